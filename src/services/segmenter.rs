//! Cohort segmentation by contract type and tenure bucket.

use std::collections::BTreeMap;

use crate::models::{NormalizedRecord, Segment, Segments};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TenureBucket {
    UpToYear,
    SecondYear,
    ThirdYear,
    FourthYear,
    FifthYear,
    OverFiveYears,
}

impl TenureBucket {
    pub const ALL: [TenureBucket; 6] = [
        TenureBucket::UpToYear,
        TenureBucket::SecondYear,
        TenureBucket::ThirdYear,
        TenureBucket::FourthYear,
        TenureBucket::FifthYear,
        TenureBucket::OverFiveYears,
    ];

    /// Upper bounds are inclusive: 12 months is still the first year.
    pub fn for_months(months: u32) -> Self {
        match months {
            0..=12 => TenureBucket::UpToYear,
            13..=24 => TenureBucket::SecondYear,
            25..=36 => TenureBucket::ThirdYear,
            37..=48 => TenureBucket::FourthYear,
            49..=60 => TenureBucket::FifthYear,
            _ => TenureBucket::OverFiveYears,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TenureBucket::UpToYear => "0-12",
            TenureBucket::SecondYear => "13-24",
            TenureBucket::ThirdYear => "25-36",
            TenureBucket::FourthYear => "37-48",
            TenureBucket::FifthYear => "49-60",
            TenureBucket::OverFiveYears => "60+",
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total: usize,
    churned: usize,
}

impl Tally {
    fn count(&mut self, record: &NormalizedRecord) {
        self.total += 1;
        if record.churned {
            self.churned += 1;
        }
    }
}

fn into_segments(tallies: BTreeMap<String, Tally>) -> BTreeMap<String, Segment> {
    tallies
        .into_iter()
        .map(|(key, tally)| (key, Segment::new(tally.total, tally.churned)))
        .collect()
}

/// One segment per distinct contract type present in `records`.
pub fn segment_by_contract_type(records: &[NormalizedRecord]) -> BTreeMap<String, Segment> {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for record in records {
        tallies
            .entry(record.contract_type.key().to_string())
            .or_default()
            .count(record);
    }
    into_segments(tallies)
}

/// All six tenure buckets, including empty ones.
pub fn segment_by_tenure_bucket(records: &[NormalizedRecord]) -> BTreeMap<String, Segment> {
    let mut tallies: BTreeMap<String, Tally> = TenureBucket::ALL
        .iter()
        .map(|bucket| (bucket.label().to_string(), Tally::default()))
        .collect();

    for record in records {
        let label = TenureBucket::for_months(record.tenure_months).label();
        if let Some(tally) = tallies.get_mut(label) {
            tally.count(record);
        }
    }
    into_segments(tallies)
}

pub fn segment(records: &[NormalizedRecord]) -> Segments {
    Segments {
        by_contract_type: segment_by_contract_type(records),
        by_tenure_bucket: segment_by_tenure_bucket(records),
    }
}
