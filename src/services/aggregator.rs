use crate::models::{ChurnMetrics, NormalizedRecord};

#[derive(Debug, Default)]
struct Accumulator {
    total: usize,
    churned: usize,
    monthly_sum: f64,
    tenure_sum: f64,
    monthly_sum_churned: f64,
    monthly_sum_retained: f64,
}

impl Accumulator {
    fn add(mut self, record: &NormalizedRecord) -> Self {
        self.total += 1;
        self.monthly_sum += record.monthly_charges;
        self.tenure_sum += f64::from(record.tenure_months);
        if record.churned {
            self.churned += 1;
            self.monthly_sum_churned += record.monthly_charges;
        } else {
            self.monthly_sum_retained += record.monthly_charges;
        }
        self
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Summary metrics over `records`, computed in one pass.
///
/// Every rate and mean over an empty subset is 0 rather than NaN.
pub fn aggregate(records: &[NormalizedRecord]) -> ChurnMetrics {
    let acc = records.iter().fold(Accumulator::default(), Accumulator::add);

    let retained = acc.total - acc.churned;
    let churn_rate = mean(acc.churned as f64, acc.total);
    let retention_rate = if acc.total > 0 { 1.0 - churn_rate } else { 0.0 };

    ChurnMetrics {
        total_customers: acc.total,
        churned_count: acc.churned,
        retained_count: retained,
        churn_rate,
        retention_rate,
        average_monthly_charges: mean(acc.monthly_sum, acc.total),
        average_tenure: mean(acc.tenure_sum, acc.total),
        average_monthly_charges_churned: mean(acc.monthly_sum_churned, acc.churned),
        average_monthly_charges_retained: mean(acc.monthly_sum_retained, retained),
    }
}
