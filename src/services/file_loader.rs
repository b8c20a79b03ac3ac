use bytes::Bytes;
use reqwest::Client;

use crate::error::AppError;

/// A file fetched from a signed URL, with the server's declared content type.
#[derive(Debug)]
pub struct DownloadedFile {
    pub content_type: Option<String>,
    pub bytes: Bytes,
    /// Full body length, including bytes dropped past the cap.
    pub size: usize,
}

/// Collects a streamed body, keeping at most `cap + 1` bytes but counting all of them.
#[derive(Debug)]
pub struct CappedBody {
    buffer: Vec<u8>,
    size: usize,
    cap: usize,
}

impl CappedBody {
    pub fn new(cap: usize) -> Self {
        Self {
            buffer: Vec::new(),
            size: 0,
            cap,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.size = self.size.saturating_add(chunk.len());
        let room = self.cap.saturating_add(1).saturating_sub(self.buffer.len());
        let keep = chunk.len().min(room);
        self.buffer.extend_from_slice(&chunk[..keep]);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_capped(&self) -> bool {
        self.size > self.cap
    }

    /// Stored bytes and the full length seen.
    pub fn finish(self) -> (Bytes, usize) {
        (Bytes::from(self.buffer), self.size)
    }
}

/// Download an upload. Only `max_bytes + 1` bytes are kept; the rest is counted.
pub async fn load_file_from_url(url: &str, max_bytes: usize) -> Result<DownloadedFile, AppError> {
    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::DownloadError(format!("Failed to fetch file: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::DownloadError(format!(
            "Failed to fetch file. Status: {}",
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let mut body = CappedBody::new(max_bytes);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::DownloadError(format!("Failed to read response bytes: {}", e)))?
    {
        body.push(&chunk);
    }

    if body.is_capped() {
        tracing::warn!(
            "Download from signed URL is {} bytes, over the {} byte limit",
            body.size(),
            max_bytes
        );
    }

    let (bytes, size) = body.finish();
    Ok(DownloadedFile {
        content_type,
        bytes,
        size,
    })
}

/// Best-effort file name for a URL: its last path segment, query stripped.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let without_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    let (_, segment) = without_scheme.rsplit_once('/')?;
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves one connection on a local port. `None` closes it without a reply.
    fn serve_once(reply: Option<Vec<u8>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            if let Some(reply) = reply {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                let _ = stream.write_all(&reply);
            }
        });
        format!("http://{}/exports/customers.csv", addr)
    }

    fn csv_reply(body_len: usize) -> Vec<u8> {
        let mut reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body_len
        )
        .into_bytes();
        reply.extend(std::iter::repeat(b'x').take(body_len));
        reply
    }

    #[test]
    fn file_name_is_last_path_segment() {
        assert_eq!(
            file_name_from_url("https://bucket.example.com/uploads/customers.csv?X-Sig=abc"),
            Some("customers.csv".to_string())
        );
        assert_eq!(file_name_from_url("https://example.com/"), None);
        assert_eq!(file_name_from_url("https://example.com"), None);
    }

    #[test]
    fn capped_body_counts_past_the_cap() {
        let mut body = CappedBody::new(4);
        body.push(b"abc");
        assert!(!body.is_capped());
        body.push(b"defgh");
        body.push(b"ij");

        assert!(body.is_capped());
        let (bytes, size) = body.finish();
        assert_eq!(&bytes[..], b"abcde");
        assert_eq!(size, 10);
    }

    #[tokio::test]
    async fn oversize_download_keeps_real_size() {
        let url = serve_once(Some(csv_reply(3000)));
        let download = load_file_from_url(&url, 1000).await.unwrap();

        assert_eq!(download.size, 3000);
        assert_eq!(download.bytes.len(), 1001);
        assert_eq!(download.content_type.as_deref(), Some("text/csv"));
    }

    #[tokio::test]
    async fn dropped_connection_is_a_download_error() {
        let url = serve_once(None);
        let result = load_file_from_url(&url, 1024).await;
        assert!(matches!(result, Err(AppError::DownloadError(_))));
    }
}
