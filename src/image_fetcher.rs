//! Artwork download module
//!
//! Downloads are best effort: a failure is reported as a [`DownloadError`]
//! which the pipeline logs and otherwise ignores. A destination file only
//! ever appears once its body has been received completely.

use crate::temp::PartialFile;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Size of the chunks the response body is copied in
const CHUNK_SIZE: usize = 1024;

/// Time allowed for connecting and for the server to answer
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while downloading an image
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The HTTP client could not be set up
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or timed out
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    /// The server answered with something other than 200 OK
    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    /// Receiving the response body failed
    #[error("Failed to read response from {url}: {source}")]
    Read { url: String, source: io::Error },

    /// Writing the file failed
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Trait for downloading a single resource to a local file
pub trait ImageFetcher {
    /// Downloads `url` to `destination`, returning the number of bytes written.
    ///
    /// Callers check for an existing destination first; an existing file is
    /// replaced.
    fn download(&self, url: &str, destination: &Path) -> Result<u64, DownloadError>;
}

/// Image fetcher backed by a blocking HTTP client
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
}

impl HttpImageFetcher {
    /// Creates a fetcher that gives up after 10 seconds without an answer
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_timeout(RESPONSE_TIMEOUT)
    }

    /// Creates a fetcher with a custom connect and response timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(DownloadError::Client)?;

        Ok(Self { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn download(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| DownloadError::Request {
                url: url.to_string(),
                source: e,
            })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let write_error = |source: io::Error| DownloadError::Write {
            path: destination.to_path_buf(),
            source,
        };

        let (partial, mut file) = PartialFile::create(destination).map_err(write_error)?;

        let mut written: u64 = 0;
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|source| DownloadError::Read {
                    url: url.to_string(),
                    source,
                })?;
            if bytes_read == 0 {
                break; // EOF
            }

            file.write_all(&buffer[..bytes_read]).map_err(write_error)?;
            written += bytes_read as u64;
        }

        file.flush().map_err(write_error)?;
        drop(file);
        partial.persist().map_err(write_error)?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::fs;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_download_writes_body() {
        let body: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/img.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(&body)
            .expect(1)
            .create();
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("poster.jpg");

        let fetcher = HttpImageFetcher::new().unwrap();
        let written = fetcher
            .download(&format!("{}/img.jpg", server.url()), &destination)
            .unwrap();

        mock.assert();
        assert_eq!(written, body.len() as u64);
        assert_eq!(fs::read(&destination).unwrap(), body);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_non_ok_status_writes_nothing() {
        let mut server = Server::new();
        let _mock = server.mock("GET", "/missing.jpg").with_status(404).create();
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("poster.jpg");

        let fetcher = HttpImageFetcher::new().unwrap();
        let err = fetcher
            .download(&format!("{}/missing.jpg", server.url()), &destination)
            .unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 404, .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_connection_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("poster.jpg");

        let fetcher = HttpImageFetcher::new().unwrap();
        let err = fetcher
            .download("http://127.0.0.1:1/poster.jpg", &destination)
            .unwrap_err();

        assert!(matches!(err, DownloadError::Request { .. }));
        assert!(!destination.exists());
    }

    #[test]
    fn test_stalled_server_times_out() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/slow.jpg")
            .with_status(200)
            .with_body_from_request(|_| {
                thread::sleep(Duration::from_secs(3));
                b"jpeg".to_vec()
            })
            .create();
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("poster.jpg");

        let fetcher = HttpImageFetcher::with_timeout(Duration::from_millis(500)).unwrap();
        let started = Instant::now();
        let err = fetcher
            .download(&format!("{}/slow.jpg", server.url()), &destination)
            .unwrap_err();

        assert!(matches!(err, DownloadError::Request { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_directory_writes_nothing() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/img.jpg")
            .with_status(200)
            .with_body("jpeg")
            .create();
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("absent").join("poster.jpg");

        let fetcher = HttpImageFetcher::new().unwrap();
        let err = fetcher
            .download(&format!("{}/img.jpg", server.url()), &destination)
            .unwrap_err();

        assert!(matches!(err, DownloadError::Write { .. }));
        assert!(!destination.exists());
    }

    #[test]
    fn test_error_messages_name_the_resource() {
        let err = DownloadError::Read {
            url: "http://x/a.jpg".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        };
        assert_eq!(err.to_string(), "Failed to read response from http://x/a.jpg: reset");
    }
}
