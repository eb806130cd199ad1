mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::SourceError;

/// Issues a GET for `url` and returns the body bytes.
///
/// Non-success statuses are reported as [`SourceError::Status`] with the
/// response body attached.
pub fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>, SourceError> {
    let url = reqwest::Url::parse(url).map_err(|e| SourceError::InvalidUrl(e.to_string()))?;
    let req = reqwest::blocking::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req)?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(SourceError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(resp.bytes()?.to_vec())
}
