use super::client::HttpClient;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BasicClient(reqwest::blocking::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Builds a client whose requests give up after `timeout`.
    ///
    /// Falls back to reqwest's defaults if the configured builder is rejected.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self(client)
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for BasicClient {
    fn execute(&self, req: reqwest::blocking::Request) -> reqwest::Result<reqwest::blocking::Response> {
        self.0.execute(req)
    }
}
