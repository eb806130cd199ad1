use reqwest::blocking::{Request, Response};

/// Transport used by the live-bus source. Implementations may decorate the
/// request (headers, query parameters) before sending it.
pub trait HttpClient: Send + Sync {
    fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
