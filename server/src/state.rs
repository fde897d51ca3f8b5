#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    /// Base URL of the trails REST backend, e.g. `http://127.0.0.1:8000`.
    pub upstream: Option<String>,
}
