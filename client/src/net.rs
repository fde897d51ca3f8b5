use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use serde_json::Value;
use thiserror::Error;
use wasm_bindgen::JsCast;
use web_sys::HtmlDocument;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("response was not valid JSON: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait(?Send)]
pub trait Backend {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
    /// State-mutating requests; implementations attach the CSRF token.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, FetchError>;
}

pub struct HttpBackend {
    document: web_sys::Document,
}

impl HttpBackend {
    pub fn new(document: web_sys::Document) -> Self {
        Self { document }
    }

    fn csrf_token(&self) -> Option<String> {
        let cookies = self
            .document
            .clone()
            .dyn_into::<HtmlDocument>()
            .ok()?
            .cookie()
            .ok()?;
        cookie_value(&cookies, CSRF_COOKIE)
    }
}

#[async_trait(?Send)]
impl Backend for HttpBackend {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!(url, "GET");
        let response = Request::get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;
        read_json(url, response).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, FetchError> {
        tracing::debug!(url, "POST");
        let mut builder = Request::post(url).header("Accept", "application/json");
        match self.csrf_token() {
            Some(token) => builder = builder.header(CSRF_HEADER, &token),
            None => tracing::warn!(url, "no {CSRF_COOKIE} cookie; sending without {CSRF_HEADER}"),
        }
        let request = builder
            .json(body)
            .map_err(|error| FetchError::Transport(error.to_string()))?;
        let response = request
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;
        read_json(url, response).await
    }
}

async fn read_json(url: &str, response: Response) -> Result<Value, FetchError> {
    if !response.ok() {
        return Err(FetchError::Status {
            status: response.status(),
            url: url.to_string(),
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(|error| FetchError::Decode(error.to_string()))
}

pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_csrf_cookie_among_others() {
        let cookies = "sessionid=abc; csrftoken=Xy%2Fz123; theme=dark";
        assert_eq!(cookie_value(cookies, CSRF_COOKIE).as_deref(), Some("Xy/z123"));
    }

    #[test]
    fn does_not_match_cookie_name_suffixes() {
        let cookies = "oldcsrftoken=nope";
        assert_eq!(cookie_value(cookies, CSRF_COOKIE), None);
        assert_eq!(cookie_value("", CSRF_COOKIE), None);
    }

    #[test]
    fn status_errors_expose_the_code() {
        let error = FetchError::Status {
            status: 404,
            url: "/api/trails/geojson/".into(),
        };
        assert_eq!(error.status(), Some(404));
        assert_eq!(error.to_string(), "HTTP 404 from /api/trails/geojson/");
        assert_eq!(FetchError::Transport("offline".into()).status(), None);
    }
}
