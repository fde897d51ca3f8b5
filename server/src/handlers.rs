use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Request headers passed through to the backend. Django needs the session
/// and CSRF cookies plus the matching header on POSTs.
const FORWARDED_REQUEST_HEADERS: [HeaderName; 5] = [
    header::ACCEPT,
    header::CONTENT_TYPE,
    header::COOKIE,
    header::REFERER,
    HeaderName::from_static("x-csrftoken"),
];

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

#[derive(Serialize)]
struct ProxyError {
    error: String,
}

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub fn upstream_url(base: &str, uri: &Uri) -> String {
    let path = uri
        .path_and_query()
        .map(|path| path.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{}{path}", base.trim_end_matches('/'))
}

pub fn forwarded_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for name in &FORWARDED_REQUEST_HEADERS {
        for value in headers.get_all(name) {
            forwarded.append(name.clone(), value.clone());
        }
    }
    forwarded
}

pub fn forwarded_response_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

fn proxy_error(status: StatusCode, error: String) -> Response {
    (status, Json(ProxyError { error })).into_response()
}

/// Relays `/api/*` and `/advanced-js-mapping/api/*` to the REST backend so
/// the browser sees one origin for pages, cookies and API calls.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(base) = state.upstream.as_deref() else {
        tracing::debug!(%uri, "no upstream configured");
        return proxy_error(StatusCode::NOT_FOUND, "no API backend configured".into());
    };
    let url = upstream_url(base, &uri);
    tracing::debug!(%method, %url, bytes = body.len(), "proxying");
    let result = state
        .client
        .request(method.clone(), &url)
        .headers(forwarded_request_headers(&headers))
        .body(body)
        .send()
        .await;
    let upstream = match result {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(%method, %url, %error, "upstream unreachable");
            return proxy_error(StatusCode::BAD_GATEWAY, format!("upstream unreachable: {error}"));
        }
    };
    let status = upstream.status();
    let response_headers = forwarded_response_headers(upstream.headers());
    match upstream.bytes().await {
        Ok(bytes) => {
            tracing::debug!(%method, %url, %status, bytes = bytes.len(), "proxied");
            (status, response_headers, bytes).into_response()
        }
        Err(error) => {
            tracing::warn!(%method, %url, %error, "upstream body failed");
            proxy_error(StatusCode::BAD_GATEWAY, format!("upstream body failed: {error}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn joins_base_and_path_with_query() {
        let uri: Uri = "/api/trails/search/?q=glen&limit=5".parse().unwrap();
        assert_eq!(
            upstream_url("http://127.0.0.1:8000/", &uri),
            "http://127.0.0.1:8000/api/trails/search/?q=glen&limit=5"
        );
        let uri: Uri = "/advanced-js-mapping/api/polygon-search/".parse().unwrap();
        assert_eq!(
            upstream_url("http://backend", &uri),
            "http://backend/advanced-js-mapping/api/polygon-search/"
        );
    }

    #[test]
    fn keeps_only_backend_relevant_request_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("csrftoken=abc"));
        headers.insert("x-csrftoken", HeaderValue::from_static("abc"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::HOST, HeaderValue::from_static("localhost:3000"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        let forwarded = forwarded_request_headers(&headers);
        assert_eq!(forwarded.len(), 3);
        assert_eq!(forwarded["x-csrftoken"], "abc");
        assert!(forwarded.get(header::HOST).is_none());
        assert!(forwarded.get(header::CONNECTION).is_none());
    }

    #[test]
    fn drops_hop_by_hop_response_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("csrftoken=abc"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("sessionid=xyz"));

        let forwarded = forwarded_response_headers(&headers);
        assert!(forwarded.get(header::TRANSFER_ENCODING).is_none());
        assert!(forwarded.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(forwarded.get_all(header::SET_COOKIE).iter().count(), 2);
    }

    #[tokio::test]
    async fn ping_is_no_content() {
        let response = ping_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn proxy_without_upstream_is_not_found() {
        let state = AppState {
            client: reqwest::Client::new(),
            upstream: None,
        };
        let response = proxy_handler(
            State(state),
            Method::GET,
            "/api/trails/".parse().unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
