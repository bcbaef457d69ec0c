/// HTTP transport seam for the Google APIs
use crate::error::SaverError;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub bearer: String,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, bearer: &str) -> HttpRequest {
        HttpRequest {
            method: Method::Get,
            url: url.into(),
            bearer: bearer.to_string(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, bearer: &str, body: Value) -> HttpRequest {
        HttpRequest {
            method: Method::Post,
            body: Some(body),
            ..HttpRequest::get(url, bearer)
        }
    }

    pub fn put(url: impl Into<String>, bearer: &str, body: Value) -> HttpRequest {
        HttpRequest {
            method: Method::Put,
            body: Some(body),
            ..HttpRequest::get(url, bearer)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SaverError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends one request, reporting only failures to get any response at all
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SaverError>;
}

/// `reqwest` client; backed by `fetch` when compiled to wasm32
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SaverError> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        }
        .bearer_auth(&request.bearer)
        .header(CONTENT_TYPE, "application/json");

        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| SaverError::transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SaverError::transport(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[cfg(test)]
pub use fake::FakeTransport;
