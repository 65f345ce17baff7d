//! Outbound REST calls against the employee resource.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use shared::protocol::StatusMessage;
use tracing::debug;

use crate::error::GatewayError;

pub const EMPLOYEES_RESOURCE_PATH: &str = "/hr/api/v1/employees";

#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestOptions {
    fn preset(method: Method) -> Self {
        Self {
            method,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::preset(Method::GET)
    }

    pub fn delete() -> Self {
        Self::preset(Method::DELETE)
    }

    pub fn post(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::preset(Method::POST)
        }
    }

    pub fn put(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::preset(Method::PUT)
        }
    }
}

#[async_trait]
pub trait EmployeeGateway: Send + Sync {
    /// Calls `{base}{path}` and returns the decoded JSON body.
    async fn call(&self, path: &str, options: RequestOptions) -> Result<Value, GatewayError>;
}

#[async_trait]
impl<G> EmployeeGateway for std::sync::Arc<G>
where
    G: EmployeeGateway + ?Sized,
{
    async fn call(&self, path: &str, options: RequestOptions) -> Result<Value, GatewayError> {
        (**self).call(path, options).await
    }
}

pub struct HttpGateway {
    http: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(api_url: &str) -> Self {
        Self::with_client(Client::new(), api_url)
    }

    pub fn with_client(http: Client, api_url: &str) -> Self {
        Self {
            http,
            base_url: format!(
                "{}{EMPLOYEES_RESOURCE_PATH}",
                api_url.trim().trim_end_matches('/')
            ),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EmployeeGateway for HttpGateway {
    async fn call(&self, path: &str, options: RequestOptions) -> Result<Value, GatewayError> {
        let url = format!("{}{path}", self.base_url);
        debug!(method = %options.method, %url, "hr api request");

        let mut request = self.http.request(options.method, &url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = options.body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<StatusMessage>(&bytes)
                .ok()
                .map(|body| body.message.unwrap_or(body.status));
            return Err(GatewayError::status(status.as_u16(), message));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}
