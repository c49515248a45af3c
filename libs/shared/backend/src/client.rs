use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::auth::AuthToken;

use crate::error::BackendError;

/// Thin HTTP wrapper around the remote clinic API.
///
/// Every endpoint answers with a JSON object carrying a `success` flag and an
/// optional `message`. [`BackendClient::call`] unwraps that envelope so callers
/// only see the payload or a [`BackendError::Rejected`] with the server text.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.backend_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get_headers(&self, auth: Option<&AuthToken>) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth {
            let name = token.kind.header_name();
            let value = HeaderValue::from_str(token.value())
                .map_err(|_| BackendError::InvalidHeader(name))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Raw request: checks the HTTP status and decodes the body as `T`.
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth: Option<&AuthToken>,
        body: Option<Value>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(auth)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Clinic backend error ({}): {}", status, error_text);

            // The backend often explains a rejection in the usual envelope even on 4xx.
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&error_text) {
                if let Some(Value::String(message)) = map.get("message") {
                    if status.is_client_error() && status.as_u16() != 401 && status.as_u16() != 403 {
                        return Err(BackendError::Rejected(message.clone()));
                    }
                }
            }

            return Err(BackendError::Status { status, body: error_text });
        }

        let bytes = response.bytes().await?;
        let data = serde_json::from_slice::<T>(&bytes)?;
        Ok(data)
    }

    /// Request whose response uses the `{success, message, ...}` envelope.
    pub async fn call<T>(
        &self,
        method: Method,
        path: &str,
        auth: Option<&AuthToken>,
        body: Option<Value>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let value: Value = self.request(method, path, auth, body).await?;
        unwrap_envelope(value)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

pub(crate) fn unwrap_envelope<T: DeserializeOwned>(value: Value) -> Result<T, BackendError> {
    let success = value.get("success").and_then(Value::as_bool).unwrap_or(false);

    if !success {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        return Err(BackendError::Rejected(message));
    }

    Ok(serde_json::from_value(value)?)
}
