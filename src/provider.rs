use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

const API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Service error ocurred ({status}): {message}.")]
    ServiceError { status: u16, message: String },

    #[error("Request failed: {0}.")]
    RequestError(String),

    #[error("Unable to parse the response: {0}.")]
    ParsingError(String),
}

/// A D1 database as reported by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseRecord {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub uuid: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub version: Option<String>,
}

#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    /// Databases in the account whose name matches `name`, in API order.
    async fn list(&self, account_id: &str, name: &str) -> Result<Vec<DatabaseRecord>, Error>;

    async fn create(&self, account_id: &str, name: &str) -> Result<DatabaseRecord, Error>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,

    #[serde(default)]
    errors: Vec<ApiMessage>,

    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct CreateDatabase<'a> {
    name: &'a str,
}

pub struct CloudflareClient {
    base_url: String,
    api_token: String,

    client: Client,
}

impl CloudflareClient {
    pub fn new(api_token: &str) -> Result<Self, Error> {
        Self::with_base_url(api_token, API_BASE_URL)
    }

    pub fn with_base_url(api_token: &str, base_url: &str) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| Error::RequestError(error.to_string()))?;

        return Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            client,
        });
    }

    fn databases_url(&self, account_id: &str) -> String {
        format!("{}/accounts/{}/d1/database", self.base_url, account_id)
    }

    async fn send<T: DeserializeOwned + Send>(&self, request: RequestBuilder) -> Result<T, Error> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|error| Error::RequestError(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| Error::RequestError(error.to_string()))?;
        debug!(status = %status, body = %body, "Cloudflare API response");

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(error) if status.is_success() => {
                return Err(Error::ParsingError(error.to_string()))
            }
            Err(_) => {
                return Err(Error::ServiceError {
                    status: status.as_u16(),
                    message: body,
                })
            }
        };

        if !status.is_success() || !envelope.success {
            return Err(Error::ServiceError {
                status: status.as_u16(),
                message: describe(&envelope.errors),
            });
        }

        match envelope.result {
            Some(result) => Ok(result),
            None => Err(Error::ParsingError(String::from(
                "response did not contain a result",
            ))),
        }
    }
}

#[async_trait]
impl DatabaseProvider for CloudflareClient {
    async fn list(&self, account_id: &str, name: &str) -> Result<Vec<DatabaseRecord>, Error> {
        let request = self
            .client
            .get(self.databases_url(account_id))
            .query(&[("name", name)]);

        self.send(request).await
    }

    async fn create(&self, account_id: &str, name: &str) -> Result<DatabaseRecord, Error> {
        let request = self
            .client
            .post(self.databases_url(account_id))
            .json(&CreateDatabase { name });

        self.send(request).await
    }
}

fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return String::from("no error details returned");
    }

    errors
        .iter()
        .map(|error| format!("[{}] {}", error.code, error.message))
        .collect::<Vec<_>>()
        .join("; ")
}
