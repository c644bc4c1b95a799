//! Row Fetcher and Row Writer over the store's REST interface.
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde_json::json;
use std::fmt;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::model::{LatestMessage, Record, RecordId};

const SERVICE: &str = "store";
const SELECT_COLUMNS: &str = "id,body,body_processed";
const LATEST_PROCEDURE: &str = "get_latest_sms";

/// Read and write access to the message table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All rows whose `body_processed` is null, in store order.
    async fn fetch_unprocessed(&self) -> Result<Vec<Record>>;

    /// Set `body_processed` on the row with `id`. Returns the updated rows.
    async fn update_processed(&self, id: &RecordId, value: &str) -> Result<Vec<Record>>;
}

#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    base_url: Url,
    table: String,
    api_key: String,
    service_role_key: String,
}

impl fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreClient")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl StoreClient {
    pub fn new(
        base_url: &str,
        table: impl Into<String>,
        api_key: impl Into<String>,
        service_role_key: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("sms-processor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: rest_base(base_url)?,
            table: table.into(),
            api_key: api_key.into(),
            service_role_key: service_role_key.into(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = Self::new(
            &cfg.store.url,
            cfg.store.table.clone(),
            cfg.store.api_key.clone(),
            cfg.store.service_role_key.clone(),
        )?;
        Ok(client)
    }

    fn request(&self, method: Method, url: Url, key: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
    }

    fn table_url(&self) -> Result<Url, ApiError> {
        self.base_url.join(&self.table).map_err(invalid_url)
    }

    /// `GET <base>/rest/v1/<table>?select=id,body,body_processed&body_processed=is.null`
    pub fn build_fetch_request(&self) -> Result<reqwest::Request, ApiError> {
        let request = self
            .request(Method::GET, self.table_url()?, &self.service_role_key)
            .query(&[("select", SELECT_COLUMNS), ("body_processed", "is.null")])
            .build()?;
        Ok(request)
    }

    /// `PATCH <base>/rest/v1/<table>?id=eq.<id>` with `{"body_processed": value}`.
    pub fn build_update_request(
        &self,
        id: &RecordId,
        value: &str,
    ) -> Result<reqwest::Request, ApiError> {
        let request = self
            .request(Method::PATCH, self.table_url()?, &self.service_role_key)
            .query(&[("id", format!("eq.{}", id))])
            .json(&json!({ "body_processed": value }))
            .build()?;
        Ok(request)
    }

    /// `POST <base>/rest/v1/rpc/get_latest_sms` with the read key.
    pub fn build_latest_request(&self) -> Result<reqwest::Request, ApiError> {
        let url = self
            .base_url
            .join(&format!("rpc/{}", LATEST_PROCEDURE))
            .map_err(invalid_url)?;
        let request = self
            .request(Method::POST, url, &self.api_key)
            .json(&json!({}))
            .build()?;
        Ok(request)
    }

    async fn execute(&self, request: reqwest::Request) -> Result<(StatusCode, String), ApiError> {
        debug!(method = %request.method(), url = %request.url(), "sending store request");
        let res = self.http.execute(request).await?;
        read_success_body(res).await
    }

    /// Only `200 OK` carries the row array; any other status is an error.
    pub async fn fetch_unprocessed(&self) -> Result<Vec<Record>, ApiError> {
        let (status, body) = self.execute(self.build_fetch_request()?).await?;
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), %body, "unexpected fetch status");
            return Err(ApiError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }
        let rows: Vec<Record> = serde_json::from_str(&body)?;
        debug!(count = rows.len(), "fetched unprocessed rows");
        Ok(rows)
    }

    pub async fn update_processed(
        &self,
        id: &RecordId,
        value: &str,
    ) -> Result<Vec<Record>, ApiError> {
        let (_, body) = self.execute(self.build_update_request(id, value)?).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Newest processed message, if the procedure returned any row.
    pub async fn latest_processed(&self) -> Result<Option<LatestMessage>, ApiError> {
        let (_, body) = self.execute(self.build_latest_request()?).await?;
        let rows: Vec<LatestMessage> = serde_json::from_str(&body)?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl RecordStore for StoreClient {
    async fn fetch_unprocessed(&self) -> Result<Vec<Record>> {
        Ok(StoreClient::fetch_unprocessed(self).await?)
    }

    async fn update_processed(&self, id: &RecordId, value: &str) -> Result<Vec<Record>> {
        Ok(StoreClient::update_processed(self, id, value).await?)
    }
}

/// Non-success statuses become `ApiError::Status` with the body text. A body
/// that cannot be read on success is an `ApiError::Http`.
async fn read_success_body(res: Response) -> Result<(StatusCode, String), ApiError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %body, "store request failed");
        return Err(ApiError::Status {
            service: SERVICE,
            status: status.as_u16(),
            body,
        });
    }
    let body = res.text().await?;
    Ok((status, body))
}

/// `https://x.supabase.co` -> `https://x.supabase.co/rest/v1/`
fn rest_base(base_url: &str) -> Result<Url, ApiError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    Url::parse(&format!("{}/rest/v1/", trimmed)).map_err(invalid_url)
}

fn invalid_url(err: impl fmt::Display) -> ApiError {
    ApiError::InvalidUrl(err.to_string())
}
