//! Hosted datastore client over its REST gateway

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{Datastore, Filter, Query, StoreError, StoreResult};
use crate::models::AuthUser;

/// REST client authenticated with the service-role key
pub struct PostgrestStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AuthUserPage {
    #[serde(default)]
    users: Vec<AuthUser>,
}

impl PostgrestStore {
    pub fn new(base_url: &str, service_key: &str) -> StoreResult<Self> {
        if base_url.trim().is_empty() || service_key.trim().is_empty() {
            return Err(StoreError::Config("Supabase keys missing".to_string()));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_key)
            .map_err(|e| StoreError::Config(format!("invalid service key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", service_key))
            .map_err(|e| StoreError::Config(format!("invalid service key: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// JSON body, treating an empty body as `null`
    async fn json_body(response: Response) -> StoreResult<Value> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn rows(value: Value, context: &str) -> StoreResult<Vec<Value>> {
        match value {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            _ => Err(StoreError::UnexpectedShape(context.to_string())),
        }
    }

    fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
        filters
            .iter()
            .map(|f| (f.column.clone(), f.to_param()))
            .collect()
    }
}

#[async_trait::async_trait]
impl Datastore for PostgrestStore {
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Value>> {
        let url = self.table_url(table);
        debug!("GET {} {:?}", url, query.to_params());

        let response = self
            .send(self.client.get(&url).query(&query.to_params()))
            .await?;
        Self::rows(Self::json_body(response).await?, table)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> StoreResult<Vec<Value>> {
        let url = self.table_url(table);
        debug!("POST {} ({} rows)", url, rows.len());

        let response = self
            .send(
                self.client
                    .post(&url)
                    .header("Prefer", "return=representation")
                    .json(&rows),
            )
            .await?;
        Self::rows(Self::json_body(response).await?, table)
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>, on_conflict: &[&str]) -> StoreResult<()> {
        let url = self.table_url(table);
        debug!("UPSERT {} on {:?}", url, on_conflict);

        self.send(
            self.client
                .post(&url)
                .query(&[("on_conflict", on_conflict.join(","))])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&rows),
        )
        .await?;
        Ok(())
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> StoreResult<usize> {
        let url = self.table_url(table);
        debug!("PATCH {} {:?}", url, filters);

        let response = self
            .send(
                self.client
                    .patch(&url)
                    .query(&Self::filter_params(filters))
                    .header("Prefer", "return=representation")
                    .json(&patch),
            )
            .await?;
        Ok(Self::rows(Self::json_body(response).await?, table)?.len())
    }

    async fn rpc(&self, function: &str, args: Value) -> StoreResult<Value> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        debug!("RPC {}", function);

        let response = self.send(self.client.post(&url).json(&args)).await?;
        Self::json_body(response).await
    }

    async fn list_auth_users(&self) -> StoreResult<Vec<AuthUser>> {
        let url = format!("{}/auth/v1/admin/users", self.base_url);

        let response = self.send(self.client.get(&url)).await?;
        match Self::json_body(response).await? {
            // Older gateways return the bare array
            Value::Array(users) => Ok(serde_json::from_value(Value::Array(users))?),
            page @ Value::Object(_) => Ok(serde_json::from_value::<AuthUserPage>(page)?.users),
            _ => Err(StoreError::UnexpectedShape("auth/v1/admin/users".to_string())),
        }
    }
}
