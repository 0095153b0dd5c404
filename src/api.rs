use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::{BackendConfig, NetworkConfig};
use crate::error::{AppError, AppResult};

/// Filter / ordering parameters for a table request, rendered in the
/// `column=op.value` query syntax of the hosted REST layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn gte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, "lte", value)
    }

    pub fn lt(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, "lt", value)
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(column, "is", "null")
    }

    /// `(a.eq.1,b.eq.2)` style disjunction.
    pub fn or(mut self, expr: &str) -> Self {
        self.params.push(("or".to_string(), format!("({expr})")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{column}.{dir}")));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".to_string(), n.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn filter(mut self, column: &str, op: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("{op}.{}", value.to_string())));
        self
    }
}

/// Client for the hosted backend: table CRUD, RPC and public storage URLs.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl BackendClient {
    /// Create a new client with configurable timeouts.
    pub fn new(backend: &BackendConfig, network: &NetworkConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: backend.url.trim_end_matches('/').to_string(),
            anon_key: backend.anon_key.clone(),
            access_token: backend.access_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read every row matching `query`.
    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> AppResult<Vec<T>> {
        let response = self
            .request(Method::GET, &self.table_url(table))
            .query(query.params())
            .send()
            .await?;
        decode(table, response).await
    }

    /// First row matching `query`, `None` when nothing matches.
    pub async fn select_optional<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> AppResult<Option<T>> {
        let query = query.clone().limit(1);
        let mut rows: Vec<T> = self.select(table, &query).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    /// Insert one row and return it as stored.
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let mut rows: Vec<T> = decode(table, response).await?;
        if rows.is_empty() {
            return Err(AppError::Decode(format!("insert into {table} returned no row")));
        }
        Ok(rows.swap_remove(0))
    }

    /// Insert several rows, returning nothing.
    pub async fn insert_many<B: Serialize>(&self, table: &str, rows: &[B]) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let response = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        check_status(table, response).await.map(|_| ())
    }

    /// Patch the rows matching `query` and return them.
    pub async fn update<B, T>(&self, table: &str, query: &Query, body: &B) -> AppResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::PATCH, &self.table_url(table))
            .query(query.params())
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        decode(table, response).await
    }

    pub async fn delete(&self, table: &str, query: &Query) -> AppResult<()> {
        let response = self
            .request(Method::DELETE, &self.table_url(table))
            .query(query.params())
            .send()
            .await?;
        check_status(table, response).await.map(|_| ())
    }

    /// Call a server-side function.
    pub async fn rpc<A, T>(&self, function: &str, args: &A) -> AppResult<T>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let response = self.request(Method::POST, &url).json(args).send().await?;
        decode(function, response).await
    }

    /// Public URL of an object in a storage bucket.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket,
            path.trim_start_matches('/')
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }
}

async fn check_status(target: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    tracing::error!("{} request failed with {}: {}", target, status, message);
    Err(AppError::Backend {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(target: &str, response: Response) -> AppResult<T> {
    let response = check_status(target, response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::Decode(format!("{target}: {e}")))
}
