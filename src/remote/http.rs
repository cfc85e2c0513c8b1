//! REST client for a PostgREST-style record table.

use async_trait::async_trait;
use reqwest::{header, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::store::{ListFilter, RemoteError, RemoteStore};
use crate::config::RemoteConfig;
use crate::records::Record;

/// Remote store backed by `{url}/rest/v1/{table}`.
#[derive(Clone)]
pub struct HttpRemoteStore {
  client: reqwest::Client,
  endpoint: Url,
  api_key: String,
}

impl HttpRemoteStore {
  pub fn new(config: &RemoteConfig, api_key: &str) -> Result<Self, RemoteError> {
    if !config.is_configured(Some(api_key)) {
      return Err(RemoteError::Unconfigured);
    }

    let endpoint = table_endpoint(&config.url, &config.table)?;
    let client = reqwest::Client::builder()
      .timeout(config.timeout())
      .build()?;

    Ok(Self {
      client,
      endpoint,
      api_key: api_key.to_string(),
    })
  }

  /// Build a store from config, or `None` when the remote is unconfigured.
  pub fn from_config(config: &RemoteConfig, api_key: Option<&str>) -> Option<Self> {
    let key = api_key.unwrap_or_default();
    match Self::new(config, key) {
      Ok(store) => {
        info!(endpoint = %store.endpoint, "remote store configured");
        Some(store)
      }
      Err(e) => {
        info!(reason = %e, "remote store unavailable, running from local cache");
        None
      }
    }
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  fn list_url(&self, filter: &ListFilter) -> Url {
    let mut url = self.endpoint.clone();
    {
      let mut query = url.query_pairs_mut();
      query.append_pair("select", "*");
      if let Some(category) = &filter.category {
        // Server-side narrowing only; exact tag matching happens client-side
        query.append_pair("category", &format!("ilike.*{}*", category.trim()));
      }
      if let Some(slug) = &filter.slug {
        query.append_pair("slug", &format!("eq.{}", slug));
      }
      if let Some(kind) = filter.kind {
        query.append_pair("kind", &format!("eq.{}", kind.as_str()));
      }
      query.append_pair("order", "created_at.desc");
    }
    url
  }

  fn row_url(&self, column: &str, value: &str) -> Url {
    let mut url = self.endpoint.clone();
    url
      .query_pairs_mut()
      .append_pair("select", "*")
      .append_pair(column, &format!("eq.{}", value));
    url
  }

  fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    request
      .header("apikey", &self.api_key)
      .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
      .header(header::ACCEPT, "application/json")
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
    let resp = self.authorize(request).send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(RemoteError::Server {
        status: status.as_u16(),
        body,
      });
    }
    Ok(resp)
  }

  async fn rows(&self, request: RequestBuilder) -> Result<Vec<Record>, RemoteError> {
    let resp = self.send(request).await?;
    let values: Vec<Value> = decode(resp).await?;
    Ok(decode_rows(values))
  }

  async fn single(&self, column: &str, value: &str) -> Result<Option<Record>, RemoteError> {
    let request = self.client.get(self.row_url(column, value));
    Ok(self.rows(request).await?.into_iter().next())
  }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, RemoteError> {
  let bytes = resp.bytes().await?;
  serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Decode rows one by one so a single bad row does not poison the batch.
fn decode_rows(values: Vec<Value>) -> Vec<Record> {
  values
    .into_iter()
    .filter_map(|value| {
      let id = value.get("id").map(Value::to_string).unwrap_or_default();
      match serde_json::from_value::<Record>(value) {
        Ok(record) => Some(record),
        Err(e) => {
          warn!(id = %id, error = %e, "skipping undecodable remote row");
          None
        }
      }
    })
    .collect()
}

fn table_endpoint(base: &str, table: &str) -> Result<Url, RemoteError> {
  let mut base = base.trim().to_string();
  if !base.ends_with('/') {
    base.push('/');
  }
  Url::parse(&base)
    .and_then(|url| url.join("rest/v1/"))
    .and_then(|url| url.join(table.trim()))
    .map_err(|e| RemoteError::Decode(format!("invalid remote url: {}", e)))
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
  async fn list(&self, filter: &ListFilter) -> Result<Vec<Record>, RemoteError> {
    let url = self.list_url(filter);
    debug!(url = %url, "listing remote records");
    let records = self.rows(self.client.get(url)).await?;
    debug!(count = records.len(), "listed remote records");
    Ok(records)
  }

  async fn get_by_id(&self, id: &str) -> Result<Option<Record>, RemoteError> {
    self.single("id", id).await
  }

  async fn get_by_slug(&self, slug: &str) -> Result<Option<Record>, RemoteError> {
    self.single("slug", slug).await
  }

  async fn insert(&self, record: &Record) -> Result<Record, RemoteError> {
    let request = self
      .client
      .post(self.endpoint.clone())
      .header("Prefer", "return=representation")
      .json(&[record]);
    let stored = self.rows(request).await?;
    Ok(stored.into_iter().next().unwrap_or_else(|| record.clone()))
  }

  async fn update(&self, record: &Record) -> Result<Option<Record>, RemoteError> {
    let request = self
      .client
      .patch(self.row_url("id", &record.id))
      .header("Prefer", "return=representation")
      .json(record);
    Ok(self.rows(request).await?.into_iter().next())
  }

  async fn delete(&self, id: &str) -> Result<bool, RemoteError> {
    let request = self
      .client
      .delete(self.row_url("id", id))
      .header("Prefer", "return=representation");
    let resp = self.send(request).await?;
    let removed: Vec<Value> = decode(resp).await?;
    Ok(!removed.is_empty())
  }
}
