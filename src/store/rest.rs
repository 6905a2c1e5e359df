use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{
    BulkDeleteScope, MediaStore, MemoryFilter, MemoryStore, NewImage, StoreError, StoredImage,
};
use crate::types::{Memory, MemoryPatch, NewMemory};

/// Client for the diary REST backend. Routes and response envelopes
/// follow the original MiD API (`/api/memories`, `/api/images`,
/// `/api/search`, `/api/auth`); the backend scopes every call to the
/// authenticated user behind the bearer token.
pub struct RestStore {
    client: Client,
    base: String,
    token: Option<String>,
}

impl RestStore {
    /// `base_url` must be an absolute http(s) URL; a trailing slash is
    /// tolerated.
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid backend base url '{base_url}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("backend base url must be http(s), got '{base_url}'");
        }
        Ok(Self {
            client: Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Exchange credentials for a backend token (`POST /api/auth/login`).
    pub async fn login(
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, StoreError> {
        let store = Self::new(base_url, None)
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        let response = store
            .request(Method::POST, "/api/auth/login")
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        let body = check(response).await?;
        body.get("data")
            .and_then(|d| d.get("token"))
            .or_else(|| body.get("token"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| StoreError::InvalidResponse("login response missing token".into()))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.client.request(method, format!("{}{path}", self.base));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    fn filter_query(filter: &MemoryFilter) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(category) = &filter.category {
            query.push(("category", category.clone()));
        }
        if !filter.tags.is_empty() {
            query.push(("tags", filter.tags.join(",")));
        }
        if let Some(kind) = &filter.kind {
            query.push(("type", kind.clone()));
        }
        if let Some(date) = &filter.date {
            query.push(("date", date.clone()));
        }
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Unreachable(e.to_string())
}

/// Map a response to its JSON body, turning non-2xx statuses into
/// `StoreError::Backend`.
async fn check(response: reqwest::Response) -> Result<Value, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(StoreError::Backend {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| StoreError::InvalidResponse(e.to_string()))
}

/// The backend answers in one of three envelope shapes depending on the
/// variant (`data.{key}`, `{key}`, or the bare object); accept all.
fn unwrap_envelope(body: &Value, key: &str) -> Value {
    if let Some(inner) = body.get("data") {
        if let Some(value) = inner.get(key) {
            return value.clone();
        }
        return inner.clone();
    }
    if let Some(value) = body.get(key) {
        return value.clone();
    }
    body.clone()
}

fn parse_memory(value: Value) -> Result<Memory, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::InvalidResponse(e.to_string()))
}

fn parse_memories(value: Value) -> Result<Vec<Memory>, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl MemoryStore for RestStore {
    async fn create(&self, new: NewMemory) -> Result<Memory, StoreError> {
        let response = self
            .request(Method::POST, "/api/memories")
            .json(&new)
            .send()
            .await
            .map_err(transport)?;
        let body = check(response).await?;
        parse_memory(unwrap_envelope(&body, "memory"))
    }

    async fn get(&self, id: &str) -> Result<Option<Memory>, StoreError> {
        let response = self
            .request(Method::GET, &format!("/api/memories/{id}"))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = check(response).await?;
        parse_memory(unwrap_envelope(&body, "memory")).map(Some)
    }

    async fn list(&self, filter: &MemoryFilter) -> Result<Vec<Memory>, StoreError> {
        let response = self
            .request(Method::GET, "/api/memories")
            .query(&Self::filter_query(filter))
            .send()
            .await
            .map_err(transport)?;
        let body = check(response).await?;
        parse_memories(unwrap_envelope(&body, "memories"))
    }

    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<(), StoreError> {
        let response = self
            .request(Method::PUT, &format!("/api/memories/{id}"))
            .json(&patch)
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        check(response).await.map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let response = self
            .request(Method::DELETE, &format!("/api/memories/{id}"))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await.map(|_| true)
    }

    async fn bulk_delete(&self, scope: &BulkDeleteScope) -> Result<u64, StoreError> {
        // Guarded here as well as server-side: an unscoped request never
        // leaves the process.
        if !scope.is_scoped() {
            return Err(StoreError::UnscopedBulkDelete);
        }
        let mut query: Vec<(&str, String)> = Vec::new();
        if scope.delete_all {
            query.push(("deleteAll", "true".into()));
        }
        if !scope.tags.is_empty() {
            query.push(("tags", scope.tags.join(",")));
        }
        if let Some(category) = &scope.category {
            query.push(("category", category.clone()));
        }
        let response = self
            .request(Method::DELETE, "/api/memories")
            .query(&query)
            .send()
            .await
            .map_err(transport)?;
        let body = check(response).await?;
        let count = body
            .get("data")
            .and_then(|d| d.get("deletedCount"))
            .or_else(|| body.get("deletedCount"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        debug!(count, "bulk delete completed");
        Ok(count)
    }

    async fn search(&self, query: &str, filter: &MemoryFilter) -> Result<Vec<Memory>, StoreError> {
        let mut params = Self::filter_query(filter);
        params.push(("q", query.to_string()));
        let response = self
            .request(Method::GET, "/api/search")
            .query(&params)
            .send()
            .await
            .map_err(transport)?;
        let body = check(response).await?;
        parse_memories(unwrap_envelope(&body, "memories"))
    }
}

#[async_trait]
impl MediaStore for RestStore {
    async fn upload(&self, image: NewImage) -> Result<StoredImage, StoreError> {
        let mime = mime_guess::from_path(&image.file_name).first_or_octet_stream();
        let part = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name.clone())
            .mime_str(mime.essence_str())
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("description", image.description)
            .text("tags", image.tags.join(","));
        if let Some(album) = image.album {
            form = form.text("album", album);
        }

        let response = self
            .request(Method::POST, "/api/images")
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let body = check(response).await?;
        let envelope = unwrap_envelope(&body, "image");

        let id = envelope
            .get("id")
            .or_else(|| envelope.get("image_id"))
            .map(json_id)
            .ok_or_else(|| StoreError::InvalidResponse("upload response missing id".into()))?;
        let url = envelope
            .get("url")
            .or_else(|| envelope.get("image_url"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| StoreError::InvalidResponse("upload response missing url".into()))?;

        Ok(StoredImage { id, url })
    }

    async fn update(
        &self,
        id: &str,
        description: &str,
        tags: &[String],
    ) -> Result<(), StoreError> {
        let response = self
            .request(Method::PUT, &format!("/api/images/{id}"))
            .json(&serde_json::json!({ "description": description, "tags": tags }))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        check(response).await.map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let response = self
            .request(Method::DELETE, &format!("/api/images/{id}"))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await.map(|_| true)
    }
}

/// Backends disagree on id types (MySQL integers, Firestore strings);
/// normalize both to strings.
fn json_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
