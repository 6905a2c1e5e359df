pub mod memory;
pub mod rest;

use async_trait::async_trait;

use crate::types::{Memory, MemoryPatch, NewMemory};

/// Errors surfaced by the memory and media stores. The dialogue engine
/// turns every one of these into a user-visible reply; none of them may
/// crash a session.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("memory not found: {0}")]
    NotFound(String),

    #[error("bulk delete requires delete_all, a category, or at least one tag")]
    UnscopedBulkDelete,

    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Failures where local input should be kept for retry (the backend
    /// is down or broken) rather than reported as a bad request.
    pub fn is_outage(&self) -> bool {
        match self {
            StoreError::Unreachable(_) => true,
            StoreError::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Filters for listing/searching memories. Tag matching is any-match
/// (OR): a memory carrying any requested tag qualifies.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    pub category: Option<String>,
    pub tags: Vec<String>,
    /// Entry type: "text", "table", "list", "timeline", "image".
    pub kind: Option<String>,
    /// Calendar day of creation, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub limit: Option<usize>,
}

/// Scope of a bulk delete. At least one of the three must be set;
/// stores reject an unscoped request so a bare "delete memories" can
/// never wipe a diary.
#[derive(Debug, Clone, Default)]
pub struct BulkDeleteScope {
    pub delete_all: bool,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl BulkDeleteScope {
    pub fn is_scoped(&self) -> bool {
        self.delete_all || self.category.is_some() || !self.tags.is_empty()
    }
}

/// The diary's persistence collaborator. Implementations are responsible
/// for per-user isolation; the dialogue core never sees another user's
/// entries.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn create(&self, memory: NewMemory) -> Result<Memory, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Memory>, StoreError>;

    async fn list(&self, filter: &MemoryFilter) -> Result<Vec<Memory>, StoreError>;

    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<(), StoreError>;

    /// Returns false when the id did not exist.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Returns the number of memories removed. Rejects unscoped requests
    /// with `StoreError::UnscopedBulkDelete`.
    async fn bulk_delete(&self, scope: &BulkDeleteScope) -> Result<u64, StoreError>;

    /// Case-insensitive substring match over content, combinable with
    /// the other filters.
    async fn search(&self, query: &str, filter: &MemoryFilter) -> Result<Vec<Memory>, StoreError>;
}

/// An image blob to upload.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub description: String,
    pub tags: Vec<String>,
    pub album: Option<String>,
}

/// A stored image as the media backend reports it.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub id: String,
    pub url: String,
}

/// The image blob collaborator.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, image: NewImage) -> Result<StoredImage, StoreError>;

    async fn update(
        &self,
        id: &str,
        description: &str,
        tags: &[String],
    ) -> Result<(), StoreError>;

    /// Returns false when the id did not exist.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}
