use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    BulkDeleteScope, MediaStore, MemoryFilter, MemoryStore, NewImage, StoreError, StoredImage,
};
use crate::types::{Memory, MemoryPatch, NewMemory};

/// In-process store backing the REPL's offline mode and the tests.
/// Keeps memories in insertion order so listings are stable.
#[derive(Default)]
pub struct InMemoryStore {
    memories: RwLock<Vec<Memory>>,
    media: RwLock<HashMap<String, NewImage>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.memories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.memories.read().await.is_empty()
    }
}

fn matches(memory: &Memory, filter: &MemoryFilter) -> bool {
    if let Some(category) = &filter.category {
        if memory.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    // Any-match: one shared tag qualifies the memory.
    if !filter.tags.is_empty() && !filter.tags.iter().any(|t| memory.tags.contains(t)) {
        return false;
    }
    if let Some(kind) = &filter.kind {
        if memory.payload.kind() != kind {
            return false;
        }
    }
    if let Some(date) = &filter.date {
        if memory.created_at.format("%Y-%m-%d").to_string() != *date {
            return false;
        }
    }
    true
}

fn in_scope(memory: &Memory, scope: &BulkDeleteScope) -> bool {
    if scope.delete_all {
        return true;
    }
    if let Some(category) = &scope.category {
        if memory.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    if !scope.tags.is_empty() && !scope.tags.iter().any(|t| memory.tags.contains(t)) {
        return false;
    }
    true
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn create(&self, new: NewMemory) -> Result<Memory, StoreError> {
        let now = chrono::Utc::now();
        let memory = Memory {
            id: uuid::Uuid::new_v4().to_string(),
            content: new.content,
            category: new.category,
            tags: new.tags,
            payload: new.payload,
            created_at: now,
            updated_at: now,
        };
        self.memories.write().await.push(memory.clone());
        Ok(memory)
    }

    async fn get(&self, id: &str) -> Result<Option<Memory>, StoreError> {
        let memories = self.memories.read().await;
        Ok(memories.iter().find(|m| m.id == id).cloned())
    }

    async fn list(&self, filter: &MemoryFilter) -> Result<Vec<Memory>, StoreError> {
        let memories = self.memories.read().await;
        let mut results: Vec<Memory> = memories
            .iter()
            .filter(|m| matches(m, filter))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<(), StoreError> {
        let mut memories = self.memories.write().await;
        let memory = memories
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(content) = patch.content {
            memory.content = content;
        }
        if let Some(tags) = patch.tags {
            memory.tags = tags;
        }
        if let Some(category) = patch.category {
            memory.category = category;
        }
        if let Some(payload) = patch.payload {
            memory.payload = payload;
        }
        memory.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut memories = self.memories.write().await;
        let before = memories.len();
        memories.retain(|m| m.id != id);
        Ok(memories.len() < before)
    }

    async fn bulk_delete(&self, scope: &BulkDeleteScope) -> Result<u64, StoreError> {
        if !scope.is_scoped() {
            return Err(StoreError::UnscopedBulkDelete);
        }
        let mut memories = self.memories.write().await;
        let before = memories.len();
        memories.retain(|m| !in_scope(m, scope));
        Ok((before - memories.len()) as u64)
    }

    async fn search(&self, query: &str, filter: &MemoryFilter) -> Result<Vec<Memory>, StoreError> {
        let needle = query.to_lowercase();
        let memories = self.memories.read().await;
        let mut results: Vec<Memory> = memories
            .iter()
            .filter(|m| matches(m, filter))
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        Ok(results)
    }
}

#[async_trait]
impl MediaStore for InMemoryStore {
    async fn upload(&self, image: NewImage) -> Result<StoredImage, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let url = format!("mid://media/{id}");
        self.media.write().await.insert(id.clone(), image);
        Ok(StoredImage { id, url })
    }

    async fn update(
        &self,
        id: &str,
        description: &str,
        tags: &[String],
    ) -> Result<(), StoreError> {
        let mut media = self.media.write().await;
        let image = media
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        image.description = description.to_string();
        image.tags = tags.to_vec();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.media.write().await.remove(id).is_some())
    }
}
