use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;

use crate::model::{
    AnnotationTagId, DeleteResult, ListOptions, ListResult, TestDefinition, TestDefinitionId,
    TestDefinitionLike, UpdateResult, WorkflowId,
};
use crate::store::traits::{AnnotationTagStore, TestDefinitionStore};

/// In-process store for local development and tests
#[derive(Debug)]
pub struct MemoryStore {
    definitions: RwLock<BTreeMap<TestDefinitionId, TestDefinition>>,
    annotation_tags: RwLock<HashSet<AnnotationTagId>>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(BTreeMap::new()),
            annotation_tags: RwLock::new(HashSet::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn with_annotation_tags<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AnnotationTagId>,
    {
        let store = Self::new();
        for tag in tags {
            store.insert_annotation_tag(tag);
        }
        store
    }

    pub fn insert_annotation_tag(&self, id: impl Into<AnnotationTagId>) {
        self.annotation_tags.write().insert(id.into());
    }

    pub fn remove_annotation_tag(&self, id: &str) -> bool {
        self.annotation_tags.write().remove(id)
    }

    /// Unscoped read, for assertions
    pub fn get_raw(&self, id: TestDefinitionId) -> Option<TestDefinition> {
        self.definitions.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }
}

fn in_scope(definition: &TestDefinition, accessible_workflow_ids: &[WorkflowId]) -> bool {
    definition
        .workflow_id()
        .map(|id| accessible_workflow_ids.contains(id))
        .unwrap_or(false)
}

fn matches_filter(definition: &TestDefinition, options: &ListOptions) -> bool {
    if let Some(name) = &options.filter.name {
        if !definition
            .name
            .to_lowercase()
            .contains(&name.to_lowercase())
        {
            return false;
        }
    }
    if let Some(workflow_id) = &options.filter.workflow_id {
        if definition.workflow_id() != Some(workflow_id) {
            return false;
        }
    }
    true
}

#[async_trait::async_trait]
impl TestDefinitionStore for MemoryStore {
    async fn save(&self, mut definition: TestDefinition) -> Result<TestDefinition> {
        let now = Utc::now();
        let mut definitions = self.definitions.write();

        let id = match definition.id {
            Some(id) => {
                self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
                id
            }
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        definition.id = Some(id);
        definition.created_at = definitions
            .get(&id)
            .and_then(|existing| existing.created_at)
            .or(Some(now));
        definition.updated_at = Some(now);

        definitions.insert(id, definition.clone());
        log::debug!("Saved test definition {}", id);
        Ok(definition)
    }

    async fn get_one(
        &self,
        id: TestDefinitionId,
        accessible_workflow_ids: &[WorkflowId],
    ) -> Result<Option<TestDefinition>> {
        Ok(self
            .definitions
            .read()
            .get(&id)
            .filter(|definition| in_scope(definition, accessible_workflow_ids))
            .cloned())
    }

    async fn update(
        &self,
        id: TestDefinitionId,
        partial: TestDefinitionLike,
        accessible_workflow_ids: &[WorkflowId],
    ) -> Result<UpdateResult> {
        let mut definitions = self.definitions.write();
        let Some(definition) = definitions
            .get_mut(&id)
            .filter(|definition| in_scope(definition, accessible_workflow_ids))
        else {
            return Ok(UpdateResult { affected: 0 });
        };

        definition.apply(partial);
        definition.updated_at = Some(Utc::now());
        log::debug!("Updated test definition {}", id);
        Ok(UpdateResult { affected: 1 })
    }

    async fn delete_by_id(
        &self,
        id: TestDefinitionId,
        accessible_workflow_ids: &[WorkflowId],
    ) -> Result<DeleteResult> {
        let mut definitions = self.definitions.write();
        let accessible = definitions
            .get(&id)
            .map(|definition| in_scope(definition, accessible_workflow_ids))
            .unwrap_or(false);
        if !accessible {
            return Ok(DeleteResult { affected: 0 });
        }

        definitions.remove(&id);
        log::debug!("Deleted test definition {}", id);
        Ok(DeleteResult { affected: 1 })
    }

    async fn get_many(
        &self,
        accessible_workflow_ids: &[WorkflowId],
        options: &ListOptions,
    ) -> Result<ListResult<TestDefinition>> {
        let definitions = self.definitions.read();
        let mut matching: Vec<&TestDefinition> = definitions
            .values()
            .filter(|d| in_scope(d, accessible_workflow_ids) && matches_filter(d, options))
            .collect();

        // Ids are handed out in insertion order
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        let count = matching.len();
        let items = matching
            .into_iter()
            .skip(options.skip.unwrap_or(0))
            .take(options.take.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(ListResult { items, count })
    }
}

#[async_trait::async_trait]
impl AnnotationTagStore for MemoryStore {
    async fn exists(&self, id: &AnnotationTagId) -> Result<bool> {
        Ok(self.annotation_tags.read().contains(id))
    }
}
