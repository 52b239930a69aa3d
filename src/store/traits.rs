use crate::model::{
    AnnotationTagId, DeleteResult, ListOptions, ListResult, TestDefinition, TestDefinitionId,
    TestDefinitionLike, UpdateResult, WorkflowId,
};
use anyhow::Result;

/// Persistence for test definitions.
///
/// Reads, updates and deletes are scoped by the caller's accessible workflow ids:
/// a definition whose workflow is outside the scope behaves as if it did not exist.
#[async_trait::async_trait]
pub trait TestDefinitionStore: Send + Sync {
    /// Build an unpersisted entity. No I/O.
    fn create(&self, partial: TestDefinitionLike) -> TestDefinition {
        TestDefinition::from_like(partial)
    }
    /// Insert a new definition, or overwrite one that already carries an id
    async fn save(&self, definition: TestDefinition) -> Result<TestDefinition>;
    async fn get_one(
        &self,
        id: TestDefinitionId,
        accessible_workflow_ids: &[WorkflowId],
    ) -> Result<Option<TestDefinition>>;
    /// Write the present fields of `partial` to the row with `id`
    async fn update(
        &self,
        id: TestDefinitionId,
        partial: TestDefinitionLike,
        accessible_workflow_ids: &[WorkflowId],
    ) -> Result<UpdateResult>;
    async fn delete_by_id(
        &self,
        id: TestDefinitionId,
        accessible_workflow_ids: &[WorkflowId],
    ) -> Result<DeleteResult>;
    /// List definitions newest first
    async fn get_many(
        &self,
        accessible_workflow_ids: &[WorkflowId],
        options: &ListOptions,
    ) -> Result<ListResult<TestDefinition>>;
}

#[async_trait::async_trait]
pub trait AnnotationTagStore: Send + Sync {
    async fn exists(&self, id: &AnnotationTagId) -> Result<bool>;
}

pub trait Store: TestDefinitionStore + AnnotationTagStore + Send + Sync {}
impl<T: TestDefinitionStore + AnnotationTagStore> Store for T {}
