use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::logic::validate::{EntityValidator, TestDefinitionValidator};
use crate::model::{
    AttrField, DeleteResult, EntityRef, Field, ListOptions, ListResult, TestDefinition,
    TestDefinitionAttrs, TestDefinitionId, TestDefinitionLike, WorkflowId,
};
use crate::store::traits::{AnnotationTagStore, TestDefinitionStore};

/// Attributes accepted on create but silently dropped on update.
///
/// A definition stays bound to the workflow it was created for. Sending a
/// different `workflowId` on update is a no-op, not an error.
pub const IMMUTABLE_AFTER_CREATE: &[AttrField] = &[AttrField::WorkflowId];

pub struct TestDefinitionsService<S, T, V = TestDefinitionValidator> {
    store: Arc<S>,
    tag_store: Arc<T>,
    validator: V,
}

impl<S, T> TestDefinitionsService<S, T, TestDefinitionValidator>
where
    S: TestDefinitionStore,
    T: AnnotationTagStore,
{
    pub fn new(store: Arc<S>, tag_store: Arc<T>) -> Self {
        Self::with_validator(store, tag_store, TestDefinitionValidator)
    }
}

impl<S, T, V> TestDefinitionsService<S, T, V>
where
    S: TestDefinitionStore,
    T: AnnotationTagStore,
    V: EntityValidator,
{
    pub fn with_validator(store: Arc<S>, tag_store: Arc<T>, validator: V) -> Self {
        Self {
            store,
            tag_store,
            validator,
        }
    }

    /// Map client attributes onto a partial entity with `{id}` relationship links.
    ///
    /// Absent attributes are omitted. `null` clears the optional links and is
    /// ignored for `id`, `name` and `workflowId`, which cannot be cleared.
    pub fn to_entity_like(attrs: &TestDefinitionAttrs) -> TestDefinitionLike {
        TestDefinitionLike {
            id: attrs.id.as_value().copied().filter(|id| *id != 0),
            name: attrs.name.as_value().map(|name| name.trim().to_string()),
            workflow: attrs.workflow_id.as_value().cloned().map(EntityRef::new),
            evaluation_workflow: attrs.evaluation_workflow_id.clone().map(EntityRef::new),
            annotation_tag: attrs.annotation_tag_id.clone().map(EntityRef::new),
        }
    }

    /// Build an unpersisted entity from client attributes
    pub fn to_entity(&self, attrs: &TestDefinitionAttrs) -> TestDefinition {
        self.store.create(Self::to_entity_like(attrs))
    }

    pub async fn find_one(
        &self,
        id: TestDefinitionId,
        accessible_workflow_ids: &[WorkflowId],
    ) -> ServiceResult<Option<TestDefinition>> {
        Ok(self.store.get_one(id, accessible_workflow_ids).await?)
    }

    pub async fn save(&self, definition: TestDefinition) -> ServiceResult<TestDefinition> {
        self.validator.validate(&definition)?;

        Ok(self.store.save(definition).await?)
    }

    pub async fn create(&self, attrs: &TestDefinitionAttrs) -> ServiceResult<TestDefinition> {
        let definition = self.to_entity(attrs);
        self.save(definition).await
    }

    pub async fn update(
        &self,
        id: TestDefinitionId,
        mut attrs: TestDefinitionAttrs,
        accessible_workflow_ids: &[WorkflowId],
    ) -> ServiceResult<Option<TestDefinition>> {
        // The transient entity is built from a partial bundle, so only the name is judged here
        if attrs.name.is_value() {
            let transient = self.to_entity(&attrs);
            if let Err(err) = self.validator.validate(&transient) {
                if let Some(name_error) = err.restricted_to(AttrField::Name.as_str()) {
                    return Err(name_error.into());
                }
            }
        }

        for field in IMMUTABLE_AFTER_CREATE {
            attrs.remove(*field);
        }

        if let Field::Value(tag_id) = &attrs.annotation_tag_id {
            if !self.tag_store.exists(tag_id).await? {
                return Err(ServiceError::bad_request("Annotation tag not found"));
            }
        }

        let partial = Self::to_entity_like(&attrs);
        let result = self
            .store
            .update(id, partial, accessible_workflow_ids)
            .await?;
        if result.affected == 0 {
            return Err(ServiceError::not_found("Test definition not found"));
        }

        Ok(self.store.get_one(id, accessible_workflow_ids).await?)
    }

    pub async fn delete(
        &self,
        id: TestDefinitionId,
        accessible_workflow_ids: &[WorkflowId],
    ) -> ServiceResult<DeleteResult> {
        Ok(self.store.delete_by_id(id, accessible_workflow_ids).await?)
    }

    /// List definitions visible to the caller. Without a scope nothing is visible.
    pub async fn get_many(
        &self,
        options: &ListOptions,
        accessible_workflow_ids: Option<&[WorkflowId]>,
    ) -> ServiceResult<ListResult<TestDefinition>> {
        let accessible_workflow_ids = accessible_workflow_ids.unwrap_or(&[]);
        Ok(self
            .store
            .get_many(accessible_workflow_ids, options)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    type Service = TestDefinitionsService<MemoryStore, MemoryStore>;

    fn attrs(json: serde_json::Value) -> TestDefinitionAttrs {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_to_entity_like_omits_absent_fields() {
        let like = Service::to_entity_like(&TestDefinitionAttrs::default());
        assert!(like.is_empty());
        assert_eq!(serde_json::to_value(&like).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_to_entity_like_trims_name() {
        let like = Service::to_entity_like(&attrs(serde_json::json!({ "name": "  Foo  " })));
        assert_eq!(
            serde_json::to_value(&like).unwrap(),
            serde_json::json!({ "name": "Foo" })
        );
    }

    #[test]
    fn test_to_entity_like_keeps_whitespace_name_as_empty() {
        let like = Service::to_entity_like(&attrs(serde_json::json!({ "name": "   " })));
        assert_eq!(like.name.as_deref(), Some(""));
    }

    #[test]
    fn test_to_entity_like_links_relationships_by_id() {
        let like = Service::to_entity_like(&attrs(serde_json::json!({
            "id": 7,
            "workflowId": "w1",
            "evaluationWorkflowId": "e1",
            "annotationTagId": "t1",
        })));

        assert_eq!(
            serde_json::to_value(&like).unwrap(),
            serde_json::json!({
                "id": 7,
                "workflow": { "id": "w1" },
                "evaluationWorkflow": { "id": "e1" },
                "annotationTag": { "id": "t1" },
            })
        );
    }

    #[test]
    fn test_to_entity_like_skips_zero_id_and_null_workflow() {
        let like = Service::to_entity_like(&attrs(serde_json::json!({
            "id": 0,
            "workflowId": null,
            "annotationTagId": null,
        })));

        assert_eq!(like.id, None);
        assert_eq!(like.workflow, None);
        assert_eq!(like.annotation_tag, Field::Null);
        assert!(like.evaluation_workflow.is_missing());
    }

    #[test]
    fn test_to_entity_does_not_persist() {
        let store = Arc::new(MemoryStore::new());
        let service = Service::new(store.clone(), store.clone());

        let entity = service.to_entity(&TestDefinitionAttrs::new("T1", "w1"));
        assert_eq!(entity.id, None);
        assert_eq!(entity.name, "T1");
        assert!(store.is_empty());
    }
}
