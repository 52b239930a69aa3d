use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AnnotationTagId, EntityRef, Field, TestDefinitionId, WorkflowId};

/// A named configuration binding a workflow to the evaluation that scores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    /// Assigned by the store on first save
    pub id: Option<TestDefinitionId>,
    pub name: String,
    /// Workflow under test. Never changes once persisted.
    pub workflow: Option<EntityRef<WorkflowId>>,
    pub evaluation_workflow: Option<EntityRef<WorkflowId>>,
    pub annotation_tag: Option<EntityRef<AnnotationTagId>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TestDefinition {
    /// Materialize an unpersisted entity from a partial one
    pub fn from_like(like: TestDefinitionLike) -> Self {
        Self {
            id: like.id,
            name: like.name.unwrap_or_default(),
            workflow: like.workflow,
            evaluation_workflow: like.evaluation_workflow.into_value(),
            annotation_tag: like.annotation_tag.into_value(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Merge the fields present in `like` into this entity
    pub fn apply(&mut self, like: TestDefinitionLike) {
        if let Some(name) = like.name {
            self.name = name;
        }
        if let Some(workflow) = like.workflow {
            self.workflow = Some(workflow);
        }
        match like.evaluation_workflow {
            Field::Value(reference) => self.evaluation_workflow = Some(reference),
            Field::Null => self.evaluation_workflow = None,
            Field::Missing => {}
        }
        match like.annotation_tag {
            Field::Value(reference) => self.annotation_tag = Some(reference),
            Field::Null => self.annotation_tag = None,
            Field::Missing => {}
        }
    }

    pub fn workflow_id(&self) -> Option<&WorkflowId> {
        self.workflow.as_ref().map(|workflow| &workflow.id)
    }
}

/// Loosely-typed attribute bundle as sent by clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinitionAttrs {
    #[serde(default, skip_serializing_if = "Field::is_missing")]
    pub id: Field<TestDefinitionId>,
    #[serde(default, skip_serializing_if = "Field::is_missing")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_missing")]
    pub workflow_id: Field<WorkflowId>,
    #[serde(default, skip_serializing_if = "Field::is_missing")]
    pub evaluation_workflow_id: Field<WorkflowId>,
    #[serde(default, skip_serializing_if = "Field::is_missing")]
    pub annotation_tag_id: Field<AnnotationTagId>,
}

/// Names of the attributes in a [`TestDefinitionAttrs`] bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrField {
    Id,
    Name,
    WorkflowId,
    EvaluationWorkflowId,
    AnnotationTagId,
}

impl AttrField {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttrField::Id => "id",
            AttrField::Name => "name",
            AttrField::WorkflowId => "workflowId",
            AttrField::EvaluationWorkflowId => "evaluationWorkflowId",
            AttrField::AnnotationTagId => "annotationTagId",
        }
    }
}

impl std::fmt::Display for AttrField {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TestDefinitionAttrs {
    pub fn new(name: impl Into<String>, workflow_id: impl Into<WorkflowId>) -> Self {
        Self {
            name: Field::Value(name.into()),
            workflow_id: Field::Value(workflow_id.into()),
            ..Self::default()
        }
    }

    pub fn is_present(&self, field: AttrField) -> bool {
        match field {
            AttrField::Id => !self.id.is_missing(),
            AttrField::Name => !self.name.is_missing(),
            AttrField::WorkflowId => !self.workflow_id.is_missing(),
            AttrField::EvaluationWorkflowId => !self.evaluation_workflow_id.is_missing(),
            AttrField::AnnotationTagId => !self.annotation_tag_id.is_missing(),
        }
    }

    /// Reset `field` to `Missing`, returning whether anything was dropped
    pub fn remove(&mut self, field: AttrField) -> bool {
        let present = self.is_present(field);
        match field {
            AttrField::Id => {
                self.id.take();
            }
            AttrField::Name => {
                self.name.take();
            }
            AttrField::WorkflowId => {
                self.workflow_id.take();
            }
            AttrField::EvaluationWorkflowId => {
                self.evaluation_workflow_id.take();
            }
            AttrField::AnnotationTagId => {
                self.annotation_tag_id.take();
            }
        }
        present
    }
}

/// Partial entity where relationships are expressed as `{id}` links.
///
/// Only the fields that are present are written by a store update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinitionLike {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TestDefinitionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<EntityRef<WorkflowId>>,
    #[serde(default, skip_serializing_if = "Field::is_missing")]
    pub evaluation_workflow: Field<EntityRef<WorkflowId>>,
    #[serde(default, skip_serializing_if = "Field::is_missing")]
    pub annotation_tag: Field<EntityRef<AnnotationTagId>>,
}

impl TestDefinitionLike {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.name.is_none()
            && self.workflow.is_none()
            && self.evaluation_workflow.is_missing()
            && self.annotation_tag.is_missing()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinitionFilter {
    /// Case-insensitive substring match on the name
    pub name: Option<String>,
    pub workflow_id: Option<WorkflowId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(default)]
    pub filter: TestDefinitionFilter,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub affected: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub affected: u64,
}

/// One page of records plus the total number matching the filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub count: usize,
}

impl<T> ListResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
        }
    }
}
