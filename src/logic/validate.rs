use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::TestDefinition;

pub const NAME_MAX_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Structural or semantic violations found on an entity
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Validation failed: {}", describe(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Keep only the violations on `field`, or `None` if there are none
    pub fn restricted_to(self, field: &str) -> Option<ValidationError> {
        let violations: Vec<_> = self
            .violations
            .into_iter()
            .filter(|v| v.field == field)
            .collect();
        if violations.is_empty() {
            None
        } else {
            Some(ValidationError { violations })
        }
    }
}

pub trait EntityValidator: Send + Sync {
    fn validate(&self, definition: &TestDefinition) -> Result<(), ValidationError>;
}

/// Column-level rules for a test definition row
#[derive(Debug, Clone, Copy, Default)]
pub struct TestDefinitionValidator;

impl EntityValidator for TestDefinitionValidator {
    fn validate(&self, definition: &TestDefinition) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        let name_length = definition.name.chars().count();
        if name_length == 0 || name_length > NAME_MAX_LENGTH {
            violations.push(FieldViolation::new(
                "name",
                format!("must be between 1 and {} characters", NAME_MAX_LENGTH),
            ));
        }

        match &definition.workflow {
            None => violations.push(FieldViolation::new("workflow", "is required")),
            Some(workflow) if workflow.id.trim().is_empty() => {
                violations.push(FieldViolation::new("workflow", "id must not be empty"))
            }
            Some(_) => {}
        }

        if let Some(evaluation) = &definition.evaluation_workflow {
            if evaluation.id.trim().is_empty() {
                violations.push(FieldViolation::new(
                    "evaluationWorkflow",
                    "id must not be empty",
                ));
            }
        }

        if let Some(tag) = &definition.annotation_tag {
            if tag.id.trim().is_empty() {
                violations.push(FieldViolation::new("annotationTag", "id must not be empty"));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }
}
