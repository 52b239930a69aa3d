use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

use crate::model::WorkflowId;

pub const ACCESSIBLE_WORKFLOWS_HEADER: &str = "x-accessible-workflow-ids";

/// Workflows the caller may read or modify, as resolved by the upstream auth layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessScope {
    workflow_ids: Option<Vec<WorkflowId>>,
}

impl AccessScope {
    pub fn new(workflow_ids: Vec<WorkflowId>) -> Self {
        Self {
            workflow_ids: Some(workflow_ids),
        }
    }

    /// `None` when the request carried no scope at all
    pub fn explicit(&self) -> Option<&[WorkflowId]> {
        self.workflow_ids.as_deref()
    }

    pub fn workflow_ids(&self) -> &[WorkflowId] {
        self.explicit().unwrap_or(&[])
    }

    pub fn allows(&self, workflow_id: &str) -> bool {
        self.workflow_ids().iter().any(|id| id == workflow_id)
    }
}

/// Axum extractor for the caller's accessible workflow ids.
///
/// Reads the comma-separated `X-Accessible-Workflow-Ids` header. A request
/// without the header gets no access rather than full access.
#[async_trait]
impl<S> FromRequestParts<S> for AccessScope
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AccessScope {
            workflow_ids: parse_workflow_ids(&parts.headers),
        })
    }
}

fn parse_workflow_ids(headers: &HeaderMap) -> Option<Vec<WorkflowId>> {
    let value = headers.get(ACCESSIBLE_WORKFLOWS_HEADER)?.to_str().ok()?;
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};

    #[test]
    fn test_header_is_split_and_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(ACCESSIBLE_WORKFLOWS_HEADER),
            HeaderValue::from_static("w1, w2,,w3 "),
        );

        assert_eq!(
            parse_workflow_ids(&headers),
            Some(vec!["w1".to_string(), "w2".to_string(), "w3".to_string()])
        );
    }

    #[test]
    fn test_missing_header_grants_nothing() {
        let scope = AccessScope {
            workflow_ids: parse_workflow_ids(&HeaderMap::new()),
        };

        assert_eq!(scope.explicit(), None);
        assert!(scope.workflow_ids().is_empty());
        assert!(!scope.allows("w1"));
    }
}
