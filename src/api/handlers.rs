use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::scope_extractor::AccessScope;
use crate::error::ServiceError;
use crate::logic::{FieldViolation, TestDefinitionsService};
use crate::model::{
    Field, ListOptions, ListResult, TestDefinition, TestDefinitionAttrs, TestDefinitionFilter,
    TestDefinitionId,
};
use crate::store::traits::Store;

pub type AppState<S> = Arc<TestDefinitionsService<S, S>>;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub skip: Option<usize>,
    pub take: Option<usize>,
    pub name: Option<String>,
    pub workflow_id: Option<String>,
}

impl From<ListQuery> for ListOptions {
    fn from(query: ListQuery) -> Self {
        ListOptions {
            filter: TestDefinitionFilter {
                name: query.name,
                workflow_id: query.workflow_id,
            },
            skip: query.skip,
            take: query.take,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            violations: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

fn error_response(err: ServiceError) -> ApiError {
    match err {
        ServiceError::Validation(validation) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: validation.to_string(),
                violations: validation.violations,
            }),
        ),
        ServiceError::BadRequest(message) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(&message)))
        }
        ServiceError::Forbidden(message) => {
            (StatusCode::FORBIDDEN, Json(ErrorResponse::new(&message)))
        }
        ServiceError::NotFound(message) => {
            (StatusCode::NOT_FOUND, Json(ErrorResponse::new(&message)))
        }
        ServiceError::Store(e) => {
            log::warn!("Store failure: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(&e.to_string())),
            )
        }
    }
}

fn not_found() -> ApiError {
    error_response(ServiceError::not_found("Test definition not found"))
}

fn ensure_accessible(
    scope: &AccessScope,
    workflow_id: &Field<String>,
    message: &str,
) -> Result<(), ApiError> {
    match workflow_id {
        Field::Value(id) if !scope.allows(id) => {
            Err(error_response(ServiceError::forbidden(message)))
        }
        _ => Ok(()),
    }
}

pub async fn list_test_definitions<S: Store>(
    State(service): State<AppState<S>>,
    scope: AccessScope,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResult<TestDefinition>>, ApiError> {
    let options = ListOptions::from(query);
    service
        .get_many(&options, scope.explicit())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_test_definition<S: Store>(
    State(service): State<AppState<S>>,
    scope: AccessScope,
    Path(id): Path<TestDefinitionId>,
) -> Result<Json<TestDefinition>, ApiError> {
    match service.find_one(id, scope.workflow_ids()).await {
        Ok(Some(definition)) => Ok(Json(definition)),
        Ok(None) => Err(not_found()),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn create_test_definition<S: Store>(
    State(service): State<AppState<S>>,
    scope: AccessScope,
    RequestJson(attrs): RequestJson<TestDefinitionAttrs>,
) -> Result<Json<TestDefinition>, ApiError> {
    ensure_accessible(
        &scope,
        &attrs.workflow_id,
        "User does not have access to the workflow",
    )?;
    ensure_accessible(
        &scope,
        &attrs.evaluation_workflow_id,
        "User does not have access to the evaluation workflow",
    )?;

    service
        .create(&attrs)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn update_test_definition<S: Store>(
    State(service): State<AppState<S>>,
    scope: AccessScope,
    Path(id): Path<TestDefinitionId>,
    RequestJson(attrs): RequestJson<TestDefinitionAttrs>,
) -> Result<Json<TestDefinition>, ApiError> {
    ensure_accessible(
        &scope,
        &attrs.evaluation_workflow_id,
        "User does not have access to the evaluation workflow",
    )?;

    match service.update(id, attrs, scope.workflow_ids()).await {
        Ok(Some(definition)) => Ok(Json(definition)),
        Ok(None) => Err(not_found()),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn delete_test_definition<S: Store>(
    State(service): State<AppState<S>>,
    scope: AccessScope,
    Path(id): Path<TestDefinitionId>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let result = service
        .delete(id, scope.workflow_ids())
        .await
        .map_err(error_response)?;

    if result.affected == 0 {
        return Err(not_found());
    }

    Ok(Json(DeleteResponse { success: true }))
}
