use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Postgres, QueryBuilder, Row,
};

use crate::model::{
    AnnotationTagId, DeleteResult, EntityRef, Field, ListOptions, ListResult, TestDefinition,
    TestDefinitionId, TestDefinitionLike, UpdateResult, WorkflowId,
};
use crate::store::traits::{AnnotationTagStore, TestDefinitionStore};

const DEFINITION_COLUMNS: &str =
    "id, name, workflow_id, evaluation_workflow_id, annotation_tag_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_definition(row: &PgRow) -> TestDefinition {
    let workflow_id: Option<String> = row.get("workflow_id");
    let evaluation_workflow_id: Option<String> = row.get("evaluation_workflow_id");
    let annotation_tag_id: Option<String> = row.get("annotation_tag_id");

    TestDefinition {
        id: Some(row.get("id")),
        name: row.get("name"),
        workflow: workflow_id.map(EntityRef::new),
        evaluation_workflow: evaluation_workflow_id.map(EntityRef::new),
        annotation_tag: annotation_tag_id.map(EntityRef::new),
        created_at: Some(row.get("created_at")),
        updated_at: Some(row.get("updated_at")),
    }
}

/// Escape `LIKE` metacharacters so user input matches literally
fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_scope_and_filter(
    builder: &mut QueryBuilder<'_, Postgres>,
    accessible_workflow_ids: &[WorkflowId],
    options: &ListOptions,
) {
    builder
        .push(" WHERE workflow_id = ANY(")
        .push_bind(accessible_workflow_ids.to_vec())
        .push(")");

    if let Some(name) = &options.filter.name {
        builder
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)))
            .push(" ESCAPE '\\'");
    }
    if let Some(workflow_id) = &options.filter.workflow_id {
        builder
            .push(" AND workflow_id = ")
            .push_bind(workflow_id.clone());
    }
}

#[async_trait::async_trait]
impl TestDefinitionStore for PostgresStore {
    async fn save(&self, definition: TestDefinition) -> Result<TestDefinition> {
        let workflow_id = definition.workflow.map(|w| w.id);
        let evaluation_workflow_id = definition.evaluation_workflow.map(|w| w.id);
        let annotation_tag_id = definition.annotation_tag.map(|t| t.id);

        let row = match definition.id {
            Some(id) => sqlx::query(&format!(
                r#"
                UPDATE test_definition
                SET name = $2, workflow_id = $3, evaluation_workflow_id = $4,
                    annotation_tag_id = $5, updated_at = NOW()
                WHERE id = $1
                RETURNING {}
                "#,
                DEFINITION_COLUMNS
            ))
            .bind(id)
            .bind(&definition.name)
            .bind(workflow_id)
            .bind(evaluation_workflow_id)
            .bind(annotation_tag_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to save test definition")?,
            None => sqlx::query(&format!(
                r#"
                INSERT INTO test_definition
                    (name, workflow_id, evaluation_workflow_id, annotation_tag_id)
                VALUES ($1, $2, $3, $4)
                RETURNING {}
                "#,
                DEFINITION_COLUMNS
            ))
            .bind(&definition.name)
            .bind(workflow_id)
            .bind(evaluation_workflow_id)
            .bind(annotation_tag_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to insert test definition")?,
        };

        let saved = row_to_definition(&row);
        log::debug!("Saved test definition {:?}", saved.id);
        Ok(saved)
    }

    async fn get_one(
        &self,
        id: TestDefinitionId,
        accessible_workflow_ids: &[WorkflowId],
    ) -> Result<Option<TestDefinition>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM test_definition WHERE id = $1 AND workflow_id = ANY($2)",
            DEFINITION_COLUMNS
        ))
        .bind(id)
        .bind(accessible_workflow_ids.to_vec())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch test definition")?;

        Ok(row.as_ref().map(row_to_definition))
    }

    async fn update(
        &self,
        id: TestDefinitionId,
        partial: TestDefinitionLike,
        accessible_workflow_ids: &[WorkflowId],
    ) -> Result<UpdateResult> {
        let mut builder =
            QueryBuilder::<Postgres>::new("UPDATE test_definition SET updated_at = NOW()");

        if let Some(name) = partial.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(workflow) = partial.workflow {
            builder.push(", workflow_id = ").push_bind(workflow.id);
        }
        match partial.evaluation_workflow {
            Field::Value(reference) => {
                builder.push(", evaluation_workflow_id = ").push_bind(reference.id);
            }
            Field::Null => {
                builder.push(", evaluation_workflow_id = NULL");
            }
            Field::Missing => {}
        }
        match partial.annotation_tag {
            Field::Value(reference) => {
                builder.push(", annotation_tag_id = ").push_bind(reference.id);
            }
            Field::Null => {
                builder.push(", annotation_tag_id = NULL");
            }
            Field::Missing => {}
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND workflow_id = ANY(")
            .push_bind(accessible_workflow_ids.to_vec())
            .push(")");

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .context("Failed to update test definition")?;

        log::debug!(
            "Updated test definition {} ({} rows)",
            id,
            result.rows_affected()
        );
        Ok(UpdateResult {
            affected: result.rows_affected(),
        })
    }

    async fn delete_by_id(
        &self,
        id: TestDefinitionId,
        accessible_workflow_ids: &[WorkflowId],
    ) -> Result<DeleteResult> {
        let result =
            sqlx::query("DELETE FROM test_definition WHERE id = $1 AND workflow_id = ANY($2)")
                .bind(id)
                .bind(accessible_workflow_ids.to_vec())
                .execute(&self.pool)
                .await
                .context("Failed to delete test definition")?;

        Ok(DeleteResult {
            affected: result.rows_affected(),
        })
    }

    async fn get_many(
        &self,
        accessible_workflow_ids: &[WorkflowId],
        options: &ListOptions,
    ) -> Result<ListResult<TestDefinition>> {
        if accessible_workflow_ids.is_empty() {
            return Ok(ListResult::empty());
        }

        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM test_definition");
        push_scope_and_filter(&mut count_query, accessible_workflow_ids, options);
        let count: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count test definitions")?;

        let mut list_query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM test_definition",
            DEFINITION_COLUMNS
        ));
        push_scope_and_filter(&mut list_query, accessible_workflow_ids, options);
        list_query.push(" ORDER BY created_at DESC, id DESC");
        // Values beyond the BIGINT range mean "no limit" / "skip everything"
        if let Some(take) = options.take {
            list_query
                .push(" LIMIT ")
                .push_bind(i64::try_from(take).unwrap_or(i64::MAX));
        }
        if let Some(skip) = options.skip {
            list_query
                .push(" OFFSET ")
                .push_bind(i64::try_from(skip).unwrap_or(i64::MAX));
        }

        let rows = list_query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list test definitions")?;

        Ok(ListResult {
            items: rows.iter().map(row_to_definition).collect(),
            count: count as usize,
        })
    }
}

#[async_trait::async_trait]
impl AnnotationTagStore for PostgresStore {
    async fn exists(&self, id: &AnnotationTagId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM annotation_tag_entity WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to check annotation tag")?;

        Ok(exists)
    }
}
