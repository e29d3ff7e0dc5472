//! List jobs query

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::features::jobs::types::{JobRecord, JobStatus, RiskLevel, JOB_COLUMNS};
use crate::features::shared::{PaginationMetadata, PaginationParams};

/// Query-string filters for `GET /jobs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

impl ListJobsQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListJobsResult {
    pub items: Vec<JobRecord>,
    pub pagination: PaginationMetadata,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, organization_id: Uuid, query: &ListJobsQuery) {
    builder
        .push(" WHERE organization_id = ")
        .push_bind(organization_id);

    if !query.include_archived {
        builder.push(" AND archived_at IS NULL");
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(level) = query.risk_level {
        builder.push(" AND risk_level = ").push_bind(level.as_str());
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: &PgPool,
    organization_id: Uuid,
    query: ListJobsQuery,
) -> Result<ListJobsResult, sqlx::Error> {
    let pagination = query.pagination();

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs");
    push_filters(&mut count, organization_id, &query);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {JOB_COLUMNS} FROM jobs"));
    push_filters(&mut select, organization_id, &query);
    select
        .push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(pagination.per_page())
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    let items = select.build_query_as::<JobRecord>().fetch_all(pool).await?;

    Ok(ListJobsResult {
        items,
        pagination: PaginationMetadata::from_params(&pagination, total),
    })
}
