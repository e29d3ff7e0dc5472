use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::features::proof_packs::types::{ListProofPacksQuery, ProofPackRecord, PROOF_PACK_COLUMNS};
use crate::features::shared::PaginationMetadata;

#[derive(Debug)]
pub struct ListProofPacksResult {
    pub items: Vec<ProofPackRecord>,
    pub pagination: PaginationMetadata,
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    organization_id: Uuid,
    query: &ListProofPacksQuery,
) {
    builder
        .push(" WHERE organization_id = ")
        .push_bind(organization_id);

    if let Some(job_id) = query.job_id {
        builder.push(" AND job_id = ").push_bind(job_id);
    }
}

/// Packs generated for an organization, newest first
#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: &PgPool,
    organization_id: Uuid,
    query: ListProofPacksQuery,
) -> Result<ListProofPacksResult, sqlx::Error> {
    let pagination = query.pagination();

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM proof_packs");
    push_filters(&mut count, organization_id, &query);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select =
        QueryBuilder::<Postgres>::new(format!("SELECT {PROOF_PACK_COLUMNS} FROM proof_packs"));
    push_filters(&mut select, organization_id, &query);
    select
        .push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(pagination.per_page())
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    let items = select.build_query_as::<ProofPackRecord>().fetch_all(pool).await?;

    Ok(ListProofPacksResult {
        items,
        pagination: PaginationMetadata::from_params(&pagination, total),
    })
}
