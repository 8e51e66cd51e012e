use crate::domain::{
    models::{
        lead::{Lead, LeadFilter},
        pagination::{like_pattern, Page, PageRequest},
    },
    ports::LeadRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqliteLeadRepo {
    pool: SqlitePool,
}

impl SqliteLeadRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &LeadFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(company_id) = &filter.company_id {
        qb.push(" AND company_id = ").push_bind(company_id.clone());
    }
    if let Some(branch_id) = &filter.branch_id {
        qb.push(" AND branch_id = ").push_bind(branch_id.clone());
    }
    if let Some(assigned_to) = &filter.assigned_to {
        qb.push(" AND assigned_to = ").push_bind(assigned_to.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(customer_name) LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'")
            .push(" OR LOWER(COALESCE(email, '')) LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'")
            .push(" OR LOWER(mobile) LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'")
            .push(" OR LOWER(COALESCE(city, '')) LIKE ").push_bind(pattern).push(" ESCAPE '\\')");
    }
}

#[async_trait]
impl LeadRepository for SqliteLeadRepo {
    async fn create(&self, lead: &Lead) -> Result<Lead, AppError> {
        sqlx::query_as::<_, Lead>(
            "INSERT INTO leads (id, company_id, branch_id, customer_name, email, mobile, address, city, service_type, status, source, notes, assigned_to, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&lead.id)
            .bind(&lead.company_id)
            .bind(&lead.branch_id)
            .bind(&lead.customer_name)
            .bind(&lead.email)
            .bind(&lead.mobile)
            .bind(&lead.address)
            .bind(&lead.city)
            .bind(&lead.service_type)
            .bind(lead.status.as_str())
            .bind(&lead.source)
            .bind(&lead.notes)
            .bind(&lead.assigned_to)
            .bind(&lead.created_by)
            .bind(lead.created_at)
            .bind(lead.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Lead>, AppError> {
        sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, filter: &LeadFilter, page: PageRequest) -> Result<Page<Lead>, AppError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM leads");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM leads");
        push_filters(&mut query, filter);
        query.push(format!(" ORDER BY {} {}, id ASC", filter.sort_by.column(), filter.order.as_sql()))
            .push(" LIMIT ").push_bind(page.limit as i64)
            .push(" OFFSET ").push_bind(page.offset());
        let items = query.build_query_as::<Lead>().fetch_all(&self.pool).await?;

        Ok(Page::new(items, total, page))
    }

    async fn update(&self, lead: &Lead) -> Result<Lead, AppError> {
        sqlx::query_as::<_, Lead>(
            "UPDATE leads SET customer_name=?, email=?, mobile=?, address=?, city=?, service_type=?, status=?, source=?, notes=?, assigned_to=?, updated_at=? \
             WHERE id=? RETURNING *"
        )
            .bind(&lead.customer_name)
            .bind(&lead.email)
            .bind(&lead.mobile)
            .bind(&lead.address)
            .bind(&lead.city)
            .bind(&lead.service_type)
            .bind(lead.status.as_str())
            .bind(&lead.source)
            .bind(&lead.notes)
            .bind(&lead.assigned_to)
            .bind(lead.updated_at)
            .bind(&lead.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
