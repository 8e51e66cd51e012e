use crate::domain::{
    models::{company::Company, pagination::{like_pattern, Page, PageRequest}},
    ports::CompanyRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqliteCompanyRepo {
    pool: SqlitePool,
}

impl SqliteCompanyRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_search<'a>(qb: &mut QueryBuilder<'a, Sqlite>, search: Option<&str>) {
    if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" WHERE (LOWER(name) LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'")
            .push(" OR LOWER(COALESCE(email, '')) LIKE ").push_bind(pattern).push(" ESCAPE '\\')");
    }
}

#[async_trait]
impl CompanyRepository for SqliteCompanyRepo {
    async fn create(&self, company: &Company) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>(
            "INSERT INTO companies (id, name, email, mobile, address, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&company.id)
            .bind(&company.name)
            .bind(&company.email)
            .bind(&company.mobile)
            .bind(&company.address)
            .bind(company.is_active)
            .bind(company.created_at)
            .bind(company.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Company>, AppError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Company>, AppError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM companies");
        push_search(&mut count, search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM companies");
        push_search(&mut query, search);
        query.push(" ORDER BY created_at DESC LIMIT ").push_bind(page.limit as i64)
            .push(" OFFSET ").push_bind(page.offset());
        let items = query.build_query_as::<Company>().fetch_all(&self.pool).await?;

        Ok(Page::new(items, total, page))
    }

    async fn update(&self, company: &Company) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>(
            "UPDATE companies SET name=?, email=?, mobile=?, address=?, is_active=?, updated_at=? WHERE id=? RETURNING *"
        )
            .bind(&company.name)
            .bind(&company.email)
            .bind(&company.mobile)
            .bind(&company.address)
            .bind(company.is_active)
            .bind(company.updated_at)
            .bind(&company.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
