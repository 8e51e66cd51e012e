use crate::domain::{models::branch::Branch, ports::BranchRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteBranchRepo {
    pool: SqlitePool,
}

impl SqliteBranchRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BranchRepository for SqliteBranchRepo {
    async fn create(&self, branch: &Branch) -> Result<Branch, AppError> {
        sqlx::query_as::<_, Branch>(
            "INSERT INTO branches (id, company_id, name, city, address, mobile, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&branch.id)
            .bind(&branch.company_id)
            .bind(&branch.name)
            .bind(&branch.city)
            .bind(&branch.address)
            .bind(&branch.mobile)
            .bind(branch.is_active)
            .bind(branch.created_at)
            .bind(branch.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Branch>, AppError> {
        sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_company_id(&self, id: &str) -> Result<Option<String>, AppError> {
        sqlx::query_scalar::<_, String>("SELECT company_id FROM branches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_company(&self, company_id: &str) -> Result<Vec<Branch>, AppError> {
        sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE company_id = ? ORDER BY name ASC")
            .bind(company_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, branch: &Branch) -> Result<Branch, AppError> {
        sqlx::query_as::<_, Branch>(
            "UPDATE branches SET name=?, city=?, address=?, mobile=?, is_active=?, updated_at=? WHERE id=? RETURNING *"
        )
            .bind(&branch.name)
            .bind(&branch.city)
            .bind(&branch.address)
            .bind(&branch.mobile)
            .bind(branch.is_active)
            .bind(branch.updated_at)
            .bind(&branch.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM branches WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
