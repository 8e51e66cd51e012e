use crate::domain::{
    models::{permission::PermissionRecord, staff::Role},
    ports::PermissionRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresPermissionRepo {
    pool: PgPool,
}

impl PostgresPermissionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepo {
    async fn upsert_permission(&self, permission: &PermissionRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO permissions (id, module, action, description) VALUES ($1, $2, $3, $4) \
             ON CONFLICT(id) DO UPDATE SET module = excluded.module, action = excluded.action, description = excluded.description"
        )
            .bind(&permission.id)
            .bind(&permission.module)
            .bind(&permission.action)
            .bind(&permission.description)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, AppError> {
        sqlx::query_as::<_, PermissionRecord>("SELECT id, module, action, description FROM permissions ORDER BY module, action")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_role(&self, role: Role) -> Result<Vec<PermissionRecord>, AppError> {
        sqlx::query_as::<_, PermissionRecord>(
            "SELECT p.id, p.module, p.action, p.description FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id WHERE rp.role = $1 ORDER BY p.module, p.action"
        )
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count_for_role(&self, role: Role) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM role_permissions WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn replace_for_role(&self, role: Role, permission_ids: &[String]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role = $1")
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

        for permission_id in permission_ids {
            sqlx::query("INSERT INTO role_permissions (role, permission_id) VALUES ($1, $2)")
                .bind(role.as_str())
                .bind(permission_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
