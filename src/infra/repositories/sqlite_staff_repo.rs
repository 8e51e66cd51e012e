use crate::domain::{
    models::{
        pagination::{like_pattern, Page, PageRequest},
        company::Company,
        staff::{Staff, StaffFilter, StaffProfile, StaffProfileRow, STAFF_HAS_LEADS},
    },
    ports::StaffRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{error::ErrorKind, Executor, QueryBuilder, Sqlite, SqlitePool};

const PROFILE_SELECT: &str = "SELECT s.id, s.name, s.email, s.mobile, s.role, s.is_active, s.company_id, s.branch_id, \
     b.name AS branch_name, b.city AS branch_city \
     FROM staff s LEFT JOIN branches b ON b.id = s.branch_id WHERE s.id = ?";

pub struct SqliteStaffRepo {
    pool: SqlitePool,
}

impl SqliteStaffRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &StaffFilter) {
    qb.push(" WHERE company_id = ").push_bind(filter.company_id.clone());

    if let Some(branch_id) = &filter.branch_id {
        qb.push(" AND branch_id = ").push_bind(branch_id.clone());
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(name) LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'")
            .push(" OR LOWER(email) LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'")
            .push(" OR LOWER(COALESCE(mobile, '')) LIKE ").push_bind(pattern).push(" ESCAPE '\\')");
    }
}

async fn insert_staff<'e, E>(executor: E, staff: &Staff) -> Result<Staff, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Staff>(
        "INSERT INTO staff (id, company_id, branch_id, name, email, mobile, password_hash, role, is_active, is_verified, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
    )
        .bind(&staff.id)
        .bind(&staff.company_id)
        .bind(&staff.branch_id)
        .bind(&staff.name)
        .bind(&staff.email)
        .bind(&staff.mobile)
        .bind(&staff.password_hash)
        .bind(staff.role.as_str())
        .bind(staff.is_active)
        .bind(staff.is_verified)
        .bind(staff.created_at)
        .bind(staff.updated_at)
        .fetch_one(executor)
        .await
}

#[async_trait]
impl StaffRepository for SqliteStaffRepo {
    async fn create(&self, staff: &Staff) -> Result<Staff, AppError> {
        insert_staff(&self.pool, staff).await.map_err(AppError::Database)
    }

    async fn create_with_company(&self, company: &Company, staff: &Staff) -> Result<Staff, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO companies (id, name, email, mobile, address, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
            .bind(&company.id)
            .bind(&company.name)
            .bind(&company.email)
            .bind(&company.mobile)
            .bind(&company.address)
            .bind(company.is_active)
            .bind(company.created_at)
            .bind(company.updated_at)
            .execute(&mut *tx)
            .await?;
        let created = insert_staff(&mut *tx, staff).await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Staff>, AppError> {
        sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Staff>, AppError> {
        sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_profile(&self, id: &str) -> Result<Option<StaffProfile>, AppError> {
        let row = sqlx::query_as::<_, StaffProfileRow>(PROFILE_SELECT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.map(StaffProfile::from))
    }

    async fn find_in_company(&self, company_id: &str, id: &str) -> Result<Option<Staff>, AppError> {
        sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE company_id = ? AND id = ?")
            .bind(company_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, filter: &StaffFilter, page: PageRequest) -> Result<Page<Staff>, AppError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM staff");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM staff");
        push_filters(&mut query, filter);
        query.push(format!(" ORDER BY {} {}, id ASC", filter.sort_by.column(), filter.order.as_sql()))
            .push(" LIMIT ").push_bind(page.limit as i64)
            .push(" OFFSET ").push_bind(page.offset());
        let items = query.build_query_as::<Staff>().fetch_all(&self.pool).await?;

        Ok(Page::new(items, total, page))
    }

    async fn list_by_branch(&self, branch_id: &str) -> Result<Vec<Staff>, AppError> {
        sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE branch_id = ? ORDER BY name ASC")
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, staff: &Staff) -> Result<Staff, AppError> {
        sqlx::query_as::<_, Staff>(
            "UPDATE staff SET name=?, mobile=?, role=?, branch_id=?, updated_at=? WHERE id=? RETURNING *"
        )
            .bind(&staff.name)
            .bind(&staff.mobile)
            .bind(staff.role.as_str())
            .bind(&staff.branch_id)
            .bind(staff.updated_at)
            .bind(&staff.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn set_active(&self, id: &str, is_active: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE staff SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_verified(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE staff SET is_verified = ?, updated_at = ? WHERE id = ?")
            .bind(true)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE staff SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE leads SET assigned_to = NULL, updated_at = ? WHERE assigned_to = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM staff WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let referenced = matches!(&e, sqlx::Error::Database(db) if matches!(db.kind(), ErrorKind::ForeignKeyViolation));
                if referenced {
                    AppError::Conflict(STAFF_HAS_LEADS.into())
                } else {
                    AppError::Database(e)
                }
            })?;

        tx.commit().await?;
        Ok(())
    }
}
