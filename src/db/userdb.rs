// db/userdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::{AccountStatus, User, UserRole};

pub const USER_COLUMNS: &str = r#"
    id,
    name,
    username,
    email,
    password,
    role,
    account_status,
    bio,
    skills,
    hourly_rate,
    company,
    avatar_url,
    total_earned,
    total_spent,
    completed_projects,
    created_at,
    updated_at
"#;

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, Error>;

    async fn save_user(
        &self,
        name: String,
        username: String,
        email: String,
        password: String,
        role: UserRole,
    ) -> Result<User, Error>;

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        bio: Option<String>,
        skills: Option<Vec<String>>,
        hourly_rate: Option<i64>,
        company: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<User, Error>;

    async fn list_users(
        &self,
        role: Option<UserRole>,
        account_status: Option<AccountStatus>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, Error>;

    async fn set_account_status(
        &self,
        user_id: Uuid,
        status: AccountStatus,
    ) -> Result<User, Error>;

    /// Count of contracts and held escrow payments that block account deletion.
    async fn count_open_engagements(&self, user_id: Uuid) -> Result<i64, Error>;

    async fn delete_user(&self, user_id: Uuid) -> Result<(), Error>;

    async fn count_users(&self) -> Result<i64, Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(username) = username {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
            ))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn save_user(
        &self,
        name: String,
        username: String,
        email: String,
        password: String,
        role: UserRole,
    ) -> Result<User, Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, username, email, password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(username)
        .bind(email)
        .bind(password)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        bio: Option<String>,
        skills: Option<Vec<String>>,
        hourly_rate: Option<i64>,
        company: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<User, Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                bio = COALESCE($3, bio),
                skills = COALESCE($4, skills),
                hourly_rate = COALESCE($5, hourly_rate),
                company = COALESCE($6, company),
                avatar_url = COALESCE($7, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(name)
        .bind(bio)
        .bind(skills)
        .bind(hourly_rate)
        .bind(company)
        .bind(avatar_url)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_users(
        &self,
        role: Option<UserRole>,
        account_status: Option<AccountStatus>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::account_status IS NULL OR account_status = $2)
              AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%'
                   OR username ILIKE '%' || $3 || '%'
                   OR email ILIKE '%' || $3 || '%')
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(role)
        .bind(account_status)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn set_account_status(
        &self,
        user_id: Uuid,
        status: AccountStatus,
    ) -> Result<User, Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET account_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_open_engagements(&self, user_id: Uuid) -> Result<i64, Error> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM contracts
                  WHERE (client_id = $1 OR freelancer_id = $1)
                    AND status IN ('pending', 'accepted'))
              + (SELECT COUNT(*) FROM payments
                  WHERE (client_id = $1 OR freelancer_id = $1)
                    AND escrow_status = 'held')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), Error> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_users(&self) -> Result<i64, Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
