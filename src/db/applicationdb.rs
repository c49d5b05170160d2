// db/applicationdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::applicationmodel::{Application, ApplicationStatus};

const APPLICATION_COLUMNS: &str = r#"
    id,
    project_id,
    freelancer_id,
    cover_letter,
    proposed_budget_min,
    proposed_budget_max,
    proposed_duration,
    status,
    ai_score,
    ai_analysis,
    created_at,
    updated_at
"#;

#[async_trait]
pub trait ApplicationExt {
    /// Fails with a unique violation on a second (project, freelancer) pair.
    async fn create_application(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
        cover_letter: String,
        proposed_budget_min: i64,
        proposed_budget_max: i64,
        proposed_duration: String,
    ) -> Result<Application, Error>;

    async fn get_application_by_id(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Application>, Error>;

    async fn get_applications_by_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<Application>, Error>;

    async fn get_applications_by_freelancer(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Application>, Error>;

    /// A rejected application permanently blocks re-application.
    async fn was_rejected_on_project(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<bool, Error>;

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Application, Error>;

    async fn set_ai_score(
        &self,
        application_id: Uuid,
        ai_score: i32,
        ai_analysis: serde_json::Value,
    ) -> Result<(), Error>;
}

#[async_trait]
impl ApplicationExt for DBClient {
    async fn create_application(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
        cover_letter: String,
        proposed_budget_min: i64,
        proposed_budget_max: i64,
        proposed_duration: String,
    ) -> Result<Application, Error> {
        sqlx::query_as::<_, Application>(&format!(
            r#"
            INSERT INTO applications
                (project_id, freelancer_id, cover_letter, proposed_budget_min,
                 proposed_budget_max, proposed_duration)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(freelancer_id)
        .bind(cover_letter)
        .bind(proposed_budget_min)
        .bind(proposed_budget_max)
        .bind(proposed_duration)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_application_by_id(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Application>, Error> {
        sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_applications_by_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<Application>, Error> {
        sqlx::query_as::<_, Application>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE project_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_applications_by_freelancer(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Application>, Error> {
        sqlx::query_as::<_, Application>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE freelancer_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn was_rejected_on_project(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<bool, Error> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM applications
                WHERE project_id = $1 AND freelancer_id = $2 AND status = 'rejected'
            )
            "#,
        )
        .bind(project_id)
        .bind(freelancer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Application, Error> {
        sqlx::query_as::<_, Application>(&format!(
            r#"
            UPDATE applications
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(application_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_ai_score(
        &self,
        application_id: Uuid,
        ai_score: i32,
        ai_analysis: serde_json::Value,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE applications
            SET ai_score = $2, ai_analysis = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(application_id)
        .bind(ai_score)
        .bind(ai_analysis)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
