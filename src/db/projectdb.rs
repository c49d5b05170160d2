// db/projectdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::projectmodel::*;

pub const PROJECT_COLUMNS: &str = r#"
    id,
    client_id,
    title,
    description,
    category,
    skills,
    budget_min,
    budget_max,
    budget_type,
    status,
    work_status,
    assigned_freelancer_id,
    accepted_application_id,
    proposal_count,
    view_count,
    viewed_by,
    phase_history,
    milestones,
    deliverables,
    work_notes,
    created_at,
    updated_at
"#;

/// Conjunctive listing filters; every supplied field must match.
#[derive(Debug, Default, Clone)]
pub struct ProjectFilter {
    pub category: Option<String>,
    pub min_budget: Option<i64>,
    pub max_budget: Option<i64>,
    pub skills: Option<Vec<String>>,
    pub search: Option<String>,
}

#[async_trait]
pub trait ProjectExt {
    async fn create_project(
        &self,
        client_id: Uuid,
        title: String,
        description: String,
        category: String,
        skills: Vec<String>,
        budget_min: i64,
        budget_max: i64,
        budget_type: BudgetType,
    ) -> Result<Project, Error>;

    async fn get_project_by_id(&self, project_id: Uuid) -> Result<Option<Project>, Error>;

    async fn get_open_projects(
        &self,
        filter: ProjectFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, Error>;

    async fn get_projects_by_client(&self, client_id: Uuid) -> Result<Vec<Project>, Error>;

    async fn get_projects_by_freelancer(&self, freelancer_id: Uuid)
        -> Result<Vec<Project>, Error>;

    async fn update_project(
        &self,
        project_id: Uuid,
        title: Option<String>,
        description: Option<String>,
        category: Option<String>,
        skills: Option<Vec<String>>,
        budget_min: Option<i64>,
        budget_max: Option<i64>,
    ) -> Result<Project, Error>;

    async fn update_project_status(
        &self,
        project_id: Uuid,
        status: ProjectStatus,
    ) -> Result<Project, Error>;

    async fn set_accepted_application(
        &self,
        project_id: Uuid,
        application_id: Uuid,
    ) -> Result<Project, Error>;

    /// Advances work_status and appends a phase record in one statement.
    async fn update_work_status(
        &self,
        project_id: Uuid,
        work_status: WorkStatus,
    ) -> Result<Project, Error>;

    async fn add_deliverable(
        &self,
        project_id: Uuid,
        deliverable: Deliverable,
    ) -> Result<Project, Error>;

    async fn update_milestones(
        &self,
        project_id: Uuid,
        milestones: Vec<Milestone>,
    ) -> Result<Project, Error>;

    async fn update_work_notes(
        &self,
        project_id: Uuid,
        work_notes: String,
    ) -> Result<Project, Error>;

    /// Counts a view once per distinct viewer.
    async fn record_project_view(&self, project_id: Uuid, viewer_id: Uuid) -> Result<(), Error>;

    async fn increment_proposal_count(&self, project_id: Uuid) -> Result<(), Error>;

    async fn delete_project(&self, project_id: Uuid) -> Result<(), Error>;

    async fn count_projects(&self) -> Result<i64, Error>;
}

#[async_trait]
impl ProjectExt for DBClient {
    async fn create_project(
        &self,
        client_id: Uuid,
        title: String,
        description: String,
        category: String,
        skills: Vec<String>,
        budget_min: i64,
        budget_max: i64,
        budget_type: BudgetType,
    ) -> Result<Project, Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects
                (client_id, title, description, category, skills, budget_min, budget_max, budget_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(client_id)
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(skills)
        .bind(budget_min)
        .bind(budget_max)
        .bind(budget_type)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_project_by_id(&self, project_id: Uuid) -> Result<Option<Project>, Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_open_projects(
        &self,
        filter: ProjectFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE status = 'open'
              AND ($1::text IS NULL OR category = $1)
              AND ($2::bigint IS NULL OR budget_max >= $2)
              AND ($3::bigint IS NULL OR budget_min <= $3)
              AND ($4::text[] IS NULL OR skills && $4)
              AND ($5::text IS NULL OR title ILIKE '%' || $5 || '%'
                   OR description ILIKE '%' || $5 || '%')
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.category)
        .bind(filter.min_budget)
        .bind(filter.max_budget)
        .bind(filter.skills)
        .bind(filter.search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_projects_by_client(&self, client_id: Uuid) -> Result<Vec<Project>, Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE client_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_projects_by_freelancer(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Project>, Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE assigned_freelancer_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_project(
        &self,
        project_id: Uuid,
        title: Option<String>,
        description: Option<String>,
        category: Option<String>,
        skills: Option<Vec<String>>,
        budget_min: Option<i64>,
        budget_max: Option<i64>,
    ) -> Result<Project, Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                skills = COALESCE($5, skills),
                budget_min = COALESCE($6, budget_min),
                budget_max = COALESCE($7, budget_max),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(skills)
        .bind(budget_min)
        .bind(budget_max)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_project_status(
        &self,
        project_id: Uuid,
        status: ProjectStatus,
    ) -> Result<Project, Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_accepted_application(
        &self,
        project_id: Uuid,
        application_id: Uuid,
    ) -> Result<Project, Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET accepted_application_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(application_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_work_status(
        &self,
        project_id: Uuid,
        work_status: WorkStatus,
    ) -> Result<Project, Error> {
        let phase_record = serde_json::json!({
            "phase": work_status.to_str(),
            "completed_at": chrono::Utc::now(),
        });

        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET work_status = $2,
                phase_history = phase_history || $3::jsonb,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(work_status)
        .bind(phase_record)
        .fetch_one(&self.pool)
        .await
    }

    async fn add_deliverable(
        &self,
        project_id: Uuid,
        deliverable: Deliverable,
    ) -> Result<Project, Error> {
        let deliverable = serde_json::to_value(deliverable)
            .map_err(|e| Error::Protocol(e.to_string()))?;

        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET deliverables = deliverables || $2::jsonb,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(deliverable)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_milestones(
        &self,
        project_id: Uuid,
        milestones: Vec<Milestone>,
    ) -> Result<Project, Error> {
        let milestones = serde_json::to_value(milestones)
            .map_err(|e| Error::Protocol(e.to_string()))?;

        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET milestones = $2::jsonb, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(milestones)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_work_notes(
        &self,
        project_id: Uuid,
        work_notes: String,
    ) -> Result<Project, Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET work_notes = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(work_notes)
        .fetch_one(&self.pool)
        .await
    }

    async fn record_project_view(&self, project_id: Uuid, viewer_id: Uuid) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE projects
            SET view_count = view_count + 1,
                viewed_by = array_append(viewed_by, $2)
            WHERE id = $1 AND NOT ($2 = ANY(viewed_by))
            "#,
        )
        .bind(project_id)
        .bind(viewer_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_proposal_count(&self, project_id: Uuid) -> Result<(), Error> {
        sqlx::query("UPDATE projects SET proposal_count = proposal_count + 1 WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_project(&self, project_id: Uuid) -> Result<(), Error> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_projects(&self) -> Result<i64, Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
