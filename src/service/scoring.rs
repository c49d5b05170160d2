// service/scoring.rs
use std::sync::Arc;

use serde::Deserialize;

use crate::{
    db::{applicationdb::ApplicationExt, db::DBClient},
    models::applicationmodel::Application,
    models::projectmodel::Project,
};

/// Client for the external AI application-scoring collaborator. Scoring is
/// fire-and-forget: the submission response never waits for it, and a failed
/// call is logged and dropped.
#[derive(Debug, Clone)]
pub struct ScoringService {
    db_client: Arc<DBClient>,
    service_url: Option<String>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ScoringResponse {
    score: i32,
    analysis: serde_json::Value,
}

impl ScoringService {
    pub fn new(db_client: Arc<DBClient>, service_url: Option<String>) -> Self {
        Self {
            db_client,
            service_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn score_in_background(&self, application: Application, project: Project) {
        let Some(url) = self.service_url.clone() else {
            tracing::debug!("scoring service not configured, skipping");
            return;
        };

        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.score(&url, &application, &project).await {
                tracing::warn!(
                    "AI scoring failed for application {}: {}",
                    application.id,
                    e
                );
            }
        });
    }

    async fn score(
        &self,
        url: &str,
        application: &Application,
        project: &Project,
    ) -> Result<(), anyhow::Error> {
        let payload = serde_json::json!({
            "application_id": application.id,
            "cover_letter": application.cover_letter,
            "proposed_budget_min": application.proposed_budget_min,
            "proposed_budget_max": application.proposed_budget_max,
            "project_title": project.title,
            "project_description": project.description,
            "project_skills": project.skills,
        });

        let response = self
            .http
            .post(url)
            .json(&payload)
            .timeout(std::time::Duration::from_secs(20))
            .send()
            .await?
            .error_for_status()?
            .json::<ScoringResponse>()
            .await?;

        self.db_client
            .set_ai_score(application.id, response.score, response.analysis)
            .await?;

        tracing::info!(
            "application {} scored {} by AI service",
            application.id,
            response.score
        );
        Ok(())
    }
}
