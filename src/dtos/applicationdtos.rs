// dtos/applicationdtos.rs
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::applicationmodel::ApplicationStatus;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitApplicationDto {
    pub project_id: Uuid,

    #[validate(length(min = 50, message = "Cover letter must be at least 50 characters"))]
    pub cover_letter: String,

    #[validate(range(min = 1, message = "Minimum budget must be positive"))]
    pub proposed_budget_min: i64,

    #[validate(range(min = 1, message = "Maximum budget must be positive"))]
    pub proposed_budget_max: i64,

    #[validate(length(min = 1, message = "Proposed duration is required"))]
    pub proposed_duration: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationStatusDto {
    pub status: ApplicationStatus,
}
