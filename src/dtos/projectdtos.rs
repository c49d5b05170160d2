// dtos/projectdtos.rs
use serde::Deserialize;
use validator::Validate;

use crate::models::projectmodel::{BudgetType, Milestone, WorkStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectDto {
    #[validate(length(min = 5, max = 200, message = "Title must be between 5 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 20, message = "Description must be at least 20 characters"))]
    pub description: String,

    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,

    #[serde(default)]
    pub skills: Vec<String>,

    #[validate(range(min = 1, message = "Minimum budget must be positive"))]
    pub budget_min: i64,

    #[validate(range(min = 1, message = "Maximum budget must be positive"))]
    pub budget_max: i64,

    pub budget_type: BudgetType,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectDto {
    #[validate(length(min = 5, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 20))]
    pub description: Option<String>,
    pub category: Option<String>,
    pub skills: Option<Vec<String>>,
    #[validate(range(min = 1))]
    pub budget_min: Option<i64>,
    #[validate(range(min = 1))]
    pub budget_max: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProjectQueryDto {
    pub category: Option<String>,
    pub min_budget: Option<i64>,
    pub max_budget: Option<i64>,
    // Comma-separated list of skills
    pub skills: Option<String>,
    pub search: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkStatusDto {
    pub work_status: WorkStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddDeliverableDto {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub url: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMilestonesDto {
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WorkNotesDto {
    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters"))]
    pub work_notes: String,
}
