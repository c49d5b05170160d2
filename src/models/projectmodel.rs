// models/projectmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
pub enum ProjectStatus {
    Open,
    InProgress,
    Completed,
    Closed,
    Cancelled,
}

impl ProjectStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ProjectStatus::Open => "open",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Closed => "closed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

/// Freelancer-driven task progress, independent of the business lifecycle.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "work_status", rename_all = "snake_case")]
pub enum WorkStatus {
    Planning,
    Designing,
    Development,
    Testing,
    Review,
    Completed,
}

impl WorkStatus {
    pub fn to_str(&self) -> &str {
        match self {
            WorkStatus::Planning => "planning",
            WorkStatus::Designing => "designing",
            WorkStatus::Development => "development",
            WorkStatus::Testing => "testing",
            WorkStatus::Review => "review",
            WorkStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "budget_type", rename_all = "snake_case")]
pub enum BudgetType {
    Fixed,
    Hourly,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PhaseRecord {
    pub phase: WorkStatus,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Milestone {
    pub title: String,
    pub description: Option<String>,
    pub amount: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Deliverable {
    pub title: String,
    pub url: Option<String>,
    pub note: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Project {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub skills: Vec<String>,
    pub budget_min: i64,
    pub budget_max: i64,
    pub budget_type: BudgetType,
    pub status: ProjectStatus,
    pub work_status: WorkStatus,
    pub assigned_freelancer_id: Option<Uuid>,
    pub accepted_application_id: Option<Uuid>,
    pub proposal_count: i32,
    pub view_count: i32,
    pub viewed_by: Vec<Uuid>,
    // jsonb sub-documents
    pub phase_history: serde_json::Value,
    pub milestones: serde_json::Value,
    pub deliverables: serde_json::Value,
    pub work_notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
