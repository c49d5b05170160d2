// dtos/contractdtos.rs
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::contractmodel::{ContractMilestone, ContractStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct ProposeContractDto {
    pub application_id: Uuid,

    #[validate(length(min = 5, max = 200, message = "Title must be between 5 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 20, message = "Scope must be at least 20 characters"))]
    pub scope: String,

    #[serde(default)]
    pub deliverables: Vec<String>,

    #[validate(range(min = 100, message = "Final amount must be at least ₹1"))]
    pub final_amount: i64, // in paise

    #[validate(length(min = 1, message = "Duration is required"))]
    pub duration: String,

    #[validate(length(min = 1, message = "Payment terms are required"))]
    pub payment_terms: String,

    pub start_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub milestones: Vec<ContractMilestone>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContractStatusDto {
    pub status: ContractStatus,
}
