// models/contractmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "contract_status", rename_all = "snake_case")]
pub enum ContractStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl ContractStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ContractStatus::Pending => "pending",
            ContractStatus::Accepted => "accepted",
            ContractStatus::Rejected => "rejected",
            ContractStatus::Cancelled => "cancelled",
        }
    }
}

/// How a contract reached accepted: a direct client decision for non-escrow
/// deals, or the payment settlement path once escrow is funded. Both routes
/// funnel through the same transition function.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "acceptance_method", rename_all = "snake_case")]
pub enum AcceptanceMethod {
    Direct,
    EscrowFunded,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContractMilestone {
    pub title: String,
    pub amount: i64,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContractDetails {
    pub title: String,
    pub scope: String,
    pub deliverables: Vec<String>,
    pub final_amount: i64,
    pub duration: String,
    pub payment_terms: String,
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub milestones: Vec<ContractMilestone>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Contract {
    pub id: Uuid,
    pub project_id: Uuid,
    pub application_id: Uuid,
    pub conversation_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub details: serde_json::Value,
    pub status: ContractStatus,
    pub acceptance_method: Option<AcceptanceMethod>,
    pub escrow_funded: bool,
    pub escrow_payment_id: Option<Uuid>,
    pub escrow_funded_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Contract {
    pub fn details(&self) -> Result<ContractDetails, serde_json::Error> {
        serde_json::from_value(self.details.clone())
    }
}
