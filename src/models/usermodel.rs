// models/usermodel.rs
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Client,
    Freelancer,
    Both,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Client => "client",
            UserRole::Freelancer => "freelancer",
            UserRole::Both => "both",
        }
    }

    pub fn can_post_projects(&self) -> bool {
        matches!(self, UserRole::Client | UserRole::Both | UserRole::Admin)
    }

    pub fn can_apply(&self) -> bool {
        matches!(self, UserRole::Freelancer | UserRole::Both)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "account_status", rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub role: UserRole,
    pub account_status: AccountStatus,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub hourly_rate: Option<i64>,
    pub company: Option<String>,
    pub avatar_url: Option<String>,
    // Lifetime counters, maintained by the payment settlement path
    pub total_earned: i64,
    pub total_spent: i64,
    pub completed_projects: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
