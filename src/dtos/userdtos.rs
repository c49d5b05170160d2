// dtos/userdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::usermodel::{AccountStatus, User, UserRole};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginUserDto {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileDto {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    #[validate(range(min = 0))]
    pub hourly_rate: Option<i64>,
    pub company: Option<String>,
    pub avatar_url: Option<String>,
}

/// Public view of a user, password stripped.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub account_status: AccountStatus,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub hourly_rate: Option<i64>,
    pub company: Option<String>,
    pub avatar_url: Option<String>,
    pub total_earned: i64,
    pub total_spent: i64,
    pub completed_projects: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            account_status: user.account_status,
            bio: user.bio.clone(),
            skills: user.skills.clone(),
            hourly_rate: user.hourly_rate,
            company: user.company.clone(),
            avatar_url: user.avatar_url.clone(),
            total_earned: user.total_earned,
            total_spent: user.total_spent,
            completed_projects: user.completed_projects,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub token: String,
    pub user: FilterUserDto,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUserQueryDto {
    pub role: Option<UserRole>,
    pub account_status: Option<AccountStatus>,
    pub search: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AdminStatsDto {
    pub total_users: i64,
    pub total_projects: i64,
}
