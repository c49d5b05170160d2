// handler/users.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{projectdb::ProjectExt, userdb::UserExt},
    dtos::{
        common::{ApiResponse, Response},
        userdtos::{AdminStatsDto, AdminUserQueryDto, FilterUserDto, UpdateProfileDto},
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::usermodel::AccountStatus,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        .route("/me", get(get_me).put(update_me).delete(delete_me))
        .route("/:user_id", get(get_user_profile))
}

pub fn admin_handler() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:user_id/suspend", put(suspend_user))
        .route("/users/:user_id/activate", put(activate_user))
        .route("/stats", get(get_stats))
}

pub async fn get_me(
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(ApiResponse::success(
        "Profile retrieved successfully",
        FilterUserDto::filter_user(&auth.user),
    )))
}

pub async fn update_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .db_client
        .update_user_profile(
            auth.user.id,
            body.name,
            body.bio,
            body.skills,
            body.hourly_rate,
            body.company,
            body.avatar_url,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Profile updated successfully",
        FilterUserDto::filter_user(&user),
    )))
}

pub async fn delete_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    // Deletion is blocked while any contract or held escrow is live
    let open_engagements = app_state
        .db_client
        .count_open_engagements(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if open_engagements > 0 {
        return Err(HttpError::bad_request(
            "Account cannot be deleted while you have active contracts or held escrow payments",
        ));
    }

    app_state
        .db_client
        .delete_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(Response {
        status: "success",
        message: "Account deleted".to_string(),
    }))
}

pub async fn get_user_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success(
        "User retrieved successfully",
        FilterUserDto::filter_user(&user),
    )))
}

// Admin moderation

pub async fn list_users(
    Query(query): Query<AdminUserQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let limit = query.limit.unwrap_or(20) as i64;
    let offset = (query.page.unwrap_or(1) as i64 - 1) * limit;

    let users = app_state
        .db_client
        .list_users(
            query.role,
            query.account_status,
            query.search.as_deref(),
            limit,
            offset,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response: Vec<FilterUserDto> = users.iter().map(FilterUserDto::filter_user).collect();

    Ok(Json(ApiResponse::success(
        "Users retrieved successfully",
        response,
    )))
}

pub async fn suspend_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    if user_id == auth.user.id {
        return Err(HttpError::bad_request("You cannot suspend yourself"));
    }

    let user = app_state
        .db_client
        .set_account_status(user_id, AccountStatus::Suspended)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("admin {} suspended user {}", auth.user.id, user_id);

    Ok(Json(ApiResponse::success(
        "User suspended",
        FilterUserDto::filter_user(&user),
    )))
}

pub async fn activate_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .set_account_status(user_id, AccountStatus::Active)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "User activated",
        FilterUserDto::filter_user(&user),
    )))
}

pub async fn get_stats(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let total_users = app_state
        .db_client
        .count_users()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let total_projects = app_state
        .db_client
        .count_projects()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Stats retrieved successfully",
        AdminStatsDto {
            total_users,
            total_projects,
        },
    )))
}
