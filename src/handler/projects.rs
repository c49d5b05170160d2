// handler/projects.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::projectdb::{ProjectExt, ProjectFilter},
    dtos::{
        common::{ApiResponse, Response},
        projectdtos::*,
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::projectmodel::{Deliverable, Project, ProjectStatus},
    service::events::DomainEvent,
    AppState,
};

pub fn projects_handler() -> Router {
    Router::new()
        .route("/", get(get_all_projects).post(create_project))
        .route("/mine", get(get_my_projects))
        .route(
            "/:project_id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/:project_id/work-status", put(update_work_status))
        .route("/:project_id/complete", put(complete_project))
        .route("/:project_id/deliverables", post(add_deliverable))
        .route("/:project_id/milestones", put(update_milestones))
        .route("/:project_id/work-notes", put(update_work_notes))
}

pub async fn create_project(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateProjectDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if !auth.user.role.can_post_projects() {
        return Err(HttpError::forbidden("Only clients can post projects"));
    }

    if body.budget_min > body.budget_max {
        return Err(HttpError::bad_request(
            "Minimum budget cannot exceed maximum budget",
        ));
    }

    let project = app_state
        .db_client
        .create_project(
            auth.user.id,
            body.title,
            body.description,
            body.category,
            body.skills,
            body.budget_min,
            body.budget_max,
            body.budget_type,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Project created successfully",
        project,
    )))
}

pub async fn get_all_projects(
    Query(query): Query<ProjectQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let limit = query.limit.unwrap_or(20) as i64;
    let offset = (query.page.unwrap_or(1) as i64 - 1) * limit;

    let skills = query.skills.as_deref().map(|s| {
        s.split(',')
            .map(|skill| skill.trim().to_string())
            .filter(|skill| !skill.is_empty())
            .collect::<Vec<_>>()
    });

    let filter = ProjectFilter {
        category: query.category,
        min_budget: query.min_budget,
        max_budget: query.max_budget,
        skills,
        search: query.search,
    };

    let projects = app_state
        .db_client
        .get_open_projects(filter, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Projects retrieved successfully",
        projects,
    )))
}

pub async fn get_my_projects(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let mut projects = app_state
        .db_client
        .get_projects_by_client(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let assigned = app_state
        .db_client
        .get_projects_by_freelancer(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    projects.extend(assigned);

    Ok(Json(ApiResponse::success(
        "Projects retrieved successfully",
        projects,
    )))
}

pub async fn get_project(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let project = app_state
        .db_client
        .get_project_by_id(project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Project not found"))?;

    // Best-effort; a failed view bump never blocks the read
    if project.client_id != auth.user.id {
        if let Err(e) = app_state
            .db_client
            .record_project_view(project_id, auth.user.id)
            .await
        {
            tracing::debug!("failed to record project view: {}", e);
        }
    }

    Ok(Json(ApiResponse::success(
        "Project retrieved successfully",
        project,
    )))
}

pub async fn update_project(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<UpdateProjectDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let project = get_owned_project(&app_state, project_id, auth.user.id).await?;

    if project.status != ProjectStatus::Open {
        return Err(HttpError::bad_request("Only open projects can be edited"));
    }

    let updated = app_state
        .db_client
        .update_project(
            project_id,
            body.title,
            body.description,
            body.category,
            body.skills,
            body.budget_min,
            body.budget_max,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Project updated successfully",
        updated,
    )))
}

pub async fn delete_project(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let project = get_owned_project(&app_state, project_id, auth.user.id).await?;

    if project.status != ProjectStatus::Open {
        return Err(HttpError::bad_request(
            "Projects with active or finished contracts cannot be deleted",
        ));
    }

    app_state
        .db_client
        .delete_project(project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(Response {
        status: "success",
        message: "Project deleted".to_string(),
    }))
}

pub async fn update_work_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<UpdateWorkStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let project = get_assigned_project(&app_state, project_id, auth.user.id).await?;

    let updated = app_state
        .db_client
        .update_work_status(project.id, body.work_status)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state.event_bus.emit(DomainEvent::WorkStatusChanged {
        project_id: updated.id,
        client_id: updated.client_id,
        work_status: body.work_status.to_str().to_string(),
    });

    Ok(Json(ApiResponse::success(
        "Work status updated successfully",
        updated,
    )))
}

/// Marks the business lifecycle as completed (work done, awaiting escrow
/// release). Distinct from work_status, which tracks task progress.
pub async fn complete_project(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let project = get_assigned_project(&app_state, project_id, auth.user.id).await?;

    if project.status != ProjectStatus::InProgress {
        return Err(HttpError::bad_request(
            "Only in-progress projects can be completed",
        ));
    }

    let updated = app_state
        .db_client
        .update_project_status(project.id, ProjectStatus::Completed)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Project marked as completed",
        updated,
    )))
}

pub async fn add_deliverable(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<AddDeliverableDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let project = get_assigned_project(&app_state, project_id, auth.user.id).await?;

    let deliverable = Deliverable {
        title: body.title,
        url: body.url,
        note: body.note,
        submitted_at: Utc::now(),
    };

    let updated = app_state
        .db_client
        .add_deliverable(project.id, deliverable)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Deliverable added successfully",
        updated,
    )))
}

pub async fn update_milestones(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<UpdateMilestonesDto>,
) -> Result<impl IntoResponse, HttpError> {
    let project = get_assigned_project(&app_state, project_id, auth.user.id).await?;

    let updated = app_state
        .db_client
        .update_milestones(project.id, body.milestones)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Milestones updated successfully",
        updated,
    )))
}

pub async fn update_work_notes(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<WorkNotesDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let project = get_assigned_project(&app_state, project_id, auth.user.id).await?;

    let updated = app_state
        .db_client
        .update_work_notes(project.id, body.work_notes)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Work notes updated successfully",
        updated,
    )))
}

async fn get_owned_project(
    app_state: &Arc<AppState>,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Project, HttpError> {
    let project = app_state
        .db_client
        .get_project_by_id(project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Project not found"))?;

    if project.client_id != user_id {
        return Err(HttpError::forbidden("You do not own this project"));
    }

    Ok(project)
}

async fn get_assigned_project(
    app_state: &Arc<AppState>,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Project, HttpError> {
    let project = app_state
        .db_client
        .get_project_by_id(project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Project not found"))?;

    if project.assigned_freelancer_id != Some(user_id) {
        return Err(HttpError::forbidden(
            "Only the assigned freelancer can do this",
        ));
    }

    Ok(project)
}
