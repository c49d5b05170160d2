// handler/applications.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{applicationdb::ApplicationExt, chatdb::ChatExt, projectdb::ProjectExt},
    dtos::{applicationdtos::*, common::ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::{
        applicationmodel::ApplicationStatus,
        chatmodels::MessageType,
        projectmodel::ProjectStatus,
    },
    service::events::DomainEvent,
    AppState,
};

pub fn applications_handler() -> Router {
    Router::new()
        .route("/", post(submit_application))
        .route("/mine", get(get_my_applications))
        .route("/project/:project_id", get(get_project_applications))
        .route("/:application_id/status", put(decide_application))
        .route("/:application_id/withdraw", put(withdraw_application))
}

pub async fn submit_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<SubmitApplicationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if !auth.user.role.can_apply() {
        return Err(HttpError::forbidden("Only freelancers can apply to projects"));
    }

    if body.proposed_budget_min > body.proposed_budget_max {
        return Err(HttpError::bad_request(
            "Minimum budget cannot exceed maximum budget",
        ));
    }

    let project = app_state
        .db_client
        .get_project_by_id(body.project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Project not found"))?;

    if project.status != ProjectStatus::Open {
        return Err(HttpError::bad_request(
            "This project is no longer accepting applications",
        ));
    }

    if project.client_id == auth.user.id {
        return Err(HttpError::bad_request(
            "You cannot apply to your own project",
        ));
    }

    let was_rejected = app_state
        .db_client
        .was_rejected_on_project(project.id, auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if was_rejected {
        return Err(HttpError::bad_request(
            "You cannot re-apply to a project that rejected your application",
        ));
    }

    let application = app_state
        .db_client
        .create_application(
            project.id,
            auth.user.id,
            body.cover_letter,
            body.proposed_budget_min,
            body.proposed_budget_max,
            body.proposed_duration,
        )
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::unique_constraint_violation(
                    "You have already applied to this project",
                )
            }
            _ => HttpError::server_error(e.to_string()),
        })?;

    if let Err(e) = app_state
        .db_client
        .increment_proposal_count(project.id)
        .await
    {
        tracing::warn!("failed to bump proposal count: {}", e);
    }

    // Fire-and-forget; the response never waits on the scoring collaborator
    app_state
        .scoring
        .score_in_background(application.clone(), project);

    Ok(Json(ApiResponse::success(
        "Application submitted successfully",
        application,
    )))
}

pub async fn get_my_applications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let applications = app_state
        .db_client
        .get_applications_by_freelancer(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Applications retrieved successfully",
        applications,
    )))
}

pub async fn get_project_applications(
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

    if project.client_id != auth.user.id {
        return Err(HttpError::forbidden(
            "Only the project owner can view its applications",
        ));
    }

    let applications = app_state
        .db_client
        .get_applications_by_project(project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Applications retrieved successfully",
        applications,
    )))
}

pub async fn withdraw_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(application_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let application = app_state
        .db_client
        .get_application_by_id(application_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Application not found"))?;

    if application.freelancer_id != auth.user.id {
        return Err(HttpError::forbidden(
            "You can only withdraw your own application",
        ));
    }

    if application.status != ApplicationStatus::Pending {
        return Err(HttpError::bad_request(
            "Only pending applications can be withdrawn",
        ));
    }

    let updated = app_state
        .db_client
        .update_application_status(application_id, ApplicationStatus::Withdrawn)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Application withdrawn",
        updated,
    )))
}

/// Accepting an application opens the negotiation channel. The project stays
/// open and other applications stay pending; only contract acceptance
/// commits the project to a freelancer.
pub async fn decide_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(application_id): Path<Uuid>,
    Json(body): Json<UpdateApplicationStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    if !matches!(
        body.status,
        ApplicationStatus::Accepted | ApplicationStatus::Rejected
    ) {
        return Err(HttpError::bad_request(
            "Applications can only be accepted or rejected",
        ));
    }

    let application = app_state
        .db_client
        .get_application_by_id(application_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Application not found"))?;

    let project = app_state
        .db_client
        .get_project_by_id(application.project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Project not found"))?;

    if project.client_id != auth.user.id {
        return Err(HttpError::forbidden(
            "Only the project owner can decide applications",
        ));
    }

    if application.status != ApplicationStatus::Pending {
        return Err(HttpError::bad_request(
            "This application has already been decided",
        ));
    }

    let updated = app_state
        .db_client
        .update_application_status(application_id, body.status)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if body.status == ApplicationStatus::Accepted {
        let conversation = app_state
            .db_client
            .create_or_get_conversation(
                application_id,
                project.id,
                project.client_id,
                application.freelancer_id,
            )
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        app_state
            .db_client
            .set_accepted_application(project.id, application_id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        if let Err(e) = app_state
            .db_client
            .send_message(
                conversation.id,
                auth.user.id,
                MessageType::System,
                "Application accepted. You can now discuss the project details."
                    .to_string(),
            )
            .await
        {
            tracing::warn!("failed to write system message: {}", e);
        }
    }

    app_state.event_bus.emit(DomainEvent::ApplicationDecided {
        application_id,
        project_id: project.id,
        freelancer_id: application.freelancer_id,
        accepted: body.status == ApplicationStatus::Accepted,
        project_title: project.title,
    });

    Ok(Json(ApiResponse::success(
        "Application status updated",
        updated,
    )))
}
