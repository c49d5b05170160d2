// handler/contracts.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        applicationdb::ApplicationExt, chatdb::ChatExt, contractdb::ContractExt,
        projectdb::ProjectExt,
    },
    dtos::{common::ApiResponse, contractdtos::*},
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::{
        applicationmodel::ApplicationStatus,
        contractmodel::{AcceptanceMethod, ContractDetails, ContractStatus},
    },
    service::events::DomainEvent,
    AppState,
};

pub fn contracts_handler() -> Router {
    Router::new()
        .route("/", get(get_my_contracts).post(propose_contract))
        .route("/:contract_id", get(get_contract))
        .route("/:contract_id/accept", put(accept_contract))
        .route("/:contract_id/reject", put(reject_contract))
        .route("/:contract_id/status", put(update_contract_status))
}

/// Freelancer proposes terms on an accepted application. The contract starts
/// pending; acceptance happens either directly or through escrow funding.
pub async fn propose_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<ProposeContractDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let application = app_state
        .db_client
        .get_application_by_id(body.application_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Application not found"))?;

    if application.freelancer_id != auth.user.id {
        return Err(HttpError::forbidden(
            "Only the applicant can propose a contract",
        ));
    }

    if application.status != ApplicationStatus::Accepted {
        return Err(HttpError::bad_request(
            "Contracts can only be proposed on accepted applications",
        ));
    }

    let project = app_state
        .db_client
        .get_project_by_id(application.project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Project not found"))?;

    let conversation = app_state
        .db_client
        .create_or_get_conversation(
            application.id,
            application.project_id,
            project.client_id,
            application.freelancer_id,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let details = ContractDetails {
        title: body.title.clone(),
        scope: body.scope,
        deliverables: body.deliverables,
        final_amount: body.final_amount,
        duration: body.duration,
        payment_terms: body.payment_terms,
        start_date: body.start_date,
        milestones: body.milestones,
    };

    let details = serde_json::to_value(&details)
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let contract = app_state
        .db_client
        .create_contract(
            application.project_id,
            application.id,
            conversation.id,
            conversation.client_id,
            application.freelancer_id,
            details,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state.event_bus.emit(DomainEvent::ContractProposed {
        contract_id: contract.id,
        conversation_id: conversation.id,
        client_id: contract.client_id,
        contract_title: body.title,
    });

    Ok(Json(ApiResponse::success(
        "Contract proposed successfully",
        contract,
    )))
}

pub async fn get_my_contracts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let contracts = app_state
        .db_client
        .get_contracts_for_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Contracts retrieved successfully",
        contracts,
    )))
}

pub async fn get_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let contract = app_state
        .db_client
        .get_contract_by_id(contract_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Contract not found"))?;

    if contract.client_id != auth.user.id && contract.freelancer_id != auth.user.id {
        return Err(HttpError::forbidden("You are not a party to this contract"));
    }

    Ok(Json(ApiResponse::success(
        "Contract retrieved successfully",
        contract,
    )))
}

/// Direct acceptance without escrow. The escrow path reaches the same
/// transition through payment settlement instead.
pub async fn accept_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let contract = get_pending_contract_as_client(&app_state, contract_id, auth.user.id).await?;

    let accepted = app_state
        .db_client
        .accept_contract(contract.id, AcceptanceMethod::Direct, None)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let contract = match accepted {
        Some(contract) => contract,
        // Raced with escrow settlement; the contract is accepted either way
        None => app_state
            .db_client
            .get_contract_by_id(contract_id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?
            .ok_or_else(|| HttpError::not_found("Contract not found"))?,
    };

    app_state.event_bus.emit(DomainEvent::ContractDecided {
        contract_id: contract.id,
        conversation_id: contract.conversation_id,
        freelancer_id: contract.freelancer_id,
        accepted: true,
    });

    Ok(Json(ApiResponse::success(
        "Contract accepted successfully",
        contract,
    )))
}

pub async fn reject_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let contract = get_pending_contract_as_client(&app_state, contract_id, auth.user.id).await?;

    let rejected = app_state
        .db_client
        .reject_contract(contract.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state.event_bus.emit(DomainEvent::ContractDecided {
        contract_id: rejected.id,
        conversation_id: rejected.conversation_id,
        freelancer_id: rejected.freelancer_id,
        accepted: false,
    });

    Ok(Json(ApiResponse::success("Contract rejected", rejected)))
}

/// Status endpoint kept for clients that send {"status": "..."} instead of
/// hitting the accept/reject routes.
pub async fn update_contract_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
    Json(body): Json<UpdateContractStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    match body.status {
        ContractStatus::Accepted => {
            accept_contract(Extension(app_state), Extension(auth), Path(contract_id))
                .await
                .map(|r| r.into_response())
        }
        ContractStatus::Rejected => {
            reject_contract(Extension(app_state), Extension(auth), Path(contract_id))
                .await
                .map(|r| r.into_response())
        }
        _ => Err(HttpError::bad_request(
            "Contracts can only be accepted or rejected",
        )),
    }
}

async fn get_pending_contract_as_client(
    app_state: &Arc<AppState>,
    contract_id: Uuid,
    user_id: Uuid,
) -> Result<crate::models::contractmodel::Contract, HttpError> {
    let contract = app_state
        .db_client
        .get_contract_by_id(contract_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Contract not found"))?;

    if contract.client_id != user_id {
        return Err(HttpError::forbidden(
            "Only the client can decide this contract",
        ));
    }

    if contract.status != ContractStatus::Pending {
        return Err(HttpError::bad_request(
            "This contract has already been decided",
        ));
    }

    Ok(contract)
}
