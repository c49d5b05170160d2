// handler/payments.rs
//
// The payment surface. Order creation talks to the gateway; verify and the
// webhook both write authoritative gateway state back and drive the same
// settlement function, so either one alone finalizes a funded payment.
use std::sync::Arc;

use axum::{
    extract::Path,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{contractdb::ContractExt, paymentdb::PaymentExt, projectdb::ProjectExt},
    dtos::{
        common::{ApiResponse, Response},
        paymentdtos::*,
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::{
        contractmodel::ContractStatus,
        paymentmodel::{EscrowStatus, Payment, PaymentStatus},
        projectmodel::ProjectStatus,
    },
    service::settlement::SettlementOutcome,
    utils::reference::generate_receipt_reference,
    AppState,
};

pub fn payments_handler() -> Router {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/verify", post(verify_payment))
        .route("/history", get(get_payment_history))
        .route("/project/:project_id", get(get_project_payments))
        .route("/release-escrow/:payment_id", post(release_escrow))
}

/// Unauthenticated; the gateway authenticates itself with the body signature.
pub fn webhook_handler() -> Router {
    Router::new().route("/webhook", post(gateway_webhook))
}

pub async fn create_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateOrderDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let project = app_state
        .db_client
        .get_project_by_id(body.project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Project not found"))?;

    if project.client_id != auth.user.id {
        return Err(HttpError::forbidden(
            "Only the project owner can pay for this project",
        ));
    }

    let (amount, freelancer_id, contract_id, description) = match body.contract_id {
        // Escrow funding: amount comes from the contract terms
        Some(contract_id) => {
            let contract = app_state
                .db_client
                .get_contract_by_id(contract_id)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?
                .ok_or_else(|| HttpError::not_found("Contract not found"))?;

            if contract.client_id != auth.user.id {
                return Err(HttpError::forbidden(
                    "You are not a party to this contract",
                ));
            }

            if contract.project_id != project.id {
                return Err(HttpError::bad_request(
                    "Contract does not belong to this project",
                ));
            }

            if contract.status != ContractStatus::Pending {
                return Err(HttpError::bad_request(
                    "Escrow can only fund a pending contract",
                ));
            }

            let details = contract
                .details()
                .map_err(|e| HttpError::server_error(e.to_string()))?;

            (
                details.final_amount,
                contract.freelancer_id,
                Some(contract.id),
                body.description
                    .unwrap_or_else(|| format!("Escrow for \"{}\"", details.title)),
            )
        }
        // Legacy non-escrow payment against a completed project
        None => {
            let amount = body.amount.ok_or_else(|| {
                HttpError::bad_request("Amount is required for non-escrow payments")
            })?;

            if project.status != ProjectStatus::Completed {
                return Err(HttpError::bad_request(
                    "Direct payments require a completed project",
                ));
            }

            let freelancer_id = project.assigned_freelancer_id.ok_or_else(|| {
                HttpError::bad_request("Project has no assigned freelancer")
            })?;

            (
                amount,
                freelancer_id,
                None,
                body.description
                    .unwrap_or_else(|| format!("Payment for \"{}\"", project.title)),
            )
        }
    };

    let receipt = generate_receipt_reference();

    // Escrow payments are held until release; legacy payments have no
    // holding phase at all.
    let escrow_status = if contract_id.is_some() {
        EscrowStatus::Held
    } else {
        EscrowStatus::Released
    };

    let order = app_state
        .gateway
        .create_order(
            amount,
            "INR",
            &receipt,
            serde_json::json!({
                "project_id": project.id,
                "contract_id": contract_id,
            }),
        )
        .await
        .map_err(HttpError::from)?;

    let payment = app_state
        .db_client
        .create_payment(
            order.id.clone(),
            amount,
            "INR".to_string(),
            escrow_status,
            project.id,
            auth.user.id,
            freelancer_id,
            contract_id,
            Some(description),
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!(
        "order {} created for project {} ({} paise)",
        order.id,
        project.id,
        amount
    );

    Ok(Json(ApiResponse::success(
        "Order created successfully",
        OrderResponseDto {
            payment_id: payment.id,
            order_id: order.id,
            amount,
            currency: payment.currency,
            escrow_status: payment.escrow_status.to_str().to_string(),
            gateway_key_id: app_state.gateway.key_id().to_string(),
        },
    )))
}

/// Frontend-driven confirmation after checkout. The checkout signature only
/// proves the redirect was genuine; the payment state written back is the
/// gateway's own, fetched server to server.
pub async fn verify_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<VerifyPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let payment = app_state
        .db_client
        .get_payment_by_order_id(&body.order_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Payment not found"))?;

    if payment.client_id != auth.user.id {
        return Err(HttpError::forbidden("You did not create this payment"));
    }

    if !app_state
        .gateway
        .verify_checkout_signature(&body.order_id, &body.payment_id, &body.signature)
    {
        app_state
            .db_client
            .mark_payment_failed(&body.order_id, "Invalid payment signature".to_string())
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        return Err(HttpError::bad_request("Invalid payment signature"));
    }

    let gateway_payment = app_state
        .gateway
        .fetch_payment(&body.payment_id)
        .await
        .map_err(HttpError::from)?;

    let status = PaymentStatus::from_gateway(&gateway_payment.status).ok_or_else(|| {
        HttpError::server_error(format!(
            "Unknown gateway payment status: {}",
            gateway_payment.status
        ))
    })?;

    let payment = app_state
        .db_client
        .record_verification(&body.order_id, body.payment_id, body.signature, status, true)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let outcome = app_state
        .settlement
        .settle_funded_payment(&payment)
        .await
        .map_err(HttpError::from)?;

    respond_with_outcome("Payment verified successfully", payment, outcome)
}

#[derive(Debug, serde::Deserialize)]
struct WebhookEnvelope {
    event: String,
    payload: WebhookPayload,
}

#[derive(Debug, serde::Deserialize)]
struct WebhookPayload {
    payment: WebhookPaymentWrapper,
}

#[derive(Debug, serde::Deserialize)]
struct WebhookPaymentWrapper {
    entity: WebhookPaymentEntity,
}

#[derive(Debug, serde::Deserialize)]
struct WebhookPaymentEntity {
    id: String,
    order_id: String,
    status: String,
}

/// Gateway-driven settlement path. The signature covers the exact raw body,
/// so the handler takes the body as a String and never re-serializes it
/// before checking.
pub async fn gateway_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    raw_body: String,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("x-razorpay-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HttpError::bad_request("Missing webhook signature"))?;

    if !app_state
        .gateway
        .verify_webhook_signature(&raw_body, signature)
    {
        tracing::warn!("webhook rejected: invalid signature");
        return Err(HttpError::bad_request("Invalid webhook signature"));
    }

    let envelope: WebhookEnvelope = serde_json::from_str(&raw_body)
        .map_err(|e| HttpError::bad_request(format!("Malformed webhook payload: {}", e)))?;

    let entity = envelope.payload.payment.entity;

    let payment = app_state
        .db_client
        .get_payment_by_order_id(&entity.order_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    // Unknown orders are acknowledged so the gateway stops retrying
    let Some(_) = payment else {
        tracing::warn!("webhook for unknown order {}", entity.order_id);
        return Ok(Json(Response {
            status: "success",
            message: "Acknowledged".to_string(),
        }));
    };

    let status = PaymentStatus::from_gateway(&entity.status).ok_or_else(|| {
        HttpError::bad_request(format!("Unknown payment status: {}", entity.status))
    })?;

    let webhook_data: serde_json::Value =
        serde_json::from_str(&raw_body).unwrap_or(serde_json::Value::Null);

    // A signed capture event counts as verification on its own
    let mark_verified = envelope.event == "payment.captured";

    let payment = app_state
        .db_client
        .record_webhook_event(
            &entity.order_id,
            status,
            Some(entity.id),
            webhook_data,
            mark_verified,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!(
        "webhook {} for order {}: status {}",
        envelope.event,
        entity.order_id,
        entity.status
    );

    match envelope.event.as_str() {
        "payment.captured" | "payment.authorized" => {
            let outcome = app_state
                .settlement
                .settle_funded_payment(&payment)
                .await
                .map_err(HttpError::from)?;

            if let SettlementOutcome::NotReady(block) = &outcome {
                tracing::info!("webhook settlement deferred: {}", block);
            }
        }
        "payment.failed" => {
            tracing::warn!("payment failed for order {}", entity.order_id);
        }
        other => {
            tracing::debug!("ignoring webhook event {}", other);
        }
    }

    Ok(Json(Response {
        status: "success",
        message: "Webhook processed".to_string(),
    }))
}

pub async fn get_payment_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let payments = app_state
        .db_client
        .get_payments_for_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Payments retrieved successfully",
        payments,
    )))
}

pub async fn get_project_payments(
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

    if project.client_id != auth.user.id
        && project.assigned_freelancer_id != Some(auth.user.id)
    {
        return Err(HttpError::forbidden(
            "Only project participants can view its payments",
        ));
    }

    let payments = app_state
        .db_client
        .get_payments_by_project(project_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Payments retrieved successfully",
        payments,
    )))
}

/// Client approval of completed work. Every guard failure comes back as a
/// 400 naming the violated precondition.
pub async fn release_escrow(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .db_client
        .get_payment_by_id(payment_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Payment not found"))?;

    if payment.client_id != auth.user.id {
        return Err(HttpError::forbidden(
            "Only the client can release this escrow",
        ));
    }

    let released = app_state
        .settlement
        .release_escrow(&payment)
        .await
        .map_err(HttpError::from)?
        .map_err(|block| HttpError::bad_request(block.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Escrow released successfully",
        released,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::settlement::SettlementBlock;
    use axum::http::StatusCode;

    fn pending_payment() -> Payment {
        Payment {
            id: Uuid::new_v4(),
            order_id: "order_test".to_string(),
            payment_id: None,
            signature: None,
            amount: 250_000,
            currency: "INR".to_string(),
            status: PaymentStatus::Created,
            escrow_status: EscrowStatus::Held,
            project_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            freelancer_id: Uuid::new_v4(),
            contract_id: Some(Uuid::new_v4()),
            verified: false,
            description: None,
            webhook_data: None,
            released_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_verify_guard_failure_is_bad_request() {
        let err = respond_with_outcome(
            "Payment verified successfully",
            pending_payment(),
            SettlementOutcome::NotReady(SettlementBlock::NotCaptured),
        )
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Payment has not been captured");
    }

    #[test]
    fn test_verify_guard_failure_names_each_precondition() {
        for (block, message) in [
            (SettlementBlock::PaymentFailed, "Payment has failed"),
            (SettlementBlock::NotVerified, "Payment has not been verified"),
        ] {
            let err = respond_with_outcome(
                "Payment verified successfully",
                pending_payment(),
                SettlementOutcome::NotReady(block),
            )
            .unwrap_err();

            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.message, message);
        }
    }

    #[test]
    fn test_webhook_envelope_parses_gateway_shape() {
        let body = r#"{
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_abc123",
                        "order_id": "order_xyz789",
                        "status": "captured",
                        "amount": 500000
                    }
                }
            }
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.event, "payment.captured");
        assert_eq!(envelope.payload.payment.entity.id, "pay_abc123");
        assert_eq!(envelope.payload.payment.entity.order_id, "order_xyz789");
        assert_eq!(envelope.payload.payment.entity.status, "captured");
    }

    #[test]
    fn test_webhook_envelope_rejects_missing_payment() {
        let body = r#"{"event": "order.paid", "payload": {}}"#;
        assert!(serde_json::from_str::<WebhookEnvelope>(body).is_err());
    }
}

fn respond_with_outcome(
    message: &str,
    payment: Payment,
    outcome: SettlementOutcome,
) -> Result<axum::response::Response, HttpError> {
    match outcome {
        // Guard failures are client-visible 400s naming the precondition
        SettlementOutcome::NotReady(block) => Err(HttpError::bad_request(block.to_string())),
        SettlementOutcome::EscrowFunded(contract) => Ok(Json(ApiResponse::success(
            message,
            serde_json::json!({
                "payment": payment,
                "contract": contract,
            }),
        ))
        .into_response()),
        SettlementOutcome::Completed | SettlementOutcome::AlreadySettled => {
            Ok(Json(ApiResponse::success(message, payment)).into_response())
        }
    }
}
