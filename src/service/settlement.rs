// service/settlement.rs
//
// The status-transition orchestrator: advances Payment, Contract and Project
// together once the gateway reports a funded payment, and releases escrow
// after client approval. Both the verify call and the webhook drive the same
// settlement function, so the final state does not depend on which of the
// two arrives first or only.
use std::sync::Arc;

use thiserror::Error;

use crate::{
    db::{
        contractdb::ContractExt,
        db::DBClient,
        paymentdb::PaymentExt,
        projectdb::ProjectExt,
    },
    models::{
        contractmodel::{AcceptanceMethod, Contract},
        paymentmodel::{EscrowStatus, Payment, PaymentStatus},
        projectmodel::ProjectStatus,
    },
    service::{
        error::ServiceError,
        events::{DomainEvent, EventBus},
    },
};

/// A violated settlement precondition. Each variant carries the caller-facing
/// reason for the block.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementBlock {
    #[error("Payment has failed")]
    PaymentFailed,
    #[error("Payment has been refunded")]
    PaymentRefunded,
    #[error("Payment has not been captured")]
    NotCaptured,
    #[error("Payment has not been verified")]
    NotVerified,
    #[error("Escrow is not in held status")]
    EscrowNotHeld,
    #[error("Project must be in completed status")]
    ProjectNotCompleted,
}

/// Guard for funding settlement (escrow acceptance). Captured or authorized
/// both count as funded; the gateway auto-captures authorized payments.
pub fn funding_guard(payment: &Payment) -> Result<(), SettlementBlock> {
    if payment.status == PaymentStatus::Failed {
        return Err(SettlementBlock::PaymentFailed);
    }
    if payment.status == PaymentStatus::Refunded
        || payment.escrow_status == EscrowStatus::Refunded
    {
        return Err(SettlementBlock::PaymentRefunded);
    }
    if !matches!(
        payment.status,
        PaymentStatus::Captured | PaymentStatus::Authorized
    ) {
        return Err(SettlementBlock::NotCaptured);
    }
    if !payment.verified {
        return Err(SettlementBlock::NotVerified);
    }
    Ok(())
}

/// Guard chain for escrow release, checked in order so the first violated
/// precondition names the block.
pub fn release_guard(
    payment: &Payment,
    project_status: ProjectStatus,
) -> Result<(), SettlementBlock> {
    if payment.escrow_status != EscrowStatus::Held {
        return Err(SettlementBlock::EscrowNotHeld);
    }
    if payment.status == PaymentStatus::Failed {
        return Err(SettlementBlock::PaymentFailed);
    }
    if payment.status == PaymentStatus::Refunded {
        return Err(SettlementBlock::PaymentRefunded);
    }
    if payment.status != PaymentStatus::Captured {
        return Err(SettlementBlock::NotCaptured);
    }
    if !payment.verified {
        return Err(SettlementBlock::NotVerified);
    }
    if project_status != ProjectStatus::Completed {
        return Err(SettlementBlock::ProjectNotCompleted);
    }
    Ok(())
}

#[derive(Debug)]
pub enum SettlementOutcome {
    /// Escrow contract accepted and project activated.
    EscrowFunded(Box<Contract>),
    /// Legacy non-escrow payment completed and project closed.
    Completed,
    /// The transition had already happened; nothing to do.
    AlreadySettled,
    /// A precondition is not met yet (e.g. webhook arrived before capture).
    NotReady(SettlementBlock),
}

#[derive(Debug, Clone)]
pub struct SettlementService {
    db_client: Arc<DBClient>,
    event_bus: EventBus,
}

impl SettlementService {
    pub fn new(db_client: Arc<DBClient>, event_bus: EventBus) -> Self {
        Self {
            db_client,
            event_bus,
        }
    }

    /// Advances Contract and Project for a funded payment. Idempotent: an
    /// already-accepted contract or already-closed project is a no-op, so
    /// verify and webhook can both call this in any order.
    pub async fn settle_funded_payment(
        &self,
        payment: &Payment,
    ) -> Result<SettlementOutcome, ServiceError> {
        if let Err(block) = funding_guard(payment) {
            return Ok(SettlementOutcome::NotReady(block));
        }

        match payment.contract_id {
            Some(contract_id) => {
                let accepted = self
                    .db_client
                    .accept_contract(contract_id, AcceptanceMethod::EscrowFunded, Some(payment.id))
                    .await?;

                match accepted {
                    None => Ok(SettlementOutcome::AlreadySettled),
                    Some(contract) => {
                        self.event_bus.emit(DomainEvent::EscrowFunded {
                            payment_id: payment.id,
                            contract_id: contract.id,
                            conversation_id: contract.conversation_id,
                            project_id: contract.project_id,
                            client_id: contract.client_id,
                            freelancer_id: contract.freelancer_id,
                            amount: payment.amount,
                        });
                        Ok(SettlementOutcome::EscrowFunded(Box::new(contract)))
                    }
                }
            }
            None => {
                // Legacy non-escrow flow: the project was already completed
                // when the order was created; a funded payment closes it out.
                let project = self
                    .db_client
                    .get_project_by_id(payment.project_id)
                    .await?
                    .ok_or(ServiceError::ProjectNotFound(payment.project_id))?;

                if project.status == ProjectStatus::Closed {
                    return Ok(SettlementOutcome::AlreadySettled);
                }

                // The status check above is a fast path; the authoritative
                // settled-once decision happens inside the transaction.
                let completed = self.db_client.complete_direct_payment(payment.id).await?;
                if completed.is_none() {
                    return Ok(SettlementOutcome::AlreadySettled);
                }

                self.event_bus.emit(DomainEvent::PaymentCompleted {
                    payment_id: payment.id,
                    project_id: payment.project_id,
                    client_id: payment.client_id,
                    freelancer_id: payment.freelancer_id,
                    amount: payment.amount,
                });
                Ok(SettlementOutcome::Completed)
            }
        }
    }

    /// Releases held escrow to the freelancer. Guards run before any
    /// mutation; the multi-row write itself is one transaction.
    pub async fn release_escrow(
        &self,
        payment: &Payment,
    ) -> Result<Result<Payment, SettlementBlock>, ServiceError> {
        let project = self
            .db_client
            .get_project_by_id(payment.project_id)
            .await?
            .ok_or(ServiceError::ProjectNotFound(payment.project_id))?;

        if let Err(block) = release_guard(payment, project.status) {
            return Ok(Err(block));
        }

        let released = self
            .db_client
            .release_escrow(payment.id)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidEscrowTransition(
                    "payment is no longer releasable".to_string(),
                )
            })?;

        self.event_bus.emit(DomainEvent::EscrowReleased {
            payment_id: released.id,
            project_id: released.project_id,
            freelancer_id: released.freelancer_id,
            amount: released.amount,
        });

        Ok(Ok(released))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn held_payment(status: PaymentStatus, verified: bool) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            order_id: "order_test".to_string(),
            payment_id: Some("pay_test".to_string()),
            signature: None,
            amount: 500_000,
            currency: "INR".to_string(),
            status,
            escrow_status: EscrowStatus::Held,
            project_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            freelancer_id: Uuid::new_v4(),
            contract_id: Some(Uuid::new_v4()),
            verified,
            description: None,
            webhook_data: None,
            released_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_funding_guard_passes_for_captured_verified() {
        let payment = held_payment(PaymentStatus::Captured, true);
        assert!(funding_guard(&payment).is_ok());
    }

    #[test]
    fn test_funding_guard_accepts_authorized() {
        let payment = held_payment(PaymentStatus::Authorized, true);
        assert!(funding_guard(&payment).is_ok());
    }

    #[test]
    fn test_funding_guard_blocks_failed() {
        let payment = held_payment(PaymentStatus::Failed, true);
        assert_eq!(funding_guard(&payment), Err(SettlementBlock::PaymentFailed));
    }

    #[test]
    fn test_funding_guard_blocks_refunded() {
        let payment = held_payment(PaymentStatus::Refunded, true);
        assert_eq!(
            funding_guard(&payment),
            Err(SettlementBlock::PaymentRefunded)
        );
    }

    #[test]
    fn test_funding_guard_blocks_unverified() {
        let payment = held_payment(PaymentStatus::Captured, false);
        assert_eq!(funding_guard(&payment), Err(SettlementBlock::NotVerified));
    }

    #[test]
    fn test_funding_guard_blocks_created() {
        let payment = held_payment(PaymentStatus::Created, true);
        assert_eq!(funding_guard(&payment), Err(SettlementBlock::NotCaptured));
    }

    #[test]
    fn test_release_guard_passes_when_all_conditions_met() {
        let payment = held_payment(PaymentStatus::Captured, true);
        assert!(release_guard(&payment, ProjectStatus::Completed).is_ok());
    }

    #[test]
    fn test_release_guard_blocks_in_progress_project() {
        let payment = held_payment(PaymentStatus::Captured, true);
        assert_eq!(
            release_guard(&payment, ProjectStatus::InProgress),
            Err(SettlementBlock::ProjectNotCompleted)
        );
    }

    #[test]
    fn test_release_guard_blocks_already_released() {
        let mut payment = held_payment(PaymentStatus::Captured, true);
        payment.escrow_status = EscrowStatus::Released;
        assert_eq!(
            release_guard(&payment, ProjectStatus::Completed),
            Err(SettlementBlock::EscrowNotHeld)
        );
    }

    #[test]
    fn test_release_guard_blocks_authorized_only() {
        // Release is stricter than funding: captured only.
        let payment = held_payment(PaymentStatus::Authorized, true);
        assert_eq!(
            release_guard(&payment, ProjectStatus::Completed),
            Err(SettlementBlock::NotCaptured)
        );
    }

    #[test]
    fn test_release_guard_blocks_unverified() {
        let payment = held_payment(PaymentStatus::Captured, false);
        assert_eq!(
            release_guard(&payment, ProjectStatus::Completed),
            Err(SettlementBlock::NotVerified)
        );
    }
}
