// service/events.rs
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, notificationdb::NotificationExt},
    service::socket::{conversation_room, project_room, user_room, SocketHub},
    utils::money::format_paise_as_rupees,
};

/// Domain events emitted after a primary transaction commits. A background
/// worker turns them into stored notifications and socket pushes, so
/// delivery failures never touch the transition path.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    ApplicationDecided {
        application_id: Uuid,
        project_id: Uuid,
        freelancer_id: Uuid,
        accepted: bool,
        project_title: String,
    },
    ContractProposed {
        contract_id: Uuid,
        conversation_id: Uuid,
        client_id: Uuid,
        contract_title: String,
    },
    ContractDecided {
        contract_id: Uuid,
        conversation_id: Uuid,
        freelancer_id: Uuid,
        accepted: bool,
    },
    EscrowFunded {
        payment_id: Uuid,
        contract_id: Uuid,
        conversation_id: Uuid,
        project_id: Uuid,
        client_id: Uuid,
        freelancer_id: Uuid,
        amount: i64,
    },
    EscrowReleased {
        payment_id: Uuid,
        project_id: Uuid,
        freelancer_id: Uuid,
        amount: i64,
    },
    PaymentCompleted {
        payment_id: Uuid,
        project_id: Uuid,
        client_id: Uuid,
        freelancer_id: Uuid,
        amount: i64,
    },
    WorkStatusChanged {
        project_id: Uuid,
        client_id: Uuid,
        work_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<DomainEvent>,
}

impl EventBus {
    /// Best-effort: a closed channel is logged, never surfaced.
    pub fn emit(&self, event: DomainEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::error!("event bus closed, dropping event: {}", e);
        }
    }
}

/// Spawns the subscriber task and returns the bus handle.
pub fn start_event_worker(db_client: Arc<DBClient>, socket_hub: SocketHub) -> EventBus {
    let (sender, mut receiver) = mpsc::unbounded_channel::<DomainEvent>();

    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            if let Err(e) = handle_event(&db_client, &socket_hub, event).await {
                tracing::warn!("notification delivery failed: {}", e);
            }
        }
    });

    EventBus { sender }
}

async fn handle_event(
    db_client: &DBClient,
    hub: &SocketHub,
    event: DomainEvent,
) -> Result<(), sqlx::Error> {
    match event {
        DomainEvent::ApplicationDecided {
            application_id,
            project_id,
            freelancer_id,
            accepted,
            project_title,
        } => {
            let (kind, title, body) = if accepted {
                (
                    "application_accepted",
                    "Application accepted",
                    format!("Your application for \"{}\" was accepted", project_title),
                )
            } else {
                (
                    "application_rejected",
                    "Application rejected",
                    format!("Your application for \"{}\" was rejected", project_title),
                )
            };

            let notification = db_client
                .store_notification(
                    freelancer_id,
                    kind.to_string(),
                    title.to_string(),
                    body,
                    Some(serde_json::json!({
                        "application_id": application_id,
                        "project_id": project_id,
                    })),
                )
                .await?;

            hub.publish(
                &user_room(freelancer_id),
                "new-notification",
                serde_json::to_value(&notification).unwrap_or_default(),
            )
            .await;
        }

        DomainEvent::ContractProposed {
            contract_id,
            conversation_id,
            client_id,
            contract_title,
        } => {
            hub.publish(
                &conversation_room(conversation_id),
                "contract-proposed",
                serde_json::json!({ "contract_id": contract_id }),
            )
            .await;

            let notification = db_client
                .store_notification(
                    client_id,
                    "contract_proposed".to_string(),
                    "New contract proposal".to_string(),
                    format!("A contract \"{}\" was proposed to you", contract_title),
                    Some(serde_json::json!({ "contract_id": contract_id })),
                )
                .await?;

            hub.publish(
                &user_room(client_id),
                "new-notification",
                serde_json::to_value(&notification).unwrap_or_default(),
            )
            .await;
        }

        DomainEvent::ContractDecided {
            contract_id,
            conversation_id,
            freelancer_id,
            accepted,
        } => {
            hub.publish(
                &conversation_room(conversation_id),
                "contract-updated",
                serde_json::json!({
                    "contract_id": contract_id,
                    "status": if accepted { "accepted" } else { "rejected" },
                }),
            )
            .await;

            let (kind, title) = if accepted {
                ("contract_accepted", "Contract accepted")
            } else {
                ("contract_rejected", "Contract rejected")
            };

            let notification = db_client
                .store_notification(
                    freelancer_id,
                    kind.to_string(),
                    title.to_string(),
                    "The client has responded to your contract proposal".to_string(),
                    Some(serde_json::json!({ "contract_id": contract_id })),
                )
                .await?;

            hub.publish(
                &user_room(freelancer_id),
                "new-notification",
                serde_json::to_value(&notification).unwrap_or_default(),
            )
            .await;
        }

        DomainEvent::EscrowFunded {
            payment_id,
            contract_id,
            conversation_id,
            project_id,
            client_id,
            freelancer_id,
            amount,
        } => {
            hub.publish(
                &conversation_room(conversation_id),
                "contract-updated",
                serde_json::json!({ "contract_id": contract_id, "status": "accepted" }),
            )
            .await;
            hub.publish(
                &project_room(project_id),
                "escrow-funded",
                serde_json::json!({ "payment_id": payment_id, "amount": amount }),
            )
            .await;

            for (user_id, body) in [
                (
                    freelancer_id,
                    format!(
                        "Escrow of {} has been funded. You can start working",
                        format_paise_as_rupees(amount)
                    ),
                ),
                (
                    client_id,
                    format!(
                        "Your escrow payment of {} is held until you approve the work",
                        format_paise_as_rupees(amount)
                    ),
                ),
            ] {
                let notification = db_client
                    .store_notification(
                        user_id,
                        "escrow_funded".to_string(),
                        "Escrow funded".to_string(),
                        body,
                        Some(serde_json::json!({
                            "payment_id": payment_id,
                            "contract_id": contract_id,
                            "project_id": project_id,
                        })),
                    )
                    .await?;

                hub.publish(
                    &user_room(user_id),
                    "new-notification",
                    serde_json::to_value(&notification).unwrap_or_default(),
                )
                .await;
            }
        }

        DomainEvent::EscrowReleased {
            payment_id,
            project_id,
            freelancer_id,
            amount,
        } => {
            hub.publish(
                &project_room(project_id),
                "payment-completed",
                serde_json::json!({ "payment_id": payment_id }),
            )
            .await;

            let notification = db_client
                .store_notification(
                    freelancer_id,
                    "escrow_released".to_string(),
                    "Payment released".to_string(),
                    format!(
                        "The escrow payment of {} has been released to you",
                        format_paise_as_rupees(amount)
                    ),
                    Some(serde_json::json!({
                        "payment_id": payment_id,
                        "project_id": project_id,
                    })),
                )
                .await?;

            hub.publish(
                &user_room(freelancer_id),
                "new-notification",
                serde_json::to_value(&notification).unwrap_or_default(),
            )
            .await;
        }

        DomainEvent::PaymentCompleted {
            payment_id,
            project_id,
            client_id,
            freelancer_id,
            amount,
        } => {
            hub.publish(
                &project_room(project_id),
                "payment-completed",
                serde_json::json!({ "payment_id": payment_id }),
            )
            .await;

            for user_id in [client_id, freelancer_id] {
                let notification = db_client
                    .store_notification(
                        user_id,
                        "payment_completed".to_string(),
                        "Payment completed".to_string(),
                        format!(
                            "Payment of {} for the project has been completed",
                            format_paise_as_rupees(amount)
                        ),
                        Some(serde_json::json!({
                            "payment_id": payment_id,
                            "project_id": project_id,
                        })),
                    )
                    .await?;

                hub.publish(
                    &user_room(user_id),
                    "new-notification",
                    serde_json::to_value(&notification).unwrap_or_default(),
                )
                .await;
            }
        }

        DomainEvent::WorkStatusChanged {
            project_id,
            client_id,
            work_status,
        } => {
            hub.publish(
                &project_room(project_id),
                "work-status-updated",
                serde_json::json!({
                    "project_id": project_id,
                    "work_status": work_status,
                }),
            )
            .await;

            let notification = db_client
                .store_notification(
                    client_id,
                    "work_status_updated".to_string(),
                    "Work progress updated".to_string(),
                    format!("The freelancer moved the project to {}", work_status),
                    Some(serde_json::json!({ "project_id": project_id })),
                )
                .await?;

            hub.publish(
                &user_room(client_id),
                "new-notification",
                serde_json::to_value(&notification).unwrap_or_default(),
            )
            .await;
        }
    }

    Ok(())
}
