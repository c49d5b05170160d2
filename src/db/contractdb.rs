// db/contractdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::contractmodel::{AcceptanceMethod, Contract, ContractStatus};

pub const CONTRACT_COLUMNS: &str = r#"
    id,
    project_id,
    application_id,
    conversation_id,
    client_id,
    freelancer_id,
    details,
    status,
    acceptance_method,
    escrow_funded,
    escrow_payment_id,
    escrow_funded_at,
    created_at,
    updated_at
"#;

#[async_trait]
pub trait ContractExt {
    async fn create_contract(
        &self,
        project_id: Uuid,
        application_id: Uuid,
        conversation_id: Uuid,
        client_id: Uuid,
        freelancer_id: Uuid,
        details: serde_json::Value,
    ) -> Result<Contract, Error>;

    async fn get_contract_by_id(&self, contract_id: Uuid) -> Result<Option<Contract>, Error>;

    async fn get_contracts_for_user(&self, user_id: Uuid) -> Result<Vec<Contract>, Error>;

    /// The single acceptance transition for both the direct and the
    /// escrow-funded path. Flips the contract to accepted and the project to
    /// in_progress with the freelancer assigned, in one transaction. Returns
    /// None when the contract is already accepted (idempotent no-op).
    async fn accept_contract(
        &self,
        contract_id: Uuid,
        method: AcceptanceMethod,
        escrow_payment_id: Option<Uuid>,
    ) -> Result<Option<Contract>, Error>;

    async fn reject_contract(&self, contract_id: Uuid) -> Result<Contract, Error>;
}

#[async_trait]
impl ContractExt for DBClient {
    async fn create_contract(
        &self,
        project_id: Uuid,
        application_id: Uuid,
        conversation_id: Uuid,
        client_id: Uuid,
        freelancer_id: Uuid,
        details: serde_json::Value,
    ) -> Result<Contract, Error> {
        sqlx::query_as::<_, Contract>(&format!(
            r#"
            INSERT INTO contracts
                (project_id, application_id, conversation_id, client_id, freelancer_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(application_id)
        .bind(conversation_id)
        .bind(client_id)
        .bind(freelancer_id)
        .bind(details)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_contract_by_id(&self, contract_id: Uuid) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"
        ))
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_contracts_for_user(&self, user_id: Uuid) -> Result<Vec<Contract>, Error> {
        sqlx::query_as::<_, Contract>(&format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM contracts
            WHERE client_id = $1 OR freelancer_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn accept_contract(
        &self,
        contract_id: Uuid,
        method: AcceptanceMethod,
        escrow_payment_id: Option<Uuid>,
    ) -> Result<Option<Contract>, Error> {
        let mut tx = self.pool.begin().await?;

        let contract = sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1 FOR UPDATE"
        ))
        .bind(contract_id)
        .fetch_one(&mut *tx)
        .await?;

        if contract.status == ContractStatus::Accepted {
            tx.rollback().await?;
            return Ok(None);
        }

        let escrow_funded = method == AcceptanceMethod::EscrowFunded;

        let updated = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET status = 'accepted',
                acceptance_method = $2,
                escrow_funded = $3,
                escrow_payment_id = COALESCE($4, escrow_payment_id),
                escrow_funded_at = CASE WHEN $3 THEN NOW() ELSE escrow_funded_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(contract_id)
        .bind(method)
        .bind(escrow_funded)
        .bind(escrow_payment_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE projects
            SET status = 'in_progress',
                accepted_application_id = $2,
                assigned_freelancer_id = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(updated.project_id)
        .bind(updated.application_id)
        .bind(updated.freelancer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn reject_contract(&self, contract_id: Uuid) -> Result<Contract, Error> {
        sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET status = 'rejected', updated_at = NOW()
            WHERE id = $1
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(contract_id)
        .fetch_one(&self.pool)
        .await
    }
}
