// db/paymentdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::{EscrowStatus, Payment, PaymentStatus};

pub const PAYMENT_COLUMNS: &str = r#"
    id,
    order_id,
    payment_id,
    signature,
    amount,
    currency,
    status,
    escrow_status,
    project_id,
    client_id,
    freelancer_id,
    contract_id,
    verified,
    description,
    webhook_data,
    released_at,
    created_at,
    updated_at
"#;

/// The project close doubles as the settled-once marker for direct payments.
const CLOSE_PROJECT_ONCE: &str =
    "UPDATE projects SET status = 'closed', updated_at = NOW() WHERE id = $1 AND status <> 'closed'";

#[async_trait]
pub trait PaymentExt {
    async fn create_payment(
        &self,
        order_id: String,
        amount: i64,
        currency: String,
        escrow_status: EscrowStatus,
        project_id: Uuid,
        client_id: Uuid,
        freelancer_id: Uuid,
        contract_id: Option<Uuid>,
        description: Option<String>,
    ) -> Result<Payment, Error>;

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    async fn get_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, Error>;

    async fn get_payments_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>, Error>;

    async fn get_payments_by_project(&self, project_id: Uuid) -> Result<Vec<Payment>, Error>;

    async fn mark_payment_failed(
        &self,
        order_id: &str,
        description: String,
    ) -> Result<Payment, Error>;

    /// Writes the authoritative gateway state back after a verify call.
    async fn record_verification(
        &self,
        order_id: &str,
        gateway_payment_id: String,
        signature: String,
        status: PaymentStatus,
        verified: bool,
    ) -> Result<Payment, Error>;

    /// Records a webhook delivery: status plus raw payload for audit. A
    /// captured event marks the payment verified, since the webhook body was
    /// authenticated by its own signature.
    async fn record_webhook_event(
        &self,
        order_id: &str,
        status: PaymentStatus,
        gateway_payment_id: Option<String>,
        webhook_data: serde_json::Value,
        mark_verified: bool,
    ) -> Result<Payment, Error>;

    /// Closes out a legacy non-escrow payment: project closed, client spend
    /// and freelancer earnings counters bumped, all in one transaction. The
    /// project close is conditional inside the transaction, so a verify call
    /// and a webhook racing on the same order settle exactly once; the loser
    /// gets None and bumps nothing.
    async fn complete_direct_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    /// Releases held escrow: payment released, project closed, both user
    /// counters updated, all in one transaction. Guards are re-checked under
    /// the row lock; a payment that is no longer releasable returns None.
    async fn release_escrow(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn create_payment(
        &self,
        order_id: String,
        amount: i64,
        currency: String,
        escrow_status: EscrowStatus,
        project_id: Uuid,
        client_id: Uuid,
        freelancer_id: Uuid,
        contract_id: Option<Uuid>,
        description: Option<String>,
    ) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments
                (order_id, amount, currency, escrow_status, project_id,
                 client_id, freelancer_id, contract_id, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(amount)
        .bind(currency)
        .bind(escrow_status)
        .bind(project_id)
        .bind(client_id)
        .bind(freelancer_id)
        .bind(contract_id)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payments_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE client_id = $1 OR freelancer_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_payments_by_project(&self, project_id: Uuid) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE project_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_payment_failed(
        &self,
        order_id: &str,
        description: String,
    ) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = 'failed', description = $2, updated_at = NOW()
            WHERE order_id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    async fn record_verification(
        &self,
        order_id: &str,
        gateway_payment_id: String,
        signature: String,
        status: PaymentStatus,
        verified: bool,
    ) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET payment_id = $2,
                signature = $3,
                status = $4,
                verified = $5,
                updated_at = NOW()
            WHERE order_id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(gateway_payment_id)
        .bind(signature)
        .bind(status)
        .bind(verified)
        .fetch_one(&self.pool)
        .await
    }

    async fn record_webhook_event(
        &self,
        order_id: &str,
        status: PaymentStatus,
        gateway_payment_id: Option<String>,
        webhook_data: serde_json::Value,
        mark_verified: bool,
    ) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $2,
                payment_id = COALESCE($3, payment_id),
                webhook_data = $4,
                verified = verified OR $5,
                updated_at = NOW()
            WHERE order_id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(status)
        .bind(gateway_payment_id)
        .bind(webhook_data)
        .bind(mark_verified)
        .fetch_one(&self.pool)
        .await
    }

    async fn complete_direct_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        let mut tx = self.pool.begin().await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE"
        ))
        .bind(payment_id)
        .fetch_one(&mut *tx)
        .await?;

        // Re-checked under the lock: zero rows means another settlement
        // already closed the project, and the counters must not move again.
        let closed = sqlx::query(CLOSE_PROJECT_ONCE)
            .bind(payment.project_id)
            .execute(&mut *tx)
            .await?;

        if closed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE users
            SET total_spent = total_spent + $2,
                completed_projects = completed_projects + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(payment.client_id)
        .bind(payment.amount)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET total_earned = total_earned + $2,
                completed_projects = completed_projects + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(payment.freelancer_id)
        .bind(payment.amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(payment))
    }

    async fn release_escrow(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        let mut tx = self.pool.begin().await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE"
        ))
        .bind(payment_id)
        .fetch_one(&mut *tx)
        .await?;

        // Re-check under the lock; the handler has already returned the
        // caller-facing error for each violated precondition.
        if payment.escrow_status != EscrowStatus::Held
            || payment.status != PaymentStatus::Captured
            || !payment.verified
        {
            tx.rollback().await?;
            return Ok(None);
        }

        let released = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET escrow_status = 'released', released_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE projects SET status = 'closed', updated_at = NOW() WHERE id = $1")
            .bind(released.project_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET total_spent = total_spent + $2,
                completed_projects = completed_projects + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(released.client_id)
        .bind(released.amount)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET total_earned = total_earned + $2,
                completed_projects = completed_projects + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(released.freelancer_id)
        .bind(released.amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(released))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_completion_closes_project_at_most_once() {
        // The close statement must filter on the current status; an
        // unconditional close would let two racing settlements both bump
        // the user counters.
        assert!(CLOSE_PROJECT_ONCE.contains("status <> 'closed'"));
        assert!(CLOSE_PROJECT_ONCE.contains("SET status = 'closed'"));
    }
}
