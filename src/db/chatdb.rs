// db/chatdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodels::{Conversation, Message, MessageType};

const CONVERSATION_COLUMNS: &str = r#"
    id,
    application_id,
    project_id,
    client_id,
    freelancer_id,
    created_at
"#;

const MESSAGE_COLUMNS: &str = r#"
    id,
    conversation_id,
    sender_id,
    message_type,
    content,
    is_read,
    created_at
"#;

#[async_trait]
pub trait ChatExt {
    /// Idempotent on application_id: a second accept returns the existing
    /// conversation instead of creating another one.
    async fn create_or_get_conversation(
        &self,
        application_id: Uuid,
        project_id: Uuid,
        client_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<Conversation, Error>;

    async fn get_conversation_by_id(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, Error>;

    async fn get_user_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, Error>;

    async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        message_type: MessageType,
        content: String,
    ) -> Result<Message, Error>;

    async fn get_conversation_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, Error>;

    async fn mark_messages_as_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<(), Error>;

    async fn count_unread_messages(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<i64, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn create_or_get_conversation(
        &self,
        application_id: Uuid,
        project_id: Uuid,
        client_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<Conversation, Error> {
        if let Some(existing) = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE application_id = $1"
        ))
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(existing);
        }

        // Unique index on application_id backs this up against races;
        // ON CONFLICT falls back to the existing row.
        sqlx::query_as::<_, Conversation>(&format!(
            r#"
            INSERT INTO conversations (application_id, project_id, client_id, freelancer_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (application_id) DO UPDATE SET application_id = EXCLUDED.application_id
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(application_id)
        .bind(project_id)
        .bind(client_id)
        .bind(freelancer_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_conversation_by_id(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS}
            FROM conversations
            WHERE client_id = $1 OR freelancer_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        message_type: MessageType,
        content: String,
    ) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (conversation_id, sender_id, message_type, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(conversation_id)
        .bind(sender_id)
        .bind(message_type)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_conversation_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_messages_as_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE messages
            SET is_read = true
            WHERE conversation_id = $1 AND sender_id != $2 AND is_read = false
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_unread_messages(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<i64, Error> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = $1 AND sender_id != $2 AND is_read = false
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
