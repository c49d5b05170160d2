// handler/chat.rs
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
    db::chatdb::ChatExt,
    dtos::{
        chatdtos::{ConversationWithLastMessage, SendMessageDto},
        common::{ApiResponse, PaginationQueryDto, Response},
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::chatmodels::{Conversation, MessageType},
    service::socket::conversation_room,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/conversations", get(get_conversations))
        .route(
            "/conversations/:conversation_id/messages",
            get(get_messages).post(send_message),
        )
        .route("/conversations/:conversation_id/read", put(mark_read))
}

pub async fn get_conversations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let conversations = app_state
        .db_client
        .get_user_conversations(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let mut response = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let last_message = app_state
            .db_client
            .get_conversation_messages(conversation.id, 1, 0)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?
            .into_iter()
            .next();

        let unread_count = app_state
            .db_client
            .count_unread_messages(conversation.id, auth.user.id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        response.push(ConversationWithLastMessage {
            conversation,
            last_message,
            unread_count,
        });
    }

    Ok(Json(ApiResponse::success(
        "Conversations retrieved successfully",
        response,
    )))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(conversation_id): Path<Uuid>,
    Query(pagination): Query<PaginationQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    pagination
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let _ = participant_conversation(&app_state, conversation_id, auth.user.id).await?;

    let (limit, offset) = pagination.limit_offset();

    let messages = app_state
        .db_client
        .get_conversation_messages(conversation_id, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Messages retrieved successfully",
        messages,
    )))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let _ = participant_conversation(&app_state, conversation_id, auth.user.id).await?;

    let message = app_state
        .db_client
        .send_message(conversation_id, auth.user.id, MessageType::Text, body.content)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state
        .socket_hub
        .publish(
            &conversation_room(conversation_id),
            "new-message",
            serde_json::to_value(&message).unwrap_or_default(),
        )
        .await;

    Ok(Json(ApiResponse::success("Message sent", message)))
}

pub async fn mark_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let _ = participant_conversation(&app_state, conversation_id, auth.user.id).await?;

    app_state
        .db_client
        .mark_messages_as_read(conversation_id, auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(Response {
        status: "success",
        message: "Messages marked as read".to_string(),
    }))
}

async fn participant_conversation(
    app_state: &Arc<AppState>,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<Conversation, HttpError> {
    let conversation = app_state
        .db_client
        .get_conversation_by_id(conversation_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Conversation not found"))?;

    if !conversation.is_participant(user_id) {
        return Err(HttpError::forbidden(
            "You are not a participant in this conversation",
        ));
    }

    Ok(conversation)
}
