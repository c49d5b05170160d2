// dtos/chatdtos.rs
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::chatmodels::{Conversation, Message};

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageDto {
    #[validate(length(min = 1, max = 5000, message = "Message must be between 1 and 5000 characters"))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationWithLastMessage {
    pub conversation: Conversation,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}
