use axum::{
    extract::{ Path, State },
    Json,
};
use serde::Serialize;
use serde_json::{ json, Value };
use std::sync::Arc;

use super::{ ApiResponse, AppState };
use crate::error::AppError;
use crate::models::chat::{ Chat, CreateChatRequest, RenameChatRequest, SendMessageRequest };

#[derive(Serialize)]
pub struct ReplyPayload {
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatNamePayload {
    chat_name: String,
}

pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "Welcome to Chatbot API" }))
}

pub async fn create_chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateChatRequest>,
) -> Result<Json<ApiResponse<Chat>>, AppError> {
    let chat = state.chats.create(req.product_information, req.name).await?;
    Ok(ApiResponse::data(chat))
}

pub async fn list_chats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Chat>>>, AppError> {
    Ok(ApiResponse::data(state.chats.list().await?))
}

pub async fn get_chat_handler(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<Chat>>, AppError> {
    Ok(ApiResponse::data(state.chats.get(&chat_id).await?))
}

pub async fn rename_chat_handler(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(req): Json<RenameChatRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let name = req.name.unwrap_or_default();
    state.chats.rename_once(&chat_id, &name).await?;
    Ok(ApiResponse::message("Chat renamed successfully"))
}

pub async fn delete_chat_handler(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.chats.delete(&chat_id).await?;
    Ok(ApiResponse::message("Chat deleted successfully"))
}

pub async fn generate_name_handler(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<ChatNamePayload>>, AppError> {
    let chat_name = state.chats.generate_name(&chat_id).await?;
    Ok(ApiResponse::data(ChatNamePayload { chat_name }))
}

pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<ReplyPayload>>, AppError> {
    let content = state.messages.send(&req.chat_id, &req.content).await?;
    Ok(ApiResponse::data(ReplyPayload { content }))
}

pub async fn resend_message_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<ReplyPayload>>, AppError> {
    let content = state.messages.resend(&req.chat_id, &req.content).await?;
    Ok(ApiResponse::data(ReplyPayload { content }))
}
