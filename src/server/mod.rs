pub mod api;
pub mod extractor;

use axum::{
    extract::DefaultBodyLimit,
    http::{ header, HeaderValue },
    routing::{ get, patch, post },
    Json,
    Router,
};
use log::{ error, info };
use serde::Serialize;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeader;

use crate::services::chat::ChatService;
use crate::services::extractor::Extractor;
use crate::services::messages::MessageService;
use crate::services::uploads::{ UploadStore, UPLOAD_ROUTE };

pub struct AppState {
    pub chats: ChatService,
    pub messages: MessageService,
    pub extractor: Extractor,
    pub uploads: UploadStore,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self { status: "success", data: Some(data), message: None })
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Json<Self> {
        Json(Self { status: "success", data: None, message: Some(message.to_string()) })
    }
}

pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/chat", post(api::create_chat_handler))
        .route("/chats", get(api::list_chats_handler))
        .route("/chats/{id}", get(api::get_chat_handler).delete(api::delete_chat_handler))
        .route("/chats/{id}/rename", patch(api::rename_chat_handler))
        .route("/chats/{id}/generate-name", post(api::generate_name_handler))
        .route("/messages/send", post(api::send_message_handler))
        .route("/messages/resend", post(api::resend_message_handler).patch(api::resend_message_handler))
        .route("/extractor/extract", post(extractor::extract_handler))
        .route("/extractor/translate", post(extractor::translate_handler))
        .route("/extractor/upload", post(extractor::upload_handler));

    let uploads = SetResponseHeader::overriding(
        ServeDir::new(state.uploads.dir()),
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff")
    );

    Router::new()
        .route("/", get(api::root_handler))
        .nest("/api", api)
        .nest_service(UPLOAD_ROUTE, uploads)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

pub struct Server {
    addr: String,
    state: Arc<AppState>,
    max_body_bytes: usize,
}

impl Server {
    pub fn new(addr: String, state: Arc<AppState>, max_body_bytes: usize) -> Self {
        Self { addr, state, max_body_bytes }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;
        let app = router(self.state.clone(), self.max_body_bytes);

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            e
        })?;
        info!("HTTP server listening on: http://{}", addr);

        axum::serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}
