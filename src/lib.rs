pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;
pub mod services;

use cli::Args;
use config::prompt::load_prompts;
use history::initialize_chat_store;
use llm::chat::new_client as new_chat_client;
use llm::{ LlmConfig, LlmType };
use log::info;
use server::{ AppState, Server };
use services::chat::ChatService;
use services::extractor::Extractor;
use services::messages::MessageService;
use services::namer::ChatNamer;
use services::uploads::UploadStore;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Public URL: {}", args.public_base_url());
    info!("Chat Store Type: {}", args.store_type);
    info!("Chat Store Host: {}", args.store_host);
    info!("LLM Type: {}", args.llm_type);
    info!("Chat Model: {}", args.chat_model);
    info!("Vision Model: {}", args.vision_model);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("Upload Dir: {}", args.upload_dir);
    info!("-------------------------");

    let state = build_state(&args)?;
    let server = Server::new(args.server_addr.clone(), state, args.max_upload_bytes);
    server.run().await?;

    Ok(())
}

/// Builds every collaborator from configuration and wires them into the shared state.
pub fn build_state(args: &Args) -> Result<Arc<AppState>, Box<dyn Error + Send + Sync>> {
    let llm_type: LlmType = args.llm_type.parse()?;
    let api_key = Some(args.llm_api_key.clone()).filter(|k| !k.is_empty());
    let chat_config = LlmConfig {
        llm_type,
        api_key,
        completion_model: Some(args.chat_model.clone()),
        base_url: args.llm_base_url.clone(),
    };
    let vision_config = LlmConfig {
        completion_model: Some(args.vision_model.clone()),
        ..chat_config.clone()
    };
    let chat_client = new_chat_client(&chat_config)?;
    let vision_client = new_chat_client(&vision_config)?;

    let prompts = load_prompts(args.prompts_path.as_deref())?;
    let store = initialize_chat_store(args)?;
    let uploads = UploadStore::new(&args.upload_dir, &args.public_base_url())?;

    let namer = ChatNamer::new(vision_client.clone(), prompts.clone());
    Ok(
        Arc::new(AppState {
            chats: ChatService::new(store.clone(), namer, args.default_user_id.clone()),
            messages: MessageService::new(store, chat_client, prompts.clone()),
            extractor: Extractor::new(vision_client, prompts),
            uploads,
        })
    )
}
