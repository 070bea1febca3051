use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat Store Args ---
    /// Chat document store type (redis, memory)
    #[arg(long, env = "STORE_TYPE", default_value = "redis")]
    pub store_type: String,

    /// Chat document store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "STORE_HOST", default_value = "redis://127.0.0.1:6379")]
    pub store_host: String,

    /// Prefix for every key the Redis chat store writes.
    #[arg(long, env = "STORE_PREFIX", default_value = "chatbot:")]
    pub store_prefix: String,

    /// Owner recorded on every new chat until authentication exists.
    #[arg(long, env = "DEFAULT_USER_ID", default_value = "user123")]
    pub default_user_id: String,

    // --- Model Provider Args ---
    /// Type of model provider (gemini, openai, openrouter)
    #[arg(long, env = "LLM_TYPE", default_value = "gemini")]
    pub llm_type: String,

    /// API Key for the model provider
    #[arg(long, env = "LLM_API_KEY", default_value = "")]
    pub llm_api_key: String,

    /// Base URL for the model provider API. Adapters pick their own default if unset.
    #[arg(long, env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// Model used for conversational replies.
    #[arg(long, env = "CHAT_MODEL", default_value = "gemini-2.0-flash-lite")]
    pub chat_model: String,

    /// Model used for image extraction, translation and chat naming.
    #[arg(long, env = "VISION_MODEL", default_value = "gemini-2.0-flash")]
    pub vision_model: String,

    /// Optional JSON file overriding the built-in prompt templates.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- Server Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8000")]
    pub server_addr: String,

    /// Public base URL used when building links to uploaded files.
    /// Defaults to http://{SERVER_ADDR}.
    #[arg(long, env = "PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Directory where uploaded images are written and served from.
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: String,

    /// Maximum accepted request body size in bytes (multipart uploads included).
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "10485760")]
    pub max_upload_bytes: usize,
}

impl Args {
    pub fn public_base_url(&self) -> String {
        match &self.public_url {
            Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("http://{}", self.server_addr),
        }
    }
}
