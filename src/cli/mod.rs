use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Conversation Store Args ---
    /// Backing store for cached conversations (memory, file, redis)
    #[arg(long, env = "STORE_TYPE", default_value = "file")]
    pub store_type: String,

    /// Store location: a directory for `file`, a URL for `redis` (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "STORE_HOST", default_value = ".followup-chat")]
    pub store_host: String,

    /// Prefix for conversation keys.
    #[arg(long, env = "STORE_KEY_PREFIX", default_value = "conv:")]
    pub store_key_prefix: String,

    // --- Caching Args ---
    /// Days a saved conversation stays valid.
    #[arg(long, env = "CACHE_TTL_DAYS", default_value = "7")]
    pub cache_ttl_days: u64,

    /// Quiet period in milliseconds before a changed conversation is written.
    #[arg(long, env = "CACHE_DEBOUNCE_MS", default_value = "500")]
    pub cache_debounce_ms: u64,

    /// Minimum time in milliseconds the loading state is shown after switching conversations.
    #[arg(long, env = "CACHE_DWELL_MS", default_value = "300")]
    pub cache_dwell_ms: u64,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider answering follow-up questions (ollama, openai, deepseek, xai, groq)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "ollama")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-4o, llama3)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// System prompt sent ahead of every follow-up conversation.
    #[arg(long, env = "CHAT_SYSTEM_PROMPT")]
    pub chat_system_prompt: Option<String>,

    // --- Session Args ---
    /// Conversation to open on startup. Without one, nothing is persisted until `/switch`.
    #[arg(long, env = "CONVERSATION_ID")]
    pub conversation_id: Option<String>,

    /// User id stamped on questions. A random one is generated if not set.
    #[arg(long, env = "USER_ID")]
    pub user_id: Option<String>,
}
