pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod models;
pub mod storage;
pub mod views;

use cli::Args;
use clock::{ Clock, SystemClock };
use config::CacheConfig;
use dispatch::OptimisticDispatcher;
use llm::{ LlmConfig, LlmType };
use log::info;
use std::error::Error;
use std::sync::Arc;
use uuid::Uuid;
use cache::ConversationCache;
use storage::StorageAdapter;
use views::{ ChatPanel, PanelHooks };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Store Type: {}", args.store_type);
    info!("Store Host: {}", args.store_host);
    info!("Store Key Prefix: {}", args.store_key_prefix);
    info!("Cache TTL (days): {}", args.cache_ttl_days);
    info!("Cache Debounce (ms): {}", args.cache_debounce_ms);
    info!("Cache Dwell (ms): {}", args.cache_dwell_ms);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Conversation: {}", args.conversation_id.as_deref().unwrap_or("none"));
    info!("-------------------------");

    let panel = build_panel(&args)?;
    console::run(panel, args.conversation_id.clone().map(Into::into)).await
}

/// Wires store, cache, answer client and dispatcher into a panel.
pub fn build_panel(args: &Args) -> Result<ChatPanel, Box<dyn Error + Send + Sync>> {
    let config = CacheConfig::from_args(args);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = storage::create_store(args)?;
    let adapter = Arc::new(StorageAdapter::new(store, clock.clone()).with_ttl(config.ttl));
    let cache = Arc::new(ConversationCache::new(adapter, config));

    let llm_type: LlmType = args.chat_llm_type.parse()?;
    let llm_config = LlmConfig {
        llm_type,
        api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
        model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
        system_prompt: args.chat_system_prompt.clone(),
    };
    let client = llm::new_client(&llm_config)?;
    info!(
        "Chat client configured: Type={}, Model={:?}, BaseURL={:?}",
        args.chat_llm_type,
        llm_config.model.as_deref().unwrap_or("adapter default"),
        llm_config.base_url.as_deref().unwrap_or("adapter default")
    );

    let user_id = args.user_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    let dispatcher = Arc::new(OptimisticDispatcher::new(cache, client, clock, Some(user_id)));
    Ok(ChatPanel::new(dispatcher, PanelHooks::default()))
}
