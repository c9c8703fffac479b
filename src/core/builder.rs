//! 组件装配：由 AppConfig 构建 LLM 客户端与生成端口
//!
//! CLI 与测试共用同一套装配逻辑，引擎只拿到 Arc<GenerationPort>。

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AppConfig, LlmSection};
use crate::core::ThinkError;
use crate::llm::{create_deepseek_client, GenerationPort, LlmClient, MockLlmClient, OpenAiClient};

/// 按 provider 查找 API Key：显式 api_key_env 优先，否则 DEEPSEEK_API_KEY / OPENAI_API_KEY
fn resolve_api_key(llm: &LlmSection, provider: &str) -> Option<String> {
    if let Some(var) = llm.api_key_env.as_deref() {
        return std::env::var(var).ok();
    }
    match provider {
        "deepseek" => std::env::var("DEEPSEEK_API_KEY")
            .ok()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
        _ => std::env::var("OPENAI_API_KEY").ok(),
    }
}

/// 根据配置创建 LLM 客户端；provider 为 mock、未知或缺少 Key 时退回 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        info!("Using Mock LLM");
        return Arc::new(MockLlmClient);
    }

    let Some(api_key) = resolve_api_key(&cfg.llm, &provider) else {
        warn!(%provider, "No API key set, using Mock LLM");
        return Arc::new(MockLlmClient);
    };

    match provider.as_str() {
        "deepseek" => {
            info!(model = %cfg.llm.model, "Using DeepSeek LLM");
            Arc::new(create_deepseek_client(cfg.llm.base_url.as_deref(), Some(&api_key)))
        }
        "openai" => {
            info!(model = %cfg.llm.model, "Using OpenAI-compatible LLM");
            Arc::new(OpenAiClient::new(cfg.llm.base_url.as_deref(), Some(&api_key)))
        }
        other => {
            warn!(provider = %other, "Unknown provider, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    }
}

/// 检查迭代参数：阈值与上限都必须为正
pub fn validate(cfg: &AppConfig) -> Result<(), ThinkError> {
    let t = &cfg.thinking;
    if t.max_iterations == 0 {
        return Err(ThinkError::Config("thinking.max_iterations must be > 0".into()));
    }
    if t.required_successful_verifications == 0 {
        return Err(ThinkError::Config(
            "thinking.required_successful_verifications must be > 0".into(),
        ));
    }
    if t.max_errors_before_give_up == 0 {
        return Err(ThinkError::Config(
            "thinking.max_errors_before_give_up must be > 0".into(),
        ));
    }
    if cfg.llm.model.trim().is_empty() {
        return Err(ThinkError::Config("llm.model must not be empty".into()));
    }
    Ok(())
}

/// 组装生成端口：阶段模型表 + 默认模型 + 可选搜索增强
pub fn build_port(cfg: &AppConfig, client: Arc<dyn LlmClient>) -> GenerationPort {
    let port = GenerationPort::new(
        client,
        cfg.thinking.stage_models.clone(),
        cfg.llm.model.clone(),
    );
    if cfg.thinking.enable_web_search {
        port.with_search(cfg.thinking.search_provider.clone())
    } else {
        port
    }
}
