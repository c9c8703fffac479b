//! 单智能体求解集成测试：通过配置装配端口后端到端运行

use std::sync::Arc;

use deepthink::config::AppConfig;
use deepthink::core::{build_port, create_llm_from_config};
use deepthink::llm::{LlmError, ScriptedLlmClient};
use deepthink::think::prompts::CHECK_VERDICT_PROMPT;
use deepthink::think::ProgressEvent;
use deepthink::{DeepThinkEngine, DeepThinkOptions};
use tokio::sync::mpsc;

fn mock_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.llm.provider = "mock".into();
    cfg.llm.model = "mock-model".into();
    cfg
}

#[tokio::test]
async fn test_mock_backend_is_accepted_after_k_verifications() {
    let cfg = mock_config();
    let port = Arc::new(build_port(&cfg, create_llm_from_config(&cfg)));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = DeepThinkEngine::new(port, DeepThinkOptions::from(&cfg.thinking)).with_event_tx(tx);

    let result = engine.run("What is 1 + 1?").await.unwrap();
    drop(engine);

    assert!(result.succeeded);
    assert!(result.failure_reason.is_none());
    assert_eq!(result.successful_verifications, 3);
    assert_eq!(result.verifications.len(), 3);
    assert_eq!(result.final_solution, result.initial_thought);

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    assert!(matches!(events.first(), Some(ProgressEvent::Init { .. })));
    assert!(matches!(events.last(), Some(ProgressEvent::Success { .. })));
}

#[tokio::test]
async fn test_rejecting_verifier_gives_up_with_last_solution() {
    let mut cfg = mock_config();
    cfg.thinking.max_errors_before_give_up = 2;
    let client = ScriptedLlmClient::new(|req| {
        let last = req.last_user_content();
        if last.starts_with(CHECK_VERDICT_PROMPT) {
            Ok("no".to_string())
        } else if last.contains("bug report") {
            Ok("corrected attempt".to_string())
        } else {
            Ok("Critical error in step 1.\nDetailed Verification\n...".to_string())
        }
    });
    let port = Arc::new(build_port(&cfg, Arc::new(client)));
    let engine = DeepThinkEngine::new(port, DeepThinkOptions::from(&cfg.thinking));

    let result = engine.run("P").await.unwrap();
    assert!(!result.succeeded);
    assert_eq!(result.failure_reason.as_deref(), Some("too many errors"));
    assert_eq!(result.final_solution, "corrected attempt");
    assert_eq!(result.verifications.len(), 2);
    assert!(result
        .verifications
        .iter()
        .all(|v| v.bug_report == "Critical error in step 1."));
}

#[tokio::test]
async fn test_generation_error_aborts_run() {
    let cfg = mock_config();
    let client = ScriptedLlmClient::new(|_| Err(LlmError::EmptyResponse));
    let port = Arc::new(build_port(&cfg, Arc::new(client)));
    let engine = DeepThinkEngine::new(port, DeepThinkOptions::default());
    assert!(engine.run("P").await.is_err());
}
