//! 多智能体流水线集成测试：规划 -> 配置 -> 并发派发 -> 汇合 -> 综合

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deepthink::llm::{
    GenerationPort, LlmClient, LlmError, ScriptedLlmClient, SearchSettings, Stage, StageModelMap,
    TextRequest,
};
use deepthink::think::prompts::CHECK_VERDICT_PROMPT;
use deepthink::think::{AgentStatus, AgentUpdate};
use deepthink::{DeepThinkOptions, ThinkError, UltraThinkEngine, UltraThinkOptions};
use tokio::sync::mpsc;

const THREE_AGENTS: &str = r#"{"agents": [
    {"agentId": "alg", "approach": "algebra", "specificPrompt": "Use algebra."},
    {"agentId": "bad", "approach": "broken", "specificPrompt": "FAIL_AGENT"},
    {"agentId": "geo", "approach": "geometry", "specificPrompt": "Draw a picture."}
]}"#;

const CLEAN_AGENTS: &str = r#"{"agents": [
    {"agentId": "alg", "approach": "algebra", "specificPrompt": "Use algebra."},
    {"agentId": "geo", "approach": "geometry", "specificPrompt": "Draw a picture."},
    {"agentId": "num", "approach": "numeric", "specificPrompt": "Try small values."}
]}"#;

const AGENT_SOLUTION: &str = "Summary\n### Detailed Solution ###\nx = 2";

fn mentions(req: &TextRequest, needle: &str) -> bool {
    req.full_messages().iter().any(|m| m.content.contains(needle))
}

/// 各阶段使用不同模型，便于按模型计数与分派回复
fn scripted(agents_json: &'static str) -> ScriptedLlmClient {
    ScriptedLlmClient::new(move |req| match req.model.as_str() {
        "m-plan" => Ok("1. algebra\n2. broken\n3. geometry".to_string()),
        "m-config" => Ok(agents_json.to_string()),
        "m-synth" => Ok(format!(
            "synthesized from {} agents",
            req.last_user_content().matches("--- Agent").count()
        )),
        "m-judge" if req.last_user_content().starts_with(CHECK_VERDICT_PROMPT) => {
            Ok("yes".to_string())
        }
        "m-judge" => Ok("Everything checks out.".to_string()),
        "m-agent" if mentions(req, "FAIL_AGENT") => Err(LlmError::Api("503 overloaded".into())),
        "m-agent" | "gemini-2.0-flash" => Ok(AGENT_SOLUTION.to_string()),
        other => Err(LlmError::Api(format!("unexpected model {}", other))),
    })
}

fn stages(agent_model: &str) -> StageModelMap {
    StageModelMap::new()
        .with_stage(Stage::Planning, "m-plan")
        .with_stage(Stage::AgentConfig, "m-config")
        .with_stage(Stage::AgentThinking, agent_model)
        .with_stage(Stage::Verification, "m-judge")
        .with_stage(Stage::Synthesis, "m-synth")
}

fn port(client: &ScriptedLlmClient) -> Arc<GenerationPort> {
    Arc::new(GenerationPort::new(Arc::new(client.clone()), stages("m-agent"), "m-default"))
}

/// 智能体调用先睡一会儿，并记录同时在途的调用数峰值
struct SlowAgents {
    inner: ScriptedLlmClient,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl LlmClient for SlowAgents {
    async fn complete(&self, request: &TextRequest) -> Result<String, LlmError> {
        if request.model == "m-agent" {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        self.inner.complete(request).await
    }
}

fn options(num_agents: Option<usize>) -> UltraThinkOptions {
    UltraThinkOptions {
        num_agents,
        agent: DeepThinkOptions::default(),
    }
}

#[tokio::test]
async fn test_failed_agent_is_isolated() {
    let client = scripted(THREE_AGENTS);
    let engine = UltraThinkEngine::new(port(&client), options(None));
    let result = engine.run("Solve x + 2 = 4").await.unwrap();

    assert_eq!(result.total_agents, 3);
    assert_eq!(result.completed_agents, 2);
    assert_eq!(result.plan, "1. algebra\n2. broken\n3. geometry");

    let by_id: HashMap<_, _> = result
        .agent_results
        .iter()
        .map(|r| (r.agent_id.as_str(), r))
        .collect();
    assert_eq!(by_id["alg"].status, AgentStatus::Completed);
    assert_eq!(by_id["alg"].progress, 100);
    assert_eq!(by_id["alg"].verifications.as_ref().map(Vec::len), Some(3));
    assert_eq!(by_id["geo"].status, AgentStatus::Completed);
    assert_eq!(by_id["bad"].status, AgentStatus::Failed);
    assert!(by_id["bad"].error.as_deref().unwrap_or("").contains("503"));

    // 综合看到全部智能体（含失败的），只调用一次
    assert_eq!(result.synthesis, "synthesized from 3 agents");
    assert_eq!(result.final_solution, result.synthesis);
    assert_eq!(client.calls_for("m-synth"), 1);
    assert_eq!(client.calls_for("m-default"), 0);
}

#[tokio::test]
async fn test_num_agents_takes_first_configs_in_order() {
    let client = scripted(THREE_AGENTS);
    let engine = UltraThinkEngine::new(port(&client), options(Some(1)));
    let result = engine.run("P").await.unwrap();

    assert_eq!(result.total_agents, 1);
    assert_eq!(result.agent_results[0].agent_id, "alg");
    assert_eq!(result.completed_agents, 1);
    // 单智能体全部通过：初稿 + 改进，之后只有验证
    assert_eq!(client.calls_for("m-agent"), 2);
    assert_eq!(client.calls_for("m-judge"), 6);
}

#[tokio::test]
async fn test_updates_are_tagged_and_end_in_terminal_status() {
    let client = scripted(THREE_AGENTS);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = UltraThinkEngine::new(port(&client), options(None)).with_update_tx(tx);
    let result = engine.run("P").await.unwrap();
    drop(engine);

    let mut updates: Vec<AgentUpdate> = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }

    for agent in &result.agent_results {
        let last_status = updates
            .iter()
            .filter(|u| u.agent_id == agent.agent_id)
            .filter_map(|u| u.patch.status)
            .last();
        assert_eq!(last_status, Some(agent.status));
    }
    assert!(updates
        .iter()
        .filter(|u| u.agent_id == "alg")
        .any(|u| u.patch.status == Some(AgentStatus::Verifying)));
}

#[tokio::test]
async fn test_planning_failure_is_fatal() {
    let client = ScriptedLlmClient::new(|_| Err(LlmError::Http("connection refused".into())));
    let engine = UltraThinkEngine::new(port(&client), options(None));
    let err = engine.run("P").await.unwrap_err();
    assert!(matches!(err, ThinkError::Llm(LlmError::Http(_))));
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn test_empty_agent_list_is_an_error() {
    let client = scripted(r#"{"agents": []}"#);
    let engine = UltraThinkEngine::new(port(&client), options(None));
    assert_eq!(engine.run("P").await.unwrap_err(), ThinkError::NoAgents);
    assert_eq!(client.calls_for("m-agent"), 0);
    assert_eq!(client.calls_for("m-synth"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_agents_run_concurrently() {
    let slow = Arc::new(SlowAgents {
        inner: scripted(CLEAN_AGENTS),
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let port = Arc::new(GenerationPort::new(slow.clone(), stages("m-agent"), "m-default"));
    let result = UltraThinkEngine::new(port, options(None))
        .run("P")
        .await
        .unwrap();

    assert_eq!(result.total_agents, 3);
    assert_eq!(result.completed_agents, 3);
    assert_eq!(slow.peak.load(Ordering::SeqCst), result.total_agents);
}

#[tokio::test]
async fn test_search_reaches_agent_thinking_model_only() {
    let client = scripted(CLEAN_AGENTS);
    let port = GenerationPort::new(
        Arc::new(client.clone()),
        stages("gemini-2.0-flash"),
        "m-default",
    )
    .with_search(SearchSettings::default());
    let result = UltraThinkEngine::new(Arc::new(port), options(Some(1)))
        .run("P")
        .await
        .unwrap();
    assert_eq!(result.completed_agents, 1);

    let calls = client.calls();
    let agent_calls: Vec<_> = calls.iter().filter(|r| r.model == "gemini-2.0-flash").collect();
    assert_eq!(agent_calls.len(), 2);
    assert!(agent_calls.iter().all(|r| r.tools.is_some()));
    assert!(calls
        .iter()
        .filter(|r| r.model != "gemini-2.0-flash")
        .all(|r| r.tools.is_none() && r.provider_options.is_none()));
}
