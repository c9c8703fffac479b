//! 智能体配置解析：结构化优先，文本降级
//!
//! decode_agent_configs 对外只有一个契约：
//! 1. 结构化调用（Schema 校验）成功则直接使用
//! 2. 仅当结构化解码失败时，改用文本调用：去掉 ``` 代码块包裹，解析 JSON，
//!    接受裸数组或含数组字段的对象
//! 3. 两条路径都失败时返回带预览的 AgentConfigParse
//!
//! 生成调用本身失败（网络等）不降级，直接返回。

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::core::{preview, ThinkError};
use crate::llm::{GenerationPort, LlmError, Stage, TextRequest};
use crate::think::prompts::{AGENT_CONFIG_PROMPT, AGENT_CONFIG_TEXT_SUFFIX};
use crate::think::types::AgentConfig;

/// 结构化输出的顶层形状
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AgentConfigList {
    /// 每个思路一个智能体
    pub agents: Vec<AgentConfig>,
}

fn config_prompt(problem: &str, plan: &str) -> String {
    format!(
        "{}\n\n### Problem ###\n\n{}\n\n### Plan ###\n\n{}",
        AGENT_CONFIG_PROMPT, problem, plan
    )
}

/// 由计划生成智能体配置（按生成顺序），agent_id 保证唯一
pub async fn decode_agent_configs(
    port: &GenerationPort,
    problem: &str,
    plan: &str,
) -> Result<Vec<AgentConfig>, ThinkError> {
    let model = port.resolve_model(Stage::AgentConfig);
    let prompt = config_prompt(problem, plan);

    let configs = match port.invoke_structured::<AgentConfigList>(&model, &prompt).await {
        Ok(list) => list.agents,
        Err(LlmError::StructuredDecode(reason)) => {
            warn!(%reason, "structured agent config decode failed, falling back to text");
            let text = port
                .invoke_text(
                    TextRequest::new(model)
                        .with_prompt(format!("{}\n\n{}", prompt, AGENT_CONFIG_TEXT_SUFFIX)),
                )
                .await?;
            parse_agent_configs_text(&text)?
        }
        Err(e) => return Err(e.into()),
    };

    let configs = normalize_agent_ids(configs);
    info!(count = configs.len(), "agent configs decoded");
    Ok(configs)
}

/// 去掉 ```json ... ``` 包裹；没有代码块时原样返回（已 trim）
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let rest = &trimmed[start + 3..];
    // 跳过语言标记（```json）
    let body = match rest.find('\n') {
        Some(nl) if !rest[..nl].contains('{') && !rest[..nl].contains('[') => &rest[nl + 1..],
        _ => rest,
    };
    body.find("```").map(|end| &body[..end]).unwrap_or(body).trim()
}

/// 文本降级路径：代码块剥离 + JSON 解析；接受裸数组或对象中的数组字段（优先 agents）
pub fn parse_agent_configs_text(text: &str) -> Result<Vec<AgentConfig>, ThinkError> {
    let parse_err = |reason: String| ThinkError::AgentConfigParse {
        reason,
        preview: preview(text),
    };

    let json_str = strip_code_fence(text);
    let value: Value = serde_json::from_str(json_str).map_err(|e| parse_err(e.to_string()))?;

    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("agents") {
            Some(agents @ Value::Array(_)) => agents,
            _ => map
                .into_iter()
                .map(|(_, v)| v)
                .find(Value::is_array)
                .ok_or_else(|| parse_err("object holds no list field".to_string()))?,
        },
        _ => return Err(parse_err("expected a JSON list or object".to_string())),
    };

    serde_json::from_value(list).map_err(|e| parse_err(e.to_string()))
}

/// 空 id 改为 agent-N，重复 id 追加 -N，保证本次运行内唯一
pub fn normalize_agent_ids(configs: Vec<AgentConfig>) -> Vec<AgentConfig> {
    let mut seen = HashSet::new();
    configs
        .into_iter()
        .enumerate()
        .map(|(i, mut config)| {
            let base = match config.agent_id.trim() {
                "" => format!("agent-{}", i + 1),
                id => id.to_string(),
            };
            let mut id = base.clone();
            let mut n = i + 1;
            while seen.contains(&id) {
                id = format!("{}-{}", base, n);
                n += 1;
            }
            seen.insert(id.clone());
            config.agent_id = id;
            config
        })
        .collect()
}
