//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：complete（文本）、complete_structured（结构化 JSON）。
//! 模型标识随请求传入，同一客户端可服务多个流水线阶段。

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::llm::Message;

/// 生成调用可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Empty response from model")]
    EmptyResponse,

    /// 结构化输出不符合 Schema（或根本不是 JSON）
    #[error("Structured decode error: {0}")]
    StructuredDecode(String),
}

/// 一次文本生成请求：模型标识 + 可选 system + 消息序列 + 可选搜索增强
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<Message>,
    /// 模型内置搜索工具（由能力协商给出）
    pub tools: Option<Vec<Value>>,
    /// 厂商扩展字段，原样合并进请求体顶层
    pub provider_options: Option<Value>,
}

impl TextRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// 追加一条 user 消息
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.messages.push(Message::user(prompt));
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn with_tools(mut self, tools: Option<Vec<Value>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_provider_options(mut self, options: Option<Value>) -> Self {
        self.provider_options = options;
        self
    }

    /// system（若有）在前，其余消息按序，供后端直接转换为 API 格式
    pub fn full_messages(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = &self.system {
            out.push(Message::system(system.clone()));
        }
        out.extend(self.messages.iter().cloned());
        out
    }

    /// 最后一条 user 消息内容（Mock 与日志用）
    pub fn last_user_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::llm::Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// 结构化请求附带的格式约束：Schema 注入 system，要求只输出 JSON
fn structured_system_prompt(schema: &Value) -> String {
    format!(
        "Respond with a single JSON value that validates against this JSON Schema. \
         Output only the JSON, no prose and no code fences.\n\nSchema:\n{}",
        serde_json::to_string_pretty(schema).unwrap_or_default()
    )
}

/// LLM 客户端 trait：文本完成与结构化完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 文本完成：阻塞至远端返回或失败
    async fn complete(&self, request: &TextRequest) -> Result<String, LlmError>;

    /// 结构化完成：返回解析后的 JSON 值
    ///
    /// 默认实现把 Schema 注入 system prompt 并严格解析整段回复；
    /// 非 JSON 回复直接报 StructuredDecode，不做宽松提取（宽松提取属于调用方的降级路径）。
    async fn complete_structured(
        &self,
        model: &str,
        schema: &Value,
        prompt: &str,
    ) -> Result<Value, LlmError> {
        let request = TextRequest::new(model)
            .with_system(structured_system_prompt(schema))
            .with_prompt(prompt);
        let text = self.complete(&request).await?;
        serde_json::from_str(text.trim()).map_err(|e| LlmError::StructuredDecode(e.to_string()))
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
