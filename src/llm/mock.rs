//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! - MockLlmClient：回显最后一条 User 消息；判定类问题恒答 yes，可离线跑通完整求解流程
//! - ScriptedLlmClient：由闭包决定每次调用的返回值，并记录全部请求，便于按阶段模型计数

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, TextRequest};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &TextRequest) -> Result<String, LlmError> {
        let last_user = request.last_user_content();
        if last_user.is_empty() {
            return Ok("(no input)".to_string());
        }
        // yes/no 判定问题：离线模式下一律通过
        if last_user.contains(r#""yes" or "no""#) {
            return Ok("yes".to_string());
        }
        // 结构化请求：给出两个固定智能体配置
        if request
            .system
            .as_deref()
            .is_some_and(|s| s.contains("JSON Schema"))
        {
            return Ok(r#"{"agents": [
                {"agentId": "agent-1", "approach": "direct", "specificPrompt": "Solve it directly."},
                {"agentId": "agent-2", "approach": "by cases", "specificPrompt": "Split into cases."}
            ]}"#
            .to_string());
        }
        Ok(format!("Echo from Mock ({}): {}", request.model, last_user))
    }
}

type Handler = dyn Fn(&TextRequest) -> Result<String, LlmError> + Send + Sync;

/// 脚本化客户端：handler 按请求（模型标识、消息）给出回复或错误；calls 记录全部请求
#[derive(Clone)]
pub struct ScriptedLlmClient {
    handler: Arc<Handler>,
    calls: Arc<Mutex<Vec<TextRequest>>>,
}

impl ScriptedLlmClient {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&TextRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 已记录的全部请求（按调用顺序）
    pub fn calls(&self) -> Vec<TextRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// 指定模型标识被调用的次数
    pub fn calls_for(&self, model: &str) -> usize {
        self.calls().iter().filter(|r| r.model == model).count()
    }
}

impl std::fmt::Debug for ScriptedLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedLlmClient")
            .field("calls", &self.calls().len())
            .finish()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &TextRequest) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        (self.handler)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_echoes_last_user_message() {
        let out = MockLlmClient
            .complete(&TextRequest::new("m").with_prompt("hello"))
            .await
            .unwrap();
        assert!(out.contains("hello"));
    }

    #[tokio::test]
    async fn test_scripted_records_calls() {
        let client = ScriptedLlmClient::new(|req| Ok(format!("{}!", req.model)));
        client.complete(&TextRequest::new("a")).await.unwrap();
        client.complete(&TextRequest::new("b")).await.unwrap();
        client.complete(&TextRequest::new("a")).await.unwrap();
        assert_eq!(client.calls_for("a"), 2);
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_default_structured_rejects_prose() {
        let client = ScriptedLlmClient::new(|_| Ok("sure, here you go".to_string()));
        let err = client
            .complete_structured("m", &serde_json::json!({}), "give json")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::StructuredDecode(_)));
    }
}
