//! 求解运行错误
//!
//! 只有基础设施类失败会以 Err 返回；迭代耗尽、连续失败过多属于正常的 Failure 结果，不在这里。

use thiserror::Error;

use crate::llm::LlmError;

/// 预览截断长度（字符）
pub const PREVIEW_CHARS: usize = 200;

/// 一次运行中可能出现的错误（生成调用、智能体配置解析、配置等）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThinkError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// 结构化与文本两条解析路径都失败
    #[error("Failed to parse agent configs ({reason}); response preview: {preview}")]
    AgentConfigParse { reason: String, preview: String },

    #[error("Plan produced no agent configurations")]
    NoAgents,

    /// 智能体任务 panic（与普通失败一样按智能体隔离）
    #[error("Agent task panicked: {0}")]
    AgentPanicked(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// 截取前 PREVIEW_CHARS 个字符，超出时加省略号
pub fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", head)
    } else {
        head
    }
}
