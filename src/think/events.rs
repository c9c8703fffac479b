//! 求解过程事件：用于流式展示初次探索、验证、修正与终态
//!
//! 事件只用于观察，引擎自身从不读取；每次状态转换发送一条，不缓冲、不重放。

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::think::types::{AgentResult, AgentStatus, Verification};

/// 单条过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// 开始求解
    Init { problem: String },
    /// 正在调用 LLM（phase: initial_exploration / self_improvement / verifying）；修正走 Correction
    Thinking { iteration: usize, phase: String },
    /// 产生了新的候选解答
    Solution { solution: String, iteration: usize },
    /// 一次验证完成
    Verification { passed: bool, iteration: usize },
    /// 开始根据 bug report 修正
    Correction { iteration: usize },
    /// 连续通过验证达到阈值
    Success { solution: String, iterations: usize },
    /// 放弃（连续失败过多或迭代耗尽）
    Failure { reason: String },
    /// 多智能体流水线的阶段说明
    Progress { message: String },
}

/// 事件发送端
pub type ProgressSender = UnboundedSender<ProgressEvent>;

/// 有接收端就发，接收端已关闭时静默丢弃
pub(crate) fn send_event(tx: &Option<ProgressSender>, ev: ProgressEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}

/// AgentResult 的增量更新：None 表示该字段未变化
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResultPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifications: Option<Vec<Verification>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResultPatch {
    pub fn status(status: AgentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 把增量写入所属智能体的结果
    pub fn apply_to(&self, result: &mut AgentResult) {
        if let Some(status) = self.status {
            result.status = status;
        }
        if let Some(progress) = self.progress {
            result.progress = progress;
        }
        if let Some(solution) = &self.solution {
            result.solution = Some(solution.clone());
        }
        if let Some(verifications) = &self.verifications {
            result.verifications = Some(verifications.clone());
        }
        if let Some(error) = &self.error {
            result.error = Some(error.clone());
        }
    }
}

/// 按 agent_id 投递的单智能体更新
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentUpdate {
    pub agent_id: String,
    pub patch: AgentResultPatch,
}

pub type AgentUpdateSender = UnboundedSender<AgentUpdate>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::think::types::AgentConfig;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(ProgressEvent::Verification {
            passed: true,
            iteration: 2,
        })
        .unwrap();
        assert_eq!(json["type"], "verification");
        assert_eq!(json["passed"], true);
        assert_eq!(json["iteration"], 2);
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let mut result = AgentResult::pending(&AgentConfig {
            agent_id: "a".into(),
            approach: "x".into(),
            specific_prompt: "y".into(),
        });
        AgentResultPatch::status(AgentStatus::Thinking)
            .with_progress(30)
            .apply_to(&mut result);
        assert_eq!(result.status, AgentStatus::Thinking);
        assert_eq!(result.progress, 30);
        assert!(result.solution.is_none());
        assert!(AgentResultPatch::default().is_empty());
    }
}
