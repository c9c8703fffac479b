//! 求解数据模型：验证记录、迭代日志、单/多智能体终态结果

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 一次验证：创建后不可变；passed 只由 raw_verdict（yes/no 判定回复）决定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub timestamp: DateTime<Utc>,
    pub passed: bool,
    /// 未通过时为审阅日志中 Detailed Verification 之前的摘要部分；通过时为空
    pub bug_report: String,
    pub raw_verdict: String,
    /// 完整审阅日志
    pub review: String,
}

impl Verification {
    pub fn new(
        raw_verdict: impl Into<String>,
        review: impl Into<String>,
        bug_report: impl Into<String>,
    ) -> Self {
        let raw_verdict = raw_verdict.into();
        Self {
            timestamp: Utc::now(),
            passed: verdict_passed(&raw_verdict),
            bug_report: bug_report.into(),
            raw_verdict,
            review: review.into(),
        }
    }
}

/// 判定是否通过：大小写不敏感地包含 "yes"
///
/// 判定回复无法解析与明确回答 no 一样按未通过处理。
pub fn verdict_passed(raw_verdict: &str) -> bool {
    raw_verdict.to_lowercase().contains("yes")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStatus {
    Thinking,
    Verifying,
    Correcting,
    Completed,
    Failed,
}

/// 单轮循环日志（只追加）；index 从 0 连续递增
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    pub index: usize,
    pub solution: String,
    pub verification: Verification,
    pub status: IterationStatus,
}

/// 单智能体终态结果：循环结束时创建一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepThinkResult {
    /// 自我改进后的首个解答（不是最原始的初稿）
    pub initial_thought: String,
    pub iterations: Vec<Iteration>,
    pub verifications: Vec<Verification>,
    pub final_solution: String,
    pub total_iterations: usize,
    /// 结束时的连续通过次数
    pub successful_verifications: usize,
    pub succeeded: bool,
    pub failure_reason: Option<String>,
}

/// 智能体配置：由方案分解生成，运行期间只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// 本次运行内唯一
    pub agent_id: String,
    /// 思路标签
    pub approach: String,
    /// 追加给该智能体的专属指令
    pub specific_prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Thinking,
    Verifying,
    Completed,
    Failed,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Pending => "pending",
            AgentStatus::Thinking => "thinking",
            AgentStatus::Verifying => "verifying",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
        }
    }
}

/// 单个智能体的状态：仅由其所属任务写入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub agent_id: String,
    pub approach: String,
    pub specific_prompt: String,
    pub status: AgentStatus,
    /// 0..=100
    pub progress: u8,
    pub solution: Option<String>,
    pub verifications: Option<Vec<Verification>>,
    pub error: Option<String>,
}

impl AgentResult {
    pub fn pending(config: &AgentConfig) -> Self {
        Self {
            agent_id: config.agent_id.clone(),
            approach: config.approach.clone(),
            specific_prompt: config.specific_prompt.clone(),
            status: AgentStatus::Pending,
            progress: 0,
            solution: None,
            verifications: None,
            error: None,
        }
    }
}

/// 多智能体终态结果：全部智能体结束后创建一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UltraThinkResult {
    pub plan: String,
    pub agent_results: Vec<AgentResult>,
    pub synthesis: String,
    pub final_solution: String,
    pub total_agents: usize,
    /// 仅统计 status == completed
    pub completed_agents: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_passed_is_case_insensitive_substring() {
        assert!(verdict_passed("YES"));
        assert!(verdict_passed("Answer: yes, it is correct"));
        assert!(!verdict_passed("no"));
        assert!(!verdict_passed(""));
    }

    #[test]
    fn test_verification_passed_derives_from_verdict() {
        let v = Verification::new("Yes.", "looks fine", "");
        assert!(v.passed);
        let v = Verification::new("No, critical error", "full log", "step 3 is wrong");
        assert!(!v.passed);
        assert_eq!(v.bug_report, "step 3 is wrong");
    }

    #[test]
    fn test_agent_config_uses_camel_case_keys() {
        let cfg: AgentConfig = serde_json::from_str(
            r#"{"agentId": "a1", "approach": "algebra", "specificPrompt": "use algebra"}"#,
        )
        .unwrap();
        assert_eq!(cfg.agent_id, "a1");
        let pending = AgentResult::pending(&cfg);
        assert_eq!(pending.status, AgentStatus::Pending);
        assert_eq!(pending.progress, 0);
    }
}
