//! 阶段模型路由
//!
//! 求解流水线的每个阶段（initial / verification / synthesis ...）可以使用不同模型：
//! - 配置了该阶段且非空：用配置的模型标识
//! - 否则：回退到本次运行的默认思考模型

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 流水线阶段（固定枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// 初次探索
    Initial,
    /// 自我审阅改进
    Improvement,
    /// 验证（审阅 + yes/no 判定）
    Verification,
    /// 根据 bug report 修正
    Correction,
    /// 多智能体：方案规划
    Planning,
    /// 多智能体：生成各智能体配置
    AgentConfig,
    /// 多智能体：各智能体的默认思考模型
    AgentThinking,
    /// 多智能体：综合
    Synthesis,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Initial,
        Stage::Improvement,
        Stage::Verification,
        Stage::Correction,
        Stage::Planning,
        Stage::AgentConfig,
        Stage::AgentThinking,
        Stage::Synthesis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Initial => "initial",
            Stage::Improvement => "improvement",
            Stage::Verification => "verification",
            Stage::Correction => "correction",
            Stage::Planning => "planning",
            Stage::AgentConfig => "agent_config",
            Stage::AgentThinking => "agent_thinking",
            Stage::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阶段 -> 模型标识；运行期间只读
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageModelMap {
    models: HashMap<Stage, String>,
}

impl StageModelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置某阶段的模型
    pub fn with_stage(mut self, stage: Stage, model: impl Into<String>) -> Self {
        self.models.insert(stage, model.into());
        self
    }

    pub fn get(&self, stage: Stage) -> Option<&str> {
        self.models.get(&stage).map(String::as_str)
    }

    /// 纯查找：有且非空则用配置值，否则回退 default_model
    pub fn resolve<'a>(&'a self, stage: Stage, default_model: &'a str) -> &'a str {
        match self.get(stage) {
            Some(model) if !model.trim().is_empty() => model,
            _ => default_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_configured_stage() {
        let map = StageModelMap::new().with_stage(Stage::Verification, "judge");
        assert_eq!(map.resolve(Stage::Verification, "default"), "judge");
        assert_eq!(map.resolve(Stage::Initial, "default"), "default");
    }

    #[test]
    fn test_resolve_ignores_blank_entry() {
        let map = StageModelMap::new().with_stage(Stage::Synthesis, "  ");
        assert_eq!(map.resolve(Stage::Synthesis, "default"), "default");
    }

    #[test]
    fn test_stage_names_round_trip_through_serde() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }
}
