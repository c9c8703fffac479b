//! 求解层：单智能体迭代（Deep Think）与多智能体流水线（Ultra Think）
//!
//! - deep_think: 初次探索 -> 自我改进 -> 验证/修正循环，连续通过 K 次才接受
//! - verifier: 审阅 + yes/no 判定
//! - agent_config: 计划 -> 智能体配置（结构化优先，文本降级）
//! - ultra_think: 规划、并发派发、汇合、综合
//! - events: 过程事件与单智能体增量更新

pub mod agent_config;
pub mod deep_think;
pub mod events;
pub mod prompts;
pub mod types;
pub mod ultra_think;
pub mod verifier;

pub use agent_config::{decode_agent_configs, AgentConfigList};
pub use deep_think::{DeepThinkEngine, DeepThinkOptions};
pub use events::{
    AgentResultPatch, AgentUpdate, AgentUpdateSender, ProgressEvent, ProgressSender,
};
pub use types::{
    AgentConfig, AgentResult, AgentStatus, DeepThinkResult, Iteration, IterationStatus,
    UltraThinkResult, Verification,
};
pub use ultra_think::{UltraThinkEngine, UltraThinkOptions};
pub use verifier::Verifier;
