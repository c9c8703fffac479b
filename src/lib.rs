//! DeepThink - Rust 迭代求解智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、客户端与生成端口装配
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、阶段路由、搜索增强、生成端口
//! - **observability**: 日志初始化
//! - **think**: 单智能体迭代求解与多智能体流水线

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod think;

pub use crate::core::ThinkError;
pub use think::{DeepThinkEngine, DeepThinkOptions, UltraThinkEngine, UltraThinkOptions};
