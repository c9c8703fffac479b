//! 核心层：错误类型与组件装配

pub mod builder;
pub mod error;

pub use builder::{build_port, create_llm_from_config, validate};
pub use error::{preview, ThinkError};
