//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、阶段路由、搜索能力协商、生成端口

pub mod deepseek;
pub mod message;
pub mod mock;
pub mod openai;
pub mod port;
pub mod router;
pub mod search;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT, DEEPSEEK_REASONER};
pub use message::{Message, Role};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use port::GenerationPort;
pub use router::{Stage, StageModelMap};
pub use search::{Augmentation, SearchAugmentation, SearchRules, SearchSettings};
pub use traits::{LlmClient, LlmError, TextRequest};
