//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DEEPTHINK__*` 覆盖（双下划线表示嵌套，如 `DEEPTHINK__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::{SearchSettings, StageModelMap, DEEPSEEK_REASONER};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub thinking: ThinkingSection,
    #[serde(default)]
    pub ultra: UltraSection,
}

/// [llm] 段：后端选择、默认思考模型
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 默认思考模型（阶段未单独配置时使用）
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 存放 API Key 的环境变量名；未设置时按 provider 取 DEEPSEEK_API_KEY / OPENAI_API_KEY
    pub api_key_env: Option<String>,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    DEEPSEEK_REASONER.to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key_env: None,
        }
    }
}

/// [thinking] 段：单智能体迭代参数与阶段模型
#[derive(Debug, Clone, Deserialize)]
pub struct ThinkingSection {
    /// 验证/修正循环的硬上限
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// 连续通过多少次验证才接受
    #[serde(default = "default_required_successful_verifications")]
    pub required_successful_verifications: usize,
    /// 连续失败多少次放弃
    #[serde(default = "default_max_errors_before_give_up")]
    pub max_errors_before_give_up: usize,
    #[serde(default)]
    pub enable_web_search: bool,
    #[serde(default)]
    pub search_provider: SearchSettings,
    /// 阶段名 -> 模型标识，如 verification = "deepseek-chat"
    #[serde(default)]
    pub stage_models: StageModelMap,
}

fn default_max_iterations() -> usize {
    30
}

fn default_required_successful_verifications() -> usize {
    3
}

fn default_max_errors_before_give_up() -> usize {
    10
}

impl Default for ThinkingSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            required_successful_verifications: default_required_successful_verifications(),
            max_errors_before_give_up: default_max_errors_before_give_up(),
            enable_web_search: false,
            search_provider: SearchSettings::default(),
            stage_models: StageModelMap::default(),
        }
    }
}

/// [ultra] 段：多智能体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UltraSection {
    /// 最多派发的智能体数；未设置时使用规划出的全部
    pub num_agents: Option<usize>,
}

/// 从 config 目录加载配置，环境变量 DEEPTHINK__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DEEPTHINK__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DEEPTHINK")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
