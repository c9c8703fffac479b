//! 搜索增强能力协商
//!
//! 按模型标识匹配规则表决定能否附带搜索：
//! - tool 规则：模型自带搜索工具（如 Gemini 的 google_search）
//! - option 规则：网关类模型（vendor/model 形式）通过厂商扩展字段开启 web 插件
//!
//! 两类规则相互独立，每类最多命中一条；provider 不是 "model" 时不做任何增强。
//! 新增厂商只需往表里追加规则。

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 能力协商只对这个 provider 生效
pub const MODEL_SEARCH_PROVIDER: &str = "model";

/// 搜索设置：provider 与结果条数提示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_provider() -> String {
    MODEL_SEARCH_PROVIDER.to_string()
}

fn default_max_results() -> usize {
    5
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            max_results: default_max_results(),
        }
    }
}

/// 命中规则后附加的增强内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Augmentation {
    /// tools: [{"google_search": {}}]
    GoogleSearchTool,
    /// provider_options: {"plugins": [{"id": "web", "max_results": N}]}
    WebPluginOption,
}

impl Augmentation {
    fn payload(&self, max_results: usize) -> Value {
        match self {
            Augmentation::GoogleSearchTool => json!({ "google_search": {} }),
            Augmentation::WebPluginOption => json!({
                "plugins": [{ "id": "web", "max_results": max_results }]
            }),
        }
    }
}

/// 一条规则：模型标识正则 -> 增强
#[derive(Debug, Clone)]
pub struct AugmentationRule {
    pub pattern: Regex,
    pub augmentation: Augmentation,
}

/// 协商结果：(tools?, provider_options?)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchAugmentation {
    pub tools: Option<Vec<Value>>,
    pub provider_options: Option<Value>,
}

impl SearchAugmentation {
    pub fn is_empty(&self) -> bool {
        self.tools.is_none() && self.provider_options.is_none()
    }
}

/// 规则表
#[derive(Debug, Clone)]
pub struct SearchRules {
    tool_rules: Vec<AugmentationRule>,
    option_rules: Vec<AugmentationRule>,
}

impl SearchRules {
    /// 空表：任何模型都不增强
    pub fn empty() -> Self {
        Self {
            tool_rules: Vec::new(),
            option_rules: Vec::new(),
        }
    }

    pub fn with_tool_rule(mut self, pattern: Regex, augmentation: Augmentation) -> Self {
        self.tool_rules.push(AugmentationRule {
            pattern,
            augmentation,
        });
        self
    }

    pub fn with_option_rule(mut self, pattern: Regex, augmentation: Augmentation) -> Self {
        self.option_rules.push(AugmentationRule {
            pattern,
            augmentation,
        });
        self
    }

    /// 能力协商：tool 与 option 分别取第一条命中的规则
    pub fn resolve(&self, model: &str, settings: &SearchSettings) -> SearchAugmentation {
        if settings.provider != MODEL_SEARCH_PROVIDER {
            return SearchAugmentation::default();
        }
        let first_hit = |rules: &[AugmentationRule]| {
            rules
                .iter()
                .find(|r| r.pattern.is_match(model))
                .map(|r| r.augmentation.payload(settings.max_results))
        };
        SearchAugmentation {
            tools: first_hit(&self.tool_rules).map(|tool| vec![tool]),
            provider_options: first_hit(&self.option_rules),
        }
    }
}

impl Default for SearchRules {
    fn default() -> Self {
        // 内置规则均为常量正则
        Self::empty()
            .with_tool_rule(
                Regex::new(r"^gemini-").expect("built-in pattern"),
                Augmentation::GoogleSearchTool,
            )
            .with_option_rule(
                Regex::new(r"^[\w.-]+/[\w.:-]+$").expect("built-in pattern"),
                Augmentation::WebPluginOption,
            )
    }
}
