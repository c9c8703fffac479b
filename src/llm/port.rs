//! 生成端口：求解引擎唯一依赖的生成能力
//!
//! resolve_model（阶段 -> 模型）、invoke_text、invoke_structured、resolve_search_augmentation。
//! 引擎只持有 Arc<GenerationPort>，不关心具体后端。

use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::llm::{
    LlmClient, LlmError, SearchAugmentation, SearchRules, SearchSettings, Stage, StageModelMap,
    TextRequest,
};

/// 生成端口：LLM 客户端 + 阶段模型表 + 默认模型 + 搜索设置
#[derive(Clone)]
pub struct GenerationPort {
    client: Arc<dyn LlmClient>,
    stages: StageModelMap,
    default_model: String,
    /// None 表示未开启搜索增强
    search: Option<SearchSettings>,
    rules: SearchRules,
}

impl GenerationPort {
    pub fn new(
        client: Arc<dyn LlmClient>,
        stages: StageModelMap,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            stages,
            default_model: default_model.into(),
            search: None,
            rules: SearchRules::default(),
        }
    }

    /// 开启搜索能力协商
    pub fn with_search(mut self, settings: SearchSettings) -> Self {
        self.search = Some(settings);
        self
    }

    /// 替换规则表（测试或新增厂商）
    pub fn with_search_rules(mut self, rules: SearchRules) -> Self {
        self.rules = rules;
        self
    }

    /// 以新的默认模型派生端口（多智能体：agent_thinking 模型覆盖默认思考模型）
    pub fn with_default_model(&self, default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            ..self.clone()
        }
    }

    pub fn search_enabled(&self) -> bool {
        self.search.is_some()
    }

    pub fn resolve_model(&self, stage: Stage) -> String {
        self.stages.resolve(stage, &self.default_model).to_string()
    }

    /// 能力协商：未开启搜索时恒为空
    pub fn resolve_search_augmentation(&self, model: &str) -> SearchAugmentation {
        match &self.search {
            Some(settings) => self.rules.resolve(model, settings),
            None => SearchAugmentation::default(),
        }
    }

    /// 文本调用
    pub async fn invoke_text(&self, request: TextRequest) -> Result<String, LlmError> {
        debug!(model = %request.model, messages = request.messages.len(), "invoke_text");
        self.client.complete(&request).await
    }

    /// 对某阶段发起文本调用；search 为 true 时附带协商得到的搜索增强
    pub async fn invoke_stage(
        &self,
        stage: Stage,
        request: TextRequest,
        search: bool,
    ) -> Result<String, LlmError> {
        let model = self.resolve_model(stage);
        let mut request = TextRequest { model, ..request };
        if search {
            let aug = self.resolve_search_augmentation(&request.model);
            request = request
                .with_tools(aug.tools)
                .with_provider_options(aug.provider_options);
        }
        self.invoke_text(request).await
    }

    /// 结构化调用：Schema 由 T 生成，回复按 T 校验；不符合时报 StructuredDecode
    pub async fn invoke_structured<T>(&self, model: &str, prompt: &str) -> Result<T, LlmError>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let schema = serde_json::to_value(schema_for!(T))
            .map_err(|e| LlmError::StructuredDecode(e.to_string()))?;
        let value = self.client.complete_structured(model, &schema, prompt).await?;
        serde_json::from_value(value).map_err(|e| LlmError::StructuredDecode(e.to_string()))
    }

    /// 累计 token 使用（透传后端）
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.client.token_usage()
    }
}

impl std::fmt::Debug for GenerationPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationPort")
            .field("stages", &self.stages)
            .field("default_model", &self.default_model)
            .field("search", &self.search)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Pair {
        a: u32,
        b: String,
    }

    #[tokio::test]
    async fn test_invoke_stage_uses_stage_model_and_search() {
        let client = ScriptedLlmClient::new(|req| Ok(req.model.clone()));
        let port = GenerationPort::new(
            Arc::new(client.clone()),
            StageModelMap::new().with_stage(Stage::Initial, "gemini-2.5-pro"),
            "deepseek-reasoner",
        )
        .with_search(SearchSettings::default());

        let out = port
            .invoke_stage(Stage::Initial, TextRequest::default().with_prompt("p"), true)
            .await
            .unwrap();
        assert_eq!(out, "gemini-2.5-pro");
        assert!(client.calls()[0].tools.is_some());

        port.invoke_stage(Stage::Verification, TextRequest::default(), true)
            .await
            .unwrap();
        assert_eq!(client.calls()[1].model, "deepseek-reasoner");
        assert!(client.calls()[1].tools.is_none());
    }

    #[tokio::test]
    async fn test_search_disabled_yields_no_augmentation() {
        let port = GenerationPort::new(
            Arc::new(ScriptedLlmClient::new(|_| Ok(String::new()))),
            StageModelMap::new(),
            "gemini-2.5-pro",
        );
        assert!(port.resolve_search_augmentation("gemini-2.5-pro").is_empty());
    }

    #[tokio::test]
    async fn test_invoke_structured_validates_shape() {
        let ok = GenerationPort::new(
            Arc::new(ScriptedLlmClient::new(|_| Ok(r#"{"a": 1, "b": "x"}"#.into()))),
            StageModelMap::new(),
            "m",
        );
        let pair: Pair = ok.invoke_structured("m", "give").await.unwrap();
        assert_eq!(pair, Pair { a: 1, b: "x".into() });

        let bad = GenerationPort::new(
            Arc::new(ScriptedLlmClient::new(|_| Ok(r#"{"a": "nope"}"#.into()))),
            StageModelMap::new(),
            "m",
        );
        let err = bad.invoke_structured::<Pair>("m", "give").await.unwrap_err();
        assert!(matches!(err, LlmError::StructuredDecode(_)));
    }
}
