//! 多智能体求解流水线（Ultra Think）
//!
//! 规划 -> 生成智能体配置 -> 选取前 N 个 -> 并发运行 N 个 DeepThinkEngine -> 全部结束后综合。
//!
//! 每个智能体独占自己的 AgentResult：过程事件在该智能体任务内翻译成增量并写入，
//! 再经 update_tx 按 agent_id 转发给调用方。单个智能体出错只记为 failed，不影响其他智能体；
//! 汇合点等待全部结束，没有提前取消与超时。

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::core::ThinkError;
use crate::llm::{GenerationPort, Stage, TextRequest};
use crate::think::agent_config::decode_agent_configs;
use crate::think::deep_think::{DeepThinkEngine, DeepThinkOptions, PHASE_VERIFYING};
use crate::think::events::{
    send_event, AgentResultPatch, AgentUpdate, AgentUpdateSender, ProgressEvent, ProgressSender,
};
use crate::think::prompts::{NO_SOLUTION_PLACEHOLDER, PLANNING_PROMPT, SYNTHESIS_PROMPT};
use crate::think::types::{AgentConfig, AgentResult, AgentStatus, UltraThinkResult};

/// 运行中进度上限；100 只在完成时给出
const MAX_RUNNING_PROGRESS: u8 = 90;

/// 多智能体运行参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UltraThinkOptions {
    /// 最多派发的智能体数；None 或 0 表示使用全部
    pub num_agents: Option<usize>,
    /// 每个智能体的单智能体参数
    pub agent: DeepThinkOptions,
}

impl From<&AppConfig> for UltraThinkOptions {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            num_agents: cfg.ultra.num_agents,
            agent: DeepThinkOptions::from(&cfg.thinking),
        }
    }
}

/// 多智能体引擎：持有生成端口、参数、过程事件通道与单智能体更新通道
pub struct UltraThinkEngine {
    port: Arc<GenerationPort>,
    options: UltraThinkOptions,
    event_tx: Option<ProgressSender>,
    update_tx: Option<AgentUpdateSender>,
}

/// 按生成顺序取前 N 个
pub fn select_agents(configs: Vec<AgentConfig>, num_agents: Option<usize>) -> Vec<AgentConfig> {
    match num_agents {
        Some(n) if n > 0 => configs.into_iter().take(n).collect(),
        _ => configs,
    }
}

/// 运行中的粗粒度进度：按迭代数线性增长并封顶
fn iteration_progress(iteration: usize) -> u8 {
    ((iteration + 1) * 10).min(MAX_RUNNING_PROGRESS as usize) as u8
}

/// 单智能体过程事件 -> AgentResult 增量；无关事件返回 None
fn patch_for_event(ev: &ProgressEvent) -> Option<AgentResultPatch> {
    match ev {
        ProgressEvent::Init { .. } => Some(AgentResultPatch::status(AgentStatus::Thinking).with_progress(5)),
        ProgressEvent::Thinking { iteration, phase } if phase == PHASE_VERIFYING => Some(
            AgentResultPatch::status(AgentStatus::Verifying).with_progress(iteration_progress(*iteration)),
        ),
        ProgressEvent::Thinking { iteration, .. } | ProgressEvent::Correction { iteration } => Some(
            AgentResultPatch::status(AgentStatus::Thinking).with_progress(iteration_progress(*iteration)),
        ),
        ProgressEvent::Solution { solution, .. } => Some(AgentResultPatch {
            solution: Some(solution.clone()),
            ..Default::default()
        }),
        _ => None,
    }
}

/// 写入本智能体结果并转发增量
fn relay(update_tx: &Option<AgentUpdateSender>, result: &mut AgentResult, patch: AgentResultPatch) {
    if patch.is_empty() {
        return;
    }
    patch.apply_to(result);
    if let Some(tx) = update_tx {
        let _ = tx.send(AgentUpdate {
            agent_id: result.agent_id.clone(),
            patch,
        });
    }
}

/// 运行单个智能体；错误在此处收敛为 failed，不向上传播
async fn run_agent(
    port: Arc<GenerationPort>,
    config: AgentConfig,
    problem: String,
    options: DeepThinkOptions,
    update_tx: Option<AgentUpdateSender>,
) -> AgentResult {
    let mut result = AgentResult::pending(&config);
    relay(&update_tx, &mut result, AgentResultPatch::status(AgentStatus::Thinking));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = DeepThinkEngine::new(port, options.with_other_prompt(config.specific_prompt.clone()))
        .with_event_tx(tx);

    // 引擎随 run 结束被释放，事件通道随之关闭，翻译循环退出
    let run = async move { engine.run(&problem).await };
    let translate = async {
        while let Some(ev) = rx.recv().await {
            if let Some(patch) = patch_for_event(&ev) {
                relay(&update_tx, &mut result, patch);
            }
        }
    };
    let (outcome, ()) = tokio::join!(run, translate);

    let patch = match outcome {
        Ok(deep) => {
            info!(agent = %config.agent_id, succeeded = deep.succeeded, "agent finished");
            AgentResultPatch {
                status: Some(AgentStatus::Completed),
                progress: Some(100),
                solution: Some(deep.final_solution),
                verifications: Some(deep.verifications),
                error: None,
            }
        }
        Err(e) => {
            warn!(agent = %config.agent_id, error = %e, "agent failed");
            failed_patch(e.to_string())
        }
    };
    relay(&update_tx, &mut result, patch);
    result
}

fn failed_patch(error: String) -> AgentResultPatch {
    AgentResultPatch {
        status: Some(AgentStatus::Failed),
        error: Some(error),
        ..Default::default()
    }
}

/// 综合阶段的 prompt：题目、计划与每个智能体的思路、状态、错误、解答
fn synthesis_prompt(problem: &str, plan: &str, results: &[AgentResult]) -> String {
    let mut prompt = format!(
        "{}\n\n### Problem ###\n\n{}\n\n### Plan ###\n\n{}\n\n### Agent Results ###\n",
        SYNTHESIS_PROMPT, problem, plan
    );
    for r in results {
        prompt.push_str(&format!(
            "\n--- Agent {} ---\nApproach: {}\nStatus: {}\n",
            r.agent_id,
            r.approach,
            r.status.as_str()
        ));
        if let Some(error) = &r.error {
            prompt.push_str(&format!("Error: {}\n", error));
        }
        prompt.push_str(&format!(
            "Solution:\n{}\n",
            r.solution.as_deref().unwrap_or(NO_SOLUTION_PLACEHOLDER)
        ));
    }
    prompt
}

impl UltraThinkEngine {
    pub fn new(port: Arc<GenerationPort>, options: UltraThinkOptions) -> Self {
        Self {
            port,
            options,
            event_tx: None,
            update_tx: None,
        }
    }

    /// 设置流水线过程事件通道
    pub fn with_event_tx(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 设置单智能体更新通道
    pub fn with_update_tx(mut self, tx: AgentUpdateSender) -> Self {
        self.update_tx = Some(tx);
        self
    }

    fn progress(&self, message: impl Into<String>) {
        send_event(
            &self.event_tx,
            ProgressEvent::Progress {
                message: message.into(),
            },
        );
    }

    /// 并发运行全部智能体并等待结束；任务 panic 同样记为该智能体 failed
    async fn dispatch(&self, problem: &str, configs: &[AgentConfig]) -> Vec<AgentResult> {
        let agent_model = self.port.resolve_model(Stage::AgentThinking);
        let agent_port = Arc::new(self.port.with_default_model(agent_model));

        let handles: Vec<_> = configs
            .iter()
            .map(|config| {
                tokio::spawn(run_agent(
                    agent_port.clone(),
                    config.clone(),
                    problem.to_string(),
                    self.options.agent.clone(),
                    self.update_tx.clone(),
                ))
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(configs)
            .map(|(joined, config)| {
                joined.unwrap_or_else(|e| {
                    warn!(agent = %config.agent_id, error = %e, "agent task aborted");
                    let mut result = AgentResult::pending(config);
                    let error = ThinkError::AgentPanicked(e.to_string()).to_string();
                    relay(&self.update_tx, &mut result, failed_patch(error));
                    result
                })
            })
            .collect()
    }

    /// 执行完整流水线；规划、配置解析、综合失败以 Err 返回，单个智能体失败不会
    pub async fn run(&self, problem: &str) -> Result<UltraThinkResult, ThinkError> {
        send_event(
            &self.event_tx,
            ProgressEvent::Init {
                problem: problem.to_string(),
            },
        );

        self.progress("Generating plan");
        let plan = self
            .port
            .invoke_stage(
                Stage::Planning,
                TextRequest::default().with_prompt(format!("{}\n\n{}", PLANNING_PROMPT, problem)),
                false,
            )
            .await?;

        self.progress("Deriving agent configurations");
        let configs = decode_agent_configs(&self.port, problem, &plan).await?;
        if configs.is_empty() {
            return Err(ThinkError::NoAgents);
        }
        let selected = select_agents(configs, self.options.num_agents);
        let total_agents = selected.len();

        info!(total_agents, "dispatching agents");
        self.progress(format!("Running {} agents", total_agents));
        let agent_results = self.dispatch(problem, &selected).await;
        let completed_agents = agent_results
            .iter()
            .filter(|r| r.status == AgentStatus::Completed)
            .count();
        info!(completed_agents, total_agents, "all agents finished");

        self.progress(format!(
            "Synthesizing results from {}/{} completed agents",
            completed_agents, total_agents
        ));
        let synthesis = self
            .port
            .invoke_stage(
                Stage::Synthesis,
                TextRequest::default().with_prompt(synthesis_prompt(problem, &plan, &agent_results)),
                false,
            )
            .await?;
        self.progress("Synthesis complete");

        Ok(UltraThinkResult {
            plan,
            agent_results,
            final_solution: synthesis.clone(),
            synthesis,
            total_agents,
            completed_agents,
        })
    }
}
