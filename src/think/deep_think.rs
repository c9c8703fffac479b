//! 单智能体求解主循环（Deep Think）
//!
//! 初次探索 -> 自我改进 -> 验证 -> { 未通过则修正 / 通过则累计 } -> 再验证 ...
//!
//! 置信度放大：同一解答必须连续 required_successful_verifications 次独立验证通过才被接受，
//! 任何一次失败都把连续计数清零；连续失败 max_errors_before_give_up 次放弃，
//! 循环最多 max_iterations 轮。两种放弃都是正常返回的 Failure 结果，不是 Err。
//!
//! 每个引擎实例同一时刻最多一个在途生成调用；可选 event_tx 按因果顺序推送 ProgressEvent。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ThinkingSection;
use crate::core::ThinkError;
use crate::llm::{GenerationPort, Message, Stage, TextRequest};
use crate::think::events::{send_event, ProgressEvent, ProgressSender};
use crate::think::prompts::{
    initial_prompt, CORRECTION_PROMPT, SELF_IMPROVEMENT_PROMPT, SOLVER_SYSTEM_PROMPT,
};
use crate::think::types::{DeepThinkResult, Iteration, IterationStatus, Verification};
use crate::think::verifier::Verifier;

pub const REASON_TOO_MANY_ERRORS: &str = "too many errors";
pub const REASON_MAX_ITERATIONS: &str = "max iterations reached";

pub const PHASE_INITIAL: &str = "initial_exploration";
pub const PHASE_IMPROVEMENT: &str = "self_improvement";
pub const PHASE_VERIFYING: &str = "verifying";

/// 单次运行参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepThinkOptions {
    pub max_iterations: usize,
    pub required_successful_verifications: usize,
    pub max_errors_before_give_up: usize,
    /// 背景知识，拼进初次探索的 prompt
    pub knowledge_context: Option<String>,
    /// 额外指令（多智能体场景下为各自的 specific_prompt）
    pub other_prompts: Vec<String>,
}

impl Default for DeepThinkOptions {
    fn default() -> Self {
        Self::from(&ThinkingSection::default())
    }
}

impl From<&ThinkingSection> for DeepThinkOptions {
    fn from(section: &ThinkingSection) -> Self {
        Self {
            max_iterations: section.max_iterations,
            required_successful_verifications: section.required_successful_verifications,
            max_errors_before_give_up: section.max_errors_before_give_up,
            knowledge_context: None,
            other_prompts: Vec::new(),
        }
    }
}

impl DeepThinkOptions {
    pub fn with_knowledge(mut self, knowledge: impl Into<String>) -> Self {
        self.knowledge_context = Some(knowledge.into());
        self
    }

    pub fn with_other_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.other_prompts.push(prompt.into());
        self
    }
}

/// 单智能体引擎：持有生成端口、Verifier、参数与可选事件通道
pub struct DeepThinkEngine {
    port: Arc<GenerationPort>,
    verifier: Verifier,
    options: DeepThinkOptions,
    event_tx: Option<ProgressSender>,
}

/// 循环内的可变状态：当前候选解答、验证与两个计数器
struct LoopState {
    solution: String,
    verification: Verification,
    correct_count: usize,
    error_count: usize,
    iterations: Vec<Iteration>,
    verifications: Vec<Verification>,
}

impl DeepThinkEngine {
    pub fn new(port: Arc<GenerationPort>, options: DeepThinkOptions) -> Self {
        Self {
            verifier: Verifier::new(port.clone()),
            port,
            options,
            event_tx: None,
        }
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, ev: ProgressEvent) {
        send_event(&self.event_tx, ev);
    }

    /// 求解器对话前缀：题目（含背景与额外指令）+ 上一版解答
    fn replay(&self, problem: &str, solution: &str) -> Vec<Message> {
        vec![
            Message::user(initial_prompt(
                problem,
                self.options.knowledge_context.as_deref(),
                &self.options.other_prompts,
            )),
            Message::assistant(solution.to_string()),
        ]
    }

    /// 初次探索：初稿 -> 自我改进；返回改进后的解答
    async fn initial_exploration(&self, problem: &str) -> Result<String, ThinkError> {
        self.emit(ProgressEvent::Thinking {
            iteration: 0,
            phase: PHASE_INITIAL.to_string(),
        });
        let first = self
            .port
            .invoke_stage(
                Stage::Initial,
                TextRequest::default()
                    .with_system(SOLVER_SYSTEM_PROMPT)
                    .with_prompt(initial_prompt(
                        problem,
                        self.options.knowledge_context.as_deref(),
                        &self.options.other_prompts,
                    )),
                true,
            )
            .await?;

        self.emit(ProgressEvent::Thinking {
            iteration: 0,
            phase: PHASE_IMPROVEMENT.to_string(),
        });
        let improved = self
            .port
            .invoke_stage(
                Stage::Improvement,
                TextRequest::default()
                    .with_system(SOLVER_SYSTEM_PROMPT)
                    .with_messages(self.replay(problem, &first))
                    .with_prompt(SELF_IMPROVEMENT_PROMPT),
                true,
            )
            .await?;

        self.emit(ProgressEvent::Solution {
            solution: improved.clone(),
            iteration: 0,
        });
        Ok(improved)
    }

    /// 验证并推送 Verification 事件
    async fn verify(&self, problem: &str, solution: &str, iteration: usize) -> Result<Verification, ThinkError> {
        self.emit(ProgressEvent::Thinking {
            iteration,
            phase: PHASE_VERIFYING.to_string(),
        });
        let verification = self.verifier.verify(problem, solution).await?;
        info!(iteration, passed = verification.passed, "verification verdict");
        self.emit(ProgressEvent::Verification {
            passed: verification.passed,
            iteration,
        });
        Ok(verification)
    }

    /// 根据 bug report 修正当前解答
    async fn correct(&self, problem: &str, solution: &str, bug_report: &str, iteration: usize) -> Result<String, ThinkError> {
        self.emit(ProgressEvent::Correction { iteration });
        let corrected = self
            .port
            .invoke_stage(
                Stage::Correction,
                TextRequest::default()
                    .with_system(SOLVER_SYSTEM_PROMPT)
                    .with_messages(self.replay(problem, solution))
                    .with_prompt(format!("{}\n\n{}", CORRECTION_PROMPT, bug_report)),
                true,
            )
            .await?;
        self.emit(ProgressEvent::Solution {
            solution: corrected.clone(),
            iteration,
        });
        Ok(corrected)
    }

    /// 执行完整求解；生成调用失败以 Err 返回，放弃以 Ok(Failure 结果) 返回
    pub async fn run(&self, problem: &str) -> Result<DeepThinkResult, ThinkError> {
        info!(
            max_iterations = self.options.max_iterations,
            required = self.options.required_successful_verifications,
            "deep think started"
        );
        self.emit(ProgressEvent::Init {
            problem: problem.to_string(),
        });

        let initial_thought = self.initial_exploration(problem).await?;
        let verification = self.verify(problem, &initial_thought, 0).await?;

        let mut state = LoopState {
            solution: initial_thought.clone(),
            verifications: vec![verification.clone()],
            verification,
            correct_count: 0,
            error_count: 0,
            iterations: Vec::new(),
        };

        for index in 0..self.options.max_iterations {
            if state.verification.passed {
                state.correct_count += 1;
                state.error_count = 0;
                state.iterations.push(Iteration {
                    index,
                    solution: state.solution.clone(),
                    verification: state.verification.clone(),
                    status: IterationStatus::Completed,
                });
            } else {
                state.correct_count = 0;
                state.error_count += 1;
                let giving_up = state.error_count >= self.options.max_errors_before_give_up;
                state.iterations.push(Iteration {
                    index,
                    solution: state.solution.clone(),
                    verification: state.verification.clone(),
                    status: if giving_up {
                        IterationStatus::Failed
                    } else {
                        IterationStatus::Correcting
                    },
                });
                if giving_up {
                    warn!(errors = state.error_count, "giving up after consecutive failed verifications");
                    return Ok(self.finish(initial_thought, state, Some(REASON_TOO_MANY_ERRORS)));
                }
                debug!(index, "correcting solution");
                state.solution = self
                    .correct(problem, &state.solution, &state.verification.bug_report, index)
                    .await?;
            }

            if state.correct_count >= self.options.required_successful_verifications {
                let iterations = state.iterations.len();
                info!(iterations, "solution accepted");
                self.emit(ProgressEvent::Success {
                    solution: state.solution.clone(),
                    iterations,
                });
                return Ok(self.finish(initial_thought, state, None));
            }

            // 即使解答未变也重新独立验证
            let verification = self.verify(problem, &state.solution, index + 1).await?;
            state.verifications.push(verification.clone());
            state.verification = verification;
        }

        warn!(max = self.options.max_iterations, "max iterations reached without acceptance");
        Ok(self.finish(initial_thought, state, Some(REASON_MAX_ITERATIONS)))
    }

    /// 生成终态结果；失败时推送 Failure 事件
    fn finish(&self, initial_thought: String, state: LoopState, failure: Option<&str>) -> DeepThinkResult {
        if let Some(reason) = failure {
            self.emit(ProgressEvent::Failure {
                reason: reason.to_string(),
            });
        }
        DeepThinkResult {
            initial_thought,
            total_iterations: state.iterations.len(),
            iterations: state.iterations,
            verifications: state.verifications,
            final_solution: state.solution,
            successful_verifications: state.correct_count,
            succeeded: failure.is_none(),
            failure_reason: failure.map(String::from),
        }
    }
}
