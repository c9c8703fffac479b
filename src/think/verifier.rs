//! Verifier：解答验证（审阅 + yes/no 判定）
//!
//! 两次调用同一 verification 阶段模型：
//! 1. 对「题目 + 详细解答」做严格审阅，得到审阅日志
//! 2. 对审阅日志提 yes/no 问题，得到终判；含 "yes" 即通过
//!
//! 未通过时，bug report 取审阅日志中 Detailed Verification 之前的摘要部分。
//! 判定不做额外解析：模型说 no 与回复格式错误同样按未通过处理。

use std::sync::Arc;

use tracing::debug;

use crate::llm::{GenerationPort, LlmError, Stage, TextRequest};
use crate::think::prompts::{
    verification_prompt, CHECK_VERDICT_PROMPT, DETAILED_SOLUTION_MARKER,
    DETAILED_VERIFICATION_MARKER, VERIFICATION_SYSTEM_PROMPT,
};
use crate::think::types::Verification;

/// 取标记之后（after=true）或之前（after=false）的部分；找不到标记时返回全文
pub fn extract_section<'a>(text: &'a str, marker: &str, after: bool) -> &'a str {
    match text.find(marker) {
        Some(idx) if after => text[idx + marker.len()..].trim(),
        Some(idx) => text[..idx].trim(),
        None => text.trim(),
    }
}

/// 解答中的详细部分
pub fn extract_detailed_solution(solution: &str) -> &str {
    extract_section(solution, DETAILED_SOLUTION_MARKER, true)
}

/// 审阅日志中的摘要部分（bug report）
pub fn extract_bug_report(review: &str) -> &str {
    extract_section(review, DETAILED_VERIFICATION_MARKER, false)
}

/// Verifier：持有生成端口，verify(problem, solution) 产出一条 Verification
pub struct Verifier {
    port: Arc<GenerationPort>,
}

impl Verifier {
    pub fn new(port: Arc<GenerationPort>) -> Self {
        Self { port }
    }

    pub async fn verify(&self, problem: &str, solution: &str) -> Result<Verification, LlmError> {
        let detailed = extract_detailed_solution(solution);

        let review = self
            .port
            .invoke_stage(
                Stage::Verification,
                TextRequest::default()
                    .with_system(VERIFICATION_SYSTEM_PROMPT)
                    .with_prompt(verification_prompt(problem, detailed)),
                false,
            )
            .await?;

        let judgment = self
            .port
            .invoke_stage(
                Stage::Verification,
                TextRequest::default().with_prompt(format!("{}\n\n{}", CHECK_VERDICT_PROMPT, review)),
                false,
            )
            .await?;

        let passed = crate::think::types::verdict_passed(&judgment);
        let bug_report = if passed {
            String::new()
        } else {
            extract_bug_report(&review).to_string()
        };
        debug!(passed, "verification finished");

        Ok(Verification::new(judgment, review, bug_report))
    }
}
