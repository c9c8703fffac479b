//! 提示词与分段标记
//!
//! 提示词内容对引擎而言是不透明参数；引擎只依赖两个标记：
//! - DETAILED_SOLUTION_MARKER：验证时只取其后的详细解答
//! - DETAILED_VERIFICATION_MARKER：bug report 取审阅日志中它之前的摘要部分

pub const DETAILED_SOLUTION_MARKER: &str = "### Detailed Solution ###";
pub const DETAILED_VERIFICATION_MARKER: &str = "Detailed Verification";

pub const SOLVER_SYSTEM_PROMPT: &str = r#"### Core Instructions ###

* **Rigor is paramount.** Your primary goal is a complete and rigorously justified solution. Every step must be logically sound and clearly explained.
* **Honesty about completeness.** If you cannot find a complete solution, do not guess. Present only significant partial results you can rigorously prove.
* Use TeX for all mathematical expressions.

### Output Format ###

Your response must be structured into exactly these sections, in order:

**1. Summary**
  * **a. Verdict:** whether the solution is complete, or which partial results it establishes.
  * **b. Method Sketch:** a high-level outline of the argument and its key lemmas.

**2. Detailed Solution**
Start this section with the exact line `### Detailed Solution ###` and present the full, step-by-step argument.

### Self-Correction Instruction ###

Before finalizing, review your work against these instructions and fix any gaps."#;

pub const SELF_IMPROVEMENT_PROMPT: &str = "You have an opportunity to improve your solution. \
Review it carefully, correct errors and fill justification gaps if any. \
Your output must strictly follow the output format in the system prompt.";

pub const CORRECTION_PROMPT: &str = "Below is the bug report from an independent verifier. \
If you agree with an item, improve your solution so that it is complete and rigorous. \
The verifier can misunderstand your solution; if you disagree with an item, add explanations \
that prevent the misunderstanding. Your new solution must strictly follow the output format \
in the system prompt.";

pub const VERIFICATION_SYSTEM_PROMPT: &str = r#"You are an expert grader. Verify the provided solution step by step; you act as a verifier, not a solver.

* A solution is correct only if every step is rigorously justified.
* Classify each issue as a **Critical Error** (breaks the logic) or a **Justification Gap** (correct claim, incomplete argument).

Your response must contain:
1. **Summary**: a one-line final verdict, followed by a list of findings (location and issue for each).
2. **Detailed Verification Log**: the step-by-step check of the whole solution."#;

pub const VERIFICATION_REMINDER: &str = "### Verification Task Reminder ###\n\
Generate the summary and the step-by-step verification log for the solution above, \
following the instructions in the system prompt.";

pub const CHECK_VERDICT_PROMPT: &str = r#"Response in "yes" or "no". Is the following statement saying the solution is correct, or does not contain critical error or a major justification gap?"#;

pub const PLANNING_PROMPT: &str = "Analyze the problem below and propose 3 to 5 genuinely \
different approaches to solve it. For each approach give a short label, the core idea, \
and why it might succeed. Number the approaches.";

pub const AGENT_CONFIG_PROMPT: &str = "From the plan below, produce one agent configuration \
per approach. Each configuration has: agentId (short unique identifier), approach (the label), \
and specificPrompt (concrete instructions telling a solver to pursue exactly this approach).";

pub const AGENT_CONFIG_TEXT_SUFFIX: &str = "Return ONLY a JSON object of the form \
{\"agents\": [{\"agentId\": \"...\", \"approach\": \"...\", \"specificPrompt\": \"...\"}]}.";

pub const SYNTHESIS_PROMPT: &str = "Several independent agents attacked the problem below with \
different approaches. Compare their solutions, identify which arguments are sound, reconcile \
disagreements, and write one final, complete and rigorous solution.";

pub const NO_SOLUTION_PLACEHOLDER: &str = "(no solution produced)";

/// 初次探索的 user 消息：题目 + 背景知识 + 额外指令
pub fn initial_prompt(problem: &str, knowledge: Option<&str>, other_prompts: &[String]) -> String {
    let mut prompt = format!("*** Problem Statement ***\n\n{}", problem);
    if let Some(k) = knowledge.filter(|k| !k.trim().is_empty()) {
        prompt.push_str("\n\n*** Background Knowledge ***\n\n");
        prompt.push_str(k);
    }
    if !other_prompts.is_empty() {
        prompt.push_str("\n\n*** Additional Instructions ***\n");
        for p in other_prompts {
            prompt.push('\n');
            prompt.push_str(p);
        }
    }
    prompt
}

/// 验证审阅的 user 消息
pub fn verification_prompt(problem: &str, detailed_solution: &str) -> String {
    format!(
        "======================================================================\n\
         ### Problem ###\n\n{}\n\n\
         ======================================================================\n\
         ### Solution ###\n\n{}\n\n{}",
        problem, detailed_solution, VERIFICATION_REMINDER
    )
}
