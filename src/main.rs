//! DeepThink CLI
//!
//! 入口：初始化日志、加载配置、装配生成端口，运行单智能体或多智能体求解并输出结果。
//! 过程事件打印到 stderr；`--json` 时事件与最终结果以 JSON 行写到 stdout。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use deepthink::config::load_config;
use deepthink::core::{build_port, create_llm_from_config, validate};
use deepthink::think::{AgentUpdate, ProgressEvent};
use deepthink::{DeepThinkEngine, DeepThinkOptions, UltraThinkEngine, UltraThinkOptions};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "deepthink")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Iterative self-verifying problem solver", long_about = None)]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 多智能体模式：规划 -> 并发求解 -> 综合
    #[arg(long)]
    ultra: bool,

    /// 多智能体模式下最多派发的智能体数
    #[arg(long)]
    agents: Option<usize>,

    /// 覆盖 llm.provider（deepseek / openai / mock）
    #[arg(long)]
    provider: Option<String>,

    /// 以 JSON 行输出事件与结果
    #[arg(long)]
    json: bool,

    /// 背景知识文件，附加在题目之后
    #[arg(long)]
    knowledge: Option<PathBuf>,

    /// 待求解的问题
    problem: String,
}

fn print_event(ev: &ProgressEvent, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(ev) {
            println!("{}", line);
        }
        return;
    }
    match ev {
        ProgressEvent::Init { .. } => eprintln!("[init] solving..."),
        ProgressEvent::Thinking { iteration, phase } => eprintln!("[{}] {}", iteration, phase),
        ProgressEvent::Solution { iteration, .. } => eprintln!("[{}] new solution", iteration),
        ProgressEvent::Verification { passed, iteration } => {
            eprintln!("[{}] verification {}", iteration, if *passed { "passed" } else { "failed" })
        }
        ProgressEvent::Correction { iteration } => eprintln!("[{}] correcting", iteration),
        ProgressEvent::Success { iterations, .. } => {
            eprintln!("[done] accepted after {} iterations", iterations)
        }
        ProgressEvent::Failure { reason } => eprintln!("[done] gave up: {}", reason),
        ProgressEvent::Progress { message } => eprintln!("[ultra] {}", message),
    }
}

fn print_update(update: &AgentUpdate, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(update) {
            println!("{}", line);
        }
        return;
    }
    let patch = &update.patch;
    match (patch.status, patch.progress) {
        (Some(status), Some(progress)) => {
            eprintln!("  <{}> {} {}%", update.agent_id, status.as_str(), progress)
        }
        (Some(status), None) => eprintln!("  <{}> {}", update.agent_id, status.as_str()),
        _ => {}
    }
    if let Some(error) = &patch.error {
        eprintln!("  <{}> error: {}", update.agent_id, error);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    deepthink::observability::init();
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    if let Some(provider) = cli.provider {
        cfg.llm.provider = provider;
    }
    if cli.agents.is_some() {
        cfg.ultra.num_agents = cli.agents;
    }
    validate(&cfg)?;

    let client = create_llm_from_config(&cfg);
    let port = Arc::new(build_port(&cfg, client));
    let json = cli.json;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            print_event(&ev, json);
        }
    });

    let mut deep = DeepThinkOptions::from(&cfg.thinking);
    if let Some(path) = &cli.knowledge {
        let knowledge = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge file {}", path.display()))?;
        deep = deep.with_knowledge(knowledge);
    }

    if cli.ultra {
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        let updates = tokio::spawn(async move {
            while let Some(update) = update_rx.recv().await {
                print_update(&update, json);
            }
        });

        let options = UltraThinkOptions {
            num_agents: cfg.ultra.num_agents,
            agent: deep,
        };
        let engine = UltraThinkEngine::new(port.clone(), options)
            .with_event_tx(event_tx)
            .with_update_tx(update_tx);
        let result = engine.run(&cli.problem).await;
        drop(engine);
        let (printed, relayed) = tokio::join!(printer, updates);
        for joined in [printed, relayed] {
            if let Err(e) = joined {
                warn!(error = %e, "event printer task failed");
            }
        }

        let result = result.context("Ultra think failed")?;
        info!(
            completed = result.completed_agents,
            total = result.total_agents,
            "ultra think finished"
        );
        if json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            println!("{}", result.final_solution);
        }
    } else {
        let engine = DeepThinkEngine::new(port.clone(), deep).with_event_tx(event_tx);
        let result = engine.run(&cli.problem).await;
        drop(engine);
        if let Err(e) = printer.await {
            warn!(error = %e, "event printer task failed");
        }

        let result = result.context("Deep think failed")?;
        info!(
            succeeded = result.succeeded,
            iterations = result.total_iterations,
            "deep think finished"
        );
        if json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            if let Some(reason) = &result.failure_reason {
                eprintln!("Not verified: {}", reason);
            }
            println!("{}", result.final_solution);
        }
    }

    let (prompt, completion, total) = port.token_usage();
    info!(prompt, completion, total, "token usage");
    Ok(())
}
