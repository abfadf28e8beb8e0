use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tool_agent::config::Config;
use tool_agent::llm::factory::provider_from_runtime_config;
use tool_agent::orchestration::report::render_summary;
use tool_agent::tools::builtin;
use tool_agent::{ConversationRun, StopReason, ToolExecutor};

const DEFAULT_PROMPT: &str = "Make the sum of 40 and 2, \
If the result is higher than 40 \
Then say hello to Bob Else to Sam";

#[derive(Debug, Parser)]
#[command(name = "tool-agent", version, about = "Run a tool-calling conversation against an OpenAI-compatible model")]
struct Cli {
    /// User message that opens the conversation.
    prompt: Option<String>,

    /// Endpoint base URL (overrides MODEL_RUNNER_BASE_URL).
    #[arg(long)]
    base_url: Option<String>,

    /// Model identifier (overrides MODEL_NAME).
    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(long)]
    temperature: Option<f64>,

    /// Optional system prompt placed before the user message.
    #[arg(long)]
    system: Option<String>,

    /// Print the full run report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn lookup(&self, key: &str) -> Option<String> {
        let flag = match key {
            "MODEL_RUNNER_BASE_URL" => self.base_url.clone(),
            "MODEL_NAME" => self.model.clone(),
            "MAX_ITERATIONS" => self.max_iterations.map(|v| v.to_string()),
            "TEMPERATURE" => self.temperature.map(|v| v.to_string()),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tool_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_lookup(|key| cli.lookup(key)).context("loading configuration")?;
    tracing::info!(model = %config.llm.model_id, max_iterations = config.max_iterations, "configuration loaded");

    let provider = provider_from_runtime_config(&config.llm)?;
    let registry = Arc::new(builtin::registry()?);
    let executor = ToolExecutor::new(registry).with_limits(config.tool_limits());

    let mut options = config.run_options();
    options.system_prompt = cli.system.clone();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping at next step");
            on_ctrl_c.cancel();
        }
    });

    let prompt = cli.prompt.clone().unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let report = ConversationRun::new(provider, executor, options)
        .run(prompt, cancel)
        .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if let Some(answer) = &report.final_answer {
            println!("{answer}");
        }
        println!();
        print!("{}", render_summary(&report.ledger, 500));
    }

    match &report.stop_reason {
        StopReason::Normal => Ok(()),
        other => Err(anyhow::anyhow!("run stopped: {other}")),
    }
}
