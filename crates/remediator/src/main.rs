use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sre_remediator::{
    agent::{ActionCatalog, Orchestrator, RemediationPlan, TurnEvent},
    config::Config,
    knowledge::{
        render_matches, resolve,
        rules::{self, RuleFile},
        KnowledgeBase,
    },
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PREVIEW_CHARS: usize = 200;

#[derive(Parser)]
#[command(name = "sre-agent", version, about = "On-call SRE agent for the big-data cluster")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat with the agent (default)
    Chat,
    /// Look up runbook entries for an alert name or keyword
    Lookup { keyword: String },
    /// Print a dry-run remediation plan
    Plan {
        #[arg(long)]
        action: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        component: String,
    },
    /// Check that alert rules and runbook entries cover each other
    CheckCoverage,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_knowledge(config: &Config) -> anyhow::Result<KnowledgeBase> {
    let path = &config.knowledge.runbook_path;
    KnowledgeBase::load(path).with_context(|| format!("loading runbooks from {}", path.display()))
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

fn print_event(event: &TurnEvent) {
    match event {
        TurnEvent::Decided { thought, calls } => {
            if !thought.is_empty() {
                println!("{}", thought);
            }
            for call in calls {
                println!("\n[Step: Decided to Call Tool]");
                println!("  --> Tool: {}", call.name);
                println!("  --> Args: {}", call.arguments);
            }
        }
        TurnEvent::ToolOutput { output, .. } => {
            println!("\n[Step: Tool Output]");
            println!("{}", preview(output));
        }
        TurnEvent::FinalAnswer(answer) => {
            println!("\n[Step: Final Answer]");
            println!("{}", answer);
        }
    }
}

async fn chat(config: &Config) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_config(config).await?;
    let session_id = uuid::Uuid::new_v4().to_string();
    info!(session = %session_id, max_steps = orchestrator.runtime().max_steps(), "SRE agent ready");

    println!("SRE agent ready. Type 'quit' or 'exit' to leave, 'reset' to start over.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "reset" => {
                orchestrator.reset(&session_id).await;
                println!("Session cleared.");
                continue;
            }
            _ => {}
        }

        orchestrator
            .handle_observed(&session_id, input, &mut |event: &TurnEvent| print_event(event))
            .await;
    }

    println!("Goodbye.");
    Ok(())
}

fn check_coverage(config: &Config) -> anyhow::Result<bool> {
    let kb = load_knowledge(config)?;
    let path = &config.knowledge.alert_rules_path;
    let rule_file =
        RuleFile::load(path).with_context(|| format!("loading alert rules from {}", path.display()))?;
    rule_file.validate()?;

    let report = rules::coverage(&rule_file, &kb);
    for alert in &report.missing_runbooks {
        println!("Alert without runbook entry: {}", alert);
    }
    for key in &report.orphaned_runbooks {
        println!("Runbook entry without alert rule: {}", key);
    }

    if report.is_complete() {
        println!(
            "Coverage complete: {} alert rules, {} runbook entries.",
            rule_file.alert_names().len(),
            kb.len()
        );
    }
    Ok(report.is_complete())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => chat(&config).await?,
        Commands::Lookup { keyword } => {
            let kb = load_knowledge(&config)?;
            println!("{}", render_matches(&keyword, &resolve(&keyword, &kb)));
        }
        Commands::Plan {
            action,
            reason,
            component,
        } => {
            let kb = load_knowledge(&config)?;
            let catalog = ActionCatalog::from_knowledge(&kb);
            let plan = RemediationPlan::new(action, reason, component, &catalog);
            println!("{}", plan.render(Utc::now()));
        }
        Commands::CheckCoverage => {
            if !check_coverage(&config)? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
