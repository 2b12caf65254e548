use std::env;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relay::agent::Agent;
use relay::orchestrator::{Orchestrator, ThreadPolicy};
use relay::providers::configs::OpenAiProviderConfig;
use relay::providers::openai::OpenAiProvider;

mod session;
mod tools;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Chat completion host: LM Studio, Ollama, or any OpenAI-compatible server
    #[arg(long, default_value = "http://localhost:1234")]
    host: String,

    /// API key (can also be set via OPENAI_API_KEY; local servers ignore it)
    #[arg(long)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long, default_value = "openai/gpt-oss-20b")]
    model: String,

    /// Give each agent its own conversation history instead of one shared thread
    #[arg(long)]
    isolated_history: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| env::var("OPENAI_API_KEY").ok())
        .unwrap_or_else(|| "lm-studio".to_string());

    let provider = Arc::new(OpenAiProvider::new(OpenAiProviderConfig::new(
        cli.host.clone(),
        api_key,
        cli.model.clone(),
    ))?);

    let specialist = Agent::new(
        "DrHouse",
        "You are a senior medical specialist.\n\
         Your only task is to extract diagnoses, symptoms, and treatments from messy clinical notes.\n\
         If the notes name a known patient, use the 'patient_history' tool to pull their record first.\n\
         Always provide a technical summary focused on the medical facts.",
        tools::specialist_registry()?,
        provider.clone(),
    );

    let secretary = Agent::new(
        "MedicalSecretary",
        "You are a hospital administrator.\n\
         Take the information from DrHouse and format it into a professional report.\n\
         IMPORTANT: Once the report is ready, you MUST call the 'save_report' tool to save the file.\n\
         Inform the user when the file has been successfully created.",
        tools::secretary_registry()?,
        provider,
    );

    let policy = if cli.isolated_history {
        ThreadPolicy::Isolated
    } else {
        ThreadPolicy::Shared
    };
    let orchestrator = Orchestrator::new(vec![specialist, secretary])?.with_policy(policy);

    let mut session = session::Session::new(orchestrator, cli.host, cli.model);
    session.start().await
}
