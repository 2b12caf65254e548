use anyhow::Result;
use console::style;
use futures::StreamExt;

use relay::orchestrator::Orchestrator;

/// Interactive console session driving the agent pipeline: reads patient
/// notes, runs the pipeline, prints one block per step.
pub struct Session {
    orchestrator: Orchestrator,
    host: String,
    model: String,
}

impl Session {
    pub fn new(orchestrator: Orchestrator, host: String, model: String) -> Self {
        Session {
            orchestrator,
            host,
            model,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        println!(
            "{}",
            style("=== Multi-Agent Medical System ===").cyan().bold()
        );
        println!("Connecting to: {}", self.host);
        println!("Using model: {}\n", self.model);
        println!(
            "System ready. Enter patient notes {}",
            style("- type \"exit\" to quit").dim()
        );

        loop {
            let input: String = cliclack::input("Input:").placeholder("").interact()?;
            let input = input.trim();
            if input.is_empty() || input.eq_ignore_ascii_case("exit") {
                break;
            }

            let spin = cliclack::spinner();
            spin.start("running pipeline");
            let mut spinning = true;

            let mut stream = self.orchestrator.run(input);
            while let Some(result) = stream.next().await {
                if spinning {
                    spin.stop("");
                    spinning = false;
                }
                match result {
                    Ok(step) => {
                        println!(
                            "\n{}",
                            style(format!("--- [{}] ---", step.author)).yellow()
                        );
                        println!("{}", step.text);
                    }
                    Err(e) => {
                        eprintln!("{}", style(format!("Error: {e}")).red());
                        break;
                    }
                }
            }
            if spinning {
                spin.stop("");
            }
            println!();
        }
        Ok(())
    }
}
