use std::sync::Mutex;

use async_stream::try_stream;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::agent::Agent;
use crate::errors::{AgentError, AgentResult, PipelineError};
use crate::models::role::Role;
use crate::thread::ConversationThread;

/// How conversation history is shared across pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadPolicy {
    /// One thread for the whole pipeline: every agent sees the full
    /// cross-agent conversation, including earlier agents' tool traffic.
    #[default]
    Shared,
    /// A fresh thread per agent: each agent only sees its own exchanges.
    Isolated,
}

/// The unit yielded by the orchestrator's output sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestrationStep {
    pub author: String,
    pub text: String,
}

/// Sequential pipeline coordinator: feeds an initial input through a fixed,
/// ordered list of agents, each agent's final text becoming the next one's
/// input.
///
/// `run` produces its steps lazily: an agent only executes when the consumer
/// pulls past the previous agent's steps, so a consumer that stops early
/// avoids running the rest of the pipeline.
pub struct Orchestrator {
    agents: Vec<Agent>,
    policy: ThreadPolicy,
    cancel: CancellationToken,
    threads: Mutex<Vec<ConversationThread>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("agents", &self.agents.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Orchestrator {
    /// Build a pipeline over the given agents, in order. At least one agent
    /// is required.
    pub fn new(agents: Vec<Agent>) -> AgentResult<Self> {
        if agents.is_empty() {
            return Err(AgentError::Internal(
                "orchestrator requires at least one agent".to_string(),
            ));
        }
        Ok(Self {
            agents,
            policy: ThreadPolicy::default(),
            cancel: CancellationToken::new(),
            threads: Mutex::new(Vec::new()),
        })
    }

    pub fn with_policy(mut self, policy: ThreadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Session-level cancellation token, observed by the active agent at
    /// every suspension point.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Threads acquired by the most recent `run`, one handle per step.
    /// Under the shared policy all handles observe the same history. Useful
    /// for observers tailing the conversation while a run is in flight.
    pub fn threads(&self) -> Vec<ConversationThread> {
        self.threads.lock().unwrap().clone()
    }

    /// Run the pipeline on `input`, yielding one step per text-carrying
    /// assistant message.
    ///
    /// The input of each agent is the *last* assistant text the previous
    /// agent produced. On the first agent failure the stream ends with a
    /// [`PipelineError`] naming the agent; steps already yielded remain
    /// valid history and no later agent executes.
    pub fn run(&self, input: &str) -> BoxStream<'_, Result<OrchestrationStep, PipelineError>> {
        let input = input.to_string();
        Box::pin(try_stream! {
            self.threads.lock().unwrap().clear();

            let mut shared_thread: Option<ConversationThread> = None;
            let mut current_input = input;

            for agent in &self.agents {
                // Acquire the step's thread lazily: created on first use,
                // reused or replaced according to the policy.
                let thread = match self.policy {
                    ThreadPolicy::Shared => shared_thread
                        .get_or_insert_with(ConversationThread::new)
                        .clone(),
                    ThreadPolicy::Isolated => ConversationThread::new(),
                };
                self.threads.lock().unwrap().push(thread.clone());

                tracing::debug!(agent = %agent.name(), "pipeline step starting");
                let response = agent
                    .run(&current_input, &thread, &self.cancel)
                    .await
                    .map_err(|source| PipelineError {
                        agent: agent.name().to_string(),
                        source,
                    })?;

                for message in &response.messages {
                    if message.role != Role::Assistant {
                        continue;
                    }
                    // Tool-call announcements without prose are protocol
                    // traffic, not steps; they stay visible in the thread.
                    let text = message.text();
                    if text.is_empty() {
                        continue;
                    }
                    current_input = text.clone();
                    yield OrchestrationStep {
                        author: agent.name().to_string(),
                        text,
                    };
                }
            }
        })
    }
}
