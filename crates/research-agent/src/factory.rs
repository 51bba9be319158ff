use reqwest::Client;
use research_agent_core::{Agent, AgentBuilder};
use research_agent_core::memory::{Memory, SessionSummarizer};
use research_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use thiserror::Error;

use crate::backend::ChatBackend;
use crate::credentials::{CredentialStore, Provider};
use crate::settings::Settings;
use crate::tools::{AnalyzeTool, ThinkTool, WebSearchTool, WikipediaTool};

const INSTRUCTIONS: &str = include_str!("./instructions.md");
const SUMMARY_INSTRUCTIONS: &str = include_str!("./summary_instructions.md");

/// The error returned when an agent cannot be built.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConstructionError {
    message: String,
}

impl ConstructionError {
    /// Creates an error with the given message.
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for ConstructionError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(format!("cannot create HTTP client: {err}"))
    }
}

/// Builds chat backends from the session's credentials.
pub trait AgentFactory {
    /// Builds a backend. Fails if a required credential is missing.
    fn build(
        &self,
        credentials: &CredentialStore,
    ) -> Result<Box<dyn ChatBackend>, ConstructionError>;
}

/// Builds the research agent: an OpenAI model with a session summarizer,
/// web search, Wikipedia and reasoning tools.
#[derive(Clone, Debug, Default)]
pub struct ResearchAgentFactory {
    settings: Settings,
}

impl ResearchAgentFactory {
    /// Creates a factory using `settings`.
    #[inline]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Returns the settings of this factory.
    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the names of the tools every agent gets, sorted.
    pub fn tool_names() -> [&'static str; 4] {
        ["analyze", "search_wikipedia", "think", "web_search"]
    }

    /// Builds the agent itself, without boxing it as a backend.
    pub fn build_agent(
        &self,
        credentials: &CredentialStore,
    ) -> Result<Agent, ConstructionError> {
        let api_key = credentials.get(Provider::OpenAI);
        if api_key.is_empty() {
            return Err(ConstructionError::new("the OpenAI API key is empty"));
        }
        let settings = &self.settings;
        let client = Client::builder().build()?;

        let model_provider = OpenAIProvider::with_client(
            client.clone(),
            OpenAIConfigBuilder::with_api_key(api_key)
                .with_base_url(&settings.openai_base_url)
                .with_model(&settings.agent_model)
                .build(),
        );
        let summary_provider = OpenAIProvider::with_client(
            client.clone(),
            OpenAIConfigBuilder::with_api_key(api_key)
                .with_base_url(&settings.openai_base_url)
                .with_model(&settings.summary_model)
                .build(),
        );
        let summarizer = SessionSummarizer::with_model_provider(summary_provider)
            .with_additional_instructions(SUMMARY_INSTRUCTIONS);

        let serper_key = Some(credentials.get(Provider::Serper).to_owned());
        if !credentials.is_present(Provider::Serper) {
            info!("no Serper API key, web search will be unavailable");
        }

        let agent = AgentBuilder::with_model_provider(model_provider)
            .with_instructions(INSTRUCTIONS)
            .with_memory(Memory::with_summarizer(summarizer))
            .with_num_history_runs(settings.num_history_runs)
            .with_tool(WebSearchTool::new(
                client.clone(),
                serper_key,
                &settings.serper_base_url,
            ))
            .with_tool(WikipediaTool::new(client, &settings.wikipedia_base_url))
            .with_tool(ThinkTool::new())
            .with_tool(AnalyzeTool::new())
            .build();
        debug!(
            "research agent ready: model {}, tools {:?}",
            agent.model_id(),
            agent.tool_names()
        );

        Ok(agent)
    }
}

impl AgentFactory for ResearchAgentFactory {
    fn build(
        &self,
        credentials: &CredentialStore,
    ) -> Result<Box<dyn ChatBackend>, ConstructionError> {
        let agent = self.build_agent(credentials)?;
        Ok(Box::new(agent))
    }
}
