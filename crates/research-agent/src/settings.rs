use std::env;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_AGENT_MODEL: &str = "gpt-5-mini";
const DEFAULT_SUMMARY_MODEL: &str = "gpt-5";
const DEFAULT_SERPER_BASE_URL: &str = "https://google.serper.dev";
const DEFAULT_WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org";
const DEFAULT_NUM_HISTORY_RUNS: usize = 3;

/// Runtime configuration of the research agent.
///
/// Every field has a default. Environment variables only override them,
/// and the two API keys read here are initial values for the session's
/// credential store.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the OpenAI-compatible API (`OPENAI_BASE_URL`).
    pub openai_base_url: String,
    /// Model answering research questions (`RESEARCH_AGENT_MODEL`).
    pub agent_model: String,
    /// Model writing session summaries (`RESEARCH_SUMMARY_MODEL`).
    pub summary_model: String,
    /// Base URL of the Serper API (`SERPER_BASE_URL`).
    pub serper_base_url: String,
    /// Base URL of Wikipedia (`WIKIPEDIA_BASE_URL`).
    pub wikipedia_base_url: String,
    /// How many previous runs go along with each request.
    pub num_history_runs: usize,
    /// Initial OpenAI key (`OPENAI_API_KEY`).
    pub openai_api_key: Option<String>,
    /// Initial Serper key (`SERPER_API_KEY`).
    pub serper_api_key: Option<String>,
}

impl Settings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let or_default = |name: &str, default: &str| {
            var(name).unwrap_or_else(|| default.to_owned())
        };

        Self {
            openai_base_url: or_default(
                "OPENAI_BASE_URL",
                DEFAULT_OPENAI_BASE_URL,
            ),
            agent_model: or_default("RESEARCH_AGENT_MODEL", DEFAULT_AGENT_MODEL),
            summary_model: or_default(
                "RESEARCH_SUMMARY_MODEL",
                DEFAULT_SUMMARY_MODEL,
            ),
            serper_base_url: or_default(
                "SERPER_BASE_URL",
                DEFAULT_SERPER_BASE_URL,
            ),
            wikipedia_base_url: or_default(
                "WIKIPEDIA_BASE_URL",
                DEFAULT_WIKIPEDIA_BASE_URL,
            ),
            num_history_runs: DEFAULT_NUM_HISTORY_RUNS,
            openai_api_key: var("OPENAI_API_KEY"),
            serper_api_key: var("SERPER_API_KEY"),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("openai_base_url", &self.openai_base_url)
            .field("agent_model", &self.agent_model)
            .field("summary_model", &self.summary_model)
            .field("serper_base_url", &self.serper_base_url)
            .field("wikipedia_base_url", &self.wikipedia_base_url)
            .field("num_history_runs", &self.num_history_runs)
            .field("openai_api_key", &self.openai_api_key.is_some())
            .field("serper_api_key", &self.serper_api_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(settings.agent_model, "gpt-5-mini");
        assert_eq!(settings.summary_model, "gpt-5");
        assert_eq!(settings.serper_base_url, "https://google.serper.dev");
        assert_eq!(settings.wikipedia_base_url, "https://en.wikipedia.org");
        assert_eq!(settings.num_history_runs, 3);
        assert_eq!(settings.openai_api_key, None);
        assert_eq!(settings.serper_api_key, None);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_BASE_URL", "http://localhost:11434/v1"),
            ("RESEARCH_AGENT_MODEL", "llama3.1"),
            ("OPENAI_API_KEY", " sk-test \n"),
            ("SERPER_API_KEY", ""),
        ]);
        let settings =
            Settings::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(settings.openai_base_url, "http://localhost:11434/v1");
        assert_eq!(settings.agent_model, "llama3.1");
        assert_eq!(settings.summary_model, "gpt-5");
        assert_eq!(settings.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.serper_api_key, None);

        let debug = format!("{settings:?}");
        assert!(!debug.contains("sk-test"));
    }
}
