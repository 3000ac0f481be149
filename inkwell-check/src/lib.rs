//! # inkwell-check: Checking & Suggestion Engine
//!
//! Turns a document that is being edited into a stream of merged
//! correction lists, and offers next-sentence suggestions on demand.
//!
//! ```text
//!  text_changed() ──▶ Orchestrator ──debounce──▶ snapshot + request id
//!                                                  │
//!                          ┌───────────────────────┴───────────────────┐
//!                          ▼                                           ▼
//!                   BasicChecker                                  AiChecker
//!               (spell service, chunked)                (generative review, anchored)
//!                          └─────────────── merge ─────────────────────┘
//!                                             │
//!                                   CheckReport (latest id only)
//! ```
//!
//! - [`basic`] and [`ai`] normalize each service into `GrammarError`s.
//! - [`orchestrator`] owns debounce, cancellation and staleness.
//! - [`suggest`] and [`logic`] are independent of check cycles.
//! - [`AiGate`] is shared by everything that calls the generative service:
//!   once a credential is found missing it stays closed for the process.

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ai;
pub mod basic;
pub mod credentials;
pub mod error;
pub mod logic;
pub mod orchestrator;
pub mod suggest;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use inkwell_core::journal::{BackgroundJournal, ErrorJournal, ErrorLogSink, NullSink};
use inkwell_core::{InkwellConfig, InkwellError};
use inkwell_llm::prompt::PromptEngine;
use inkwell_llm::{LlmClient, LlmError, LlmProvider, TextGenerator};

pub use ai::{AiChecker, AiGate};
pub use basic::BasicChecker;
pub use credentials::{CredentialProvider, EnvCredentials, StaticCredentials};
pub use error::CheckError;
pub use logic::LogicAnalyzer;
pub use orchestrator::{CheckReport, Coverage, DocumentSource, Orchestrator};
pub use suggest::SuggestionEngine;

/// Everything wired from one config: checkers, engines, and the shared gate.
#[derive(Debug, Clone)]
pub struct Engine {
    /// Spell-service adapter.
    pub basic: BasicChecker,
    /// Generative reviewer.
    pub ai: AiChecker,
    /// Next-sentence engine.
    pub suggestions: SuggestionEngine,
    /// Logic reviewer.
    pub logic: LogicAnalyzer,
    /// The gate all three generative users share.
    pub gate: AiGate,
}

impl Engine {
    /// Build the generative client and every component from `config`.
    ///
    /// The credential is read once, here.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider.
    pub fn from_config(
        config: &InkwellConfig,
        credentials: &dyn CredentialProvider,
        prompts: PromptEngine,
    ) -> Result<Self, LlmError> {
        let provider = LlmProvider::from_name(
            &config.ai.provider,
            config.ai.base_url.clone(),
            credentials.api_key(),
        )?;
        let client = LlmClient::new(provider, config.ai.model.clone(), config.ai.max_retries);
        Ok(Self::with_generator(config, Arc::new(client), prompts))
    }

    /// Wire components around an existing generator.
    #[must_use]
    pub fn with_generator(
        config: &InkwellConfig,
        generator: Arc<dyn TextGenerator>,
        prompts: PromptEngine,
    ) -> Self {
        let prompts = Arc::new(prompts);
        let gate = AiGate::new();
        let review = ai::ReviewSettings::from(&config.ai);
        let timeout = Duration::from_millis(config.check.adapter_timeout_ms);
        Self {
            basic: BasicChecker::from_config(&config.basic, timeout),
            ai: AiChecker::new(generator.clone(), prompts.clone(), gate.clone(), review.clone()),
            suggestions: SuggestionEngine::new(
                generator.clone(),
                prompts.clone(),
                gate.clone(),
                suggest::SuggestSettings::from_config(&config.ai, &config.suggestion),
            ),
            logic: LogicAnalyzer::new(generator, prompts, gate.clone(), review),
            gate,
        }
    }

    /// The finding journal `config.journal` asks for: a background SQLite
    /// writer when enabled, otherwise a sink that drops everything.
    ///
    /// # Errors
    ///
    /// Returns [`InkwellError::Database`] if the journal cannot be opened
    /// and [`InkwellError::Io`] if its writer thread cannot start.
    pub fn journal(config: &InkwellConfig) -> Result<Arc<dyn ErrorLogSink>, InkwellError> {
        if !config.journal.enabled {
            return Ok(Arc::new(NullSink));
        }
        let journal = ErrorJournal::open(&config.journal.path, &config.journal)?;
        Ok(Arc::new(BackgroundJournal::spawn(journal)?))
    }

    /// An orchestrator over `source` using these checkers.
    #[must_use]
    pub fn orchestrator(
        &self,
        config: &InkwellConfig,
        source: Arc<dyn DocumentSource>,
    ) -> (Orchestrator, tokio::sync::mpsc::UnboundedReceiver<CheckReport>) {
        Orchestrator::new(
            orchestrator::OrchestratorSettings::from(&config.check),
            self.basic.clone(),
            Some(self.ai.clone()),
            self.gate.clone(),
            source,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell_core::journal::UserAction;

    #[tokio::test]
    async fn keyless_config_fails_fast_and_closes_the_gate() {
        let config = InkwellConfig::default();
        let engine = Engine::from_config(&config, &StaticCredentials::none(), PromptEngine::builtin())
            .expect("default provider is known");

        let result = engine.suggestions.suggest("첫 문장.", 3).await;
        assert!(matches!(result, Err(CheckError::AuthMissing)));
        assert!(!engine.gate.is_open());
        assert!(!engine.ai.gate().is_open(), "components share one gate");
    }

    fn finding() -> inkwell_core::GrammarError {
        inkwell_core::GrammarError::new(
            inkwell_core::TextSpan::new(0, 2).expect("span"),
            "됬다",
            "됐다",
            inkwell_core::Category::Spelling,
            inkwell_core::Origin::Basic,
            1.0,
        )
    }

    #[test]
    fn enabled_journal_persists_findings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("journal.db");
        let mut config = InkwellConfig::default();
        config.journal.enabled = true;
        config.journal.path = path.to_string_lossy().into_owned();

        let sink = Engine::journal(&config).expect("journal opens");
        sink.record(&finding(), UserAction::Surfaced);
        sink.record(&finding(), UserAction::Surfaced);
        drop(sink);

        let reopened = ErrorJournal::open(&path, &config.journal).expect("reopen");
        assert_eq!(reopened.count_by_action(UserAction::Surfaced).expect("count"), 2);
    }

    #[test]
    fn disabled_journal_touches_no_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("journal.db");
        let mut config = InkwellConfig::default();
        config.journal.path = path.to_string_lossy().into_owned();

        let sink = Engine::journal(&config).expect("null sink");
        sink.record(&finding(), UserAction::Surfaced);
        drop(sink);
        assert!(!path.exists());
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let mut config = InkwellConfig::default();
        config.ai.provider = "carrier-pigeon".into();
        let err = Engine::from_config(&config, &StaticCredentials::none(), PromptEngine::builtin())
            .expect_err("rejected");
        assert!(matches!(err, LlmError::ConfigError(_)));
    }
}
