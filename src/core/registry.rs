use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{domain::Language, errors::PipelineError, traits::language::LanguageStrategy};

/// Maps a language to the strategy that builds it. Adding a language means
/// registering one more strategy.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    strategies: HashMap<Language, Arc<dyn LanguageStrategy>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy, replacing any previous one for the same language.
    pub fn register(&mut self, strategy: Arc<dyn LanguageStrategy>) -> &mut Self {
        let language = strategy.language();
        if self.strategies.insert(language, strategy).is_some() {
            tracing::debug!(%language, "Replaced language strategy");
        }
        self
    }

    pub fn get(&self, language: Language) -> Result<Arc<dyn LanguageStrategy>, PipelineError> {
        self.strategies
            .get(&language)
            .cloned()
            .ok_or_else(|| PipelineError::UnsupportedLanguage(language.tag().to_string()))
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.strategies.keys().copied()
    }
}
