//! Chat Router - one user turn in, one assistant text out.
//!
//! Wires the [`IntentClassifier`] to the [`ResponseComposer`]:
//! `handle_turn(u, provider) == compose(classify(u), provider)`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use super::composer::ResponseComposer;
use super::intent::{Category, IntentClassifier};
use super::templates::ResponseTemplates;
use crate::config::RouterConfig;
use crate::error::AppError;

/// Outcome of a routed turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Category the utterance was routed to
    pub category: Category,
    /// Text to append to the transcript
    pub response: String,
}

/// Intent classifier plus response composer for one deployment
pub struct ChatRouter<R = StdRng> {
    classifier: IntentClassifier,
    composer: ResponseComposer<R>,
}

impl ChatRouter<StdRng> {
    /// Build a router from configuration, with an entropy-seeded random source
    pub fn from_config(config: &RouterConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> ChatRouter<R> {
    /// Build a router from configuration with an explicit random source
    pub fn with_rng(config: &RouterConfig, rng: R) -> Self {
        Self {
            classifier: IntentClassifier::new(&config.keywords, &config.active_categories),
            composer: ResponseComposer::with_rng(Arc::new(config.templates.clone()), rng),
        }
    }

    /// Templates used for canned answers and fallbacks
    pub fn templates(&self) -> &ResponseTemplates {
        self.composer.templates()
    }

    /// Handle one user turn with a synchronous model provider
    pub fn handle_turn<F>(&mut self, utterance: &str, provider: F) -> TurnOutcome
    where
        F: FnOnce() -> Result<String, AppError>,
    {
        let category = self.route(utterance);
        let response = self.composer.compose(category, provider);
        TurnOutcome { category, response }
    }

    /// Handle one user turn with an async model provider
    pub async fn handle_turn_async<F, Fut>(&mut self, utterance: &str, provider: F) -> TurnOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, AppError>>,
    {
        let category = self.route(utterance);
        let response = self.composer.compose_async(category, provider).await;
        TurnOutcome { category, response }
    }

    fn route(&self, utterance: &str) -> Category {
        let result = self.classifier.classify_detailed(utterance);
        info!(
            category = %result.category,
            keyword = result.matched_keyword.as_deref().unwrap_or("-"),
            "routed user turn"
        );
        result.category
    }
}
