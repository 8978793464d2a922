//! Response composition.
//!
//! Turns a routed [`Category`] into the text shown to the visitor. Canned
//! categories short-circuit to their template; the others pull one answer
//! from a caller-supplied provider, which is the only place network or model
//! state can enter.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::intent::Category;
use super::templates::ResponseTemplates;
use crate::error::AppError;

/// Builds the final assistant text for a routed turn.
///
/// `R` is the random source used to pick consultation suggestions.
pub struct ResponseComposer<R = StdRng> {
    templates: Arc<ResponseTemplates>,
    rng: R,
}

impl ResponseComposer<StdRng> {
    /// Create a composer seeded from OS entropy
    pub fn new(templates: Arc<ResponseTemplates>) -> Self {
        Self::with_rng(templates, StdRng::from_entropy())
    }
}

impl<R: Rng> ResponseComposer<R> {
    /// Create a composer with an explicit random source
    pub fn with_rng(templates: Arc<ResponseTemplates>, rng: R) -> Self {
        Self { templates, rng }
    }

    /// Templates this composer answers with
    pub fn templates(&self) -> &ResponseTemplates {
        &self.templates
    }

    /// Compose the answer for `category`.
    ///
    /// `provider` is invoked at most once, and never for canned categories.
    pub fn compose<F>(&mut self, category: Category, provider: F) -> String
    where
        F: FnOnce() -> Result<String, AppError>,
    {
        if let Some(text) = self.templates.canned(category) {
            debug!(category = %category, "answering with canned template");
            return text.to_string();
        }

        let answer = provider();
        self.finish(category, answer)
    }

    /// Async twin of [`compose`](Self::compose) for providers that perform I/O
    pub async fn compose_async<F, Fut>(&mut self, category: Category, provider: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, AppError>>,
    {
        if let Some(text) = self.templates.canned(category) {
            debug!(category = %category, "answering with canned template");
            return text.to_string();
        }

        let answer = provider().await;
        self.finish(category, answer)
    }

    /// Text substituted when the model cannot answer
    pub fn fallback(&self, with_apology: bool) -> String {
        match (&self.templates.apology_prefix, with_apology) {
            (Some(prefix), true) => format!("{}{}", prefix, self.templates.technical_support),
            _ => self.templates.technical_support.clone(),
        }
    }

    fn finish(&mut self, category: Category, answer: Result<String, AppError>) -> String {
        match answer {
            Ok(text) if category == Category::CareerGuidance => match self.pick_suggestion() {
                Some(suggestion) => format!("{}\n\n{}", text, suggestion),
                None => text,
            },
            Ok(text) => text,
            Err(e) => {
                warn!(category = %category, error = %e, "model answer unavailable, using support fallback");
                self.fallback(category == Category::General)
            }
        }
    }

    fn pick_suggestion(&mut self) -> Option<String> {
        self.templates
            .consultation_suggestions
            .choose(&mut self.rng)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer(seed: u64) -> ResponseComposer {
        ResponseComposer::with_rng(
            Arc::new(ResponseTemplates::default()),
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_canned_categories_skip_provider() {
        let mut composer = composer(1);
        let templates = ResponseTemplates::default();

        for category in [
            Category::Technical,
            Category::Complaint,
            Category::ConsultantInterest,
        ] {
            let text = composer.compose(category, || panic!("provider must not be called"));
            assert_eq!(Some(text.as_str()), templates.canned(category));
        }
    }

    #[test]
    fn test_general_passes_answer_through() {
        let mut composer = composer(1);
        let text = composer.compose(Category::General, || Ok("Our AI course runs 12 weeks.".to_string()));
        assert_eq!(text, "Our AI course runs 12 weeks.");
    }

    #[test]
    fn test_general_failure_uses_apology_and_support() {
        let mut composer = composer(1);
        let templates = ResponseTemplates::default();

        let text = composer.compose(Category::General, || {
            Err(AppError::ModelUnavailable("down".to_string()))
        });

        let prefix = templates.apology_prefix.clone().unwrap();
        assert_eq!(text, format!("{}{}", prefix, templates.technical_support));
    }

    #[test]
    fn test_career_failure_uses_plain_support() {
        let mut composer = composer(1);
        let text = composer.compose(Category::CareerGuidance, || {
            Err(AppError::Timeout("slow".to_string()))
        });
        assert_eq!(text, ResponseTemplates::default().technical_support);
    }

    #[test]
    fn test_career_answer_gets_seeded_suggestion() {
        let mut composer = composer(42);
        let templates = ResponseTemplates::default();

        let mut replay = StdRng::seed_from_u64(42);
        let expected = templates
            .consultation_suggestions
            .choose(&mut replay)
            .unwrap()
            .clone();

        let text = composer.compose(Category::CareerGuidance, || Ok("X".to_string()));
        assert_eq!(text, format!("X\n\n{}", expected));
    }

    async fn async_answer() -> Result<String, AppError> {
        Ok("async answer".to_string())
    }

    async fn unreachable_answer() -> Result<String, AppError> {
        panic!("provider must not be called")
    }

    #[tokio::test]
    async fn test_compose_async_matches_sync_behavior() {
        let mut composer = composer(3);
        let text = composer.compose_async(Category::General, async_answer).await;
        assert_eq!(text, "async answer");

        let text = composer
            .compose_async(Category::Complaint, unreachable_answer)
            .await;
        assert_eq!(text, ResponseTemplates::default().complaint);
    }
}
