//! # Brain Module
//!
//! Fast, non-LLM routing for CareerGPT.
//! Decides, for each user message, whether to answer with canned text or
//! with the retrieval-augmented model call.
//!
//! ## Components
//! - `intent`: Category enum and keyword-based intent classification
//! - `keywords`: Per-category keyword tables
//! - `templates`: Canned texts, suggestions and greeting
//! - `composer`: Final text composition with model fallback
//! - `router`: Classifier + composer for one user turn

pub mod composer;
pub mod intent;
pub mod keywords;
pub mod router;
pub mod templates;

pub use composer::ResponseComposer;
pub use intent::{Category, IntentClassifier, IntentResult};
pub use keywords::KeywordTable;
pub use router::{ChatRouter, TurnOutcome};
pub use templates::ResponseTemplates;
