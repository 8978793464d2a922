//! Keyword tables for intent routing.
//!
//! A [`KeywordTable`] maps each routable [`Category`] to an ordered list of
//! lowercase substring patterns. Tables are plain data: deployments differ by
//! the table they load, never by code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::intent::Category;
use crate::error::AppError;

/// Login, access and payment problems
const TECHNICAL_KEYWORDS: &[&str] = &[
    "password",
    "login",
    "log in",
    "sign in",
    "access",
    "payment failed",
    "payment issue",
    "charged twice",
    "error",
    "bug",
    "not working",
    "doesn't work",
    "broken",
    "crash",
    "technical issue",
];

/// Dissatisfaction that should be escalated to a person
const COMPLAINT_KEYWORDS: &[&str] = &[
    "complaint",
    "complain",
    "disappointed",
    "unhappy",
    "frustrated",
    "terrible",
    "awful",
    "worst",
    "unacceptable",
    "not satisfied",
    "dissatisfied",
    "waste of money",
    "rip off",
];

/// Career questions the model answers, followed by a consultation nudge
const CAREER_GUIDANCE_KEYWORDS: &[&str] = &[
    "career advice",
    "career change",
    "career switch",
    "switch careers",
    "career path",
    "which course",
    "what course",
    "right course",
    "job prospects",
    "job market",
    "salary",
    "resume",
    "portfolio",
    "interview",
    "get a job",
    "land a job",
    "transition into",
];

/// Requests to talk to a human, as deployed on the consultant-only widget
const CONSULTANT_KEYWORDS: &[&str] = &[
    "speak to someone",
    "talk to human",
    "human advisor",
    "real person",
    "schedule call",
    "book consultation",
    "arrange meeting",
    "connect me with",
];

/// Extra phrasings enabled on the full deployment
const CONSULTANT_KEYWORDS_EXTENDED: &[&str] = &[
    "talk to a human",
    "speak to a human",
    "talk to someone",
    "book a consultation",
    "schedule a call",
    "career consultant",
];

/// Per-category keyword lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTable {
    entries: BTreeMap<Category, Vec<String>>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::full()
    }
}

impl KeywordTable {
    /// A table without any keyword: every utterance routes to `general`
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Keywords for all four routable categories
    pub fn full() -> Self {
        Self::empty()
            .with_keywords(Category::Technical, TECHNICAL_KEYWORDS.iter().copied())
            .with_keywords(Category::Complaint, COMPLAINT_KEYWORDS.iter().copied())
            .with_keywords(Category::CareerGuidance, CAREER_GUIDANCE_KEYWORDS.iter().copied())
            .with_keywords(
                Category::ConsultantInterest,
                CONSULTANT_KEYWORDS
                    .iter()
                    .chain(CONSULTANT_KEYWORDS_EXTENDED.iter())
                    .copied(),
            )
    }

    /// Only the "connect me to a human" triggers; everything else goes to the model
    pub fn consultant_only() -> Self {
        Self::empty().with_keywords(Category::ConsultantInterest, CONSULTANT_KEYWORDS.iter().copied())
    }

    /// Append keywords to a category, lower-cased, skipping duplicates
    pub fn with_keywords<I, S>(mut self, category: Category, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = self.entries.entry(category).or_default();
        for keyword in keywords {
            let keyword = keyword.as_ref().to_lowercase();
            if !list.contains(&keyword) {
                list.push(keyword);
            }
        }
        self
    }

    /// Keywords configured for a category, in declaration order
    pub fn keywords(&self, category: Category) -> &[String] {
        self.entries
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Categories that have at least one keyword
    pub fn categories(&self) -> Vec<Category> {
        self.entries
            .iter()
            .filter(|(_, keywords)| !keywords.is_empty())
            .map(|(category, _)| *category)
            .collect()
    }

    /// Reject tables that would misroute silently.
    ///
    /// An empty keyword matches every utterance and keywords under `general`
    /// can never fire.
    pub fn check(&self) -> Result<(), AppError> {
        if self.entries.get(&Category::General).is_some_and(|k| !k.is_empty()) {
            return Err(AppError::Validation(
                "Keywords cannot be configured for the 'general' category".to_string(),
            ));
        }

        for (category, keywords) in &self.entries {
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(AppError::Validation(format!(
                    "Empty keyword configured for category '{}'",
                    category
                )));
            }
        }

        Ok(())
    }
}
