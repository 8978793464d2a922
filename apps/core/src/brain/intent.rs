//! Intent Classification using keyword tables.
//!
//! Every utterance is routed to exactly one [`Category`] by plain substring
//! matching against per-category keyword lists, tested in a fixed priority
//! order. No ML model, no regex, no state between calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

use super::keywords::KeywordTable;
use crate::error::AppError;

/// Routing category of a user message.
///
/// Variant order is the routing priority: an utterance matching keywords of
/// several categories goes to the one declared first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Login, payment, access problems.
    Technical,
    /// Dissatisfaction that needs escalation.
    Complaint,
    /// Career questions answered by the model plus a consultation nudge.
    CareerGuidance,
    /// The visitor wants to talk to a human consultant.
    ConsultantInterest,
    /// Everything else; answered by the model.
    General,
}

impl Category {
    /// Categories that can be routed to by keywords, highest priority first.
    pub const PRIORITY: [Category; 4] = [
        Category::Technical,
        Category::Complaint,
        Category::CareerGuidance,
        Category::ConsultantInterest,
    ];

    /// Returns the snake_case label used in configuration and logs
    pub fn label(&self) -> &'static str {
        match self {
            Category::Technical => "technical",
            Category::Complaint => "complaint",
            Category::CareerGuidance => "career_guidance",
            Category::ConsultantInterest => "consultant_interest",
            Category::General => "general",
        }
    }

    /// Whether the category is answered with a canned template, without the model.
    pub fn is_canned(&self) -> bool {
        matches!(
            self,
            Category::Technical | Category::Complaint | Category::ConsultantInterest
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "technical" => Ok(Category::Technical),
            "complaint" => Ok(Category::Complaint),
            "career_guidance" => Ok(Category::CareerGuidance),
            "consultant_interest" => Ok(Category::ConsultantInterest),
            "general" => Ok(Category::General),
            other => Err(AppError::Config(format!("Unknown category: '{}'", other))),
        }
    }
}

/// Result of intent classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Routed category
    pub category: Category,
    /// Keyword that triggered the route (`None` for the default route)
    pub matched_keyword: Option<String>,
}

/// Keyword group for one active category
#[derive(Debug, Clone)]
struct KeywordGroup {
    category: Category,
    keywords: Vec<String>,
}

/// Intent classifier using substring keyword matching
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    groups: Vec<KeywordGroup>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(&KeywordTable::default(), &Category::PRIORITY)
    }
}

impl IntentClassifier {
    /// Build a classifier for the given active categories.
    ///
    /// Groups are always tested in [`Category::PRIORITY`] order, whatever
    /// order `active` lists them in. `General` in `active` is ignored.
    pub fn new(table: &KeywordTable, active: &[Category]) -> Self {
        let groups = Category::PRIORITY
            .iter()
            .filter(|category| active.contains(category))
            .map(|&category| {
                let mut keywords: Vec<String> = Vec::new();
                for keyword in table.keywords(category) {
                    let keyword = keyword.to_lowercase();
                    if !keyword.is_empty() && !keywords.contains(&keyword) {
                        keywords.push(keyword);
                    }
                }
                KeywordGroup { category, keywords }
            })
            .collect();

        Self { groups }
    }

    /// Categories this classifier can route to, in priority order
    pub fn active_categories(&self) -> Vec<Category> {
        self.groups.iter().map(|g| g.category).collect()
    }

    /// Classify an utterance
    pub fn classify(&self, utterance: &str) -> Category {
        self.classify_detailed(utterance).category
    }

    /// Classify an utterance and report the keyword that decided it
    pub fn classify_detailed(&self, utterance: &str) -> IntentResult {
        let text = utterance.to_lowercase();

        for group in &self.groups {
            if let Some(keyword) = group.keywords.iter().find(|k| text.contains(k.as_str())) {
                trace!(category = %group.category, keyword = %keyword, "keyword matched");
                return IntentResult {
                    category: group.category,
                    matched_keyword: Some(keyword.clone()),
                };
            }
        }

        IntentResult {
            category: Category::General,
            matched_keyword: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technical_detection() {
        let classifier = IntentClassifier::default();

        assert_eq!(classifier.classify("My payment failed twice"), Category::Technical);
        assert_eq!(classifier.classify("I forgot my password"), Category::Technical);
        assert_eq!(classifier.classify("PAYMENT FAILED"), Category::Technical);
    }

    #[test]
    fn test_complaint_detection() {
        let classifier = IntentClassifier::default();

        assert_eq!(
            classifier.classify("I am really disappointed with the course"),
            Category::Complaint
        );
    }

    #[test]
    fn test_consultant_detection() {
        let classifier = IntentClassifier::default();

        assert_eq!(
            classifier.classify("Can I speak to someone about the program?"),
            Category::ConsultantInterest
        );
        assert_eq!(
            classifier.classify("Please connect me with an advisor"),
            Category::ConsultantInterest
        );
    }

    #[test]
    fn test_default_route() {
        let classifier = IntentClassifier::default();

        assert_eq!(classifier.classify("hello"), Category::General);
        assert_eq!(classifier.classify(""), Category::General);
        assert_eq!(classifier.classify_detailed("hello").matched_keyword, None);
    }

    #[test]
    fn test_matched_keyword_reported() {
        let classifier = IntentClassifier::default();

        let result = classifier.classify_detailed("my Payment Failed again");
        assert_eq!(result.category, Category::Technical);
        assert_eq!(result.matched_keyword.as_deref(), Some("payment failed"));
    }

    #[test]
    fn test_category_labels_round_trip_through_from_str() {
        for category in Category::PRIORITY {
            assert_eq!(category.label().parse::<Category>().unwrap(), category);
        }
        assert_eq!("General".parse::<Category>().unwrap(), Category::General);
        assert!("billing".parse::<Category>().is_err());
    }

    #[test]
    fn test_canned_categories() {
        assert!(Category::Technical.is_canned());
        assert!(Category::Complaint.is_canned());
        assert!(Category::ConsultantInterest.is_canned());
        assert!(!Category::CareerGuidance.is_canned());
        assert!(!Category::General.is_canned());
    }
}
