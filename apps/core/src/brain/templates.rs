//! Canned response texts.
//!
//! Static content returned verbatim for the intents that never reach the
//! model, plus the consultation suggestions appended to career answers.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::intent::Category;

const TECHNICAL_SUPPORT: &str = "If none of the solutions above worked, our technical support team is here to help:

📧 Email: support@teq3.ai
💬 Live Chat: Visit teq3.ai for instant support
⏰ Response time: Usually within 2-4 hours

They'll be able to look into your specific account and resolve this quickly! 🛠️";

const COMPLAINT: &str = "I'm truly sorry you're experiencing this issue. Your satisfaction is important to us.

For urgent concerns that need immediate attention:
📧 careers@teq3.ai (for program/course concerns)
📧 support@teq3.ai (for technical/billing issues)
📧 hello@teq3.ai (for general feedback)

Our team will prioritize your concern and get back to you within 24 hours. 💪";

const CONSULTATION: &str = "That's fantastic! 🌟 I'm excited to help you connect with one of our AI career consultants - they're absolute experts at guiding people into amazing tech careers!

Here's how to reach our career consultation team:
   🌐 Visit: teq3.ai/contact
   📧 Email: careers@teq3.ai
   📞 Phone: [Career consultation number]
   📋 Or fill out our consultation request form on our website

Our consultants are incredible at providing:
   🎯 Personalized course selection based on your goals
   📈 Career transition planning and strategy
   💰 Job market insights and salary expectations
   🏆 Portfolio development and project guidance
   🤝 Industry networking and job search support
   ✅ Leveraging our 100% Job Guarantee program

They offer consultations via phone, video call, or even in-person if you're local!

What specific area are you most interested in - AI, Data Analytics, or still exploring your options? 🤔";

const SUGGESTIONS: &[&str] = &[
    "Would you like to speak with one of our career consultants for personalized guidance? 🚀",
    "Want to connect with our career team for a deeper dive into your options? 🗺️",
    "Interested in a one-on-one consultation to create your personalized roadmap? 💡",
];

const APOLOGY_PREFIX: &str =
    "I encountered an error processing your request. Let me connect you with our support team who can help: ";

const GREETING: &str = "Hi there! 👋 I'm excited to help you with your AI or Data Analytics career journey. What brings you here today? 😊";

/// Canned texts for one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ResponseTemplates {
    /// Returned for `technical`, and substituted whenever the model fails
    #[validate(length(min = 1))]
    pub technical_support: String,
    /// Returned for `complaint`
    #[validate(length(min = 1))]
    pub complaint: String,
    /// Returned for `consultant_interest`
    #[validate(length(min = 1))]
    pub consultation: String,
    /// Call-to-action lines, one is appended to each career answer
    #[validate(length(min = 1), custom(function = "non_blank_entries"))]
    pub consultation_suggestions: Vec<String>,
    /// Prepended to the fallback on the `general` path
    #[serde(default)]
    pub apology_prefix: Option<String>,
    /// First assistant message of every session
    #[validate(length(min = 1))]
    pub greeting: String,
}

#[allow(clippy::ptr_arg)]
fn non_blank_entries(values: &Vec<String>) -> Result<(), ValidationError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(ValidationError::new("blank_entry"));
    }
    Ok(())
}

impl Default for ResponseTemplates {
    fn default() -> Self {
        Self {
            technical_support: TECHNICAL_SUPPORT.to_string(),
            complaint: COMPLAINT.to_string(),
            consultation: CONSULTATION.to_string(),
            consultation_suggestions: SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            apology_prefix: Some(APOLOGY_PREFIX.to_string()),
            greeting: GREETING.to_string(),
        }
    }
}

impl ResponseTemplates {
    /// Fixed answer for a canned category, `None` for model-backed ones
    pub fn canned(&self, category: Category) -> Option<&str> {
        match category {
            Category::Technical => Some(&self.technical_support),
            Category::Complaint => Some(&self.complaint),
            Category::ConsultantInterest => Some(&self.consultation),
            Category::CareerGuidance | Category::General => None,
        }
    }
}
