//! Runtime configuration.
//!
//! Deployments differ only by data: which categories are routed, their
//! keywords, the canned texts, and the model/retrieval settings. Everything
//! is validated once at load time and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::brain::{Category, KeywordTable, ResponseTemplates};
use crate::error::AppError;

/// Prompt sent to the model; `{context}`, `{chat_history}` and `{question}` are filled per turn.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are **CareerGPT**, TEQ3's expert AI career advisor specializing in AI and tech industry careers. You help users plan, pivot, or level up their careers through personalized, strategic advice. Your tone is friendly, knowledgeable, supportive, and concise.

## Your Core Mission
Help users successfully transition into or advance within AI and tech careers by providing:
- Strategic career planning and path recommendations
- Skill gap analysis and learning roadmaps
- Job role guidance and market insights
- Portfolio, resume, and interview preparation
- Connections to TEQ3's programs and resources

Context from TEQ3 website: {context}
Previous conversation: {chat_history}
Current question: {question}

Your response:
";

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Built-in router configurations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentProfile {
    /// Technical, complaint, career guidance and consultant routing
    #[default]
    Full,
    /// Only consultant requests are routed; everything else goes to the model
    ConsultantOnly,
}

impl FromStr for DeploymentProfile {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(DeploymentProfile::Full),
            "consultant_only" | "consultant-only" => Ok(DeploymentProfile::ConsultantOnly),
            other => Err(AppError::Config(format!("Unknown deployment profile: '{}'", other))),
        }
    }
}

/// Routing data for one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RouterConfig {
    /// Categories the classifier may route to (`general` is implicit)
    #[validate(custom(function = "routable_categories"))]
    pub active_categories: Vec<Category>,
    /// Keyword lists per category
    #[serde(default)]
    pub keywords: KeywordTable,
    /// Canned texts
    #[serde(default)]
    #[validate(nested)]
    pub templates: ResponseTemplates,
}

#[allow(clippy::ptr_arg)]
fn routable_categories(categories: &Vec<Category>) -> Result<(), ValidationError> {
    if categories.contains(&Category::General) {
        return Err(ValidationError::new("general_is_implicit"));
    }
    Ok(())
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::for_profile(DeploymentProfile::Full)
    }
}

impl RouterConfig {
    /// Built-in configuration for a profile
    pub fn for_profile(profile: DeploymentProfile) -> Self {
        match profile {
            DeploymentProfile::Full => Self {
                active_categories: Category::PRIORITY.to_vec(),
                keywords: KeywordTable::full(),
                templates: ResponseTemplates::default(),
            },
            DeploymentProfile::ConsultantOnly => Self {
                active_categories: vec![Category::ConsultantInterest],
                keywords: KeywordTable::consultant_only(),
                templates: ResponseTemplates::default(),
            },
        }
    }

    /// Parse and validate a JSON router configuration
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Load a JSON router configuration from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        info!("Loaded router configuration from {:?}", path);
        Self::from_json_str(&json)
    }

    /// Validate templates, active set and keyword table
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        self.keywords.check()
    }
}

/// Settings for the OpenAI-compatible completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LlmConfig {
    /// Base URL, `/chat/completions` is appended
    #[validate(url)]
    pub api_base: String,
    /// Bearer token; never serialized
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    #[validate(length(min = 1))]
    pub model: String,
    /// Controls the creativity of the model's responses. Value between 0.0 and 2.0.
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
    #[validate(range(min = 1))]
    pub max_tokens: u32,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    #[validate(custom(function = "has_question_placeholder"))]
    pub prompt_template: String,
}

#[allow(clippy::ptr_arg)]
fn has_question_placeholder(template: &String) -> Result<(), ValidationError> {
    if !template.contains("{question}") {
        return Err(ValidationError::new("missing_question_placeholder"));
    }
    Ok(())
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 600,
            request_timeout_secs: 60,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

/// Settings for the in-memory retrieval index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "overlap_below_chunk_size"))]
pub struct RetrievalConfig {
    /// Target chunk length in characters
    #[validate(range(min = 100))]
    pub chunk_size: usize,
    /// Characters carried over from the previous chunk
    pub chunk_overlap: usize,
    /// Snippets handed to the model per question
    #[validate(range(min = 1))]
    pub top_k: usize,
    /// Directory of `.txt` / `.md` files ingested at startup
    pub knowledge_dir: Option<PathBuf>,
}

fn overlap_below_chunk_size(config: &RetrievalConfig) -> Result<(), ValidationError> {
    if config.chunk_overlap >= config.chunk_size {
        return Err(ValidationError::new("overlap_not_below_chunk_size"));
    }
    Ok(())
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            knowledge_dir: None,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub profile: DeploymentProfile,
    pub router: RouterConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// Unset variables keep their defaults; malformed ones are errors.
    pub fn from_env() -> Result<Self, AppError> {
        let profile = match env_var("CAREERGPT_PROFILE") {
            Some(value) => value.parse()?,
            None => DeploymentProfile::default(),
        };

        let mut router = match env_var("CAREERGPT_ROUTER_CONFIG") {
            Some(path) => RouterConfig::from_path(path)?,
            None => RouterConfig::for_profile(profile),
        };
        if let Some(list) = env_var("CAREERGPT_ACTIVE_CATEGORIES") {
            router.active_categories = parse_categories(&list)?;
        }

        let mut llm = LlmConfig {
            api_key: env_var("OPENAI_API_KEY"),
            ..LlmConfig::default()
        };
        if let Some(base) = env_var("OPENAI_API_BASE") {
            llm.api_base = base;
        }
        if let Some(model) = env_var("CAREERGPT_MODEL") {
            llm.model = model;
        }
        llm.temperature = parse_env("CAREERGPT_TEMPERATURE", llm.temperature)?;
        llm.max_tokens = parse_env("CAREERGPT_MAX_TOKENS", llm.max_tokens)?;

        let mut retrieval = RetrievalConfig {
            knowledge_dir: env_var("CAREERGPT_KNOWLEDGE_DIR").map(PathBuf::from),
            ..RetrievalConfig::default()
        };
        retrieval.top_k = parse_env("CAREERGPT_TOP_K", retrieval.top_k)?;

        let config = Self {
            profile,
            router,
            llm,
            retrieval,
        };
        config.check()?;

        info!(
            profile = ?config.profile,
            categories = ?config.router.active_categories,
            model = %config.llm.model,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate every section
    pub fn check(&self) -> Result<(), AppError> {
        self.router.check()?;
        self.llm.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }
}

/// Parse a comma-separated category list; an empty list disables routing
pub fn parse_categories(list: &str) -> Result<Vec<Category>, AppError> {
    let mut categories = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let category: Category = item.parse()?;
        if category == Category::General {
            return Err(AppError::Config(
                "'general' is the implicit default and cannot be activated".to_string(),
            ));
        }
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    Ok(categories)
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match env_var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {}", key, e))),
        None => Ok(default),
    }
}
