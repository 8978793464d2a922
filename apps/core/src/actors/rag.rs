use crate::actors::messages::{AppError, RagMessage, SearchResult};
use crate::actors::traits::RagActor;
use crate::config::RetrievalConfig;
use async_trait::async_trait;
use lru::LruCache;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

const RAG_TIMEOUT: Duration = Duration::from_secs(30);

/// Chunks shorter than this are treated as noise and never indexed.
const MIN_CHUNK_CHARS: usize = 20;
const MIN_TERM_CHARS: usize = 3;

const STOPWORDS_EN: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "nor", "for", "yet", "so", "i", "you", "he", "she", "it",
    "we", "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their",
    "mine", "yours", "hers", "ours", "theirs", "this", "that", "these", "those", "who", "whom",
    "which", "what", "whose", "is", "am", "are", "was", "were", "be", "been", "being", "have",
    "has", "had", "having", "do", "does", "did", "doing", "will", "would", "shall", "should",
    "can", "could", "may", "might", "must", "in", "on", "at", "to", "from", "by", "with", "about",
    "against", "between", "into", "through", "during", "before", "after", "above", "below", "up",
    "down", "out", "off", "over", "under", "again", "further", "here", "there", "where", "when",
    "why", "how", "all", "each", "every", "both", "few", "more", "most", "other", "some", "any",
    "no", "not", "only", "own", "same", "than", "too", "very", "just", "also", "now", "then",
    "once", "always", "never", "if", "because", "as", "until", "while", "although", "though",
    "yes", "maybe",
];

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}_]+").expect("token pattern is a valid regex"));

/// A handle to the `RagActor`.
///
/// This provides a public, cloneable interface for sending messages to the running RAG actor,
/// which manages the knowledge base and document retrieval.
#[derive(Clone)]
pub struct RagActorHandle {
    sender: mpsc::Sender<RagMessage>,
}

impl RagActorHandle {
    /// Creates a new `RagActor` with an empty knowledge base and returns a handle to it.
    pub fn new(config: &RetrievalConfig) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let actor = RagActorRunner::new(receiver, config);
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }
}

#[async_trait]
impl RagActor for RagActorHandle {
    async fn ingest(&self, content: String, source: Option<String>) -> Result<usize, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = RagMessage::Ingest {
            content,
            source,
            responder: send,
        };
        self.sender
            .send(msg)
            .await
            .map_err(|_| AppError::Actor("RAG Actor closed".to_string()))?;
        timeout(RAG_TIMEOUT, recv)
            .await?
            .map_err(|_| AppError::Actor("RAG Actor failed to respond".to_string()))?
    }

    async fn search(&self, query: String, limit: usize) -> Result<Vec<SearchResult>, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = RagMessage::Search {
            query,
            limit,
            responder: send,
        };
        self.sender
            .send(msg)
            .await
            .map_err(|_| AppError::Actor("RAG Actor closed".to_string()))?;
        timeout(RAG_TIMEOUT, recv)
            .await?
            .map_err(|_| AppError::Actor("RAG Actor failed to respond".to_string()))?
    }
}

/// Splits text into chunks of at most `chunk_size` characters on word
/// boundaries, repeating up to `overlap` trailing characters of each chunk at
/// the start of the next one. A single word longer than `chunk_size` becomes
/// its own chunk.
pub(crate) fn chunk_text(content: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for word in content.split_whitespace() {
        let word_len = word.chars().count();

        if !current.is_empty() && current_len + 1 + word_len > chunk_size {
            chunks.push(current.join(" "));

            // Keep the longest word-aligned tail that fits in the overlap.
            let mut kept = 0;
            let mut start = current.len();
            while start > 0 {
                let len = current[start - 1].chars().count() + usize::from(kept > 0);
                if kept + len > overlap {
                    break;
                }
                kept += len;
                start -= 1;
            }
            if start == 0 {
                current.clear();
            } else {
                current.drain(..start);
            }
            current_len = joined_len(&current);

            // The overlap gives way when it would push the next word over the limit.
            while !current.is_empty() && current_len + 1 + word_len > chunk_size {
                current.remove(0);
                current_len = joined_len(&current);
            }
        }

        current_len += word_len + usize::from(!current.is_empty());
        current.push(word);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
        .into_iter()
        .filter(|chunk| chunk.chars().count() >= MIN_CHUNK_CHARS)
        .collect()
}

fn joined_len(words: &[&str]) -> usize {
    words.iter().map(|w| w.chars().count()).sum::<usize>() + words.len().saturating_sub(1)
}

/// Lowercased content terms of a text, stopwords and very short tokens removed.
pub(crate) fn tokenize(text: &str, stopwords: &HashSet<&'static str>) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| {
            w.chars().count() >= MIN_TERM_CHARS
                && !stopwords.contains(*w)
                && !w.chars().all(|c| c.is_numeric())
        })
        .map(str::to_string)
        .collect()
}

struct IndexedChunk {
    id: String,
    content: String,
    source: Option<String>,
    term_counts: HashMap<String, usize>,
    term_total: usize,
}

// --- Actor Runner (Internal Logic) ---
struct RagActorRunner {
    receiver: mpsc::Receiver<RagMessage>,
    chunk_size: usize,
    chunk_overlap: usize,
    stopwords: HashSet<&'static str>,
    chunks: Vec<IndexedChunk>,
    /// Number of chunks each term appears in.
    doc_freq: HashMap<String, usize>,
    search_cache: LruCache<String, Vec<SearchResult>>,
}

impl RagActorRunner {
    const CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(size) => size,
        None => panic!("Cache size must be non-zero"),
    };

    fn new(receiver: mpsc::Receiver<RagMessage>, config: &RetrievalConfig) -> Self {
        Self {
            receiver,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            stopwords: STOPWORDS_EN.iter().copied().collect(),
            chunks: Vec::new(),
            doc_freq: HashMap::new(),
            search_cache: LruCache::new(Self::CACHE_SIZE),
        }
    }

    async fn run(mut self) {
        info!(
            chunk_size = self.chunk_size,
            chunk_overlap = self.chunk_overlap,
            "RagActor started"
        );
        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg);
        }
        info!("RagActor stopped");
    }

    fn handle_message(&mut self, msg: RagMessage) {
        match msg {
            RagMessage::Ingest {
                content,
                source,
                responder,
            } => {
                let result = self.ingest_document(&content, source);
                if responder.send(result).is_err() {
                    warn!("Failed to send ingest response (channel closed)");
                }
            }
            RagMessage::Search {
                query,
                limit,
                responder,
            } => {
                let result = self.search_documents(&query, limit);
                if responder.send(result).is_err() {
                    warn!("Failed to send search response (channel closed)");
                }
            }
        }
    }

    fn ingest_document(&mut self, content: &str, source: Option<String>) -> Result<usize, AppError> {
        let chunks = chunk_text(content, self.chunk_size, self.chunk_overlap);

        if chunks.is_empty() {
            warn!(
                "Document ingestion skipped: No valid chunks found (content length: {})",
                content.len()
            );
            return Ok(0);
        }

        let total_chunks = chunks.len();
        for chunk in chunks {
            let terms = tokenize(&chunk, &self.stopwords);
            let mut term_counts: HashMap<String, usize> = HashMap::new();
            for term in &terms {
                *term_counts.entry(term.clone()).or_insert(0) += 1;
            }
            for term in term_counts.keys() {
                *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
            }

            self.chunks.push(IndexedChunk {
                id: Uuid::new_v4().to_string(),
                content: chunk,
                source: source.clone(),
                term_counts,
                term_total: terms.len(),
            });
        }

        self.search_cache.clear();
        info!(
            source = source.as_deref().unwrap_or("-"),
            "Ingested {} chunks ({} indexed in total)",
            total_chunks,
            self.chunks.len()
        );
        Ok(total_chunks)
    }

    fn search_documents(&mut self, query: &str, limit: usize) -> Result<Vec<SearchResult>, AppError> {
        let cache_key = format!("{}:{}", limit, query);
        if let Some(results) = self.search_cache.get(&cache_key) {
            debug!("Cache hit for query: '{}'", query);
            return Ok(results.clone());
        }
        debug!("Cache miss for query: '{}'", query);

        let query_terms: HashSet<String> = tokenize(query, &self.stopwords).into_iter().collect();
        let total_chunks = self.chunks.len() as f32;

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .filter(|chunk| chunk.term_total > 0)
            .filter_map(|chunk| {
                let score: f32 = query_terms
                    .iter()
                    .filter_map(|term| {
                        let count = *chunk.term_counts.get(term)?;
                        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
                        let tf = count as f32 / chunk.term_total as f32;
                        let idf = ((total_chunks + 1.0) / (df + 1.0)).ln() + 1.0;
                        Some(tf * idf)
                    })
                    .sum();
                (score > 0.0).then_some((score, chunk))
            })
            .collect();

        // Stable sort keeps ingestion order for equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let results: Vec<SearchResult> = scored
            .into_iter()
            .take(limit)
            .map(|(score, chunk)| {
                debug!(chunk_id = %chunk.id, score, "retrieved chunk");
                SearchResult {
                    content: chunk.content.clone(),
                    source: chunk.source.clone(),
                    score,
                }
            })
            .collect();

        self.search_cache.put(cache_key, results.clone());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COURSES: &str = "TEQ3 offers an Artificial Intelligence programme covering machine \
        learning, deep learning and model deployment. Graduates work as machine learning engineers.";
    const ANALYTICS: &str = "The Data Analytics track teaches SQL, dashboards and statistics for \
        business analysts who want to move into data science roles.";

    fn small_config() -> RetrievalConfig {
        RetrievalConfig {
            chunk_size: 100,
            chunk_overlap: 20,
            ..RetrievalConfig::default()
        }
    }

    #[test]
    fn test_chunk_text_respects_size_and_overlap() {
        let text = (0..60).map(|i| format!("word{:02}", i)).collect::<Vec<_>>().join(" ");

        let chunks = chunk_text(&text, 100, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "chunk too long: {}", chunk);
        }
        // The tail of each chunk opens the next one.
        for pair in chunks.windows(2) {
            let first_word = pair[1].split(' ').next().unwrap();
            assert!(pair[0].split(' ').any(|w| w == first_word));
        }
        assert!(chunks.last().unwrap().ends_with("word59"));

        // A long word after the overlap tail still fits the limit.
        let short_words = (0..10).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        let text = format!("{} {}", short_words, "x".repeat(90));

        let chunks = chunk_text(&text, 100, 20);

        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "chunk too long: {}", chunk);
        }
        assert!(chunks[1].ends_with(&"x".repeat(90)));
    }

    #[test]
    fn test_chunk_text_handles_multibyte_text() {
        let text = "développeur données sécurité ".repeat(40);

        let chunks = chunk_text(&text, 100, 30);

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn test_chunk_text_drops_tiny_chunks() {
        assert!(chunk_text("too short", 1000, 200).is_empty());
        assert!(chunk_text("   \n  ", 1000, 200).is_empty());
        assert_eq!(chunk_text(COURSES, 1000, 200), vec![COURSES.split_whitespace().collect::<Vec<_>>().join(" ")]);
    }

    #[test]
    fn test_tokenize_filters_stopwords_and_short_terms() {
        let stopwords: HashSet<&'static str> = STOPWORDS_EN.iter().copied().collect();

        let terms = tokenize("What is the AI programme at TEQ3 in 2024?", &stopwords);

        assert_eq!(terms, vec!["programme".to_string(), "teq3".to_string()]);
    }

    #[tokio::test]
    async fn test_search_ranks_matching_chunk_first() {
        let handle = RagActorHandle::new(&small_config());
        handle.ingest(COURSES.to_string(), Some("courses.md".to_string())).await.unwrap();
        handle.ingest(ANALYTICS.to_string(), Some("analytics.md".to_string())).await.unwrap();

        let results = handle
            .search("Which machine learning jobs can graduates get?".to_string(), 5)
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].source.as_deref(), Some("courses.md"));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_search_without_matches_is_empty() {
        let handle = RagActorHandle::new(&small_config());
        handle.ingest(COURSES.to_string(), None).await.unwrap();

        let results = handle.search("cooking recipes".to_string(), 5).await.unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let handle = RagActorHandle::new(&small_config());
        handle.ingest(COURSES.repeat(4), None).await.unwrap();

        let results = handle.search("machine learning".to_string(), 2).await.unwrap();

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_invalidates_cached_searches() {
        let handle = RagActorHandle::new(&small_config());
        handle.ingest(COURSES.to_string(), None).await.unwrap();
        let before = handle.search("dashboards statistics".to_string(), 5).await.unwrap();
        assert!(before.is_empty());

        handle.ingest(ANALYTICS.to_string(), None).await.unwrap();
        let after = handle.search("dashboards statistics".to_string(), 5).await.unwrap();

        assert!(!after.is_empty());
        assert!(after[0].content.contains("dashboards"));
    }

    #[tokio::test]
    async fn test_ingest_empty_document_stores_nothing() {
        let handle = RagActorHandle::new(&RetrievalConfig::default());

        let stored = handle.ingest("   ".to_string(), None).await.unwrap();

        assert_eq!(stored, 0);
        assert!(handle.search("anything".to_string(), 5).await.unwrap().is_empty());
    }
}
