//! AI enrichment of ingested entries.
//!
//! For each entry the service refines the summary, scores sentiment and
//! engagement, derives readability scores, generates an embedding vector,
//! and upserts the resulting AIEnrichment record. The language model is an
//! external collaborator behind [`gazette_core::LanguageModel`]; prompts
//! and token budgets live here.
//!
//! Model replies that should be JSON are parsed defensively: a malformed
//! sentiment or engagement reply degrades to a recorded failure and a
//! neutral default, never a crash.

use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;

use gazette_core::{
    failure, AIEnrichment, Clients, EngagementCategory, Entry, HttpFetcher, LanguageModel as _,
    Result, Sentiment,
};

const SUMMARY_PROMPT: &str =
    "Improve this short summary for clarity and engagement, keeping it concise.";
const SUMMARY_MAX_TOKENS: u32 = 50;

const SENTIMENT_PROMPT: &str = "Analyze the sentiment of this text. Categorize it as one of \
    Positive, Negative, Neutral, or Mixed and return a score between -1 and 1. \
    Output should be in the format: { \"sentiment\": \"Positive\", \"score\": 0.8 }.";
const SENTIMENT_MAX_TOKENS: u32 = 20;

const ENGAGEMENT_PROMPT: &str = "Estimate reader engagement for this text. Return a score \
    between 0 and 10 and one to three categories out of Liked, Comment, Shared. \
    Output should be in the format: { \"score\": 7.5, \"categories\": [\"Liked\", \"Shared\"] }.";
const ENGAGEMENT_MAX_TOKENS: u32 = 30;

#[derive(Debug, Deserialize)]
struct SentimentReply {
    sentiment: Sentiment,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct EngagementReply {
    score: f32,
    categories: BTreeSet<EngagementCategory>,
}

/// Outcome of enriching a batch of entries.
#[derive(Debug, Default)]
pub struct EnrichReport {
    /// Number of entries enriched and persisted.
    pub enriched: usize,
    /// Number of entries skipped due to per-entry failures.
    pub skipped: usize,
}

/// Runs AI enrichment over ingested entries.
pub struct EnrichmentService {
    clients: Clients,
    http: Arc<dyn HttpFetcher>,
}

impl EnrichmentService {
    /// Create a service over the given client bundle.
    pub fn new(clients: Clients, http: Arc<dyn HttpFetcher>) -> Self {
        Self { clients, http }
    }

    /// Enrich every entry, isolating per-entry failures.
    pub async fn enrich_batch(&self, entries: &mut [Entry]) -> EnrichReport {
        let mut report = EnrichReport::default();
        for entry in entries.iter_mut() {
            match self.enrich_entry(entry).await {
                Ok(_) => {
                    counter!("enrich_entries_total").increment(1);
                    report.enriched += 1;
                }
                Err(e) => {
                    counter!("enrich_failures_total").increment(1);
                    report.skipped += 1;
                    failure::record_failure(&format!(
                        "failed to enrich entry {}: {e}",
                        entry.row_key()
                    ));
                }
            }
        }
        report
    }

    /// Enrich one entry and upsert its AIEnrichment record.
    pub async fn enrich_entry(&self, entry: &mut Entry) -> Result<AIEnrichment> {
        // Prefer the source-provided summary; fall back to the body.
        let text = match entry.summary.clone() {
            Some(summary) => summary,
            None => entry
                .resolve_content(&self.clients, self.http.as_ref())
                .await?
                .to_string(),
        };

        let summary = self.improve_summary(&text).await?;
        let (sentiment, sentiment_score) = self.analyze_sentiment(&summary).await;
        let ease = reading_ease(&text);
        let embedding = self.clients.model.embed(&summary).await?;

        let mut enrichment = AIEnrichment::for_entry(entry);
        enrichment.summary = Some(truncate_chars(&summary, 500));
        enrichment.sentiment = Some(sentiment);
        enrichment.sentiment_score = Some(sentiment_score.clamp(-1.0, 1.0));
        enrichment.grade_level = Some(grade_level_from_ease(ease));
        enrichment.difficulty = Some(difficulty_from_ease(ease));
        if let Some((score, categories)) = self.score_engagement(&summary).await {
            enrichment.engagement_score = Some(score.clamp(0.0, 10.0));
            enrichment.engagement_categories = Some(categories);
        }
        enrichment.set_embedding(embedding, &self.clients).await?;

        enrichment.create(&self.clients).await
    }

    /// Refine the feed-provided summary with the completion model.
    async fn improve_summary(&self, text: &str) -> Result<String> {
        let reply = self
            .clients
            .model
            .complete(SUMMARY_PROMPT, text, SUMMARY_MAX_TOKENS)
            .await?;
        Ok(reply.trim().to_string())
    }

    /// Sentiment analysis; degrades to (Neutral, 0.0) on a malformed reply.
    async fn analyze_sentiment(&self, text: &str) -> (Sentiment, f32) {
        let reply = match self
            .clients
            .model
            .complete(SENTIMENT_PROMPT, text, SENTIMENT_MAX_TOKENS)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                failure::record_failure(&format!("sentiment analysis failed: {e}"));
                return (Sentiment::Neutral, 0.0);
            }
        };
        match serde_json::from_str::<SentimentReply>(reply.trim()) {
            Ok(parsed) => (parsed.sentiment, parsed.score),
            Err(e) => {
                failure::record_failure(&format!("unparseable sentiment reply '{reply}': {e}"));
                (Sentiment::Neutral, 0.0)
            }
        }
    }

    /// Engagement scoring; degrades to `None` on a malformed reply.
    async fn score_engagement(&self, text: &str) -> Option<(f32, BTreeSet<EngagementCategory>)> {
        let reply = match self
            .clients
            .model
            .complete(ENGAGEMENT_PROMPT, text, ENGAGEMENT_MAX_TOKENS)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                failure::record_failure(&format!("engagement scoring failed: {e}"));
                return None;
            }
        };
        match serde_json::from_str::<EngagementReply>(reply.trim()) {
            Ok(parsed) if !parsed.categories.is_empty() => {
                Some((parsed.score, parsed.categories))
            }
            Ok(_) => None,
            Err(e) => {
                failure::record_failure(&format!("unparseable engagement reply '{reply}': {e}"));
                None
            }
        }
    }
}

/// Flesch reading-ease approximation.
///
/// `206.835 − 1.015·(words per sentence) − 84.6·(chars per word)`, using
/// average word length as a syllable proxy. Higher is easier; typical
/// English prose lands between 0 and 100.
pub fn reading_ease(text: &str) -> f32 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 100.0;
    }
    let sentences = text
        .chars()
        .filter(|c| matches!(c, '.' | '!' | '?'))
        .count()
        .max(1);
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();

    let words_per_sentence = words.len() as f32 / sentences as f32;
    let chars_per_word = total_chars as f32 / words.len() as f32;
    206.835 - 1.015 * words_per_sentence - 84.6 * (chars_per_word / 5.0)
}

/// Map reading ease onto the 0–15 grade-level scale (higher = harder).
pub fn grade_level_from_ease(ease: f32) -> f32 {
    ((100.0 - ease) * 0.15).clamp(0.0, 15.0)
}

/// Map reading ease onto the 4.9–11 difficulty scale (higher = harder).
pub fn difficulty_from_ease(ease: f32) -> f32 {
    (4.9 + (100.0 - ease).max(0.0) * 0.061).clamp(4.9, 11.0)
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gazette_core::memory::{MemoryBlobStore, MemoryQueue, MemoryTableStore, ScriptedFetcher};
    use gazette_core::{content_key, LanguageModel};
    use url::Url;

    /// Model whose completion depends on the system prompt, so one fake
    /// serves summary, sentiment, and engagement calls.
    struct PromptRoutedModel;

    #[async_trait]
    impl LanguageModel for PromptRoutedModel {
        async fn complete(&self, system: &str, _user: &str, _max_tokens: u32) -> Result<String> {
            if system.contains("sentiment") {
                Ok(r#"{"sentiment": "Positive", "score": 0.8}"#.to_string())
            } else if system.contains("engagement") {
                Ok(r#"{"score": 7.5, "categories": ["Liked", "Shared"]}"#.to_string())
            } else {
                Ok("A tighter, clearer summary.".to_string())
            }
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    fn clients_with(model: Arc<dyn LanguageModel>) -> (Clients, Arc<MemoryTableStore>) {
        let tables = Arc::new(MemoryTableStore::new());
        let clients = Clients::new(
            tables.clone(),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryQueue::new()),
            model,
        );
        (clients, tables)
    }

    fn entry() -> Entry {
        let mut e = Entry::new(
            "my_tech_feed",
            "urn:item-1",
            content_key("https://example.com/"),
            Url::parse("https://example.com/posts/1").unwrap(),
        );
        e.summary = Some("Original summary. It explains the story.".to_string());
        e
    }

    #[tokio::test]
    async fn enrich_entry_persists_full_record() {
        let (clients, tables) = clients_with(Arc::new(PromptRoutedModel));
        let service = EnrichmentService::new(clients.clone(), Arc::new(ScriptedFetcher::new()));

        let mut e = entry();
        let enrichment = service.enrich_entry(&mut e).await.unwrap();

        assert_eq!(enrichment.summary.as_deref(), Some("A tighter, clearer summary."));
        assert_eq!(enrichment.sentiment, Some(Sentiment::Positive));
        assert_eq!(enrichment.engagement_score, Some(7.5));
        assert!(enrichment.embedding_key().is_some());

        let record = tables
            .get("ai_enrichment", "my_tech_feed", &e.row_key())
            .unwrap();
        assert_eq!(record["Sentiment"], "\"Positive\"");
        assert!(record.contains_key("EmbeddingsKey"));
    }

    #[tokio::test]
    async fn malformed_sentiment_degrades_to_neutral() {
        struct BadJsonModel;
        #[async_trait]
        impl LanguageModel for BadJsonModel {
            async fn complete(&self, _s: &str, _u: &str, _m: u32) -> Result<String> {
                Ok("definitely positive!!".to_string())
            }
            async fn embed(&self, _t: &str) -> Result<Vec<f32>> {
                Ok(vec![0.0])
            }
        }

        let (clients, _) = clients_with(Arc::new(BadJsonModel));
        let service = EnrichmentService::new(clients, Arc::new(ScriptedFetcher::new()));

        let mut e = entry();
        let enrichment = service.enrich_entry(&mut e).await.unwrap();
        assert_eq!(enrichment.sentiment, Some(Sentiment::Neutral));
        assert_eq!(enrichment.sentiment_score, Some(0.0));
        assert_eq!(enrichment.engagement_score, None);
    }

    #[tokio::test]
    async fn batch_isolates_failures() {
        struct FailingEmbedModel {
            calls: std::sync::atomic::AtomicU32,
        }
        #[async_trait]
        impl LanguageModel for FailingEmbedModel {
            async fn complete(&self, _s: &str, _u: &str, _m: u32) -> Result<String> {
                Ok(r#"{"sentiment": "Neutral", "score": 0.0}"#.to_string())
            }
            async fn embed(&self, _t: &str) -> Result<Vec<f32>> {
                // Fail only the first entry's embedding.
                let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    Err(gazette_core::Error::Model("rate limited".to_string()))
                } else {
                    Ok(vec![1.0])
                }
            }
        }

        let (clients, tables) = clients_with(Arc::new(FailingEmbedModel {
            calls: std::sync::atomic::AtomicU32::new(0),
        }));
        let service = EnrichmentService::new(clients, Arc::new(ScriptedFetcher::new()));

        let first = entry();
        let mut second = entry();
        second.id = "urn:item-2".to_string();
        let mut batch = vec![first, second];

        let report = service.enrich_batch(&mut batch).await;
        assert_eq!(report.enriched, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(tables.len("ai_enrichment"), 1);
    }

    #[test]
    fn reading_ease_orders_simple_before_complex() {
        let simple = "The cat sat. The dog ran. It was fun.";
        let complex = "Multidimensional institutional heterogeneity characterizes \
            contemporary organizational infrastructures notwithstanding countervailing \
            considerations.";
        assert!(reading_ease(simple) > reading_ease(complex));
    }

    #[test]
    fn readability_mappings_respect_bounds() {
        for ease in [-150.0f32, -10.0, 0.0, 35.5, 70.0, 100.0, 150.0] {
            let grade = grade_level_from_ease(ease);
            assert!((0.0..=15.0).contains(&grade), "grade {grade} for ease {ease}");
            let difficulty = difficulty_from_ease(ease);
            assert!(
                (4.9..=11.0).contains(&difficulty),
                "difficulty {difficulty} for ease {ease}"
            );
        }
    }

    #[test]
    fn harder_text_maps_to_higher_scores() {
        let easy = grade_level_from_ease(90.0);
        let hard = grade_level_from_ease(20.0);
        assert!(hard > easy);
        assert!(difficulty_from_ease(20.0) > difficulty_from_ease(90.0));
    }
}
