//! Retrieval-augmented question answering

use std::sync::Arc;

use crate::config::{RetrievalConfig, TimeoutConfig};
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider, VectorStoreProvider};
use crate::resilience::{call_with_retry, CallPolicy, Deadline};
use crate::types::RagAnswer;

use super::prompt::PromptBuilder;

/// Map the top retrieval similarity to an answer confidence in [0, 1]
pub fn confidence_from_similarity(top_similarity: f32) -> f32 {
    if top_similarity.is_nan() {
        return 0.0;
    }
    top_similarity.clamp(0.0, 1.0)
}

/// Embeds a question, retrieves chunks and asks the LLM for a grounded answer
pub struct RagQueryEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
    retrieval: RetrievalConfig,
    embed_policy: CallPolicy,
    search_policy: CallPolicy,
    generate_policy: CallPolicy,
}

impl RagQueryEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        llm: Arc<dyn LlmProvider>,
        retrieval: RetrievalConfig,
        timeouts: &TimeoutConfig,
    ) -> Self {
        let backoff = timeouts.retry_backoff();
        Self {
            embedder,
            store,
            llm,
            retrieval,
            embed_policy: CallPolicy::new(timeouts.embed(), backoff),
            search_policy: CallPolicy::new(timeouts.storage(), backoff),
            generate_policy: CallPolicy::new(timeouts.generate(), backoff),
        }
    }

    /// Answer `question` from the `top_k` most similar chunks
    ///
    /// `top_k` defaults to `retrieval.default_top_k`. When nothing clears
    /// `retrieval.min_similarity` the empty answer is returned without calling
    /// the LLM.
    pub async fn query(&self, question: &str, top_k: Option<usize>, deadline: &Deadline) -> Result<RagAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::validation("question must not be empty"));
        }

        let top_k = top_k.unwrap_or(self.retrieval.default_top_k);
        if top_k == 0 {
            return Err(Error::validation("top_k must be greater than 0"));
        }
        if top_k > self.retrieval.max_top_k {
            return Err(Error::validation(format!(
                "top_k must be at most {}, got {}",
                self.retrieval.max_top_k, top_k
            )));
        }

        let embedding = call_with_retry("question embedding", deadline, self.embed_policy, || {
            self.embedder.embed(question)
        })
        .await?;

        let results = call_with_retry("vector search", deadline, self.search_policy, || {
            self.store.search(&embedding, top_k)
        })
        .await?;

        let results: Vec<_> = results
            .into_iter()
            .filter(|r| r.similarity >= self.retrieval.min_similarity)
            .collect();

        let Some(top) = results.first() else {
            tracing::info!("No chunk above {} similarity, returning empty answer", self.retrieval.min_similarity);
            return Ok(RagAnswer::empty());
        };
        let confidence = confidence_from_similarity(top.similarity);

        tracing::debug!(
            "Retrieved {} chunks (top similarity {:.3})",
            results.len(),
            top.similarity
        );

        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_rag_prompt(question, &context);

        let answer = call_with_retry("generation", deadline, self.generate_policy, || {
            self.llm.generate(&prompt)
        })
        .await
        .map_err(|e| match e {
            Error::DependencyTimeout(_) | Error::Generation(_) => e,
            other => Error::generation(other.to_string()),
        })?;

        Ok(RagAnswer {
            answer: answer.trim().to_string(),
            sources: results.iter().map(|r| r.chunk.chunk_id).collect(),
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::hashing::HashingEmbedder;
    use crate::providers::local::LocalVectorStore;
    use crate::types::DocumentChunk;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::time::Duration;
    use uuid::Uuid;

    /// Echoes a canned answer and records prompts
    struct CannedLlm {
        reply: Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedLlm {
        fn replying(reply: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(Error::DependencyTimeout(msg)) => Err(Error::DependencyTimeout(msg.clone())),
                Err(e) => Err(Error::Internal(e.to_string())),
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    const DIMS: usize = 256;

    fn timeouts() -> TimeoutConfig {
        TimeoutConfig {
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    async fn engine_with(llm: Arc<CannedLlm>, texts: &[&str]) -> (RagQueryEngine, Vec<Uuid>) {
        let embedder = Arc::new(HashingEmbedder::new(DIMS).unwrap());
        let store = Arc::new(LocalVectorStore::in_memory().unwrap());
        let doc_id = Uuid::new_v4();

        let mut ids = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let chunk = DocumentChunk::new(doc_id, i as u32, text.to_string())
                .with_embedding(embedder.embed_text(text));
            store.insert_chunk(&chunk).await.unwrap();
            ids.push(chunk.chunk_id);
        }

        let engine = RagQueryEngine::new(embedder, store, llm, RetrievalConfig::default(), &timeouts());
        (engine, ids)
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_answer_cites_matching_chunk() {
        let llm = CannedLlm::replying(Ok(" The clinic closes at 5pm. ".to_string()));
        let (engine, ids) = engine_with(
            llm.clone(),
            &["The clinic closes at 5pm on weekdays.", "Parking permits are issued by security."],
        )
        .await;

        let answer = engine.query("When does the clinic close?", None, &deadline()).await.unwrap();

        assert_eq!(answer.answer, "The clinic closes at 5pm.");
        assert_eq!(answer.sources.first(), Some(&ids[0]));
        assert!(!answer.sources.contains(&ids[1]));
        assert!(answer.confidence > 0.0 && answer.confidence <= 1.0);

        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("The clinic closes at 5pm on weekdays."));
    }

    #[tokio::test]
    async fn test_empty_index_gives_empty_answer() {
        let llm = CannedLlm::replying(Ok("unused".to_string()));
        let (engine, _) = engine_with(llm.clone(), &[]).await;

        let answer = engine.query("When does the clinic close?", Some(3), &deadline()).await.unwrap();
        assert_eq!(answer, RagAnswer::empty());
        assert!(llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_queries_rejected() {
        let llm = CannedLlm::replying(Ok("unused".to_string()));
        let (engine, _) = engine_with(llm, &["text"]).await;

        for (question, top_k) in [("  ", None), ("ok?", Some(0)), ("ok?", Some(51))] {
            let result = engine.query(question, top_k, &deadline()).await;
            assert!(matches!(result, Err(Error::Validation(_))), "{:?} {:?}", question, top_k);
        }
    }

    #[tokio::test]
    async fn test_llm_failure_is_generation_error() {
        let llm = CannedLlm::replying(Err(Error::internal("boom")));
        let (engine, _) = engine_with(llm, &["The clinic closes at 5pm on weekdays."]).await;

        let result = engine.query("When does the clinic close?", None, &deadline()).await;
        assert!(matches!(result, Err(Error::Generation(_))));
    }

    #[tokio::test]
    async fn test_llm_timeout_retried_then_surfaces() {
        let llm = CannedLlm::replying(Err(Error::DependencyTimeout("slow".to_string())));
        let (engine, _) = engine_with(llm.clone(), &["The clinic closes at 5pm on weekdays."]).await;

        let result = engine.query("When does the clinic close?", None, &deadline()).await;
        assert!(matches!(result, Err(Error::DependencyTimeout(_))));
        assert_eq!(llm.prompts.lock().len(), 2);
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(confidence_from_similarity(1.5), 1.0);
        assert_eq!(confidence_from_similarity(-0.3), 0.0);
        assert_eq!(confidence_from_similarity(f32::NAN), 0.0);
        assert_eq!(confidence_from_similarity(0.42), 0.42);
    }

    proptest! {
        #[test]
        fn prop_confidence_monotonic(a in -1.0f32..1.0, b in -1.0f32..1.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(confidence_from_similarity(low) <= confidence_from_similarity(high));
            prop_assert!((0.0..=1.0).contains(&confidence_from_similarity(high)));
        }
    }
}
