//! Prompt templates for RAG generation

use crate::providers::vector_store::VectorSearchResult;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from search results, numbered in retrieval order
    pub fn build_context(results: &[VectorSearchResult]) -> String {
        let mut context = String::new();

        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                Self::format_source_ref(result),
                result.chunk.text
            ));
        }

        context
    }

    /// Format source reference for context
    fn format_source_ref(result: &VectorSearchResult) -> String {
        let mut parts = vec![match result.chunk.metadata.get("title") {
            Some(title) => title.clone(),
            None => format!("Document {}", result.chunk.doc_id),
        }];
        parts.push(format!("Part {}", result.chunk.chunk_index + 1));

        if let Some(section) = result.chunk.metadata.get("section") {
            parts.push(format!("Section: {}", section));
        }

        parts.join(", ")
    }

    /// Build the full RAG prompt with strict grounding
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a hospital information assistant that ONLY uses information from the provided documents.

GROUNDING RULES:
1. ONLY use information that is EXPLICITLY stated in the CONTEXT below
2. If the answer is not in the context, respond with "This information is not available in the provided documents."
3. NEVER use general knowledge or make assumptions about hospital policy
4. Refer to sources by their number, e.g. [1] or [2]
5. Keep the answer short and factual

CONTEXT FROM DOCUMENTS:
{context}

QUESTION: {question}

Answer using ONLY the document content above:"#,
            context = context,
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentChunk;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn result(text: &str, index: u32, metadata: HashMap<String, String>) -> VectorSearchResult {
        VectorSearchResult {
            chunk: DocumentChunk::new(Uuid::new_v4(), index, text.to_string()).with_metadata(metadata),
            similarity: 0.9,
        }
    }

    #[test]
    fn test_context_numbered_in_order() {
        let mut metadata = HashMap::new();
        metadata.insert("title".to_string(), "Visitor handbook".to_string());

        let context = PromptBuilder::build_context(&[
            result("The clinic closes at 5pm on weekdays.", 0, metadata),
            result("Parking is free after 6pm.", 3, HashMap::new()),
        ]);

        let first = context.find("[1] Visitor handbook, Part 1").unwrap();
        let second = context.find("[2] Document ").unwrap();
        assert!(first < second);
        assert!(context.contains("Part 4"));
        assert!(context.contains("The clinic closes at 5pm on weekdays."));
    }

    #[test]
    fn test_prompt_contains_question_and_context() {
        let prompt = PromptBuilder::build_rag_prompt("When does the clinic close?", "[1] ctx");
        assert!(prompt.contains("QUESTION: When does the clinic close?"));
        assert!(prompt.contains("[1] ctx"));
    }
}
