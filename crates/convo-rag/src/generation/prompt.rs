//! Prompt templates for refinement and grounded answering

/// Instruction sent as the system message on every answer call
pub const SYSTEM_INSTRUCTION: &str = "Answer the question as truthfully as possible using the provided context, \
and if the answer is not contained within the text below, say 'I don't know'";

/// Prompt builder for the two LLM calls of a turn
pub struct PromptBuilder;

impl PromptBuilder {
    /// Prompt asking the model to rewrite `query` for knowledge-base lookup
    pub fn build_refine_prompt(conversation: &str, query: &str) -> String {
        format!(
            r#"Given the following user query and conversation log, formulate a question that would be the most relevant to provide the user with an answer from a knowledge base.

CONVERSATION LOG: 
{conversation}

Query: {query}

Refined Query:"#,
            conversation = conversation,
            query = query
        )
    }

    /// Final user message embedding the retrieved context and the raw query
    pub fn build_augmented_message(context: &str, query: &str) -> String {
        format!("Context:\n{}\n\nQuery:\n{}", context, query)
    }
}
