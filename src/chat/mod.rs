// Grounded question answering
// Retrieves the passages nearest a question and asks the chat model to answer
// from them alone

#[cfg(test)]
mod tests;

use itertools::Itertools;
use tracing::debug;

use crate::embeddings::TextEmbedder;
use crate::index::VectorStore;

/// The exact string the model is instructed to emit when the retrieved
/// context does not contain the answer.
pub const REFUSAL_ANSWER: &str = "answer is not available in the context";

/// Hosted chat-completion model. One call per question; conversation history
/// is never replayed into the model.
pub trait ChatModel: Send + Sync {
    fn generate(&self, prompt: &str) -> crate::Result<String>;
}

/// The model's answer, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
}

/// Assemble the grounded prompt: retrieved passages as context, then the
/// question, with the instruction to abstain when the context is
/// insufficient.
#[inline]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question as detailed as possible from the provided context, \
         and make sure to provide all the details. If the answer is not in the \
         provided context, say exactly \"{REFUSAL_ANSWER}\"; do not provide a \
         wrong answer.\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:"
    )
}

/// Answer a question from the index: embed it, retrieve the `top_k` nearest
/// chunks, and invoke the chat model once over the assembled prompt.
///
/// Provider failures propagate to the caller unchanged.
#[inline]
pub async fn answer(
    question: &str,
    store: &VectorStore,
    embedder: &dyn TextEmbedder,
    model: &dyn ChatModel,
    top_k: usize,
) -> crate::Result<Answer> {
    let query_vector = embedder.embed_query(question)?;
    let hits = store.query(&query_vector, top_k).await?;

    debug!("Retrieved {} chunks for question", hits.len());

    let context = hits.iter().map(|hit| hit.text.as_str()).join("\n\n");
    let prompt = build_prompt(&context, question);

    let text = model.generate(&prompt)?;
    Ok(Answer { text })
}
