use itertools::Itertools;

use crate::embeddings::ChatMessage;

pub const SYSTEM_PROMPT: &str = "You strictly follow the provided context.";

/// Reply the model must give when the context does not contain the answer
pub const REFUSAL: &str = "I don't have the information needed to answer your question.";

/// Wrap the retrieved chunks and the question in the grounding template.
///
/// Chunks are joined with a blank line in retrieval order.
#[inline]
pub fn build_prompt<S: AsRef<str>>(context: &[S], question: &str) -> String {
    let context = context.iter().map(AsRef::as_ref).join("\n\n");

    format!(
        "CONTEXT:\n{context}\n\n\
         RULES:\n\
         - Answer only from the CONTEXT.\n\
         - If the information is not explicitly in the CONTEXT, reply:\n  \"{REFUSAL}\"\n\
         - Never invent facts or use outside knowledge.\n\
         - Never give opinions or interpretations beyond what is written.\n\n\
         EXAMPLES OF QUESTIONS OUTSIDE THE CONTEXT:\n\
         Question: \"What is the capital of France?\"\n\
         Answer: \"{REFUSAL}\"\n\n\
         Question: \"How many customers do we have in 2024?\"\n\
         Answer: \"{REFUSAL}\"\n\n\
         Question: \"Do you think this is good or bad?\"\n\
         Answer: \"{REFUSAL}\"\n\n\
         USER QUESTION:\n{question}\n\n\
         ANSWER THE \"USER QUESTION\""
    )
}

/// System message followed by the grounded user prompt
#[inline]
pub fn build_messages<S: AsRef<str>>(context: &[S], question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_prompt(context, question)),
    ]
}
