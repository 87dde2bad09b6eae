use crate::llm::Prompt;
use crate::session::Turn;

/// Reply used whenever a question is not covered by the documents
pub const OUT_OF_SCOPE_MESSAGE: &str =
    "That topic is outside my scope. I can help with MFI Business Document related information.";

/// Standing instructions sent with every generation request
pub fn system_instructions() -> String {
    format!(
        "You are a helpful assistant for microfinance domain Q&A. \
         Answer strictly and briefly using ONLY the provided CONTEXT. \
         If the question is unrelated to microfinance documents or the CONTEXT \
         is insufficient, respond exactly: \"{}\"",
        OUT_OF_SCOPE_MESSAGE
    )
}

/// Build the prompt for one question from its retrieved context and the session so far
pub fn build_prompt(question: &str, context_chunks: &[String], history: Vec<Turn>) -> Prompt {
    let context = context_chunks.join("\n\n");

    Prompt {
        system: system_instructions(),
        history,
        user: format!("Question: {}\n\nCONTEXT:\n{}", question, context),
    }
}
