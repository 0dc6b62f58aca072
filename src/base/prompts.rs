//! Prompt text and the fixed user-facing replies.

/// Persona preamble placed before every question.
pub const STUDY_GROUP_DIRECTIVE: &str = "You are Gemini AI, an intelligent assistant helping students in their study group chat. \nBe helpful, friendly, and concise in your responses. If the question is academic, provide clear explanations.";

/// Question used when a mention carries no text of its own.
pub const DEFAULT_QUESTION: &str = "Hello! How can I help you?";

/// Reply when no API key is available.
pub const API_KEY_NOT_CONFIGURED: &str = "Gemini API key is not configured. Please set GEMINI_API_KEY in environment variables.";

/// Apology written when a reply could not be produced or stored.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error processing your request. Please try again later.";

/// Build the prompt sent to the model.
pub fn build_study_group_prompt(directive: &str, question: &str) -> String {
    format!("{directive}\n\nUser question: {question}")
}

/// Format an LLM failure as a chat reply.
pub fn format_llm_error(error: impl std::fmt::Display) -> String {
    format!("I apologize, but I encountered an error: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_ends_with_question() {
        let prompt = build_study_group_prompt(STUDY_GROUP_DIRECTIVE, "what is 2+2?");

        assert!(prompt.starts_with("You are Gemini AI, an intelligent assistant helping students"));
        assert!(prompt.ends_with("\n\nUser question: what is 2+2?"));
    }

    #[test]
    fn test_llm_error_format() {
        assert_eq!(format_llm_error("quota exceeded"), "I apologize, but I encountered an error: quota exceeded");
    }
}
