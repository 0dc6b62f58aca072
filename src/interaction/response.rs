//! Response generation for a single question.

use tracing::{error, instrument, warn};

use crate::{
    base::{config::Config, prompts},
    service::llm::LlmClient,
};

/// Ask the model `question` in the study-group persona.
///
/// Never fails: a missing API key or a failed call comes back as a reply
/// explaining the problem, to be posted like any other answer.
#[instrument(skip_all)]
pub async fn generate_response(config: &Config, llm: &LlmClient, question: &str) -> String {
    if !config.has_gemini_api_key() {
        warn!("Gemini API key is not configured; skipping the model call.");
        return prompts::API_KEY_NOT_CONFIGURED.to_string();
    }

    let prompt = prompts::build_study_group_prompt(&config.system_directive, question);

    match llm.generate_content(&config.gemini_model, &prompt).await {
        Ok(text) => text,
        Err(err) => {
            error!("Error calling Gemini API: {err}");
            prompts::format_llm_error(err)
        }
    }
}
