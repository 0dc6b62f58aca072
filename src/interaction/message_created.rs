//! Handles newly created chat messages.

use tracing::{debug, error, info, instrument};

use crate::{
    base::{
        config::Config,
        types::{AI_SENDER_ID, EventParams, MessageEvent, NewMessage, ReplyOutcome, Res, SkipReason},
    },
    service::{db::DbClient, llm::LlmClient},
};

use super::{mention, response};

/// Handles a "message created" event.
///
/// Replies when the message mentions the bot and was not written by it. If
/// the reply cannot be stored, a best-effort apology is stored instead. This
/// never fails: the returned outcome says what happened.
#[instrument(skip_all, fields(class_code = %event.params.class_code, group_id = %event.params.group_id, message_id = %event.params.message_id))]
pub async fn handle_message_created(event: MessageEvent, config: &Config, db: &DbClient, llm: &LlmClient) -> ReplyOutcome {
    let Some(snapshot) = event.snapshot.as_ref().filter(|snapshot| !snapshot.is_empty()) else {
        debug!("Skipping event without message data.");
        return ReplyOutcome::skipped(SkipReason::EmptySnapshot);
    };

    let text = snapshot.get_str("text").unwrap_or_default();
    let sender_id = snapshot.get_str("senderId").unwrap_or_default();

    if !mention::mentions_assistant(text) {
        debug!("Skipping message without a mention.");
        return ReplyOutcome::skipped(SkipReason::NoMention);
    }

    if sender_id == AI_SENDER_ID {
        debug!("Skipping message written by the bot.");
        return ReplyOutcome::skipped(SkipReason::SelfAuthored);
    }

    let question = mention::extract_question(text);

    info!("Answering mention ...");

    match reply(&event.params, &question, config, db, llm).await {
        Ok(message_id) => ReplyOutcome::Replied { message_id },
        Err(err) => {
            error!("Error generating AI response: {err}");

            match db.append_message(&event.params.class_code, &event.params.group_id, &NewMessage::fallback()).await {
                Ok(message_id) => ReplyOutcome::FallbackReplied { message_id },
                Err(err) => {
                    error!("Error writing fallback reply: {err}");
                    ReplyOutcome::Dropped
                }
            }
        }
    }
}

/// Generate the answer and store it as a reply to the triggering message.
async fn reply(params: &EventParams, question: &str, config: &Config, db: &DbClient, llm: &LlmClient) -> Res<String> {
    let text = response::generate_response(config, llm, question).await;
    let message = NewMessage::ai_reply(text, &params.message_id);

    db.append_message(&params.class_code, &params.group_id, &message).await
}
