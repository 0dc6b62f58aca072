//! Shared result aliases, event and message types, and handler outcomes.

use std::collections::BTreeMap;

use serde::Serialize;

use super::document::{Document, FieldValue};

/// Error type used throughout the crate.
pub type Err = anyhow::Error;
/// Result with the crate's error type.
pub type Res<T> = Result<T, Err>;
/// Result carrying no value.
pub type Void = Res<()>;

// Reserved identifiers.

/// Sender id stamped on every AI-authored message.
///
/// Also used to keep the bot from answering its own replies.
pub const AI_SENDER_ID: &str = "gemini_ai";

/// Substring (matched case-insensitively) that asks the bot for a reply.
pub const MENTION_TRIGGER: &str = "@gemini";

/// Model tag stored in `aiModel` on written messages.
///
/// This intentionally differs from the model id sent to the API.
pub const AI_MODEL_TAG: &str = "gemini-pro";

/// Field that receives the server timestamp on write.
pub const CREATED_AT_FIELD: &str = "createdAt";

// Events.

/// Path parameters of a message document:
/// `classes/{class_code}/groups/{group_id}/messages/{message_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventParams {
    /// Class the group belongs to.
    pub class_code: String,
    /// Group whose chat received the message.
    pub group_id: String,
    /// Id of the created message.
    pub message_id: String,
}

/// A "message created" notification from the datastore.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// The created document, if the trigger delivered one.
    pub snapshot: Option<Document>,
    /// Where the document lives.
    pub params: EventParams,
}

// Messages.

/// A message document to be appended to a group's `messages` collection.
///
/// `createdAt` is not part of this struct: the store assigns it at write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Message body (`text`).
    pub text: String,
    /// Author id (`senderId`).
    pub sender_id: String,
    /// Whether the bot wrote it (`isAIMessage`).
    pub is_ai_message: bool,
    /// Model tag (`aiModel`).
    pub ai_model: String,
    /// The message being answered (`replyToMessageId`); omitted when `None`.
    pub reply_to_message_id: Option<String>,
    /// Users who hid the message (`deletedBy`).
    pub deleted_by: Vec<String>,
}

impl NewMessage {
    /// An AI reply to the message with id `reply_to`.
    pub fn ai_reply(text: impl Into<String>, reply_to: impl Into<String>) -> Self {
        Self {
            reply_to_message_id: Some(reply_to.into()),
            ..Self::ai_message(text)
        }
    }

    /// The apology written when a reply could not be produced or stored.
    pub fn fallback() -> Self {
        Self::ai_message(super::prompts::FALLBACK_REPLY)
    }

    fn ai_message(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender_id: AI_SENDER_ID.to_string(),
            is_ai_message: true,
            ai_model: AI_MODEL_TAG.to_string(),
            reply_to_message_id: None,
            deleted_by: Vec::new(),
        }
    }

    /// Encode as Firestore document fields.
    pub fn to_fields(&self) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();

        fields.insert("text".to_string(), FieldValue::from(self.text.as_str()));
        fields.insert("senderId".to_string(), FieldValue::from(self.sender_id.as_str()));
        fields.insert("isAIMessage".to_string(), FieldValue::BooleanValue(self.is_ai_message));
        fields.insert("aiModel".to_string(), FieldValue::from(self.ai_model.as_str()));
        fields.insert("deletedBy".to_string(), FieldValue::array(self.deleted_by.iter().map(|id| FieldValue::from(id.as_str()))));

        if let Some(reply_to) = &self.reply_to_message_id {
            fields.insert("replyToMessageId".to_string(), FieldValue::from(reply_to.as_str()));
        }

        fields
    }
}

// Outcomes.

/// Why an event did not warrant a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The snapshot was missing or had no fields.
    EmptySnapshot,
    /// The text does not mention the bot.
    NoMention,
    /// The message was written by the bot itself.
    SelfAuthored,
}

/// Result of handling one message event.
///
/// None of these is an error to the trigger infrastructure: every event is
/// acknowledged, and nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Nothing was written.
    Skipped {
        /// Which guard applied.
        reason: SkipReason,
    },
    /// The generated reply was stored.
    Replied {
        /// Id of the stored reply.
        message_id: String,
    },
    /// The reply failed, and the apology was stored instead.
    FallbackReplied {
        /// Id of the stored apology.
        message_id: String,
    },
    /// Both the reply and the apology failed to store.
    Dropped,
}

impl ReplyOutcome {
    /// Shorthand for [`ReplyOutcome::Skipped`].
    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_reply_fields() {
        let message = NewMessage::ai_reply("4", "msg-1");
        let fields = message.to_fields();

        assert_eq!(fields.get("text"), Some(&FieldValue::from("4")));
        assert_eq!(fields.get("senderId"), Some(&FieldValue::from(AI_SENDER_ID)));
        assert_eq!(fields.get("isAIMessage"), Some(&FieldValue::BooleanValue(true)));
        assert_eq!(fields.get("aiModel"), Some(&FieldValue::from("gemini-pro")));
        assert_eq!(fields.get("replyToMessageId"), Some(&FieldValue::from("msg-1")));
        assert_eq!(fields.get("deletedBy"), Some(&FieldValue::array([])));
        assert!(!fields.contains_key(CREATED_AT_FIELD));
    }

    #[test]
    fn test_fallback_has_no_reply_reference() {
        let message = NewMessage::fallback();

        assert_eq!(message.text, "Sorry, I encountered an error processing your request. Please try again later.");
        assert_eq!(message.sender_id, AI_SENDER_ID);
        assert!(message.is_ai_message);
        assert!(message.deleted_by.is_empty());
        assert!(!message.to_fields().contains_key("replyToMessageId"));
    }

    #[test]
    fn test_outcome_serialization() {
        let skipped = serde_json::to_value(ReplyOutcome::skipped(SkipReason::NoMention)).unwrap();
        assert_eq!(skipped, serde_json::json!({ "outcome": "skipped", "reason": "no_mention" }));

        let replied = serde_json::to_value(ReplyOutcome::Replied { message_id: "abc".to_string() }).unwrap();
        assert_eq!(replied, serde_json::json!({ "outcome": "replied", "message_id": "abc" }));

        let dropped = serde_json::to_value(ReplyOutcome::Dropped).unwrap();
        assert_eq!(dropped, serde_json::json!({ "outcome": "dropped" }));
    }
}
