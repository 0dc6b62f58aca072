//! Decoding of Firestore trigger deliveries.
//!
//! Eventarc delivers document events as CloudEvents over HTTP. In binary
//! content mode the attributes arrive as `ce-*` headers and the body is the
//! `DocumentEventData` JSON; in structured mode the whole event is a JSON
//! object with the payload under `data`.

use anyhow::anyhow;
use axum::http::{HeaderMap, header::CONTENT_TYPE};
use serde::Deserialize;

use crate::base::{
    document::DocumentEventData,
    types::{EventParams, MessageEvent, Res},
};

/// Event type for a created Firestore document.
pub const DOCUMENT_CREATED: &str = "google.cloud.firestore.document.v1.created";
/// Same as [`DOCUMENT_CREATED`], with the writer's identity attached.
pub const DOCUMENT_CREATED_WITH_AUTH_CONTEXT: &str = "google.cloud.firestore.document.v1.created.withAuthContext";

const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

/// A structured-mode CloudEvent. Unused attributes are ignored.
#[derive(Debug, Deserialize)]
struct StructuredCloudEvent {
    #[serde(rename = "type")]
    event_type: Option<String>,
    subject: Option<String>,
    document: Option<String>,
    data: Option<DocumentEventData>,
}

/// The parts of a delivery the handler needs, whichever mode it came in.
struct Delivery {
    event_type: Option<String>,
    subject: Option<String>,
    document: Option<String>,
    data: Option<DocumentEventData>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
}

fn is_created_event(event_type: &str) -> bool {
    event_type == DOCUMENT_CREATED || event_type == DOCUMENT_CREATED_WITH_AUTH_CONTEXT
}

fn read_delivery(headers: &HeaderMap, body: &[u8]) -> Res<Delivery> {
    let content_type = header(headers, CONTENT_TYPE.as_str()).unwrap_or_default();

    if content_type.starts_with(STRUCTURED_CONTENT_TYPE) {
        let event: StructuredCloudEvent = serde_json::from_slice(body)?;

        return Ok(Delivery {
            event_type: event.event_type,
            subject: event.subject,
            document: event.document,
            data: event.data,
        });
    }

    let data = if body.iter().all(u8::is_ascii_whitespace) { None } else { Some(serde_json::from_slice(body)?) };

    Ok(Delivery {
        event_type: header(headers, "ce-type"),
        subject: header(headers, "ce-subject"),
        document: header(headers, "ce-document"),
        data,
    })
}

/// Decode an HTTP delivery into a [`MessageEvent`].
///
/// The path parameters come from the created document's name, falling back
/// to the `document` and `subject` attributes when the payload carries no
/// document. Yields `None` when the delivery carries neither a document nor
/// a path, since there is nothing to reply to.
pub fn decode_message_event(headers: &HeaderMap, body: &[u8]) -> Res<Option<MessageEvent>> {
    let delivery = read_delivery(headers, body)?;

    if let Some(event_type) = &delivery.event_type
        && !is_created_event(event_type)
    {
        return Err(anyhow!("Unsupported event type `{event_type}`."));
    }

    let snapshot = delivery.data.and_then(|data| data.value);

    let path = snapshot.as_ref().and_then(|snapshot| snapshot.name.clone()).or(delivery.document).or(delivery.subject);

    let Some(path) = path else {
        if snapshot.is_none() {
            return Ok(None);
        }

        return Err(anyhow!("Event does not name a document."));
    };

    let params = EventParams::from_document_path(&path)?;

    Ok(Some(MessageEvent { snapshot, params }))
}

// Tests.
