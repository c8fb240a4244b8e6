//! Envelope codec: the unit exchanged on the wire.
//!
//! One envelope per frame, serialized as a JSON object:
//!
//! ```text
//! {"id":3735928559,"kind":"call","payload":{"op":"echo","value":"x"}}
//! {"id":3735928559,"kind":"reply","payload":{"value":"x"}}
//! {"id":3735928559,"kind":"error","error":{"message":"no handler registered"}}
//! ```
//!
//! `id` is a JSON number in the `u32` range. Payloads stay as raw JSON text
//! until whoever consumes them knows the target type.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Message carried by an error reply when the receiving side has no handler.
pub const NO_HANDLER_MESSAGE: &str = "no handler registered";

/// Errors decoding or encoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The frame body is not a well-formed envelope.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// An `error` envelope without an error object.
    #[error("error envelope {id} carries no error object")]
    MissingError { id: u32 },
}

/// Structured error sent back in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The fixed error answering calls on a connection with no handler.
    pub fn no_handler() -> Self {
        Self::new(NO_HANDLER_MESSAGE)
    }

    pub fn is_no_handler(&self) -> bool {
        self.message == NO_HANDLER_MESSAGE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// A request issued by the sender; answered with `reply` or `error`.
    Call,
    /// A successful answer to a call.
    Reply,
    /// A failed answer to a call.
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub id: u32,
    pub kind: EnvelopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

/// Outcome carried by a reply envelope.
#[derive(Debug)]
pub enum Reply {
    Value(Box<RawValue>),
    Error(RemoteError),
}

/// A decoded envelope, classified by direction.
#[derive(Debug)]
pub enum Message {
    /// The peer is calling us.
    Call { id: u32, payload: Box<RawValue> },
    /// The peer is answering one of our calls.
    Reply { id: u32, reply: Reply },
}

impl Envelope {
    pub fn call(id: u32, payload: Box<RawValue>) -> Self {
        Self {
            id,
            kind: EnvelopeKind::Call,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn reply(id: u32, outcome: std::result::Result<Box<RawValue>, RemoteError>) -> Self {
        match outcome {
            Ok(payload) => Self {
                id,
                kind: EnvelopeKind::Reply,
                payload: Some(payload),
                error: None,
            },
            Err(error) => Self {
                id,
                kind: EnvelopeKind::Error,
                payload: None,
                error: Some(error),
            },
        }
    }

    /// Serialize to a frame body. JSON escapes control characters, so the
    /// result never contains the frame terminator.
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(body: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Classify the envelope. A missing payload stands for JSON `null`.
    pub fn into_message(self) -> Result<Message, EnvelopeError> {
        let id = self.id;
        match self.kind {
            EnvelopeKind::Call => Ok(Message::Call {
                id,
                payload: payload_or_null(self.payload)?,
            }),
            EnvelopeKind::Reply => Ok(Message::Reply {
                id,
                reply: Reply::Value(payload_or_null(self.payload)?),
            }),
            EnvelopeKind::Error => {
                let error = self.error.ok_or(EnvelopeError::MissingError { id })?;
                Ok(Message::Reply {
                    id,
                    reply: Reply::Error(error),
                })
            }
        }
    }
}

fn payload_or_null(payload: Option<Box<RawValue>>) -> Result<Box<RawValue>, EnvelopeError> {
    match payload {
        Some(payload) => Ok(payload),
        None => Ok(RawValue::from_string("null".to_owned())?),
    }
}
