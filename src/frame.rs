//! Frame: the wire envelope for every drawing session message.
//!
//! ARCHITECTURE
//! ============
//! Every websocket text message is a Frame: `{"event": <name>, "data": <payload>}`.
//! Inbound frames are decoded into a typed `Inbound` event before they reach the
//! coordinator; outbound events serialize straight back into the same envelope.
//!
//! DESIGN
//! ======
//! - Decoding is two-step: the envelope first, then the payload by event name.
//!   Payload-less events ignore whatever `data` carries.
//! - Decode failures are typed (`FrameError`) with grepable codes so the
//!   transport can log and drop them without closing the connection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{CursorState, Segment, Stroke};

/// Stable identifier of one websocket connection.
pub type ConnectionId = Uuid;

// =============================================================================
// EVENT NAMES
// =============================================================================

pub const EVENT_REGISTER_USER: &str = "registerUser";
pub const EVENT_REQUEST_HISTORY: &str = "requestHistory";
pub const EVENT_START_STROKE: &str = "startStroke";
pub const EVENT_DRAWING: &str = "drawing";
pub const EVENT_STOP_DRAWING: &str = "stopDrawing";
pub const EVENT_CURSOR_MOVE: &str = "cursorMove";
pub const EVENT_UNDO: &str = "undo";
pub const EVENT_REDO: &str = "redo";

// =============================================================================
// ENVELOPE
// =============================================================================

/// Untyped envelope. `data` defaults to `null` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// `startStroke` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStyle {
    pub color: String,
    pub line_width: f64,
}

/// `drawing` payload. Relayed verbatim to peers so they can render live ink
/// before the stroke is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawSegment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: String,
    pub line_width: f64,
}

impl DrawSegment {
    #[must_use]
    pub fn segment(&self) -> Segment {
        Segment {
            x0: self.x0,
            y0: self.y0,
            x1: self.x1,
            y1: self.y1,
        }
    }
}

/// `cursorMove` payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorMove {
    pub x: f64,
    pub y: f64,
    pub state: CursorState,
}

/// `remoteCursor` payload: a cursor move stamped with the mover's identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteCursor {
    pub id: ConnectionId,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub username: String,
    pub state: CursorState,
}

/// One row of the `updateUserList` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    pub id: ConnectionId,
    pub color: String,
    pub username: String,
}

// =============================================================================
// TYPED EVENTS
// =============================================================================

/// Client → server events.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    RegisterUser(String),
    RequestHistory,
    StartStroke(StrokeStyle),
    Drawing(DrawSegment),
    StopDrawing,
    CursorMove(CursorMove),
    Undo,
    Redo,
}

impl Inbound {
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::RegisterUser(_) => EVENT_REGISTER_USER,
            Self::RequestHistory => EVENT_REQUEST_HISTORY,
            Self::StartStroke(_) => EVENT_START_STROKE,
            Self::Drawing(_) => EVENT_DRAWING,
            Self::StopDrawing => EVENT_STOP_DRAWING,
            Self::CursorMove(_) => EVENT_CURSOR_MOVE,
            Self::Undo => EVENT_UNDO,
            Self::Redo => EVENT_REDO,
        }
    }

    /// Decode one inbound text message.
    ///
    /// # Errors
    ///
    /// Returns a `FrameError` if the envelope is not JSON, the event name is
    /// unknown, or the payload does not match the event's shape.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let frame: Frame = serde_json::from_str(text)?;
        Self::from_frame(frame)
    }

    /// Type an already-parsed envelope.
    ///
    /// # Errors
    ///
    /// See [`Inbound::decode`].
    pub fn from_frame(frame: Frame) -> Result<Self, FrameError> {
        let Frame { event, data } = frame;
        let inbound = match event.as_str() {
            EVENT_REGISTER_USER => Self::RegisterUser(payload(EVENT_REGISTER_USER, data)?),
            EVENT_REQUEST_HISTORY => Self::RequestHistory,
            EVENT_START_STROKE => {
                let style: StrokeStyle = payload(EVENT_START_STROKE, data)?;
                check_line_width(EVENT_START_STROKE, style.line_width)?;
                Self::StartStroke(style)
            }
            EVENT_DRAWING => {
                let seg: DrawSegment = payload(EVENT_DRAWING, data)?;
                check_finite(EVENT_DRAWING, &[seg.x0, seg.y0, seg.x1, seg.y1])?;
                check_line_width(EVENT_DRAWING, seg.line_width)?;
                Self::Drawing(seg)
            }
            EVENT_STOP_DRAWING => Self::StopDrawing,
            EVENT_CURSOR_MOVE => {
                let cursor: CursorMove = payload(EVENT_CURSOR_MOVE, data)?;
                check_finite(EVENT_CURSOR_MOVE, &[cursor.x, cursor.y])?;
                Self::CursorMove(cursor)
            }
            EVENT_UNDO => Self::Undo,
            EVENT_REDO => Self::Redo,
            _ => return Err(FrameError::UnknownEvent(event)),
        };
        Ok(inbound)
    }
}

fn payload<T>(event: &'static str, data: serde_json::Value) -> Result<T, FrameError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(data)
        .map_err(|source| FrameError::InvalidPayload { event, source })
}

fn check_line_width(event: &'static str, line_width: f64) -> Result<(), FrameError> {
    if line_width.is_finite() && line_width > 0.0 {
        return Ok(());
    }
    Err(FrameError::OutOfRange {
        event,
        reason: "lineWidth must be a positive number",
    })
}

fn check_finite(event: &'static str, coords: &[f64]) -> Result<(), FrameError> {
    if coords.iter().all(|v| v.is_finite()) {
        return Ok(());
    }
    Err(FrameError::OutOfRange {
        event,
        reason: "non-finite coordinate",
    })
}

/// Server → client events. Serializes directly into the wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Outbound {
    InitialHistory(Vec<Stroke>),
    RedrawAll(Vec<Stroke>),
    Drawing(DrawSegment),
    StopDrawing,
    RemoteCursor(RemoteCursor),
    UpdateUserList(Vec<UserEntry>),
    UserDisconnected { id: ConnectionId },
}

impl Outbound {
    /// Serialize to the JSON text sent over the socket.
    ///
    /// # Errors
    ///
    /// Returns a serialization error.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Cursor and segment relays are high-frequency; the transport keeps them out of info logs.
    #[must_use]
    pub fn is_chatty(&self) -> bool {
        matches!(self, Self::Drawing(_) | Self::RemoteCursor(_))
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Grepable error code for structured log lines.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("invalid {event} payload: {source}")]
    InvalidPayload {
        event: &'static str,
        source: serde_json::Error,
    },
    #[error("invalid {event} payload: {reason}")]
    OutOfRange {
        event: &'static str,
        reason: &'static str,
    },
}

impl ErrorCode for FrameError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "E_INVALID_JSON",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::InvalidPayload { .. } | Self::OutOfRange { .. } => "E_INVALID_PAYLOAD",
        }
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
