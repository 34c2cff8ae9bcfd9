//! Presence directory: who is connected, their color, and their session state.
//!
//! DESIGN
//! ======
//! One `Session` per registered connection, keyed by connection id. The
//! session owns that connection's cursor and in-progress stroke; nothing
//! else mutates them. Sessions carry a registration sequence number so the
//! presence list is ordered by registration without a second index.

use std::collections::HashMap;

use rand::Rng;

use crate::frame::{ConnectionId, UserEntry};
use crate::services::stroke::StrokeAssembler;
use crate::state::{Cursor, CursorState};

/// Saturation and lightness for assigned colors. Hue is uniformly random.
const COLOR_SATURATION: u8 = 100;
const COLOR_LIGHTNESS: u8 = 75;

/// Random bright display color as a CSS `hsl()` string.
#[must_use]
pub fn random_display_color() -> String {
    let hue: u16 = rand::rng().random_range(0..360);
    format!("hsl({hue}, {COLOR_SATURATION}%, {COLOR_LIGHTNESS}%)")
}

#[derive(Debug, Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub display_color: String,
    pub username: String,
    pub cursor: Cursor,
    pub assembler: StrokeAssembler,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct PresenceDirectory {
    sessions: HashMap<ConnectionId, Session>,
    next_seq: u64,
}

impl PresenceDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return its display color. Registering an
    /// already registered connection renames it and keeps its color and slot.
    pub fn register(&mut self, connection_id: ConnectionId, username: &str) -> String {
        let username = username.to_owned();
        if let Some(session) = self.sessions.get_mut(&connection_id) {
            session.username = username;
            return session.display_color.clone();
        }

        let display_color = random_display_color();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.sessions.insert(
            connection_id,
            Session {
                connection_id,
                display_color: display_color.clone(),
                username,
                cursor: Cursor::default(),
                assembler: StrokeAssembler::new(),
                seq,
            },
        );
        display_color
    }

    /// Remove a session. Any in-progress stroke goes with it.
    pub fn deregister(&mut self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions.remove(&connection_id)
    }

    /// Update a cursor. Returns the session so the caller can stamp the relay
    /// with identity; `None` for unregistered connections.
    pub fn update_cursor(
        &mut self,
        connection_id: ConnectionId,
        x: f64,
        y: f64,
        state: CursorState,
    ) -> Option<&Session> {
        let session = self.sessions.get_mut(&connection_id)?;
        session.cursor = Cursor { x, y, state };
        Some(session)
    }

    pub fn get_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Session> {
        self.sessions.get_mut(&connection_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Presence list ordered by registration.
    #[must_use]
    pub fn list(&self) -> Vec<UserEntry> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by_key(|s| s.seq);
        sessions
            .into_iter()
            .map(|s| UserEntry {
                id: s.connection_id,
                color: s.display_color.clone(),
                username: s.username.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
impl PresenceDirectory {
    pub fn get(&self, connection_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection_id)
    }

    pub fn is_registered(&self, connection_id: ConnectionId) -> bool {
        self.sessions.contains_key(&connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
