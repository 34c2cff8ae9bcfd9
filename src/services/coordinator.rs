//! Synchronization coordinator: the event table that ties the services together.
//!
//! DESIGN
//! ======
//! `handle` is pure state transition: it mutates presence, assembler, and
//! history, then returns `Outcome`s describing what to send and to whom.
//! `dispatch` applies those outcomes through the broadcaster. Keeping the two
//! apart lets the event table be tested without a live transport.
//!
//! The coordinator is only ever reached through `AppState`'s mutex, so each
//! inbound event runs to completion before the next one starts.
//!
//! | event          | precondition | broadcast                          |
//! |----------------|--------------|------------------------------------|
//! | registerUser   | -            | all: user list; caller: history    |
//! | requestHistory | -            | caller: history                    |
//! | startStroke    | registered   | -                                  |
//! | drawing        | -            | others: segment relay              |
//! | cursorMove     | registered   | others: remote cursor              |
//! | stopDrawing    | -            | others: stop notice                |
//! | undo / redo    | -            | all: full history (unless no-op)   |
//! | disconnect     | -            | all: user list + disconnect notice |

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::frame::{ConnectionId, CursorMove, Inbound, Outbound, RemoteCursor};
use crate::services::broadcast::{Broadcaster, Delivery};
use crate::services::history::{HistoryChange, HistoryStore};
use crate::services::presence::PresenceDirectory;
use crate::services::stroke::StartOutcome;

// =============================================================================
// OUTCOME
// =============================================================================

/// What the dispatch layer should send. Handlers never send directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send to the originating connection only.
    Reply(Outbound),
    /// Send to every connection including the originator.
    Broadcast(Outbound),
    /// Send to every connection except the originator.
    BroadcastExcludeSender(Outbound),
}

impl Outcome {
    #[must_use]
    pub fn delivery(&self, sender: ConnectionId) -> Delivery {
        match self {
            Self::Reply(_) => Delivery::To(sender),
            Self::Broadcast(_) => Delivery::All,
            Self::BroadcastExcludeSender(_) => Delivery::ExcludeSender(sender),
        }
    }

    #[must_use]
    pub fn event(&self) -> &Outbound {
        match self {
            Self::Reply(event)
            | Self::Broadcast(event)
            | Self::BroadcastExcludeSender(event) => event,
        }
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

#[derive(Debug)]
pub struct Coordinator {
    presence: PresenceDirectory,
    history: HistoryStore,
    broadcaster: Broadcaster,
}

impl Coordinator {
    #[must_use]
    pub fn new(redo_stack_depth: usize) -> Self {
        Self {
            presence: PresenceDirectory::new(),
            history: HistoryStore::new(redo_stack_depth),
            broadcaster: Broadcaster::new(),
        }
    }

    /// Transport connect notification: start routing outbound events to `tx`.
    pub fn connect(&mut self, connection_id: ConnectionId, tx: mpsc::Sender<Outbound>) {
        self.broadcaster.attach(connection_id, tx);
        info!(
            %connection_id,
            connections = self.broadcaster.connection_count(),
            "coordinator: connection attached"
        );
    }

    /// Handle one inbound event and deliver the results.
    pub fn dispatch(&mut self, connection_id: ConnectionId, event: Inbound) {
        let outcomes = self.handle(connection_id, event);
        self.deliver(connection_id, &outcomes);
    }

    /// Transport disconnect notification: tear down the session and tell everyone.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        let outcomes = self.handle_disconnect(connection_id);
        self.deliver(connection_id, &outcomes);
    }

    /// Apply one inbound event to state and describe the resulting sends.
    pub fn handle(&mut self, connection_id: ConnectionId, event: Inbound) -> Vec<Outcome> {
        match event {
            Inbound::RegisterUser(username) => {
                let color = self.presence.register(connection_id, username.as_str());
                info!(
                    %connection_id,
                    %username,
                    %color,
                    active = self.presence.len(),
                    "presence: user registered"
                );
                vec![
                    Outcome::Broadcast(Outbound::UpdateUserList(self.presence.list())),
                    Outcome::Reply(Outbound::InitialHistory(self.history.snapshot())),
                ]
            }
            Inbound::RequestHistory => {
                debug!(%connection_id, strokes = self.history.len(), "history: requested");
                let history = self.history.snapshot();
                vec![Outcome::Reply(Outbound::InitialHistory(history))]
            }
            Inbound::StartStroke(style) => {
                let Some(session) = self.presence.get_mut(connection_id) else {
                    debug!(%connection_id, "stroke: start from unregistered connection dropped");
                    return Vec::new();
                };
                let started = session.assembler.start(style.color, style.line_width);
                if let StartOutcome::Replaced(old) = started {
                    debug!(
                        %connection_id,
                        discarded = old.points.len(),
                        "stroke: unfinished stroke replaced"
                    );
                }
                self.history.clear_redo();
                Vec::new()
            }
            Inbound::Drawing(segment) => {
                if let Some(session) = self.presence.get_mut(connection_id) {
                    if !session.assembler.append_segment(segment.segment()) {
                        trace!(%connection_id, "stroke: segment without start ignored");
                    }
                }
                vec![Outcome::BroadcastExcludeSender(Outbound::Drawing(segment))]
            }
            Inbound::StopDrawing => {
                let committed = self
                    .presence
                    .get_mut(connection_id)
                    .and_then(|session| session.assembler.commit());
                if let Some(stroke) = committed {
                    let points = stroke.points.len();
                    self.history.append(stroke);
                    info!(
                        %connection_id,
                        points,
                        strokes = self.history.len(),
                        "history: stroke committed"
                    );
                }
                vec![Outcome::BroadcastExcludeSender(Outbound::StopDrawing)]
            }
            Inbound::CursorMove(cursor) => {
                let CursorMove { x, y, state } = cursor;
                let Some(session) = self.presence.update_cursor(connection_id, x, y, state) else {
                    return Vec::new();
                };
                let relay = Outbound::RemoteCursor(RemoteCursor {
                    id: connection_id,
                    x: session.cursor.x,
                    y: session.cursor.y,
                    color: session.display_color.clone(),
                    username: session.username.clone(),
                    state: session.cursor.state,
                });
                vec![Outcome::BroadcastExcludeSender(relay)]
            }
            Inbound::Undo => self.history_outcome(connection_id, "undo", HistoryStore::undo),
            Inbound::Redo => self.history_outcome(connection_id, "redo", HistoryStore::redo),
        }
    }

    fn history_outcome(
        &mut self,
        connection_id: ConnectionId,
        op: &'static str,
        apply: fn(&mut HistoryStore) -> HistoryChange,
    ) -> Vec<Outcome> {
        match apply(&mut self.history) {
            HistoryChange::Changed(strokes) => {
                info!(
                    %connection_id,
                    op,
                    strokes = strokes.len(),
                    redo = self.history.redo_len(),
                    "history: changed"
                );
                vec![Outcome::Broadcast(Outbound::RedrawAll(strokes))]
            }
            HistoryChange::NoOp => {
                debug!(%connection_id, op, "history: nothing to apply");
                Vec::new()
            }
        }
    }

    fn handle_disconnect(&mut self, connection_id: ConnectionId) -> Vec<Outcome> {
        if let Some(session) = self.presence.deregister(connection_id) {
            if let Some(stroke) = session.assembler.in_progress() {
                debug!(
                    %connection_id,
                    discarded = stroke.points.len(),
                    "stroke: abandoned on disconnect"
                );
            }
            info!(
                %connection_id,
                username = %session.username,
                active = self.presence.len(),
                "presence: user left"
            );
        }
        self.broadcaster.detach(connection_id);
        vec![
            Outcome::Broadcast(Outbound::UpdateUserList(self.presence.list())),
            Outcome::Broadcast(Outbound::UserDisconnected { id: connection_id }),
        ]
    }

    fn deliver(&self, sender: ConnectionId, outcomes: &[Outcome]) {
        for outcome in outcomes {
            let delivery = outcome.delivery(sender);
            self.broadcaster.deliver(delivery, outcome.event());
        }
    }
}

#[cfg(test)]
impl Coordinator {
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn presence(&self) -> &PresenceDirectory {
        &self.presence
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
