//! Fan-out broadcaster: routes outbound events to connection channels.
//!
//! DESIGN
//! ======
//! Each live connection owns a bounded `mpsc` channel drained by its socket
//! task. Delivery is `try_send`: fire-and-forget, never awaited, so the
//! coordinator lock is never held across network I/O. A full or closed
//! channel loses that one event for that one recipient.
//!
//! Per-recipient ordering is the channel's FIFO order, which is the order the
//! coordinator generated the events.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::frame::{ConnectionId, Outbound};

/// Who receives an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Only the named connection.
    To(ConnectionId),
    /// Every connection except the originator.
    ExcludeSender(ConnectionId),
    /// Every connection, originator included.
    All,
}

#[derive(Debug, Default)]
pub struct Broadcaster {
    clients: HashMap<ConnectionId, mpsc::Sender<Outbound>>,
}

impl Broadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, connection_id: ConnectionId, tx: mpsc::Sender<Outbound>) {
        self.clients.insert(connection_id, tx);
    }

    pub fn detach(&mut self, connection_id: ConnectionId) -> bool {
        self.clients.remove(&connection_id).is_some()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    /// Deliver one event. Returns how many recipients accepted it.
    pub fn deliver(&self, delivery: Delivery, event: &Outbound) -> usize {
        match delivery {
            Delivery::To(id) => self.send_to(id, event),
            Delivery::ExcludeSender(id) => self.send_to_all_except(id, event),
            Delivery::All => self.send_to_all(event),
        }
    }

    pub fn send_to(&self, connection_id: ConnectionId, event: &Outbound) -> usize {
        let Some(tx) = self.clients.get(&connection_id) else {
            debug!(%connection_id, "broadcast: target not attached");
            return 0;
        };
        usize::from(enqueue(connection_id, tx, event))
    }

    pub fn send_to_all_except(&self, excluded: ConnectionId, event: &Outbound) -> usize {
        self.clients
            .iter()
            .filter(|(id, _)| **id != excluded)
            .filter(|(id, tx)| enqueue(**id, tx, event))
            .count()
    }

    pub fn send_to_all(&self, event: &Outbound) -> usize {
        self.clients
            .iter()
            .filter(|(id, tx)| enqueue(**id, tx, event))
            .count()
    }
}

fn enqueue(connection_id: ConnectionId, tx: &mpsc::Sender<Outbound>, event: &Outbound) -> bool {
    match tx.try_send(event.clone()) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            if dropped.is_chatty() {
                debug!(%connection_id, "broadcast: channel full, relay dropped");
            } else {
                warn!(%connection_id, "broadcast: channel full, event dropped");
            }
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(%connection_id, "broadcast: channel closed");
            false
        }
    }
}

#[cfg(test)]
impl Broadcaster {
    pub fn is_attached(&self, connection_id: ConnectionId) -> bool {
        self.clients.contains_key(&connection_id)
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
