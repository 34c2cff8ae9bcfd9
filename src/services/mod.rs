//! Drawing-session services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Leaf services (presence, stroke, history, broadcast) own one concern each
//! and never reach into one another. The coordinator is the only module that
//! knows about all of them.

pub mod broadcast;
pub mod coordinator;
pub mod history;
pub mod presence;
pub mod stroke;
