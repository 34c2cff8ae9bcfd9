//! Shared application state and core drawing types.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! coordinator sits behind one `tokio::sync::Mutex`: that lock is the single
//! serialization point for history, redo, and presence mutations. Outbound
//! delivery under the lock is `try_send` only, so holding it never waits on
//! network I/O.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::services::coordinator::Coordinator;

// =============================================================================
// STROKES
// =============================================================================

/// One straight-line draw command in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// A freehand gesture. Immutable once committed to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub color: String,
    pub line_width: f64,
    pub points: Vec<Segment>,
}

impl Stroke {
    #[must_use]
    pub fn new(color: impl Into<String>, line_width: f64) -> Self {
        Self {
            color: color.into(),
            line_width,
            points: Vec::new(),
        }
    }
}

// =============================================================================
// CURSORS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorState {
    #[default]
    Moving,
    Drawing,
    Erasing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    pub state: CursorState,
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Mutex<Coordinator>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let coordinator = Coordinator::new(config.redo_stack_depth);
        Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
