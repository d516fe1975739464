//! Error types for tedit-engine
//!
//! Engine operations fail in two flavors: rejected invariant violations
//! (deleting the last layer, drawing on a locked layer) that callers treat
//! as no-ops, and real faults such as a missing surface.

use thiserror::Error;

use crate::layer::LayerId;

/// Engine error type
#[derive(Debug, Error)]
pub enum Error {
    /// Layer not found
    #[error("layer not found: {0}")]
    LayerNotFound(LayerId),

    /// Attempted to delete the only remaining layer
    #[error("cannot delete the last layer")]
    LastLayer,

    /// Layer is locked
    #[error("layer is locked: {0}")]
    LayerLocked(LayerId),

    /// No active layer to draw on
    #[error("no active layer")]
    NoActiveLayer,

    /// Active tool cannot draw
    #[error("tool cannot draw: {0}")]
    NotDrawingTool(&'static str),

    /// Stroke operation outside the Drawing state
    #[error("no stroke in progress")]
    NoStrokeInProgress,

    /// Surface missing from the registry
    #[error("surface not allocated for layer: {0}")]
    SurfaceMissing(LayerId),
}

impl Error {
    /// Whether this error is a gated-UI invariant rejection that callers
    /// may silently ignore rather than surface to the user.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::LastLayer
                | Self::LayerLocked(_)
                | Self::NoActiveLayer
                | Self::NotDrawingTool(_)
                | Self::NoStrokeInProgress
        )
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::LayerNotFound(_) => "layer_not_found",
            Self::LastLayer => "last_layer",
            Self::LayerLocked(_) => "layer_locked",
            Self::NoActiveLayer => "no_active_layer",
            Self::NotDrawingTool(_) => "not_drawing_tool",
            Self::NoStrokeInProgress => "no_stroke_in_progress",
            Self::SurfaceMissing(_) => "surface_missing",
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;
