//! Tedit Editor - Document Editing Sessions
//!
//! This crate ties the pieces of tedit together into a session per open
//! document:
//! - Editor: Layer stack, surfaces and stroke engine behind one facade,
//!   with pointer handling, flush cadence and remote event application
//! - Restore: Once-per-session snapshot restore, remote-first with the
//!   local cache as fallback
//!
//! A session is synchronous pure state; persistence and sync I/O happen at
//! its edges through tedit-store and tedit-sync.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod editor;
pub mod error;
pub mod restore;

// Re-export main types
pub use editor::{EditorConfig, EditorSession, STROKE_FLUSH_POINTS};
pub use error::{Error, Result};
pub use restore::restore_session;
