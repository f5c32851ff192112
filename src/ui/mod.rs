//! UI components for Wind Highway Desktop.
//!
//! This module contains the header, legend, detail popups and status pane.

pub mod details;
pub mod header;
pub mod legend;
pub mod status_pane;

pub use header::HeaderStats;
pub use status_pane::StatusPane;
