//! Lighting data model shared by the fill-light engine and its front-ends.
//!
//! Everything here is plain data: a [`ConfigurationModel`] describes one
//! lighting setup, a [`Template`] is a named copy of one, and [`PRESETS`]
//! lists the read-only setups that ship with the app.

mod color;
mod config;
mod preset;
mod template;

pub use color::Color;
pub use config::{ConfigurationModel, Edit, Field, Pattern, clamp_percent};
pub use preset::{PRESETS, Preset};
pub use template::{Template, TemplateId};

use thiserror::Error;

// ==========================================
// VALIDATION
// ==========================================

/// Rejected user or external input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("template name must not be empty")]
    EmptyName,
    #[error("'{0}' is not a hex color")]
    MalformedColor(String),
    #[error("{field} expects a number, got '{raw}'")]
    NotANumber { field: Field, raw: String },
    #[error("unknown pattern '{0}'")]
    UnknownPattern(String),
}
