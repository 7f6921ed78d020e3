//! # fill-light
//!
//! Engine behind a full-screen fill light: the working configuration, the
//! pulse/strobe timing, saved templates, and AI suggestions from a photo.
//!
//! [`session::SessionController`] is the entry point; the other modules are
//! its collaborators and can be used on their own.

pub mod clock;
pub mod config;
pub mod logging;
pub mod notify;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod suggestion;
pub mod templates;
pub mod ui;

pub use shared;
