//! Authentication module for managing the user's bearer token.
//!
//! This module provides `Session`, the token persisted after a login.
//! Sessions are saved to the cache directory and expire 24 hours after
//! they were issued.

pub mod session;

pub use session::{Session, SessionData};
