//! Admin handlers.

pub mod extensions;
pub mod hooks;
