//! HTTP request handlers.

pub mod admin;
pub mod assets;
pub mod health;
pub mod site;
