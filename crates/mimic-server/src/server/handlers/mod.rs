//! Request handlers.

pub mod completions;
pub mod emulator;
pub mod models;
pub mod system;
