//! Per-token session management.

mod store;

pub use store::{Session, SessionSnapshot, SessionStore};
