//! Mimic: a deterministic, scriptable stand-in for OpenAI-style completion APIs.
//!
//! Clients load a script per bearer token, then send ordinary completion
//! requests and receive the scripted responses, optionally as a paced
//! server-sent-events stream.

// ===== Response scripting core =====
pub mod engine;
pub mod script;
pub mod session;
pub mod stream;

// ===== Service surface =====
pub mod config;
pub mod server;

mod ids;

pub use engine::{Engine, LoadSummary, DEFAULT_MODELS};
pub use script::EngineError;
pub use server::{AppState, EmulatorServer};
