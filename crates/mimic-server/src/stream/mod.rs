//! Emulated incremental (server-sent events) responses.

mod emitter;
mod synthesizer;

pub use emitter::{paced_stream, PacedStream, SseBody, StreamOutcome, DEFAULT_EVENT_DELAY};
pub use synthesizer::{split_tokens, StreamEvent, StreamFormat, StreamSynthesizer, DONE_SENTINEL};
