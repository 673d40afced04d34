//! Stream synthesis: matched text → ordered delta events.
//!
//! Chat streams are emitted as:
//! role announcement → one content delta per word → finish → `[DONE]`.
//! Text-completion streams skip the role announcement.

use crate::ids::generate_id;
use serde_json::{json, Value};
use tracing::warn;

/// Literal payload of the stream-end sentinel
pub const DONE_SENTINEL: &str = "[DONE]";

/// One unit of an emulated incremental response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Data(Value),
    Done,
}

impl StreamEvent {
    /// Server-sent-events framing (`data: ...` followed by a blank line).
    /// String payloads are written as-is, everything else as compact JSON.
    pub fn to_sse(&self) -> String {
        match self {
            StreamEvent::Data(Value::String(s)) => format!("data: {s}\n\n"),
            StreamEvent::Data(value) => format!("data: {value}\n\n"),
            StreamEvent::Done => format!("data: {DONE_SENTINEL}\n\n"),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

/// Wire protocol of the stream being synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// `chat.completion.chunk` deltas
    Chat,
    /// legacy `text_completion` chunks
    Text,
}

impl StreamFormat {
    fn id_prefix(self) -> &'static str {
        match self {
            StreamFormat::Chat => "chatcmpl",
            StreamFormat::Text => "cmpl",
        }
    }
}

/// Builds the stream events for one response
#[derive(Debug, Clone)]
pub struct StreamSynthesizer {
    format: StreamFormat,
    model: String,
}

impl StreamSynthesizer {
    pub fn new(format: StreamFormat, model: impl Into<String>) -> Self {
        Self {
            format,
            model: model.into(),
        }
    }

    pub fn chat(model: impl Into<String>) -> Self {
        Self::new(StreamFormat::Chat, model)
    }

    pub fn text(model: impl Into<String>) -> Self {
        Self::new(StreamFormat::Text, model)
    }

    /// Lazily synthesize the events for `text`. Each call gets a fresh id.
    pub fn synthesize(&self, text: &str) -> impl Iterator<Item = StreamEvent> + Send + 'static {
        let chunk = ChunkTemplate {
            id: generate_id(self.format.id_prefix()),
            created: chrono::Utc::now().timestamp(),
            model: self.model.clone(),
            format: self.format,
        };
        let role = match self.format {
            StreamFormat::Chat => Some(chunk.role()),
            StreamFormat::Text => None,
        };
        let content_chunk = chunk.clone();

        role.into_iter()
            .chain(
                split_tokens(text)
                    .into_iter()
                    .map(move |token| content_chunk.content(&token)),
            )
            .chain(std::iter::once_with(move || chunk.finish()))
            .chain(std::iter::once(StreamEvent::Done))
    }

    /// Convert an explicit pre-built event list into stream events.
    ///
    /// Elements are `{"data": ...}` objects emitted in order. A `data` equal to
    /// the string `"[DONE]"` ends the stream. Malformed elements are skipped.
    /// A sentinel is appended when the list does not carry one.
    pub fn explicit(events: &[Value]) -> Vec<StreamEvent> {
        let mut out = Vec::with_capacity(events.len() + 1);
        for (idx, element) in events.iter().enumerate() {
            let Some(data) = element.as_object().and_then(|o| o.get("data")) else {
                warn!("Skipping malformed stream event at index {}", idx);
                continue;
            };
            if data.as_str() == Some(DONE_SENTINEL) {
                out.push(StreamEvent::Done);
                return out;
            }
            out.push(StreamEvent::Data(data.clone()));
        }
        out.push(StreamEvent::Done);
        out
    }
}

/// Split on whitespace, re-appending one space to every token but the last so
/// that concatenating the tokens rebuilds the words separated by single spaces.
pub fn split_tokens(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let last = words.len().saturating_sub(1);
    words
        .into_iter()
        .enumerate()
        .map(|(i, word)| {
            if i < last {
                format!("{word} ")
            } else {
                word.to_string()
            }
        })
        .collect()
}

/// Fields shared by every chunk of one stream
#[derive(Debug, Clone)]
struct ChunkTemplate {
    id: String,
    created: i64,
    model: String,
    format: StreamFormat,
}

impl ChunkTemplate {
    fn role(&self) -> StreamEvent {
        self.chat_chunk(json!({"role": "assistant"}), Value::Null)
    }

    fn content(&self, token: &str) -> StreamEvent {
        match self.format {
            StreamFormat::Chat => self.chat_chunk(json!({"content": token}), Value::Null),
            StreamFormat::Text => self.text_chunk(token, Value::Null),
        }
    }

    fn finish(&self) -> StreamEvent {
        match self.format {
            StreamFormat::Chat => self.chat_chunk(json!({}), json!("stop")),
            StreamFormat::Text => self.text_chunk("", json!("stop")),
        }
    }

    fn chat_chunk(&self, delta: Value, finish_reason: Value) -> StreamEvent {
        StreamEvent::Data(json!({
            "id": self.id,
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": self.model,
            "choices": [{
                "index": 0,
                "delta": delta,
                "finish_reason": finish_reason
            }]
        }))
    }

    fn text_chunk(&self, text: &str, finish_reason: Value) -> StreamEvent {
        StreamEvent::Data(json!({
            "id": self.id,
            "object": "text_completion",
            "created": self.created,
            "model": self.model,
            "choices": [{
                "text": text,
                "index": 0,
                "logprobs": null,
                "finish_reason": finish_reason
            }]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compact description of an event: "role", the content text, "finish" or "[DONE]"
    fn describe(event: &StreamEvent) -> String {
        match event {
            StreamEvent::Done => DONE_SENTINEL.to_string(),
            StreamEvent::Data(v) => {
                let choice = &v["choices"][0];
                if choice["finish_reason"] == "stop" {
                    "finish".to_string()
                } else if choice["delta"]["role"] == "assistant" {
                    "role".to_string()
                } else if let Some(text) = choice["delta"]["content"].as_str() {
                    text.to_string()
                } else {
                    choice["text"].as_str().unwrap_or_default().to_string()
                }
            }
        }
    }

    #[test]
    fn test_chat_event_order() {
        let events: Vec<_> = StreamSynthesizer::chat("gpt-4")
            .synthesize("Hello, world!")
            .collect();
        let described: Vec<_> = events.iter().map(describe).collect();
        assert_eq!(
            described,
            vec!["role", "Hello, ", "world!", "finish", "[DONE]"]
        );
    }

    #[test]
    fn test_content_round_trip() {
        let text = "The quick  brown\tfox\njumps";
        let rebuilt: String = StreamSynthesizer::chat("gpt-4")
            .synthesize(text)
            .filter_map(|e| match e {
                StreamEvent::Data(v) => v["choices"][0]["delta"]["content"]
                    .as_str()
                    .map(String::from),
                StreamEvent::Done => None,
            })
            .collect();
        let words: Vec<&str> = rebuilt.split(' ').collect();
        assert_eq!(words, text.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_text_has_no_content_events() {
        let described: Vec<_> = StreamSynthesizer::chat("gpt-4")
            .synthesize("")
            .map(|e| describe(&e))
            .collect();
        assert_eq!(described, vec!["role", "finish", "[DONE]"]);
    }

    #[test]
    fn test_chunks_share_id_and_model() {
        let events: Vec<_> = StreamSynthesizer::chat("gpt-4o").synthesize("a b").collect();
        let ids: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Data(v) => Some(v["id"].clone()),
                StreamEvent::Done => None,
            })
            .collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.iter().all(|id| id == &ids[0]));
        assert!(ids[0].as_str().unwrap().starts_with("chatcmpl-"));
        match &events[0] {
            StreamEvent::Data(v) => {
                assert_eq!(v["model"], "gpt-4o");
                assert_eq!(v["object"], "chat.completion.chunk");
            }
            StreamEvent::Done => panic!("first event must carry data"),
        }
    }

    #[test]
    fn test_each_call_gets_fresh_id() {
        let synth = StreamSynthesizer::chat("gpt-4");
        let first_id = |mut it: Box<dyn Iterator<Item = StreamEvent>>| match it.next() {
            Some(StreamEvent::Data(v)) => v["id"].as_str().unwrap().to_string(),
            _ => panic!("expected data"),
        };
        let a = first_id(Box::new(synth.synthesize("x")));
        let b = first_id(Box::new(synth.synthesize("x")));
        assert_ne!(a, b);
    }

    #[test]
    fn test_text_format_skips_role() {
        let events: Vec<_> = StreamSynthesizer::text("gpt-3.5-turbo-instruct")
            .synthesize("one two")
            .collect();
        let described: Vec<_> = events.iter().map(describe).collect();
        assert_eq!(described, vec!["one ", "two", "finish", "[DONE]"]);
        match &events[0] {
            StreamEvent::Data(v) => {
                assert_eq!(v["object"], "text_completion");
                assert!(v["id"].as_str().unwrap().starts_with("cmpl-"));
            }
            StreamEvent::Done => panic!("expected data"),
        }
    }

    #[test]
    fn test_split_tokens() {
        assert_eq!(split_tokens("a b c"), vec!["a ", "b ", "c"]);
        assert_eq!(split_tokens("  single  "), vec!["single"]);
        assert!(split_tokens("   ").is_empty());
    }

    #[test]
    fn test_explicit_events_verbatim() {
        let events = StreamSynthesizer::explicit(&[
            json!({"data": {"n": 1}}),
            json!({"data": {"n": 2}}),
            json!({"data": "[DONE]"}),
        ]);
        assert_eq!(
            events,
            vec![
                StreamEvent::Data(json!({"n": 1})),
                StreamEvent::Data(json!({"n": 2})),
                StreamEvent::Done
            ]
        );
    }

    #[test]
    fn test_explicit_events_skip_malformed_and_append_sentinel() {
        let events = StreamSynthesizer::explicit(&[
            json!("not an object"),
            json!({"no_data": true}),
            json!({"data": {"n": 1}}),
        ]);
        assert_eq!(
            events,
            vec![StreamEvent::Data(json!({"n": 1})), StreamEvent::Done]
        );
    }

    #[test]
    fn test_explicit_events_stop_at_sentinel() {
        let events = StreamSynthesizer::explicit(&[
            json!({"data": "[DONE]"}),
            json!({"data": {"late": true}}),
        ]);
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[test]
    fn test_sse_framing() {
        assert_eq!(StreamEvent::Done.to_sse(), "data: [DONE]\n\n");
        assert_eq!(
            StreamEvent::Data(json!({"a": 1})).to_sse(),
            "data: {\"a\":1}\n\n"
        );
        assert_eq!(
            StreamEvent::Data(json!("raw text")).to_sse(),
            "data: raw text\n\n"
        );
    }
}
