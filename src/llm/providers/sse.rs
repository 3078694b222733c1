//! Server-sent events plumbing shared by the HTTP providers.
//!
//! Bytes arrive in arbitrary chunks; complete events are separated by a blank
//! line. Only `data:` fields are kept (multi-line data joined with `\n`);
//! comments and other fields are ignored. [`event_stream`] turns a response
//! body into a [`TextStream`], delegating each event's JSON to an
//! [`EventParser`].

use std::collections::VecDeque;
use std::fmt::Display;

use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use tracing::error;

use crate::llm::{LlmUsage, ProviderError, StreamPart, TextStream};

/// Provider-specific decoding of one event's `data` payload.
pub(super) trait EventParser: Send + 'static {
    /// Name used in log lines.
    const PROVIDER: &'static str;

    /// Parts carried by one event. Usage, if reported, is remembered for
    /// the final `Finish`.
    fn parse(&mut self, data: &str) -> Result<Vec<StreamPart>, ProviderError>;

    fn take_usage(&mut self) -> Option<LlmUsage>;
}

struct EventState<B, E, P> {
    body: BoxStream<'static, Result<B, E>>,
    decoder: SseDecoder,
    parser: P,
    pending: VecDeque<Result<StreamPart, ProviderError>>,
    done: bool,
}

impl<B, E, P: EventParser> EventState<B, E, P> {
    /// Returns `false` once the stream must end.
    fn absorb(&mut self, data: &str) -> bool {
        if data.trim() == "[DONE]" {
            return true;
        }
        match self.parser.parse(data) {
            Ok(parts) => {
                self.pending.extend(parts.into_iter().map(Ok));
                true
            }
            Err(e) => {
                error!(provider = P::PROVIDER, error = %e, "malformed stream event");
                self.pending.push_back(Err(e));
                self.done = true;
                false
            }
        }
    }
}

/// Decode `body` as SSE and map every event through `parser`.
///
/// The stream ends after the first error (transport or malformed event);
/// otherwise it ends with `Finish` carrying the last usage seen.
pub(super) fn event_stream<S, B, E, P>(body: S, parser: P) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
    P: EventParser,
{
    let state = EventState {
        body: body.boxed(),
        decoder: SseDecoder::new(),
        parser,
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(chunk)) => {
                    for data in st.decoder.push(chunk.as_ref()) {
                        if !st.absorb(&data) {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    error!(provider = P::PROVIDER, error = %e, "stream interrupted");
                    st.pending.push_back(Err(ProviderError::Stream(e.to_string())));
                    st.done = true;
                }
                None => {
                    let tail = st.decoder.finish();
                    if tail.is_none_or(|data| st.absorb(&data)) {
                        let usage = st.parser.take_usage();
                        st.pending.push_back(Ok(StreamPart::Finish { usage }));
                    }
                    st.done = true;
                }
            }
        }
    }))
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the `data` payload of every completed event.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(data) = event_data(&raw[..end]) {
                events.push(data);
            }
        }
        events
    }

    /// Flush a trailing event not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        event_data(&raw)
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn event_data(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let mut data: Option<String> = None;
    for line in text.lines() {
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(d) => {
                d.push('\n');
                d.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }
    data
}
