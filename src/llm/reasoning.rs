//! Reasoning extraction: split a `<tag>…</tag>` segment out of a model's
//! answer and report it separately.
//!
//! [`ReasoningProvider`] decorates any other [`LlmProvider`] and exposes the
//! same `complete` / `stream` capability. Non-streaming replies go through
//! [`extract_reasoning`]; streamed replies go through a [`ReasoningSplitter`].
//!
//! Collecting a split stream yields the same text and reasoning as extracting
//! from the complete reply, for malformed input too (unterminated, empty or
//! adjacent segments).

use std::collections::VecDeque;

use futures_util::{StreamExt, stream};
use tracing::trace;

use crate::llm::{LlmProvider, LlmResponse, ProviderError, StreamPart, TextStream};

/// Joins separate reasoning segments, and the text on either side of a
/// removed segment.
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Answer text with reasoning segments removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    /// `None` when the text contained no complete `<tag>…</tag>` pair.
    pub reasoning: Option<String>,
}

/// Remove every complete `<tag>…</tag>` segment from `text`.
///
/// Segments are matched non-greedily. Their contents are joined with
/// `separator`; where a segment sat between two non-empty stretches of text,
/// the stretches are joined with `separator` too. An unterminated opening tag
/// is left in the text.
pub fn extract_reasoning(text: &str, tag: &str, separator: &str) -> Extracted {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    // (segment start, content start, content end, segment end)
    let mut segments = Vec::new();
    let mut pos = 0;
    while let Some(found) = text[pos..].find(&open) {
        let start = pos + found;
        let content_start = start + open.len();
        let Some(len) = text[content_start..].find(&close) else {
            break;
        };
        let content_end = content_start + len;
        pos = content_end + close.len();
        segments.push((start, content_start, content_end, pos));
    }

    if segments.is_empty() {
        return Extracted { text: text.to_string(), reasoning: None };
    }

    let reasoning = segments
        .iter()
        .map(|&(_, cs, ce, _)| &text[cs..ce])
        .collect::<Vec<_>>()
        .join(separator);

    let mut remaining = text.to_string();
    for &(start, _, _, end) in segments.iter().rev() {
        let before = &remaining[..start];
        let after = &remaining[end..];
        let joiner = if !before.is_empty() && !after.is_empty() { separator } else { "" };
        remaining = format!("{before}{joiner}{after}");
    }

    Extracted { text: remaining, reasoning: Some(reasoning) }
}

/// Incremental counterpart of [`extract_reasoning`] for streamed text.
///
/// Text outside segments is emitted as soon as it cannot be part of an
/// opening tag. A segment's reasoning is emitted in one piece once its closing
/// tag arrives; a segment still open at [`finish`](Self::finish) is returned
/// to the text verbatim, opening tag included.
#[derive(Debug, Clone)]
pub struct ReasoningSplitter {
    open: String,
    close: String,
    separator: String,
    /// Bytes that may still be the start of the next tag.
    buffer: String,
    /// Contents of the currently open segment.
    segment: Option<String>,
    segments_closed: usize,
    text_before_first: bool,
    /// Separators owed to the next non-empty text.
    pending_joiners: usize,
    reasoning_started: bool,
}

impl ReasoningSplitter {
    pub fn new(tag: &str) -> Self {
        Self {
            open: format!("<{tag}>"),
            close: format!("</{tag}>"),
            separator: DEFAULT_SEPARATOR.to_string(),
            buffer: String::new(),
            segment: None,
            segments_closed: 0,
            text_before_first: false,
            pending_joiners: 0,
            reasoning_started: false,
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Record reasoning the wrapped handle reported on its own, so tagged
    /// reasoning that follows is joined to it with the separator.
    pub fn note_reasoning(&mut self) {
        self.reasoning_started = true;
    }

    /// Feed one text delta; returns the parts that are safe to emit now.
    pub fn push(&mut self, delta: &str) -> Vec<StreamPart> {
        let mut out = Vec::new();
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.push_str(delta);

        loop {
            let inside = self.segment.is_some();
            let next_tag = if inside { &self.close } else { &self.open };
            let tag_len = next_tag.len();
            let Some(start) = potential_start(&buffer, next_tag) else {
                self.consume(&buffer, &mut out);
                buffer.clear();
                break;
            };

            self.consume(&buffer[..start], &mut out);
            if start + tag_len > buffer.len() {
                // Possible partial tag: hold it until the next delta decides.
                buffer.drain(..start);
                break;
            }
            buffer.drain(..start + tag_len);
            if inside {
                self.close_segment(&mut out);
            } else {
                self.segment = Some(String::new());
            }
        }

        self.buffer = buffer;
        out
    }

    /// Flush whatever is still held back. An unterminated segment goes back
    /// to the text together with its opening tag.
    pub fn finish(&mut self) -> Option<StreamPart> {
        let held = std::mem::take(&mut self.buffer);
        let text = match self.segment.take() {
            Some(segment) => format!("{}{segment}{held}", self.open),
            None => held,
        };
        let mut out = Vec::new();
        self.publish_text(&text, &mut out);
        out.pop()
    }

    fn consume(&mut self, text: &str, out: &mut Vec<StreamPart>) {
        match self.segment.as_mut() {
            Some(segment) => segment.push_str(text),
            None => self.publish_text(text, out),
        }
    }

    fn publish_text(&mut self, text: &str, out: &mut Vec<StreamPart>) {
        if text.is_empty() {
            return;
        }
        let mut chunk = self.separator.repeat(self.pending_joiners);
        chunk.push_str(text);
        self.pending_joiners = 0;
        if self.segments_closed == 0 {
            self.text_before_first = true;
        }
        out.push(StreamPart::TextDelta(chunk));
    }

    fn close_segment(&mut self, out: &mut Vec<StreamPart>) {
        let content = self.segment.take().unwrap_or_default();
        let prefix = if self.reasoning_started { self.separator.as_str() } else { "" };
        out.push(StreamPart::ReasoningDelta(format!("{prefix}{content}")));
        self.reasoning_started = true;

        // A removed segment joins the text around it only when something
        // precedes it and non-empty text follows.
        if self.segments_closed > 0 || self.text_before_first {
            self.pending_joiners += 1;
        }
        self.segments_closed += 1;
    }
}

/// Index where `tag` starts in `text`, or where the longest suffix of `text`
/// that is a prefix of `tag` starts.
fn potential_start(text: &str, tag: &str) -> Option<usize> {
    if tag.is_empty() {
        return None;
    }
    if let Some(i) = text.find(tag) {
        return Some(i);
    }
    text.char_indices()
        .map(|(i, _)| i)
        .find(|&i| tag.starts_with(&text[i..]))
}

struct SplitState {
    inner: TextStream,
    splitter: ReasoningSplitter,
    pending: VecDeque<Result<StreamPart, ProviderError>>,
    done: bool,
}

/// Run every text delta of `inner` through `splitter`.
///
/// Reasoning deltas the inner handle already produced pass through untouched.
/// Held-back text is flushed before `Finish` or at end of stream.
pub fn split_stream(inner: TextStream, splitter: ReasoningSplitter) -> TextStream {
    let state = SplitState { inner, splitter, pending: VecDeque::new(), done: false };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.inner.next().await {
                Some(Ok(StreamPart::TextDelta(t))) => {
                    st.pending.extend(st.splitter.push(&t).into_iter().map(Ok));
                }
                Some(Ok(StreamPart::Finish { usage })) => {
                    st.pending.extend(st.splitter.finish().map(Ok));
                    st.pending.push_back(Ok(StreamPart::Finish { usage }));
                    st.done = true;
                }
                Some(Ok(StreamPart::ReasoningDelta(r))) => {
                    if !r.is_empty() {
                        st.splitter.note_reasoning();
                    }
                    st.pending.push_back(Ok(StreamPart::ReasoningDelta(r)));
                }
                Some(Err(e)) => {
                    st.pending.push_back(Err(e));
                    st.done = true;
                }
                None => {
                    st.pending.extend(st.splitter.finish().map(Ok));
                    st.done = true;
                }
            }
        }
    }))
}

/// Decorator handle: same capability as the wrapped handle, with the tagged
/// reasoning segment moved out of the answer.
#[derive(Debug, Clone)]
pub struct ReasoningProvider {
    inner: LlmProvider,
    tag: String,
    separator: String,
}

impl ReasoningProvider {
    pub fn new(inner: LlmProvider, tag: impl Into<String>) -> Self {
        Self { inner, tag: tag.into(), separator: DEFAULT_SEPARATOR.to_string() }
    }

    pub fn inner(&self) -> &LlmProvider {
        &self.inner
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        let response = self.inner.complete(prompt, system).await?;
        let extracted = extract_reasoning(&response.text, &self.tag, &self.separator);
        trace!(
            tag = %self.tag,
            extracted = extracted.reasoning.is_some(),
            "reasoning extraction applied"
        );

        let reasoning = match (response.reasoning, extracted.reasoning) {
            (Some(native), Some(tagged)) => Some(format!("{native}{}{tagged}", self.separator)),
            (native, tagged) => native.or(tagged),
        };

        Ok(LlmResponse { text: extracted.text, reasoning, usage: response.usage })
    }

    pub async fn stream(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<TextStream, ProviderError> {
        let inner = self.inner.stream(prompt, system).await?;
        let splitter = ReasoningSplitter::new(&self.tag).with_separator(self.separator.clone());
        Ok(split_stream(inner, splitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::collect_stream;
    use crate::llm::providers::mock::{MockProvider, MockScript};

    fn extract(text: &str) -> Extracted {
        extract_reasoning(text, "think", "\n")
    }

    /// Push `text` through a splitter in pieces of `step` chars and collect
    /// the (text, reasoning) totals the way `collect_stream` does.
    fn split_in_steps(text: &str, step: usize) -> (String, Option<String>) {
        let mut splitter = ReasoningSplitter::new("think");
        let chars: Vec<char> = text.chars().collect();
        let mut parts = Vec::new();
        for chunk in chars.chunks(step) {
            parts.extend(splitter.push(&chunk.iter().collect::<String>()));
        }
        parts.extend(splitter.finish());

        let mut text = String::new();
        let mut reasoning: Option<String> = None;
        for p in parts {
            match p {
                StreamPart::TextDelta(t) => text.push_str(&t),
                StreamPart::ReasoningDelta(r) => reasoning.get_or_insert_with(String::new).push_str(&r),
                StreamPart::Finish { .. } => {}
            }
        }
        (text, reasoning)
    }

    #[test]
    fn leading_segment_removed() {
        let e = extract("<think>plan the reply</think>Hello!");
        assert_eq!(e.text, "Hello!");
        assert_eq!(e.reasoning.as_deref(), Some("plan the reply"));
    }

    #[test]
    fn no_segment_is_untouched() {
        let e = extract("just an answer");
        assert_eq!(e.text, "just an answer");
        assert!(e.reasoning.is_none());
    }

    #[test]
    fn unterminated_tag_stays_in_text() {
        let e = extract("<think>never closed");
        assert_eq!(e.text, "<think>never closed");
        assert!(e.reasoning.is_none());
    }

    #[test]
    fn multiple_segments_joined() {
        let e = extract("a<think>x</think>b<think>y</think>c");
        assert_eq!(e.text, "a\nb\nc");
        assert_eq!(e.reasoning.as_deref(), Some("x\ny"));
    }

    #[test]
    fn matching_is_non_greedy() {
        let e = extract("<think>one</think>mid<think>two</think>");
        assert_eq!(e.text, "mid");
        assert_eq!(e.reasoning.as_deref(), Some("one\ntwo"));
    }

    #[test]
    fn other_tags_ignored() {
        let e = extract("<reason>x</reason>answer");
        assert!(e.reasoning.is_none());
        assert_eq!(extract_reasoning("<reason>x</reason>answer", "reason", "\n").text, "answer");
    }

    #[test]
    fn splitter_whole_delta() {
        assert_eq!(
            split_in_steps("<think>abc</think>def", 100),
            ("def".to_string(), Some("abc".to_string()))
        );
    }

    #[test]
    fn splitter_char_by_char_matches_extract() {
        for text in [
            "<think>abc</think>def",
            "a<think>x</think>b<think>y</think>c",
            "no tags at all",
            "less < than and <th not a tag",
            "<think>ünïcødé 💡</think>réponse",
            "a <think>x</think><think>y</think> c",
            "<think>never closed",
            "a<think>x</think>b<think>never closed",
            "<think></think>answer",
            "<think>one</think>mid<think>two</think>",
            "<think>a <think>b</think>c",
            "text<think>x</think>",
        ] {
            let expected = extract(text);
            for step in [1, 2, 3, 5, 100] {
                let (t, r) = split_in_steps(text, step);
                assert_eq!(t, expected.text, "text for {text:?} step {step}");
                assert_eq!(r, expected.reasoning, "reasoning for {text:?} step {step}");
            }
        }
    }

    #[test]
    fn adjacent_segments_keep_both_joiners() {
        let expected = ("a \n\n c".to_string(), Some("x\ny".to_string()));
        assert_eq!(split_in_steps("a <think>x</think><think>y</think> c", 1), expected);
        let e = extract("a <think>x</think><think>y</think> c");
        assert_eq!((e.text, e.reasoning), expected);
    }

    #[test]
    fn unterminated_segment_returns_to_text() {
        assert_eq!(
            split_in_steps("<think>never closed", 4),
            ("<think>never closed".to_string(), None)
        );
    }

    #[test]
    fn empty_segment_still_reports_reasoning() {
        assert_eq!(
            split_in_steps("<think></think>answer", 1),
            ("answer".to_string(), Some(String::new()))
        );
    }

    #[test]
    fn splitter_holds_partial_tag() {
        let mut s = ReasoningSplitter::new("think");
        assert_eq!(s.push("Hi <th"), vec![StreamPart::TextDelta("Hi ".into())]);
        assert!(s.push("in").is_empty());
        // Reasoning is held until the segment closes.
        assert!(s.push("k>x").is_empty());
        assert_eq!(
            s.push("</think>!"),
            vec![StreamPart::ReasoningDelta("x".into()), StreamPart::TextDelta("\n!".into())]
        );
    }

    #[test]
    fn splitter_flushes_false_alarm_at_end() {
        let mut s = ReasoningSplitter::new("think");
        assert_eq!(s.push("a <thi"), vec![StreamPart::TextDelta("a ".into())]);
        assert_eq!(s.finish(), Some(StreamPart::TextDelta("<thi".into())));
        assert_eq!(s.finish(), None);
    }

    #[test]
    fn potential_start_prefers_longest_suffix() {
        assert_eq!(potential_start("xaa", "aab"), Some(1));
        assert_eq!(potential_start("abc", "<think>"), None);
        assert_eq!(potential_start("ab<think>", "<think>"), Some(2));
    }

    fn tagged_mock() -> LlmProvider {
        LlmProvider::Mock(MockProvider::new(
            "tagged",
            MockScript {
                reasoning: None,
                text: "<think>The user said hi, greet back</think>Hello there friend".into(),
            },
        ))
    }

    #[tokio::test]
    async fn decorator_complete_splits() {
        let p = ReasoningProvider::new(tagged_mock(), "think");
        let resp = p.complete("hi", None).await.unwrap();
        assert_eq!(resp.text, "Hello there friend");
        assert_eq!(resp.reasoning.as_deref(), Some("The user said hi, greet back"));
        assert!(resp.usage.is_some());
    }

    #[tokio::test]
    async fn decorator_stream_matches_complete() {
        let p = ReasoningProvider::new(tagged_mock(), "think");
        let streamed = collect_stream(p.stream("hi", None).await.unwrap()).await.unwrap();
        let direct = p.complete("hi", None).await.unwrap();
        assert_eq!(streamed, direct);
    }

    #[tokio::test]
    async fn decorator_keeps_native_reasoning() {
        let p = ReasoningProvider::new(LlmProvider::Mock(MockProvider::reasoning()), "think");
        let resp = p.complete("hi", None).await.unwrap();
        assert_eq!(resp.text, "Hello, world! This is a test response.");
        assert!(resp.reasoning.unwrap().starts_with("The user sent a test message"));
    }

    #[tokio::test]
    async fn decorator_is_same_capability() {
        let wrapped = LlmProvider::Reasoning(Box::new(ReasoningProvider::new(tagged_mock(), "think")));
        assert_eq!(wrapped.model_id(), "tagged");
        assert!(wrapped.is_offline());
        let resp = wrapped.complete("hi", Some("sys")).await.unwrap();
        assert_eq!(resp.text, "Hello there friend");
    }

    #[tokio::test]
    async fn stream_error_ends_split_stream() {
        let inner: TextStream = Box::pin(stream::iter(vec![
            Ok(StreamPart::TextDelta("ok <think>a".into())),
            Err(ProviderError::Stream("reset".into())),
            Ok(StreamPart::TextDelta("never seen".into())),
        ]));
        let parts: Vec<_> = split_stream(inner, ReasoningSplitter::new("think")).collect().await;
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], Ok(StreamPart::TextDelta(ref t)) if t == "ok "));
        assert!(parts[1].is_err());
    }

    fn mock_replying(reasoning: Option<&str>, text: &str) -> LlmProvider {
        LlmProvider::Mock(MockProvider::new(
            "tagged",
            MockScript { reasoning: reasoning.map(str::to_string), text: text.into() },
        ))
    }

    #[tokio::test]
    async fn decorator_stream_matches_complete_on_malformed_tags() {
        for text in [
            "a <think>x</think><think>y</think> c",
            "<think>never closed",
            "<think></think>answer",
            "head<think>x</think>tail<think>dangling",
            "<think>only</think>",
        ] {
            let p = ReasoningProvider::new(mock_replying(None, text), "think");
            let streamed = collect_stream(p.stream("hi", None).await.unwrap()).await.unwrap();
            let direct = p.complete("hi", None).await.unwrap();
            assert_eq!(streamed, direct, "reply {text:?}");
        }
    }

    #[tokio::test]
    async fn decorator_merges_native_and_tagged_reasoning() {
        let p = ReasoningProvider::new(
            mock_replying(Some("native"), "<think>tagged</think>answer"),
            "think",
        );
        let direct = p.complete("hi", None).await.unwrap();
        assert_eq!(direct.reasoning.as_deref(), Some("native\ntagged"));
        assert_eq!(direct.text, "answer");
        let streamed = collect_stream(p.stream("hi", None).await.unwrap()).await.unwrap();
        assert_eq!(streamed, direct);
    }
}
