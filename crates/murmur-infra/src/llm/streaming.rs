//! OpenAI SSE stream to [`StreamChunk`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] events to the
//! provider-agnostic chunk shape defined in `murmur-types`.
//!
//! With `stream_options.include_usage = true` the provider reports usage
//! on the final chunk, which carries an empty choices array. The tracker
//! below makes sure a usage snapshot is surfaced exactly once: attached to
//! the chunk where it arrived, or as a trailing empty-content chunk when
//! it only showed up at stream end.

use async_openai::types::chat::ChatCompletionResponseStream;
use futures_util::StreamExt;

use murmur_core::llm::client::ChunkStream;
use murmur_types::llm::{CompletionError, StreamChunk, TokenUsage};

/// Holds the most recent usage snapshot until a chunk carries it out.
#[derive(Debug, Default)]
pub(crate) struct UsageTracker {
    pending: Option<TokenUsage>,
}

impl UsageTracker {
    pub(crate) fn observe(&mut self, usage: TokenUsage) {
        self.pending = Some(usage);
    }

    pub(crate) fn take(&mut self) -> Option<TokenUsage> {
        self.pending.take()
    }
}

/// Map an async-openai [`ChatCompletionResponseStream`] to a stream of
/// [`StreamChunk`]s.
pub fn map_completion_stream(stream: ChatCompletionResponseStream) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let mut stream = stream;
        let mut tracker = UsageTracker::default();

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| CompletionError::Stream(e.to_string()))?;

            if let Some(usage) = chunk.usage.as_ref() {
                tracker.observe(TokenUsage {
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                });
            }

            let content = chunk
                .choices
                .first()
                .and_then(|c| c.delta.content.clone())
                .unwrap_or_default();

            if !content.is_empty() {
                yield StreamChunk {
                    content,
                    usage: tracker.take(),
                };
            }
        }

        if let Some(usage) = tracker.take() {
            yield StreamChunk::usage(usage);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(total: u32) -> TokenUsage {
        TokenUsage {
            prompt_tokens: total / 2,
            completion_tokens: total - total / 2,
            total_tokens: total,
        }
    }

    #[test]
    fn test_tracker_surfaces_usage_once() {
        let mut tracker = UsageTracker::default();
        tracker.observe(usage(30));

        assert_eq!(tracker.take(), Some(usage(30)));
        assert_eq!(tracker.take(), None);
    }

    #[test]
    fn test_tracker_keeps_latest_snapshot() {
        let mut tracker = UsageTracker::default();
        tracker.observe(usage(10));
        tracker.observe(usage(25));

        assert_eq!(tracker.take(), Some(usage(25)));
    }

    #[test]
    fn test_tracker_empty_by_default() {
        let mut tracker = UsageTracker::default();
        assert_eq!(tracker.take(), None);
    }
}
