//! Streaming response channel.
//!
//! A [`ResponseStream`] delivers the increments of one generation cycle.
//! It is lazy (nothing runs until it is polled), finite, and cannot be
//! restarted: once it yields an error or ends it only yields `None`.

use crate::error::{SessionError, ToolError};
use crate::tool::ToolPayload;
use futures::stream::{BoxStream, FusedStream, StreamExt};
use futures::Stream;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::pin::Pin;
use std::task::{Context, Poll};
use vitals_core::ToolCallId;

/// One increment delivered to the consumer of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseUpdate {
    /// Response text, appended to the in-progress response.
    Text { delta: String },
    /// A structured response segment.
    Structure { content: JsonMap<String, JsonValue> },
    /// The model called a tool; the call is already in the transcript.
    ToolCalled {
        call_id: ToolCallId,
        name: String,
        arguments: JsonValue,
    },
    /// The tool finished; its output is already in the transcript.
    ToolCompleted {
        call_id: ToolCallId,
        name: String,
        result: Result<ToolPayload, ToolError>,
    },
}

/// The increments of one generation cycle.
pub struct ResponseStream {
    inner: futures::stream::Fuse<BoxStream<'static, Result<ResponseUpdate, SessionError>>>,
}

impl ResponseStream {
    pub(crate) fn new(
        inner: impl Stream<Item = Result<ResponseUpdate, SessionError>> + Send + 'static,
    ) -> Self {
        Self {
            inner: inner.boxed().fuse(),
        }
    }

    /// Drains the stream and returns the response text.
    ///
    /// # Errors
    ///
    /// Returns the first error the cycle produced.
    pub async fn collect_text(mut self) -> Result<String, SessionError> {
        let mut text = String::new();
        while let Some(update) = self.next().await {
            if let ResponseUpdate::Text { delta } = update? {
                text.push_str(&delta);
            }
        }
        Ok(text)
    }
}

impl Stream for ResponseStream {
    type Item = Result<ResponseUpdate, SessionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl FusedStream for ResponseStream {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("terminated", &self.inner.is_terminated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;

    #[tokio::test]
    async fn collect_text_concatenates_deltas() {
        let stream = ResponseStream::new(futures::stream::iter(vec![
            Ok(ResponseUpdate::Text {
                delta: "Your last ".to_string(),
            }),
            Ok(ResponseUpdate::Structure {
                content: JsonMap::new(),
            }),
            Ok(ResponseUpdate::Text {
                delta: "reading".to_string(),
            }),
        ]));
        assert_eq!(stream.collect_text().await.expect("text"), "Your last reading");
    }

    #[tokio::test]
    async fn collect_text_returns_first_error() {
        let stream = ResponseStream::new(futures::stream::iter(vec![
            Ok(ResponseUpdate::Text {
                delta: "partial".to_string(),
            }),
            Err(SessionError::Generation(GenerationError::Timeout)),
        ]));
        let err = stream.collect_text().await.expect_err("error");
        assert_eq!(err, SessionError::Generation(GenerationError::Timeout));
    }

    #[tokio::test]
    async fn ended_stream_stays_ended() {
        let mut stream = ResponseStream::new(futures::stream::iter(Vec::new()));
        assert!(stream.next().await.is_none());
        assert!(stream.is_terminated());
        assert!(stream.next().await.is_none());
    }
}
