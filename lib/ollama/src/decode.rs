//! Newline-delimited JSON decoding for streamed chat responses.

use crate::wire::ChatChunk;
use futures::{Stream, StreamExt, stream};
use std::fmt::Display;
use vitals_conversation::{GenerationError, ModelEvent};

/// Turns a streamed response body into model events.
///
/// The last line is decoded when the body ends, even without a trailing
/// newline. Transport errors become `RequestFailed`.
pub(crate) fn decode_events<S, B, E>(
    body: S,
) -> impl Stream<Item = Result<ModelEvent, GenerationError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: Display + 'static,
{
    let mut decoder = LineDecoder::default();
    body.map(Some)
        .chain(stream::once(async { None }))
        .flat_map(move |chunk| {
            let decoded = match chunk {
                Some(Ok(bytes)) => decoder.push(bytes.as_ref()),
                Some(Err(e)) => vec![Err(GenerationError::RequestFailed {
                    reason: e.to_string(),
                })],
                None => decoder.finish().into_iter().collect(),
            };
            let events: Vec<_> = decoded
                .into_iter()
                .flat_map(|chunk| match chunk {
                    Ok(chunk) => chunk.into_events(),
                    Err(e) => vec![Err(e)],
                })
                .collect();
            stream::iter(events)
        })
}

/// Reassembles JSON lines from arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Feeds bytes and returns every complete line decoded so far.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<ChatChunk, GenerationError>> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(chunk) = parse_line(&line) {
                chunks.push(chunk);
            }
        }
        chunks
    }

    /// Decodes whatever remains once the body has ended.
    pub fn finish(&mut self) -> Option<Result<ChatChunk, GenerationError>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<Result<ChatChunk, GenerationError>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(line).map_err(|e| GenerationError::ResponseParseFailed {
            reason: e.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn texts(chunks: Vec<Result<ChatChunk, GenerationError>>) -> Vec<String> {
        chunks
            .into_iter()
            .map(|c| c.expect("chunk").message.expect("message").content)
            .collect()
    }

    #[test]
    fn lines_split_across_chunks_are_reassembled() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(br#"{"message":{"role":"assistant","con"#).is_empty());
        let decoded = decoder.push(
            b"tent\":\"Your \"},\"done\":false}\n{\"message\":{\"role\":\"assistant\",\"content\":\"reading\"},\"done\":false}\n",
        );
        assert_eq!(texts(decoded), vec!["Your ", "reading"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn trailing_line_without_newline_is_decoded_on_finish() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(br#"{"done":true}"#).is_empty());
        let last = decoder.finish().expect("line").expect("chunk");
        assert!(last.done);
    }

    #[test]
    fn blank_lines_are_skipped_and_garbage_is_an_error() {
        let mut decoder = LineDecoder::default();
        let decoded = decoder.push(b"\n\r\nnot json\n");
        assert_eq!(decoded.len(), 1);
        assert!(matches!(
            decoded[0],
            Err(GenerationError::ResponseParseFailed { .. })
        ));
    }

    #[tokio::test]
    async fn body_stream_yields_events_and_flushes_last_line() {
        let body = stream::iter(vec![
            Ok::<_, std::io::Error>(
                br#"{"message":{"role":"assistant","content":"Your last "}}"#.to_vec(),
            ),
            Ok(b"\n{\"message\":{\"role\":\"assistant\",\"content\":\"reading\"}}\n".to_vec()),
            Ok(br#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"blood_pressure","arguments":{}}}]},"done":true}"#.to_vec()),
        ]);

        let events: Vec<_> = decode_events(body).collect().await;
        assert_eq!(
            events,
            vec![
                Ok(ModelEvent::text("Your last ")),
                Ok(ModelEvent::text("reading")),
                Ok(ModelEvent::tool_call("blood_pressure", json!({}))),
            ]
        );
    }

    #[tokio::test]
    async fn transport_errors_become_request_failures() {
        let body = stream::iter(vec![
            Ok(b"{\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"}}\n".to_vec()),
            Err("connection reset"),
        ]);

        let events: Vec<_> = decode_events(body).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Ok(ModelEvent::text("Hi")));
        assert_eq!(
            events[1],
            Err(GenerationError::RequestFailed {
                reason: "connection reset".to_string()
            })
        );
    }
}
