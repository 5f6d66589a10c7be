//! SSE streaming shared by provider adapters.
//!
//! Chunks from a `reqwest::Response` go through the same
//! [`FrameDecoder`] the stream client uses; each `data:` payload is handed
//! to an adapter-specific parser.

use crate::util::from_reqwest;
use sb_domain::error::Result;
use sb_domain::frame::FrameDecoder;
use sb_domain::stream::{BoxStream, StreamEvent};

/// Build a [`BoxStream`] from an SSE response and a payload parser.
///
/// The parser is `FnMut` so adapters can keep assembly state across
/// payloads. A closing `Done` is synthesized if the parser never produced one.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut decoder = FrameDecoder::new();
        let mut done_emitted = false;

        loop {
            let payloads = match response.chunk().await {
                Ok(Some(bytes)) => decoder.push_bytes(&bytes),
                Ok(None) => {
                    // Body closed; flush a trailing event with no terminator.
                    let tail = if decoder.has_partial() {
                        decoder.push_str("\n\n")
                    } else {
                        Vec::new()
                    };
                    for data in tail {
                        for event in parse_data(&data) {
                            done_emitted |= matches!(&event, Ok(StreamEvent::Done { .. }));
                            yield event;
                        }
                    }
                    break;
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            };

            for data in payloads {
                for event in parse_data(&data) {
                    done_emitted |= matches!(&event, Ok(StreamEvent::Done { .. }));
                    yield event;
                }
            }
        }

        if !done_emitted {
            yield Ok(StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
            });
        }
    };

    Box::pin(stream)
}
