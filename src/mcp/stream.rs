//! Event-stream framing of JSON-RPC responses
//!
//! Each response becomes one `data: <json>\n\n` frame; the stream always closes with a
//! single `data: [DONE]\n\n` frame. Replies without a body bypass framing entirely and
//! are signalled as an acknowledgment instead.

use std::convert::Infallible;

use axum::body::Bytes;
use futures::stream::{self, Stream};

use crate::mcp::rpc::JsonRpcResponse;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";
pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

const DATA_PREFIX: &[u8] = b"data: ";
const RECORD_SEPARATOR: &[u8] = b"\n\n";

/// Output of the encoder: either framed payload or a bodiless acknowledgment.
#[derive(Debug)]
pub enum EncodedReply {
    Stream(EventStream),
    Acknowledged,
}

/// Ordered frames of one reply, terminator included.
#[derive(Debug, Clone)]
pub struct EventStream {
    frames: Vec<Bytes>,
}

impl EventStream {
    pub fn from_responses<'a, I>(responses: I) -> Result<Self, serde_json::Error>
    where
        I: IntoIterator<Item = &'a JsonRpcResponse>,
    {
        let mut frames = responses
            .into_iter()
            .map(encode_frame)
            .collect::<Result<Vec<_>, _>>()?;
        frames.push(Bytes::from_static(DONE_FRAME));
        Ok(Self { frames })
    }

    pub fn single(response: &JsonRpcResponse) -> Result<Self, serde_json::Error> {
        Self::from_responses([response])
    }

    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.frames.concat())
    }

    /// Frames as a body stream. Dropping it mid-way abandons the remaining frames.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        stream::iter(self.frames.into_iter().map(Ok))
    }
}

pub fn encode_frame(response: &JsonRpcResponse) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(response)?;
    let mut frame = Vec::with_capacity(DATA_PREFIX.len() + json.len() + RECORD_SEPARATOR.len());
    frame.extend_from_slice(DATA_PREFIX);
    frame.extend_from_slice(&json);
    frame.extend_from_slice(RECORD_SEPARATOR);
    Ok(Bytes::from(frame))
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use rust_mcp_sdk::schema::RequestId;
    use serde_json::json;

    use super::*;
    use crate::mcp::rpc::ProtocolError;

    fn count_terminators(bytes: &[u8]) -> usize {
        bytes
            .windows(DONE_FRAME.len())
            .filter(|window| *window == DONE_FRAME)
            .count()
    }

    #[test]
    fn success_frame_matches_wire_format() {
        let response = JsonRpcResponse::success(Some(RequestId::Integer(1)), json!({}));
        let stream = EventStream::single(&response).expect("encode");

        assert_eq!(
            stream.to_bytes(),
            Bytes::from_static(b"data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\ndata: [DONE]\n\n")
        );
    }

    #[test]
    fn error_stream_ends_with_exactly_one_terminator() {
        let response = JsonRpcResponse::failure(
            Some(RequestId::String("r1".to_string())),
            &ProtocolError::SessionNotReady,
        );
        let stream = EventStream::single(&response).expect("encode");
        let bytes = stream.to_bytes();

        assert_eq!(stream.frames().len(), 2);
        assert_eq!(count_terminators(&bytes), 1);
        assert!(bytes.ends_with(DONE_FRAME));
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(!text.contains("\"result\""));
    }

    #[test]
    fn frames_keep_input_order() {
        let first = JsonRpcResponse::success(Some(RequestId::Integer(1)), json!({"n": 1}));
        let second = JsonRpcResponse::success(Some(RequestId::Integer(2)), json!({"n": 2}));
        let stream = EventStream::from_responses([&first, &second]).expect("encode");

        let frames = stream.frames();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with(b"data: {\"jsonrpc\":\"2.0\",\"id\":1"));
        assert!(frames[1].starts_with(b"data: {\"jsonrpc\":\"2.0\",\"id\":2"));
        assert_eq!(&frames[2][..], DONE_FRAME);
        assert_eq!(count_terminators(&stream.to_bytes()), 1);
    }

    #[test]
    fn empty_input_still_terminates() {
        let stream =
            EventStream::from_responses(std::iter::empty::<&JsonRpcResponse>()).expect("encode");
        assert_eq!(stream.to_bytes(), Bytes::from_static(DONE_FRAME));
    }

    #[tokio::test]
    async fn body_stream_yields_every_frame() {
        let response = JsonRpcResponse::success(Some(RequestId::Integer(5)), json!({"ok": true}));
        let stream = EventStream::single(&response).expect("encode");
        let expected = stream.frames().to_vec();

        let collected: Vec<Bytes> = stream
            .into_stream()
            .map(|frame| match frame {
                Ok(bytes) => bytes,
                Err(never) => match never {},
            })
            .collect()
            .await;

        assert_eq!(collected, expected);
    }
}
