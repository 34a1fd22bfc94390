//! Decodes an SSE byte stream into a stream of [`acp_core::event::Event`]
//! values, mirroring `ag-ui-client::stream`'s `EventStream` alias.

use acp_core::event::Event;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest_eventsource::{Event as SseEvent, EventSource};

use crate::error::{ClientError, ClientResult};

/// A boxed stream of decoded run events.
pub type EventStream = BoxStream<'static, ClientResult<Event>>;

/// Wraps a `reqwest_eventsource::EventSource` as an [`EventStream`],
/// decoding each `data:` frame's JSON payload into an [`Event`] and
/// ending the stream when the connection closes (the terminal event has
/// already been delivered by then.
pub(crate) fn decode(source: EventSource) -> EventStream {
    Box::pin(source.filter_map(|item| async move {
        match item {
            Ok(SseEvent::Open) => None,
            Ok(SseEvent::Message(message)) => {
                Some(serde_json::from_str::<Event>(&message.data).map_err(ClientError::from))
            }
            Err(reqwest_eventsource::Error::StreamEnded) => None,
            Err(e) => Some(Err(ClientError::Stream(e.to_string()))),
        }
    }))
}
