//! Request body type for HTTP transport.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

use crate::GatewayError;

/// A request body sent by the gateway.
///
/// GET requests carry no body; everything else is encoded up front.
#[derive(Default)]
pub enum TransportBody {
    /// Empty request body.
    #[default]
    Empty,
    /// Full request body with all data available.
    Full { data: Option<Bytes> },
}

impl TransportBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        TransportBody::Empty
    }

    /// Create a body with the given data.
    pub fn full(data: Bytes) -> Self {
        TransportBody::Full { data: Some(data) }
    }

    /// Peek at the bytes that have not been sent yet.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            TransportBody::Empty => None,
            TransportBody::Full { data } => data.as_ref(),
        }
    }
}

impl Body for TransportBody {
    type Data = Bytes;
    type Error = GatewayError;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            TransportBody::Empty => Poll::Ready(None),
            TransportBody::Full { data } => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            TransportBody::Empty => true,
            TransportBody::Full { data } => data.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        let len = self.as_bytes().map_or(0, |d| d.len() as u64);
        SizeHint::with_exact(len)
    }
}

impl std::fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportBody::Empty => write!(f, "TransportBody::Empty"),
            TransportBody::Full { data } => f
                .debug_struct("TransportBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
        }
    }
}
