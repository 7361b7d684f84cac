use bytes::BytesMut;
use http::{Version, header};
use tokio_util::codec::Encoder;

use crate::codec::body::PayloadEncoder;
use crate::codec::header::{HeaderEncoder, is_chunked};
use crate::protocol::{PayloadItem, PayloadSize, Response, SendError};

/// Serializes a finished [`Response`] for a request of the given protocol version.
///
/// The body is sent with `Content-Length` unless the handler asked for
/// `Transfer-Encoding: chunked`, in which case every written chunk becomes one
/// chunk on the wire.
#[derive(Debug)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self { header_encoder: HeaderEncoder }
    }
}

impl<'a> Encoder<(Version, &'a Response)> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (Version, &'a Response), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (version, response) = item;
        let payload_size = payload_size(response)?;

        // nothing reaches `dst` unless the whole response encodes
        let mut buf = BytesMut::with_capacity(response.body_len() + 256);
        self.header_encoder.encode((version, response, payload_size), &mut buf)?;

        let mut payload_encoder = PayloadEncoder::from(payload_size);
        for chunk in response.chunks() {
            payload_encoder.encode(PayloadItem::Chunk(chunk.clone()), &mut buf)?;
        }
        payload_encoder.encode(PayloadItem::Eof, &mut buf)?;

        dst.extend_from_slice(&buf);
        Ok(())
    }
}

fn payload_size(response: &Response) -> Result<PayloadSize, SendError> {
    let headers = response.headers();

    if headers.get(header::TRANSFER_ENCODING.as_str()).is_some_and(is_chunked) {
        return Ok(PayloadSize::new_chunked());
    }

    match headers.get(header::CONTENT_LENGTH.as_str()) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            // an explicit zero still has to match the body
            .map(PayloadSize::Length)
            .map_err(|_| SendError::invalid_header(format!("content-length {value} is not u64"))),
        None => Ok(PayloadSize::new_length(response.body_len() as u64)),
    }
}
