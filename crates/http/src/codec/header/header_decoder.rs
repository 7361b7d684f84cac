//! Request line and header block decoding.
//!
//! Bytes are handed to `httparse` until a complete head is available. The head is
//! copied out as owned strings, so the source buffer can be advanced past it and
//! whatever follows is left for the payload decoder.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header block size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1

use bytes::{Buf, BytesMut};
use http::{Method, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, RequestHead};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes a [`RequestHead`] and works out how its payload is framed.
#[derive(Debug, Clone, Copy)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let status = req.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            Error::Version => ParseError::InvalidVersion(None),
            Error::Token => ParseError::InvalidMethod,
            e => ParseError::invalid_header(e.to_string()),
        })?;

        let body_offset = match status {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(header_size = body_offset, "parsed request head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
        let target = req.path.ok_or(ParseError::InvalidUri)?.to_string();

        let mut fields = Vec::with_capacity(req.headers.len());
        for header in req.headers.iter() {
            let value = std::str::from_utf8(header.value)
                .map_err(|_| ParseError::invalid_header(format!("value of {} is not utf-8", header.name)))?;
            fields.push((header.name.to_string(), value.trim().to_string()));
        }

        let payload_size = parse_payload(&fields)?;
        src.advance(body_offset);

        Ok(Some((RequestHead::new(method, target, version, fields), payload_size)))
    }
}

fn find<'a>(fields: &'a [(String, String)], name: &http::HeaderName) -> Option<&'a str> {
    fields.iter().find(|(n, _)| n.eq_ignore_ascii_case(name.as_str())).map(|(_, v)| v.as_str())
}

/// Picks the payload framing from `Transfer-Encoding` and `Content-Length`.
///
/// refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length
fn parse_payload(fields: &[(String, String)]) -> Result<PayloadSize, ParseError> {
    let te = find(fields, &http::header::TRANSFER_ENCODING);
    let cl = find(fields, &http::header::CONTENT_LENGTH);

    match (te, cl) {
        (None, None) => Ok(PayloadSize::new_empty()),

        (Some(te), None) => {
            if is_chunked(te) {
                Ok(PayloadSize::new_chunked())
            } else {
                Ok(PayloadSize::new_empty())
            }
        }

        (None, Some(cl)) => {
            let length = cl.parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl} is not u64")))?;
            Ok(PayloadSize::new_length(length))
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
    }
}

/// `chunked` must be the final transfer coding when present.
pub(crate) fn is_chunked(value: &str) -> bool {
    value.rsplit(',').next().is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
}
