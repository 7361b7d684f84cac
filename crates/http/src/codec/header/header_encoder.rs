//! Status line and header block encoding.

use std::io;
use std::io::Write;
use std::time::SystemTime;

use bytes::{BufMut, BytesMut};
use http::{Version, header};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadSize, Response, SendError};

const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Value of the `Server` header added to every response that lacks one.
pub const SERVER_NAME: &str = "albatross";

/// Writes the head of `response`, answering in the request's protocol `version`.
///
/// Headers the handler did not set itself are filled in: the framing header matching
/// the [`PayloadSize`], `Date` and `Server`. Cookies follow as one `Set-Cookie` line
/// each.
#[derive(Debug, Clone, Copy)]
pub struct HeaderEncoder;

impl<'a> Encoder<(Version, &'a Response, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (Version, &'a Response, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (version, response, payload_size) = item;
        let headers = response.headers();

        dst.reserve(INIT_HEADER_SIZE);
        let version = match version {
            Version::HTTP_10 => "HTTP/1.0",
            _ => "HTTP/1.1",
        };
        let status = response.status();
        write!(FastWrite(dst), "{} {} {}\r\n", version, status.as_str(), status.canonical_reason().unwrap_or(""))?;

        for (name, value) in headers.iter() {
            ensure_line_safe(name)?;
            ensure_line_safe(value)?;
            put_header(dst, name, value);
        }

        match payload_size {
            PayloadSize::Chunked => {
                if !headers.contains_key(header::TRANSFER_ENCODING.as_str()) {
                    put_header(dst, header::TRANSFER_ENCODING.as_str(), "chunked");
                }
            }
            PayloadSize::Length(n) => {
                if !headers.contains_key(header::CONTENT_LENGTH.as_str()) {
                    put_header(dst, header::CONTENT_LENGTH.as_str(), &n.to_string());
                }
            }
            PayloadSize::Empty => {
                if !headers.contains_key(header::CONTENT_LENGTH.as_str()) {
                    put_header(dst, header::CONTENT_LENGTH.as_str(), "0");
                }
            }
        }

        if !headers.contains_key(header::DATE.as_str()) {
            put_header(dst, header::DATE.as_str(), &httpdate::fmt_http_date(SystemTime::now()));
        }
        if !headers.contains_key(header::SERVER.as_str()) {
            put_header(dst, header::SERVER.as_str(), SERVER_NAME);
        }

        for cookie in response.cookies() {
            let value = cookie.header_value();
            ensure_line_safe(&value)?;
            put_header(dst, header::SET_COOKIE.as_str(), &value);
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[inline]
fn put_header(dst: &mut BytesMut, name: &str, value: &str) {
    dst.put_slice(name.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(value.as_bytes());
    dst.put_slice(b"\r\n");
}

/// A header line must not be able to end the head early.
fn ensure_line_safe(s: &str) -> Result<(), SendError> {
    if s.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(SendError::invalid_header(format!("line break in header field {s:?}")));
    }
    Ok(())
}

struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
