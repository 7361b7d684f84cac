use std::error::Error;
use std::sync::Arc;

use bytes::BytesMut;
use futures::SinkExt;
use http::{StatusCode, Version, header};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{HttpError, Message, ParseError, ParserState, PayloadItem, Request, RequestParser, Response, SendError};

/// Upper bound of a single read from the transport, 1 MiB.
pub const DEFAULT_READ_CHUNK: usize = 1024 * 1024;

const INIT_READ_BUFFER: usize = 8 * 1024;

const CONTINUE_LINE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// What reading one request produced.
enum Cycle {
    /// The request is complete and parsed
    Ready(Request),
    /// The head and body were framed correctly but the body content could not be parsed
    Malformed { version: Version, keep_alive: bool, error: ParseError },
    /// The peer went away
    Closed,
}

/// One client connection, split into its read and write halves.
pub struct HttpConnection<R, W> {
    reader: R,
    read_buf: BytesMut,
    decoder: RequestDecoder,
    framed_write: FramedWrite<W, ResponseEncoder>,
    max_read_chunk: usize,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_read_chunk(reader, writer, DEFAULT_READ_CHUNK)
    }

    /// Like [`HttpConnection::new`], reading at most `max_read_chunk` bytes at a time.
    pub fn with_read_chunk(reader: R, writer: W, max_read_chunk: usize) -> Self {
        Self {
            reader,
            read_buf: BytesMut::with_capacity(INIT_READ_BUFFER.min(max_read_chunk.max(1))),
            decoder: RequestDecoder::new(),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            max_read_chunk: max_read_chunk.max(1),
        }
    }

    /// Serves requests until the peer disconnects or a request asks to close.
    ///
    /// A request that cannot be framed is answered with `400 Bad Request`, after which
    /// the connection is given up and the parse error returned.
    pub async fn process<H: Handler>(mut self, handler: Arc<H>) -> Result<(), HttpError> {
        loop {
            let mut request = match self.read_request().await {
                Ok(Cycle::Ready(request)) => request,

                Ok(Cycle::Closed) => {
                    info!("can't read more request, break this connection down");
                    return Ok(());
                }

                Ok(Cycle::Malformed { version, keep_alive, error: e }) => {
                    error!(cause = %e, "failed to parse request body");
                    let mut response = status_response(StatusCode::INTERNAL_SERVER_ERROR);
                    if keep_alive && version == Version::HTTP_10 {
                        response.set_header(header::CONNECTION.as_str(), "keep-alive");
                    }
                    self.send_response(version, &response).await?;
                    if !keep_alive {
                        info!("request does not keep alive, close the connection");
                        return Ok(());
                    }
                    continue;
                }

                Err(HttpError::RequestError { source }) => {
                    error!(cause = %source, "can't receive next request");
                    let mut response = status_response(StatusCode::BAD_REQUEST);
                    response.set_header(header::CONNECTION.as_str(), "close");
                    self.send_response(Version::HTTP_11, &response).await?;
                    return Err(source.into());
                }

                Err(e) => return Err(e),
            };

            let mut response = Response::new();
            if let Err(e) = handler.call(&mut request, &mut response).await {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!(cause = %e, path = %request.path(), "handle request error");
                response = status_response(StatusCode::INTERNAL_SERVER_ERROR);
            }

            let keep_alive = request.is_keep_alive() && !asks_close(&response);
            if keep_alive && request.version() == Version::HTTP_10 && !response.headers().contains_key(header::CONNECTION.as_str()) {
                response.set_header(header::CONNECTION.as_str(), "keep-alive");
            }

            self.send_response(request.version(), &response).await?;
            debug!(method = %request.method(), path = %request.path(), status = response.status().as_u16(), "sent response");

            if !keep_alive {
                info!("request does not keep alive, close the connection");
                return Ok(());
            }
        }
    }

    /// Feeds decoded messages into a fresh [`RequestParser`] until the request is complete.
    async fn read_request(&mut self) -> Result<Cycle, HttpError> {
        let mut parser = RequestParser::new();

        loop {
            while let Some(message) = self.decoder.decode(&mut self.read_buf)? {
                match message {
                    Message::Header((head, _payload_size)) => {
                        head.replay(&mut parser)?;
                        parser.on_headers_complete();

                        if parser.state() == ParserState::ExpectContinue {
                            self.send_continue().await?;
                            parser.continue_sent();
                        }
                    }

                    Message::Payload(PayloadItem::Chunk(bytes)) => parser.on_body(&bytes),

                    Message::Payload(PayloadItem::Eof) => {
                        return match parser.on_message_complete() {
                            Ok(()) => Ok(Cycle::Ready(parser.into_request())),
                            Err(e) if e.is_recoverable() => {
                                let request = parser.request();
                                Ok(Cycle::Malformed { version: request.version(), keep_alive: request.is_keep_alive(), error: e })
                            }
                            Err(e) => Err(e.into()),
                        };
                    }
                }
            }

            if !self.fill_read_buf().await? {
                if parser.has_path() {
                    warn!(path = %parser.request().path(), "connection closed before the request was complete");
                } else if !self.read_buf.is_empty() {
                    debug!(pending = self.read_buf.len(), "connection closed in the middle of a request head");
                }
                return Ok(Cycle::Closed);
            }
        }
    }

    /// Reads at most `max_read_chunk` bytes; `false` once the peer has closed.
    async fn fill_read_buf(&mut self) -> Result<bool, ParseError> {
        self.read_buf.reserve(INIT_READ_BUFFER.min(self.max_read_chunk));
        let limit = self.max_read_chunk as u64;
        let n = (&mut self.reader).take(limit).read_buf(&mut self.read_buf).await.map_err(ParseError::io)?;
        Ok(n > 0)
    }

    async fn send_continue(&mut self) -> Result<(), SendError> {
        let writer = self.framed_write.get_mut();
        writer.write_all(CONTINUE_LINE).await.map_err(SendError::io)?;
        writer.flush().await.map_err(SendError::io)?;
        info!("receive expect request header, sent continue response");
        Ok(())
    }

    /// Writes `response`; one that can't be encoded is replaced by `500 Internal Server Error`.
    async fn send_response(&mut self, version: Version, response: &Response) -> Result<(), SendError> {
        match self.framed_write.send((version, response)).await {
            Err(e @ (SendError::InvalidBody { .. } | SendError::InvalidHeader { .. })) => {
                error!(cause = %e, status = response.status().as_u16(), "can't encode response, sending internal server error");
                let fallback = status_response(StatusCode::INTERNAL_SERVER_ERROR);
                self.framed_write.send((version, &fallback)).await
            }
            result => result,
        }
    }
}

fn status_response(status: StatusCode) -> Response {
    let mut response = Response::new();
    response.set_status(status);
    response.set_header(header::CONTENT_TYPE.as_str(), mime::TEXT_PLAIN_UTF_8.as_ref());
    response.write(status.to_string());
    response
}

fn asks_close(response: &Response) -> bool {
    response
        .headers()
        .get_all(header::CONNECTION.as_str())
        .unwrap_or_default()
        .iter()
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case("close"))
}
