use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::protocol::{PayloadItem, SendError};

/// Copies body chunks as they are, never past the announced length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl Encoder<PayloadItem> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                if bytes.len() as u64 > self.remaining {
                    warn!(remaining = self.remaining, chunk = bytes.len(), "body longer than content-length");
                    return Err(SendError::invalid_body("body longer than the announced content-length"));
                }
                dst.extend_from_slice(&bytes);
                self.remaining -= bytes.len() as u64;
                Ok(())
            }
            PayloadItem::Eof if self.remaining > 0 => {
                Err(SendError::invalid_body(format!("body ended {} bytes short of content-length", self.remaining)))
            }
            PayloadItem::Eof => Ok(()),
        }
    }
}
