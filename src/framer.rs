// ABOUTME: Reassembles length-prefixed SMPP PDUs from an arbitrarily chunked byte stream
// ABOUTME: Yields complete PDU byte ranges and keeps any trailing partial PDU for the next read

use crate::codec::{CodecError, MAX_PDU_SIZE, PduHeader};
use bytes::{Buf, Bytes, BytesMut};

/// Stream framer for SMPP
///
/// Every PDU starts with a 4-byte big-endian command_length that counts
/// itself. The framer accumulates bytes across reads, cuts out each complete
/// PDU and leaves partial data buffered. It does not look past the length
/// field; decoding is the codec's job.
#[derive(Debug)]
pub struct StreamFramer {
    buffer: BytesMut,
    max_pdu_size: u32,
}

impl StreamFramer {
    pub fn new() -> Self {
        Self::with_max_pdu_size(MAX_PDU_SIZE)
    }

    pub fn with_max_pdu_size(max_pdu_size: u32) -> Self {
        StreamFramer {
            // Default to a 4KB read buffer, it grows on demand
            buffer: BytesMut::with_capacity(4 * 1024),
            max_pdu_size,
        }
    }

    /// Append raw bytes read from the transport
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Cut the next complete PDU out of the buffer.
    ///
    /// Returns `Ok(None)` until enough bytes have arrived. A length field
    /// below the header size or above the configured maximum is a protocol
    /// error; the stream cannot be resynchronised after one.
    pub fn next_pdu(&mut self) -> Result<Option<Bytes>, CodecError> {
        if self.buffer.len() < 4 {
            return Ok(None);
        }

        let command_length = u32::from_be_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]);

        if command_length < PduHeader::SIZE as u32 || command_length > self.max_pdu_size {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: self.max_pdu_size,
            });
        }

        if self.buffer.len() < command_length as usize {
            return Ok(None);
        }

        Ok(Some(self.buffer.split_to(command_length as usize).freeze()))
    }

    /// Append `data` and drain every PDU that is now complete
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<Bytes>, CodecError> {
        self.extend(data);
        let mut pdus = Vec::new();
        while let Some(pdu) = self.next_pdu()? {
            pdus.push(pdu);
        }
        Ok(pdus)
    }

    /// Number of buffered bytes not yet part of a complete PDU
    pub fn pending(&self) -> usize {
        self.buffer.remaining()
    }

    /// Drop buffered data, used when the connection is torn down
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}
