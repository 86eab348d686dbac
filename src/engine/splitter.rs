// ABOUTME: Turns one outbound message into the submit_sm PDUs that carry it
// ABOUTME: Supports message_payload, UDH concatenation and SAR segmentation

use crate::codec::MAX_SHORT_MESSAGE_LENGTH;
use crate::datatypes::{SubmitSm, Tlv, esm_class, tags};
use crate::error::{SmppError, SmppResult};
use bytes::{BufMut, Bytes, BytesMut};

/// Payload octets per UDH segment; the 6-byte header brings it to 136
pub const UDH_CHUNK_SIZE: usize = 130;

/// Payload octets per SAR segment
pub const SAR_CHUNK_SIZE: usize = 128;

/// Segment counts travel in a single octet
pub const MAX_SEGMENTS: usize = 255;

/// How a message longer than the short_message field is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongMessageStrategy {
    /// One PDU, content in the message_payload TLV
    MessagePayload,
    /// Several PDUs, each prefixed with a concatenation User Data Header
    MultipartUdh,
    /// Several PDUs tied together with sar_* TLVs
    MultipartSar,
}

/// One piece of a multipart message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSegment {
    pub reference: u16,
    /// 1-based
    pub position: u8,
    pub total: u8,
    pub payload: Bytes,
}

impl MessageSegment {
    /// The 8-bit reference concatenation header: IEI 0x00, length 3
    pub fn udh(&self) -> [u8; 6] {
        [0x05, 0x00, 0x03, self.reference as u8, self.total, self.position]
    }
}

/// Cut `content` into numbered segments of at most `chunk_size` octets
pub fn segment(content: &[u8], chunk_size: usize, reference: u16) -> SmppResult<Vec<MessageSegment>> {
    let count = content.len().div_ceil(chunk_size).max(1);
    if count > MAX_SEGMENTS {
        return Err(SmppError::InvalidData(format!(
            "message of {} bytes needs {} segments, at most {} are possible",
            content.len(),
            count,
            MAX_SEGMENTS
        )));
    }

    Ok(content
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, chunk)| MessageSegment {
            reference,
            position: (index + 1) as u8,
            total: count as u8,
            payload: Bytes::copy_from_slice(chunk),
        })
        .collect())
}

/// Produces submit_sm PDUs for a message according to the configured
/// strategy. Sequence numbers are left at zero for the engine to assign.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageSplitter {
    strategy: Option<LongMessageStrategy>,
}

impl MessageSplitter {
    pub fn new(strategy: Option<LongMessageStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> Option<LongMessageStrategy> {
        self.strategy
    }

    /// Largest message that still goes out as one plain PDU. The multipart
    /// strategies split anything longer than a single segment.
    pub fn single_pdu_limit(&self) -> usize {
        match self.strategy {
            Some(LongMessageStrategy::MultipartUdh) => UDH_CHUNK_SIZE,
            Some(LongMessageStrategy::MultipartSar) => SAR_CHUNK_SIZE,
            Some(LongMessageStrategy::MessagePayload) | None => MAX_SHORT_MESSAGE_LENGTH,
        }
    }

    /// Build the PDUs for `content`, copying every other field from
    /// `template`. `reference` ties multipart segments together and is
    /// ignored for single-PDU results.
    pub fn split(&self, template: &SubmitSm, content: &[u8], reference: u16) -> SmppResult<Vec<SubmitSm>> {
        if content.len() <= self.single_pdu_limit() {
            let mut pdu = template.clone();
            pdu.short_message = Bytes::copy_from_slice(content);
            return Ok(vec![pdu]);
        }

        match self.strategy {
            None => Err(SmppError::InvalidData(format!(
                "message of {} bytes exceeds the {} byte short_message limit and no long message strategy is configured",
                content.len(),
                MAX_SHORT_MESSAGE_LENGTH
            ))),
            Some(LongMessageStrategy::MessagePayload) => {
                let mut pdu = template.clone();
                pdu.short_message = Bytes::new();
                pdu.optional_params
                    .push(Tlv::new(tags::MESSAGE_PAYLOAD, Bytes::copy_from_slice(content)));
                Ok(vec![pdu])
            }
            Some(LongMessageStrategy::MultipartUdh) => {
                let segments = segment(content, UDH_CHUNK_SIZE, reference)?;
                Ok(segments
                    .iter()
                    .map(|segment| {
                        let mut short_message = BytesMut::with_capacity(6 + segment.payload.len());
                        short_message.put_slice(&segment.udh());
                        short_message.put_slice(&segment.payload);

                        let mut pdu = template.clone();
                        pdu.esm_class |= esm_class::UDHI;
                        pdu.short_message = short_message.freeze();
                        pdu
                    })
                    .collect())
            }
            Some(LongMessageStrategy::MultipartSar) => {
                let segments = segment(content, SAR_CHUNK_SIZE, reference)?;
                Ok(segments
                    .into_iter()
                    .map(|segment| {
                        let mut pdu = template.clone();
                        pdu.short_message = segment.payload;
                        pdu.optional_params.extend([
                            Tlv::from_u16(tags::SAR_MSG_REF_NUM, segment.reference),
                            Tlv::from_u8(tags::SAR_TOTAL_SEGMENTS, segment.total),
                            Tlv::from_u8(tags::SAR_SEGMENT_SEQNUM, segment.position),
                        ]);
                        pdu
                    })
                    .collect())
            }
        }
    }
}
