use crate::codec::{CodecError, Decodable, Encodable, PduHeader, decode_cstring, encode_cstring};
use crate::datatypes::tlv::tags;
use crate::datatypes::{CommandId, CommandStatus, Tlv, esm_class};
use crate::macros::impl_short_message_pdu;
use bytes::{Buf, BytesMut};
use std::io::Cursor;

impl_short_message_pdu!(
    /// Message delivered by the SMSC to the ESME: a mobile originated short
    /// message or a delivery receipt (SMPP v3.4 section 4.6.1).
    DeliverSm,
    CommandId::DeliverSm
);

impl DeliverSm {
    pub fn is_delivery_receipt(&self) -> bool {
        esm_class::is_delivery_receipt(self.esm_class)
    }

    /// The id of the message a delivery receipt refers to
    pub fn receipted_message_id(&self) -> Option<String> {
        self.tlv(tags::RECEIPTED_MESSAGE_ID).and_then(Tlv::as_cstring)
    }
}

/// Response to deliver_sm. The message_id field is unused and always empty.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl DeliverSmResponse {
    pub fn new(sequence_number: u32, command_status: CommandStatus) -> Self {
        Self {
            command_status,
            sequence_number,
        }
    }
}

impl Decodable for DeliverSmResponse {
    fn command_id() -> CommandId {
        CommandId::DeliverSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        if buf.has_remaining() {
            decode_cstring(buf, 65, "message_id")?;
        }
        Ok(DeliverSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
        })
    }
}

impl Encodable for DeliverSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::DeliverSmResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;
        encode_cstring(buf, "", 65, "message_id")
    }
}
