use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_enum, decode_tlvs,
    decode_u8, encode_cstring, encode_u8,
};
use crate::datatypes::{CommandId, CommandStatus, NumericPlanIndicator, TypeOfNumber};
use bytes::{Buf, BytesMut};
use std::io::Cursor;

/// Query the state of a previously submitted message (SMPP v3.4 section 4.8.1)
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    /// Must match the source address of the original submission
    pub source_addr: String,
}

impl QuerySm {
    pub fn new(sequence_number: u32, message_id: &str, source_addr: &str) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.to_string(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: source_addr.to_string(),
        }
    }
}

impl Decodable for QuerySm {
    fn command_id() -> CommandId {
        CommandId::QuerySm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let message_id = decode_cstring(buf, 65, "message_id")?;
        let source_addr_ton = decode_enum(buf, "source_addr_ton")?;
        let source_addr_npi = decode_enum(buf, "source_addr_npi")?;
        let source_addr = decode_cstring(buf, 21, "source_addr")?;

        Ok(QuerySm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
            source_addr_ton,
            source_addr_npi,
            source_addr,
        })
    }
}

impl Encodable for QuerySm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::QuerySm,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.message_id, 65, "message_id")?;
        encode_u8(buf, self.source_addr_ton as u8);
        encode_u8(buf, self.source_addr_npi as u8);
        encode_cstring(buf, &self.source_addr, 21, "source_addr")?;
        Ok(())
    }
}

/// Message states reported in query_sm_resp and delivery receipts
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageState {
    Enroute,
    Delivered,
    Expired,
    Deleted,
    Undeliverable,
    Accepted,
    Unknown,
    Rejected,
}

impl MessageState {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => MessageState::Enroute,
            2 => MessageState::Delivered,
            3 => MessageState::Expired,
            4 => MessageState::Deleted,
            5 => MessageState::Undeliverable,
            6 => MessageState::Accepted,
            7 => MessageState::Unknown,
            8 => MessageState::Rejected,
            _ => return None,
        })
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, MessageState::Enroute | MessageState::Accepted)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuerySmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: String,
    /// Date and time the message reached its final state, empty while pending
    pub final_date: String,
    pub message_state: u8,
    /// Network specific error code
    pub error_code: u8,
}

impl QuerySmResponse {
    pub fn state(&self) -> Option<MessageState> {
        MessageState::from_u8(self.message_state)
    }
}

impl Decodable for QuerySmResponse {
    fn command_id() -> CommandId {
        CommandId::QuerySmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let mut response = QuerySmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id: String::new(),
            final_date: String::new(),
            message_state: 0,
            error_code: 0,
        };

        // The body is omitted when command_status is non-zero
        if buf.has_remaining() {
            response.message_id = decode_cstring(buf, 65, "message_id")?;
            response.final_date = decode_cstring(buf, 17, "final_date")?;
            response.message_state = decode_u8(buf)?;
            response.error_code = decode_u8(buf)?;
            // query_sm_resp defines no TLVs; tolerate and skip any that appear
            decode_tlvs(buf)?;
        }

        Ok(response)
    }
}

impl Encodable for QuerySmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::QuerySmResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        if self.command_status.is_ok() {
            encode_cstring(buf, &self.message_id, 65, "message_id")?;
            encode_cstring(buf, &self.final_date, 17, "final_date")?;
            encode_u8(buf, self.message_state);
            encode_u8(buf, self.error_code);
        }
        Ok(())
    }
}
