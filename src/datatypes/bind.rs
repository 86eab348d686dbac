// ABOUTME: bind_transmitter, bind_receiver and bind_transceiver PDUs with their responses
// ABOUTME: The three flavours share one body layout and differ only in command_id

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_enum, decode_tlvs,
    encode_cstring, encode_u8,
};
use crate::datatypes::tlv::tags;
use crate::datatypes::{
    CommandId, CommandStatus, InterfaceVersion, NumericPlanIndicator, Tlv, TypeOfNumber,
};
use bytes::{Buf, BytesMut};
use std::io::Cursor;

/// Role requested when binding to the SMSC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindType {
    #[default]
    Transmitter,
    Receiver,
    Transceiver,
}

impl BindType {
    pub fn request_command_id(&self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitter,
            BindType::Receiver => CommandId::BindReceiver,
            BindType::Transceiver => CommandId::BindTransceiver,
        }
    }

    pub fn response_command_id(&self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitterResp,
            BindType::Receiver => CommandId::BindReceiverResp,
            BindType::Transceiver => CommandId::BindTransceiverResp,
        }
    }

    pub fn from_command_id(command_id: CommandId) -> Option<Self> {
        match command_id {
            CommandId::BindTransmitter | CommandId::BindTransmitterResp => {
                Some(BindType::Transmitter)
            }
            CommandId::BindReceiver | CommandId::BindReceiverResp => Some(BindType::Receiver),
            CommandId::BindTransceiver | CommandId::BindTransceiverResp => {
                Some(BindType::Transceiver)
            }
            _ => None,
        }
    }

    /// Whether a session bound with this role may submit messages
    pub fn can_transmit(&self) -> bool {
        matches!(self, BindType::Transmitter | BindType::Transceiver)
    }

    /// Whether a session bound with this role may be sent deliver_sm
    pub fn can_receive(&self) -> bool {
        matches!(self, BindType::Receiver | BindType::Transceiver)
    }
}

/// A bind request (SMPP v3.4 section 4.1.1)
#[derive(Clone, Debug, PartialEq)]
pub struct BindRequest {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub bind_type: BindType,

    /// Identifies the ESME requesting to bind. Max 15 octets.
    pub system_id: String,
    /// Max 8 octets.
    pub password: String,
    /// Identifies the type of ESME system. Max 12 octets.
    pub system_type: String,
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    /// Addresses served by this ESME when bound as a receiver. Max 40 octets.
    pub address_range: String,
}

impl Decodable for BindRequest {
    fn command_id() -> CommandId {
        CommandId::BindTransmitter
    }

    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        match BindType::from_command_id(header.command_id) {
            Some(_) if !header.command_id.is_response() => Ok(()),
            _ => Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            }),
        }
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        let bind_type = BindType::from_command_id(header.command_id).unwrap_or_default();

        let system_id = decode_cstring(buf, 16, "system_id")?;
        let password = decode_cstring(buf, 9, "password")?;
        let system_type = decode_cstring(buf, 13, "system_type")?;
        let interface_version = decode_enum(buf, "interface_version")?;
        let addr_ton = decode_enum(buf, "addr_ton")?;
        let addr_npi = decode_enum(buf, "addr_npi")?;
        let address_range = decode_cstring(buf, 41, "address_range")?;

        Ok(BindRequest {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            bind_type,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

impl Encodable for BindRequest {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: self.bind_type.request_command_id(),
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.system_id, 16, "system_id")?;
        encode_cstring(buf, &self.password, 9, "password")?;
        encode_cstring(buf, &self.system_type, 13, "system_type")?;
        encode_u8(buf, self.interface_version as u8);
        encode_u8(buf, self.addr_ton as u8);
        encode_u8(buf, self.addr_npi as u8);
        encode_cstring(buf, &self.address_range, 41, "address_range")?;
        Ok(())
    }
}

/// Response to any of the three bind requests
#[derive(Clone, Debug, PartialEq)]
pub struct BindResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub bind_type: BindType,
    /// Identifies the SMSC. Omitted by some SMSCs when the bind is rejected.
    pub system_id: String,
    pub optional_params: Vec<Tlv>,
}

impl BindResponse {
    pub fn new(bind_type: BindType, sequence_number: u32, system_id: &str) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            bind_type,
            system_id: system_id.to_string(),
            optional_params: Vec::new(),
        }
    }

    pub fn error(bind_type: BindType, sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            bind_type,
            system_id: String::new(),
            optional_params: Vec::new(),
        }
    }

    /// The interface version the SMSC advertised, if any
    pub fn sc_interface_version(&self) -> Option<u8> {
        self.optional_params
            .iter()
            .find(|tlv| tlv.tag == tags::SC_INTERFACE_VERSION)
            .and_then(Tlv::as_u8)
    }
}

impl Decodable for BindResponse {
    fn command_id() -> CommandId {
        CommandId::BindTransmitterResp
    }

    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        match BindType::from_command_id(header.command_id) {
            Some(_) if header.command_id.is_response() => Ok(()),
            _ => Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            }),
        }
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        let bind_type = BindType::from_command_id(header.command_id).unwrap_or_default();

        let system_id = if buf.has_remaining() {
            decode_cstring(buf, 16, "system_id")?
        } else {
            String::new()
        };
        let optional_params = decode_tlvs(buf)?;

        Ok(BindResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            bind_type,
            system_id,
            optional_params,
        })
    }
}

impl Encodable for BindResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: self.bind_type.response_command_id(),
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.system_id, 16, "system_id")?;
        for tlv in &self.optional_params {
            tlv.encode(buf)?;
        }
        Ok(())
    }
}
