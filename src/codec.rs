// SMPP v3.4 Codec - Separates parsing/encoding logic from domain models
//
// Each PDU implements the Encodable/Decodable traits; the PduRegistry maps a
// command_id to the decoder for that PDU and produces the `Pdu` enum the
// engine dispatches on. The codec never looks at session state.

use crate::datatypes::{
    BindRequest, BindResponse, CommandId, CommandStatus, DeliverSm, DeliverSmResponse,
    EnquireLink, EnquireLinkResponse, GenericNack, QuerySm, QuerySmResponse, SubmitSm,
    SubmitSmResponse, Tlv, Unbind, UnbindResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// Capacity of the short_message field (sm_length is a single octet, 0-254)
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::InvalidCommandId(command_id_raw))?;
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        if !(Self::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        // SMPP v3.4 rule: requests must have command_status = 0
        if !command_id.is_response() && command_status != CommandStatus::Ok {
            return Err(CodecError::InvalidRequestStatus {
                command_id,
                command_status,
            });
        }

        // 0 is accepted: peers use it for unsolicited requests and the
        // engine answers them with the same number
        if command_id != CommandId::GenericNack && sequence_number == 0xFFFF_FFFF {
            return Err(CodecError::ReservedSequenceNumber(sequence_number));
        }

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode PDU header to buffer
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id as u32);
        buf.put_u32(self.command_status.code());
        buf.put_u32(self.sequence_number);
        Ok(())
    }
}

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this PDU to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Calculate the encoded size without actually encoding
    fn encoded_size(&self) -> usize {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).map(|_| buf.len()).unwrap_or(0)
    }

    /// Encode into a fresh buffer, fix the command_length field and freeze.
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf)?;

        if buf.len() > MAX_PDU_SIZE as usize {
            return Err(CodecError::InvalidPduLength {
                length: buf.len() as u32,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        let length = buf.len() as u32;
        buf[0..4].copy_from_slice(&length.to_be_bytes());

        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer after header
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Return the expected command_id for this PDU type
    fn command_id() -> CommandId;

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid command_id: {0:#x}")]
    InvalidCommandId(u32),

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Request PDU {command_id:?} has non-zero status: {command_status:?}")]
    InvalidRequestStatus {
        command_id: CommandId,
        command_status: CommandStatus,
    },

    #[error("Reserved sequence number: {0:#010x}")]
    ReservedSequenceNumber(u32),

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("TLV parsing error: {0}")]
    TlvError(String),

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert codec errors to appropriate SMPP command_status codes
impl CodecError {
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::InvalidCommandId(_) => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } => match *field {
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "destination_addr" => CommandStatus::InvalidDestinationAddress,
                "short_message" => CommandStatus::InvalidMsgLength,
                _ => CommandStatus::SystemError,
            },
            CodecError::TlvError(_) => CommandStatus::ErrorInOptionalPartOfPduBody,
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a C-Octet String: bytes up to and including a NUL terminator.
/// `max_len` counts the terminator, as the SMPP field tables do.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field_name: &'static str,
) -> Result<String, CodecError> {
    let chunk = buf.chunk();
    let window = &chunk[..chunk.len().min(max_len)];

    let end = match window.iter().position(|&b| b == 0) {
        Some(end) => end,
        None if chunk.len() < max_len => return Err(CodecError::Incomplete),
        None => {
            return Err(CodecError::FieldValidation {
                field: field_name,
                reason: format!("missing NUL terminator within {} bytes", max_len),
            });
        }
    };

    let value = window[..end].to_vec();
    buf.advance(end + 1);

    String::from_utf8(value).map_err(|e| CodecError::Utf8Error {
        field: field_name,
        source: e,
    })
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

/// Decode a 32-bit big-endian integer
pub fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u32())
}

/// Decode a single-octet field into one of the num_enum backed enums
pub fn decode_enum<T>(buf: &mut Cursor<&[u8]>, field_name: &'static str) -> Result<T, CodecError>
where
    T: TryFrom<u8>,
{
    let raw = decode_u8(buf)?;
    T::try_from(raw).map_err(|_| CodecError::FieldValidation {
        field: field_name,
        reason: format!("unknown value {:#04x}", raw),
    })
}

/// Decode TLVs until the end of the PDU body
pub fn decode_tlvs(buf: &mut Cursor<&[u8]>) -> Result<Vec<Tlv>, CodecError> {
    let mut tlvs = Vec::new();
    while buf.has_remaining() {
        tlvs.push(Tlv::decode(buf)?);
    }
    Ok(tlvs)
}

/// Encode a C-Octet String with its NUL terminator. `max_len` counts the
/// terminator; longer values are rejected rather than truncated.
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &str,
    max_len: usize,
    field_name: &'static str,
) -> Result<(), CodecError> {
    let bytes = value.as_bytes();
    if bytes.len() >= max_len {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: format!("{} bytes exceeds maximum of {}", bytes.len(), max_len - 1),
        });
    }
    if bytes.contains(&0) {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: "embedded NUL byte".to_string(),
        });
    }

    buf.put_slice(bytes);
    buf.put_u8(0);
    Ok(())
}

/// Encode a single byte
pub fn encode_u8(buf: &mut BytesMut, value: u8) {
    buf.put_u8(value);
}

/// Encode a 16-bit big-endian integer
pub fn encode_u16(buf: &mut BytesMut, value: u16) {
    buf.put_u16(value);
}

/// Encode a 32-bit big-endian integer
pub fn encode_u32(buf: &mut BytesMut, value: u32) {
    buf.put_u32(value);
}

/// A decoded PDU of any supported command family
#[derive(Debug, Clone, PartialEq)]
pub enum Pdu {
    // Session management PDUs
    Bind(BindRequest),
    BindResp(BindResponse),
    Unbind(Unbind),
    UnbindResp(UnbindResponse),

    // Keep-alive PDUs
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),

    // Message PDUs
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),
    QuerySm(QuerySm),
    QuerySmResp(QuerySmResponse),

    GenericNack(GenericNack),

    // Command ids outside the supported set, kept opaque
    Unknown {
        command_id: u32,
        command_status: CommandStatus,
        sequence_number: u32,
        body: Bytes,
    },
}

impl Pdu {
    /// The raw command_id, including ids this crate does not model
    pub fn command_id(&self) -> u32 {
        match self {
            Pdu::Bind(pdu) => pdu.bind_type.request_command_id() as u32,
            Pdu::BindResp(pdu) => pdu.bind_type.response_command_id() as u32,
            Pdu::Unbind(_) => CommandId::Unbind as u32,
            Pdu::UnbindResp(_) => CommandId::UnbindResp as u32,
            Pdu::EnquireLink(_) => CommandId::EnquireLink as u32,
            Pdu::EnquireLinkResp(_) => CommandId::EnquireLinkResp as u32,
            Pdu::SubmitSm(_) => CommandId::SubmitSm as u32,
            Pdu::SubmitSmResp(_) => CommandId::SubmitSmResp as u32,
            Pdu::DeliverSm(_) => CommandId::DeliverSm as u32,
            Pdu::DeliverSmResp(_) => CommandId::DeliverSmResp as u32,
            Pdu::QuerySm(_) => CommandId::QuerySm as u32,
            Pdu::QuerySmResp(_) => CommandId::QuerySmResp as u32,
            Pdu::GenericNack(_) => CommandId::GenericNack as u32,
            Pdu::Unknown { command_id, .. } => *command_id,
        }
    }

    pub fn sequence_number(&self) -> u32 {
        match self {
            Pdu::Bind(pdu) => pdu.sequence_number,
            Pdu::BindResp(pdu) => pdu.sequence_number,
            Pdu::Unbind(pdu) => pdu.sequence_number,
            Pdu::UnbindResp(pdu) => pdu.sequence_number,
            Pdu::EnquireLink(pdu) => pdu.sequence_number,
            Pdu::EnquireLinkResp(pdu) => pdu.sequence_number,
            Pdu::SubmitSm(pdu) => pdu.sequence_number,
            Pdu::SubmitSmResp(pdu) => pdu.sequence_number,
            Pdu::DeliverSm(pdu) => pdu.sequence_number,
            Pdu::DeliverSmResp(pdu) => pdu.sequence_number,
            Pdu::QuerySm(pdu) => pdu.sequence_number,
            Pdu::QuerySmResp(pdu) => pdu.sequence_number,
            Pdu::GenericNack(pdu) => pdu.sequence_number,
            Pdu::Unknown {
                sequence_number, ..
            } => *sequence_number,
        }
    }

    pub fn command_status(&self) -> CommandStatus {
        match self {
            Pdu::Bind(pdu) => pdu.command_status,
            Pdu::BindResp(pdu) => pdu.command_status,
            Pdu::Unbind(pdu) => pdu.command_status,
            Pdu::UnbindResp(pdu) => pdu.command_status,
            Pdu::EnquireLink(pdu) => pdu.command_status,
            Pdu::EnquireLinkResp(pdu) => pdu.command_status,
            Pdu::SubmitSm(pdu) => pdu.command_status,
            Pdu::SubmitSmResp(pdu) => pdu.command_status,
            Pdu::DeliverSm(pdu) => pdu.command_status,
            Pdu::DeliverSmResp(pdu) => pdu.command_status,
            Pdu::QuerySm(pdu) => pdu.command_status,
            Pdu::QuerySmResp(pdu) => pdu.command_status,
            Pdu::GenericNack(pdu) => pdu.command_status,
            Pdu::Unknown { command_status, .. } => *command_status,
        }
    }

    pub fn is_response(&self) -> bool {
        CommandId::is_response_id(self.command_id())
    }
}

impl Encodable for Pdu {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Pdu::Bind(pdu) => pdu.encode(buf),
            Pdu::BindResp(pdu) => pdu.encode(buf),
            Pdu::Unbind(pdu) => pdu.encode(buf),
            Pdu::UnbindResp(pdu) => pdu.encode(buf),
            Pdu::EnquireLink(pdu) => pdu.encode(buf),
            Pdu::EnquireLinkResp(pdu) => pdu.encode(buf),
            Pdu::SubmitSm(pdu) => pdu.encode(buf),
            Pdu::SubmitSmResp(pdu) => pdu.encode(buf),
            Pdu::DeliverSm(pdu) => pdu.encode(buf),
            Pdu::DeliverSmResp(pdu) => pdu.encode(buf),
            Pdu::QuerySm(pdu) => pdu.encode(buf),
            Pdu::QuerySmResp(pdu) => pdu.encode(buf),
            Pdu::GenericNack(pdu) => pdu.encode(buf),
            Pdu::Unknown {
                command_id,
                command_status,
                sequence_number,
                body,
            } => {
                buf.put_u32((PduHeader::SIZE + body.len()) as u32);
                buf.put_u32(*command_id);
                buf.put_u32(command_status.code());
                buf.put_u32(*sequence_number);
                buf.put_slice(body);
                Ok(())
            }
        }
    }
}

/// Registry of PDU decoders for extensible parsing
type DecoderFn = Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Pdu, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

impl PduRegistry {
    /// Create a new registry with the supported ESME PDUs registered
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };

        // The three bind flavours share one body layout
        for command_id in [
            CommandId::BindTransmitter,
            CommandId::BindReceiver,
            CommandId::BindTransceiver,
        ] {
            registry.register(command_id, |header, buf| {
                BindRequest::decode(header, buf).map(Pdu::Bind)
            });
        }
        for command_id in [
            CommandId::BindTransmitterResp,
            CommandId::BindReceiverResp,
            CommandId::BindTransceiverResp,
        ] {
            registry.register(command_id, |header, buf| {
                BindResponse::decode(header, buf).map(Pdu::BindResp)
            });
        }

        registry.register_pdu::<Unbind, _>(Pdu::Unbind);
        registry.register_pdu::<UnbindResponse, _>(Pdu::UnbindResp);
        registry.register_pdu::<EnquireLink, _>(Pdu::EnquireLink);
        registry.register_pdu::<EnquireLinkResponse, _>(Pdu::EnquireLinkResp);
        registry.register_pdu::<GenericNack, _>(Pdu::GenericNack);

        // Message PDUs (boxed for large structs)
        registry.register_pdu::<SubmitSm, _>(|pdu| Pdu::SubmitSm(Box::new(pdu)));
        registry.register_pdu::<SubmitSmResponse, _>(Pdu::SubmitSmResp);
        registry.register_pdu::<DeliverSm, _>(|pdu| Pdu::DeliverSm(Box::new(pdu)));
        registry.register_pdu::<DeliverSmResponse, _>(Pdu::DeliverSmResp);
        registry.register_pdu::<QuerySm, _>(Pdu::QuerySm);
        registry.register_pdu::<QuerySmResponse, _>(Pdu::QuerySmResp);

        registry
    }

    fn register<F>(&mut self, command_id: CommandId, decoder: F)
    where
        F: Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Pdu, CodecError> + Send + Sync + 'static,
    {
        self.decoders.insert(command_id, Box::new(decoder));
    }

    fn register_pdu<T, F>(&mut self, pdu_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Pdu + Send + Sync + 'static,
    {
        self.register(T::command_id(), move |header, buf| {
            T::decode(header, buf).map(&pdu_constructor)
        });
    }

    /// Decode one complete PDU, as yielded by the stream framer
    pub fn decode(&self, frame: &[u8]) -> Result<Pdu, CodecError> {
        if frame.len() < PduHeader::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
        if command_length as usize != frame.len() {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        let raw_command_id = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
        if CommandId::try_from(raw_command_id).is_err() {
            // Handle unknown PDU gracefully for forward compatibility
            let mut buf = Cursor::new(&frame[8..]);
            let command_status = CommandStatus::from(buf.get_u32());
            let sequence_number = buf.get_u32();
            tracing::warn!(
                "Unknown PDU command_id: {:#x}, treating as opaque data",
                raw_command_id
            );
            return Ok(Pdu::Unknown {
                command_id: raw_command_id,
                command_status,
                sequence_number,
                body: Bytes::copy_from_slice(&frame[PduHeader::SIZE..]),
            });
        }

        let mut buf = Cursor::new(frame);
        let header = PduHeader::decode(&mut buf)?;
        match self.decoders.get(&header.command_id) {
            Some(decoder) => decoder(header, &mut buf),
            None => Err(CodecError::InvalidCommandId(raw_command_id)),
        }
    }

    /// Check if a command_id is registered
    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PduRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PduRegistry")
            .field("registered", &self.decoders.len())
            .finish()
    }
}
