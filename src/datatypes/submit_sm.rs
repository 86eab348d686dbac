use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_tlvs, encode_cstring,
};
use crate::datatypes::{CommandId, CommandStatus, Tlv};
use crate::macros::impl_short_message_pdu;
use bytes::{Buf, BytesMut};
use std::io::Cursor;

impl_short_message_pdu!(
    /// Submit a short message to the SMSC for onward delivery
    /// (SMPP v3.4 section 4.4.1).
    SubmitSm,
    CommandId::SubmitSm
);

#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    /// SMSC assigned identifier of the submitted message
    pub message_id: String,
    pub optional_params: Vec<Tlv>,
}

impl SubmitSmResponse {
    pub fn new(sequence_number: u32, message_id: &str) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.to_string(),
            optional_params: Vec::new(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
            optional_params: Vec::new(),
        }
    }
}

impl Decodable for SubmitSmResponse {
    fn command_id() -> CommandId {
        CommandId::SubmitSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        // The body is omitted when command_status is non-zero
        let message_id = if buf.has_remaining() {
            decode_cstring(buf, 65, "message_id")?
        } else {
            String::new()
        };
        let optional_params = decode_tlvs(buf)?;

        Ok(SubmitSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
            optional_params,
        })
    }
}

impl Encodable for SubmitSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::SubmitSmResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        if self.command_status.is_ok() || !self.message_id.is_empty() {
            encode_cstring(buf, &self.message_id, 65, "message_id")?;
        }
        for tlv in &self.optional_params {
            tlv.encode(buf)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{MAX_SHORT_MESSAGE_LENGTH, Pdu, PduRegistry};
    use crate::datatypes::{TypeOfNumber, tags};
    use bytes::Bytes;

    fn sample() -> SubmitSm {
        SubmitSm {
            sequence_number: 3,
            source_addr: "1234".to_string(),
            destination_addr: "27831234567".to_string(),
            dest_addr_ton: TypeOfNumber::International,
            short_message: Bytes::from_static(b"hello world"),
            ..Default::default()
        }
    }

    #[test]
    fn submit_sm_survives_the_registry() {
        let mut pdu = sample();
        pdu.optional_params
            .push(Tlv::from_u16(tags::SAR_MSG_REF_NUM, 77));
        let bytes = pdu.to_bytes().unwrap();

        match PduRegistry::new().decode(&bytes).unwrap() {
            Pdu::SubmitSm(decoded) => {
                assert_eq!(*decoded, pdu);
                assert_eq!(decoded.tlv(tags::SAR_MSG_REF_NUM).and_then(Tlv::as_u16), Some(77));
            }
            other => panic!("Expected submit_sm, got {:?}", other),
        }
    }

    #[test]
    fn short_message_over_capacity_is_rejected() {
        let mut pdu = sample();
        pdu.short_message = Bytes::from(vec![b'a'; MAX_SHORT_MESSAGE_LENGTH + 1]);
        assert!(matches!(
            pdu.to_bytes(),
            Err(CodecError::FieldValidation {
                field: "short_message",
                ..
            })
        ));
    }

    #[test]
    fn content_prefers_message_payload() {
        let mut pdu = sample();
        pdu.short_message = Bytes::new();
        pdu.optional_params
            .push(Tlv::new(tags::MESSAGE_PAYLOAD, &b"long body"[..]));
        assert_eq!(pdu.content(), b"long body");
    }

    #[test]
    fn error_response_without_body() {
        let data = [
            0x00, 0x00, 0x00, 0x10, 0x80, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x58, 0x00, 0x00,
            0x00, 0x04,
        ];
        match PduRegistry::new().decode(&data).unwrap() {
            Pdu::SubmitSmResp(resp) => {
                assert_eq!(resp.command_status, CommandStatus::ThrottlingError);
                assert_eq!(resp.message_id, "");
            }
            other => panic!("Expected submit_sm_resp, got {:?}", other),
        }
        let encoded = SubmitSmResponse::error(4, CommandStatus::ThrottlingError)
            .to_bytes()
            .unwrap();
        assert_eq!(encoded.as_ref(), &data[..]);
    }
}
