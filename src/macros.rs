// ABOUTME: This module provides macros to reduce boilerplate in SMPP PDU implementations
// ABOUTME: Includes macros for header-only PDUs, short message PDUs, status tables and builders

/// Macro for defining the command_status table
///
/// Generates an enum with one unit variant per listed code plus an
/// `Other(u32)` catch-all, a lossless `From<u32>` conversion and `code()`
/// for the reverse direction. Status codes are open ended on the wire
/// (vendor ranges exist), so an unrecognized code must never fail a decode.
macro_rules! define_command_statuses {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $code:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )*
            /// A status code outside the known table
            Other(u32),
        }

        impl $name {
            /// The numeric code carried in the PDU header
            pub fn code(&self) -> u32 {
                match self {
                    $( $name::$variant => $code, )*
                    $name::Other(code) => *code,
                }
            }
        }

        impl From<u32> for $name {
            fn from(code: u32) -> Self {
                match code {
                    $( c if c == $code => $name::$variant, )*
                    other => $name::Other(other),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(status: $name) -> u32 {
                status.code()
            }
        }
    };
}

/// Macro for implementing codec traits on header-only PDUs (no body)
///
/// # Arguments
/// * `$pdu_type` - The PDU struct name (e.g., EnquireLink)
/// * `$command_id` - The CommandId variant (e.g., CommandId::EnquireLink)
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;

                if buf.has_remaining() {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: concat!(stringify!($pdu_type), "_body"),
                        reason: concat!(stringify!($pdu_type), " PDU should have no body")
                            .to_string(),
                    });
                }

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                let header = $crate::codec::PduHeader {
                    command_length: $crate::codec::PduHeader::SIZE as u32,
                    command_id: $command_id,
                    command_status: self.command_status,
                    sequence_number: self.sequence_number,
                };
                header.encode(buf)
            }

            fn encoded_size(&self) -> usize {
                $crate::codec::PduHeader::SIZE
            }
        }
    };
}

/// Macro for generating constructor methods for header-only PDUs
///
/// # Generated code
/// - `new(sequence_number: u32)` - Creates PDU with Ok status
/// - `error(sequence_number: u32, status: CommandStatus)` - Creates PDU with error status
macro_rules! impl_header_only_constructors {
    ($pdu_type:ident) => {
        impl $pdu_type {
            /// Create a new PDU with Ok status
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }

            /// Create a PDU with error status
            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                }
            }
        }
    };
}

/// Macro for implementing the complete header-only PDU pattern: struct,
/// codec traits and constructors.
macro_rules! impl_complete_header_only_pdu {
    ($(#[$meta:meta])* $pdu_type:ident, $command_id:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $pdu_type {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,
        }

        $crate::macros::impl_header_only_pdu!($pdu_type, $command_id);
        $crate::macros::impl_header_only_constructors!($pdu_type);
    };
}

/// Macro for the submit_sm / deliver_sm family
///
/// Both PDUs share the same mandatory parameter layout (SMPP v3.4 sections
/// 4.4.1 and 4.6.1), followed by optional TLVs. The generated struct keeps
/// `sm_length` implicit: it is derived from `short_message` on encode and
/// checked against the actual octets on decode.
macro_rules! impl_short_message_pdu {
    ($(#[$meta:meta])* $pdu_type:ident, $command_id:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Default)]
        pub struct $pdu_type {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,
            pub service_type: String,
            pub source_addr_ton: $crate::datatypes::TypeOfNumber,
            pub source_addr_npi: $crate::datatypes::NumericPlanIndicator,
            pub source_addr: String,
            pub dest_addr_ton: $crate::datatypes::TypeOfNumber,
            pub dest_addr_npi: $crate::datatypes::NumericPlanIndicator,
            pub destination_addr: String,
            pub esm_class: u8,
            pub protocol_id: u8,
            pub priority_flag: u8,
            pub schedule_delivery_time: String,
            pub validity_period: String,
            pub registered_delivery: u8,
            pub replace_if_present_flag: u8,
            pub data_coding: u8,
            pub sm_default_msg_id: u8,
            pub short_message: bytes::Bytes,
            pub optional_params: Vec<$crate::datatypes::Tlv>,
        }

        impl $pdu_type {
            /// Look up an optional parameter by tag
            pub fn tlv(&self, tag: u16) -> Option<&$crate::datatypes::Tlv> {
                self.optional_params.iter().find(|tlv| tlv.tag == tag)
            }

            /// The message content, from message_payload when present,
            /// otherwise from the short_message field
            pub fn content(&self) -> &[u8] {
                match self.tlv($crate::datatypes::tags::MESSAGE_PAYLOAD) {
                    Some(tlv) => &tlv.value,
                    None => &self.short_message,
                }
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::{decode_cstring, decode_tlvs, decode_u8};
                use bytes::Buf;

                Self::validate_header(&header)?;

                let service_type = decode_cstring(buf, 6, "service_type")?;
                let source_addr_ton = $crate::codec::decode_enum(buf, "source_addr_ton")?;
                let source_addr_npi = $crate::codec::decode_enum(buf, "source_addr_npi")?;
                let source_addr = decode_cstring(buf, 21, "source_addr")?;
                let dest_addr_ton = $crate::codec::decode_enum(buf, "dest_addr_ton")?;
                let dest_addr_npi = $crate::codec::decode_enum(buf, "dest_addr_npi")?;
                let destination_addr = decode_cstring(buf, 21, "destination_addr")?;
                let esm_class = decode_u8(buf)?;
                let protocol_id = decode_u8(buf)?;
                let priority_flag = decode_u8(buf)?;
                let schedule_delivery_time = decode_cstring(buf, 17, "schedule_delivery_time")?;
                let validity_period = decode_cstring(buf, 17, "validity_period")?;
                let registered_delivery = decode_u8(buf)?;
                let replace_if_present_flag = decode_u8(buf)?;
                let data_coding = decode_u8(buf)?;
                let sm_default_msg_id = decode_u8(buf)?;
                let sm_length = decode_u8(buf)? as usize;
                if buf.remaining() < sm_length {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "sm_length {} exceeds remaining {} bytes",
                            sm_length,
                            buf.remaining()
                        ),
                    });
                }
                let short_message = buf.copy_to_bytes(sm_length);
                let optional_params = decode_tlvs(buf)?;

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    service_type,
                    source_addr_ton,
                    source_addr_npi,
                    source_addr,
                    dest_addr_ton,
                    dest_addr_npi,
                    destination_addr,
                    esm_class,
                    protocol_id,
                    priority_flag,
                    schedule_delivery_time,
                    validity_period,
                    registered_delivery,
                    replace_if_present_flag,
                    data_coding,
                    sm_default_msg_id,
                    short_message,
                    optional_params,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use $crate::codec::{encode_cstring, encode_u8};
                use bytes::BufMut;

                if self.short_message.len() > $crate::codec::MAX_SHORT_MESSAGE_LENGTH {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "{} bytes exceeds the {} byte limit",
                            self.short_message.len(),
                            $crate::codec::MAX_SHORT_MESSAGE_LENGTH
                        ),
                    });
                }

                let header = $crate::codec::PduHeader {
                    command_length: 0,
                    command_id: $command_id,
                    command_status: self.command_status,
                    sequence_number: self.sequence_number,
                };
                header.encode(buf)?;

                encode_cstring(buf, &self.service_type, 6, "service_type")?;
                encode_u8(buf, self.source_addr_ton as u8);
                encode_u8(buf, self.source_addr_npi as u8);
                encode_cstring(buf, &self.source_addr, 21, "source_addr")?;
                encode_u8(buf, self.dest_addr_ton as u8);
                encode_u8(buf, self.dest_addr_npi as u8);
                encode_cstring(buf, &self.destination_addr, 21, "destination_addr")?;
                encode_u8(buf, self.esm_class);
                encode_u8(buf, self.protocol_id);
                encode_u8(buf, self.priority_flag);
                encode_cstring(buf, &self.schedule_delivery_time, 17, "schedule_delivery_time")?;
                encode_cstring(buf, &self.validity_period, 17, "validity_period")?;
                encode_u8(buf, self.registered_delivery);
                encode_u8(buf, self.replace_if_present_flag);
                encode_u8(buf, self.data_coding);
                encode_u8(buf, self.sm_default_msg_id);
                encode_u8(buf, self.short_message.len() as u8);
                buf.put_slice(&self.short_message);

                for tlv in &self.optional_params {
                    tlv.encode(buf)?;
                }
                Ok(())
            }
        }
    };
}

/// Macro for generating builder setter methods
///
/// For each `field: Type` pair, generates a fluent setter that assigns the
/// field and returns self.
macro_rules! builder_setters {
    ($($field:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $field(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

// Make macros available to the rest of the crate
pub(crate) use {
    builder_setters,
    define_command_statuses,
    impl_complete_header_only_pdu,
    impl_header_only_constructors,
    impl_header_only_pdu,
    impl_short_message_pdu,
};
