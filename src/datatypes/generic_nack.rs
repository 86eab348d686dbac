use crate::datatypes::CommandId;
use crate::macros::impl_complete_header_only_pdu;

impl_complete_header_only_pdu!(
    /// Negative acknowledgement for a PDU the receiver could not process at
    /// all, typically an unknown command_id or a corrupt header.
    GenericNack,
    CommandId::GenericNack
);
