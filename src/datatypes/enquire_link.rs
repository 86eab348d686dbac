use crate::datatypes::CommandId;
use crate::macros::impl_complete_header_only_pdu;

impl_complete_header_only_pdu!(
    /// Liveness check. Either peer may send it at any time once connected.
    EnquireLink,
    CommandId::EnquireLink
);

impl_complete_header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);
