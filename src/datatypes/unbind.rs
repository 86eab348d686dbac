use crate::datatypes::CommandId;
use crate::macros::impl_complete_header_only_pdu;

impl_complete_header_only_pdu!(
    /// Ends the session. Either peer may send it.
    Unbind,
    CommandId::Unbind
);

impl_complete_header_only_pdu!(
    /// Acknowledges an unbind; the connection is torn down afterwards.
    UnbindResponse,
    CommandId::UnbindResp
);
