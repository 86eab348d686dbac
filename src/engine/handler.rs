// ABOUTME: Collaborator hooks the engine invokes for responses and inbound deliveries
// ABOUTME: Every hook has a default so handlers implement only what they need

use crate::datatypes::{CommandStatus, DeliverSm};

/// Hooks exposed to the application.
///
/// Hooks run on the engine's event path and must not block.
pub trait EsmeHandler: Send {
    /// Called for every submit_sm_resp, including ones that match no
    /// outstanding request.
    fn on_submit_response(&mut self, sequence_number: u32, message_id: &str, status: CommandStatus) {
        let _ = (sequence_number, message_id, status);
    }

    /// Called for every deliver_sm. The returned status is sent back verbatim
    /// in the deliver_sm_resp.
    fn on_deliver(&mut self, sequence_number: u32, pdu: &DeliverSm) -> CommandStatus {
        let _ = (sequence_number, pdu);
        CommandStatus::Ok
    }

    fn on_enquire_link_response(&mut self, sequence_number: u32) {
        let _ = sequence_number;
    }

    fn on_unbind_response(&mut self, sequence_number: u32) {
        let _ = sequence_number;
    }
}

/// Handler that accepts every delivery and ignores every response
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl EsmeHandler for NoopHandler {}
