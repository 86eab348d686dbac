//! Session scenarios driven through the engine with a manual clock and a
//! recording transport, plus a TCP round trip through the tokio client

use crate::codec::{Encodable, Pdu, PduRegistry};
use crate::config::{ConfigError, EngineConfig, EngineConfigBuilder};
use crate::datatypes::*;
use crate::engine::{EsmeHandler, ManualScheduler, SessionState, SmppEngine, TimerKind, Transport};
use crate::error::{BindError, SmppError, SmppResult};
use crate::sequence::SharedSequence;
use crate::types::{BindCredentials, SmsMessage};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct RecordingTransport {
    writes: Vec<Bytes>,
    closes: usize,
    fail_writes: bool,
}

impl Transport for RecordingTransport {
    fn write(&mut self, data: Bytes) -> SmppResult<()> {
        if self.fail_writes {
            return Err(SmppError::ConnectionClosed);
        }
        self.writes.push(data);
        Ok(())
    }

    fn lose_connection(&mut self) {
        self.closes += 1;
    }
}

#[derive(Debug, Clone, Default)]
struct RecordingHandler {
    deliver_status: CommandStatus,
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl EsmeHandler for RecordingHandler {
    fn on_submit_response(&mut self, sequence_number: u32, message_id: &str, status: CommandStatus) {
        self.events.lock().unwrap().push(format!(
            "submit_sm_resp {} {} {:?}",
            sequence_number, message_id, status
        ));
    }

    fn on_deliver(&mut self, sequence_number: u32, pdu: &DeliverSm) -> CommandStatus {
        self.events.lock().unwrap().push(format!(
            "deliver_sm {} {}",
            sequence_number,
            String::from_utf8_lossy(pdu.content())
        ));
        self.deliver_status
    }

    fn on_unbind_response(&mut self, sequence_number: u32) {
        self.events
            .lock()
            .unwrap()
            .push(format!("unbind_resp {}", sequence_number));
    }
}

type TestEngine = SmppEngine<RecordingTransport, ManualScheduler>;

struct Harness {
    engine: TestEngine,
    clock: ManualScheduler,
    handler: RecordingHandler,
}

impl Harness {
    fn new(config: EngineConfig) -> Self {
        Self::with_handler(config, RecordingHandler::default())
    }

    fn with_handler(config: EngineConfig, handler: RecordingHandler) -> Self {
        let clock = ManualScheduler::new();
        let engine = SmppEngine::new(
            config,
            RecordingTransport::default(),
            clock.clone(),
            Arc::new(SharedSequence::new()),
            Box::new(handler.clone()),
        );
        Self {
            engine,
            clock,
            handler,
        }
    }

    /// Connect and complete a transceiver bind; consumes seq 1 (bind) and
    /// seq 2 (first enquire_link)
    fn bound(config: EngineConfig) -> Self {
        let mut harness = Self::new(config);
        harness.bind_ok();
        harness
    }

    fn bind_ok(&mut self) {
        let bind_type = self.engine.config().credentials.bind_type;
        let mut pending = self.engine.connection_made().unwrap();
        self.feed(Pdu::BindResp(BindResponse::new(bind_type, 1, "SMSC")));
        assert!(pending.try_take().unwrap().is_ok());
    }

    fn feed(&mut self, pdu: Pdu) {
        let bytes = pdu.to_bytes().unwrap();
        self.engine.data_received(&bytes);
    }

    fn advance(&mut self, by: Duration) {
        let engine = &mut self.engine;
        self.clock.advance(by, |id, kind| engine.timer_fired(id, kind));
    }

    fn sent(&self) -> Vec<Pdu> {
        let registry = PduRegistry::new();
        self.engine
            .transport()
            .writes
            .iter()
            .map(|bytes| registry.decode(bytes).unwrap())
            .collect()
    }

    fn last_sent(&self) -> Pdu {
        self.sent().pop().unwrap()
    }

    fn closes(&self) -> usize {
        self.engine.transport().closes
    }
}

fn builder() -> EngineConfigBuilder {
    EngineConfig::builder(BindCredentials::transceiver("test_system", "secret"))
}

fn config() -> EngineConfig {
    builder().build().unwrap()
}

fn long_text() -> String {
    "This is a long message.".repeat(20)
}

#[cfg(test)]
mod bind {
    use super::*;

    #[test]
    fn first_pdu_is_the_bind_request() {
        let mut harness = Harness::new(config());
        assert_eq!(harness.engine.state(), SessionState::Closed);

        let pending = harness.engine.connection_made().unwrap();

        assert_eq!(pending.sequence_number(), 1);
        assert_eq!(harness.engine.state(), SessionState::Open);
        assert!(harness.clock.is_scheduled(TimerKind::BindTimeout));

        let sent = harness.sent();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Pdu::Bind(bind) => {
                assert_eq!(bind.sequence_number, 1);
                assert_eq!(bind.bind_type, BindType::Transceiver);
                assert_eq!(bind.system_id, "test_system");
                assert_eq!(bind.password, "secret");
                assert_eq!(bind.interface_version, InterfaceVersion::SmppV34);
            }
            other => panic!("expected bind_transceiver, got {:?}", other),
        }
        assert_eq!(
            harness.engine.transport().writes[0][4..8],
            [0x00, 0x00, 0x00, 0x09]
        );
    }

    #[test]
    fn transmitter_credentials_send_bind_transmitter() {
        let config = EngineConfig::builder(BindCredentials::transmitter("tx", "pw"))
            .build()
            .unwrap();
        let mut harness = Harness::new(config);
        harness.engine.connection_made().unwrap();

        assert_eq!(
            harness.last_sent().command_id(),
            CommandId::BindTransmitter as u32
        );
    }

    #[test]
    fn bind_response_binds_and_starts_keepalive() {
        let mut harness = Harness::new(config());
        let mut pending = harness.engine.connection_made().unwrap();
        assert!(pending.try_take().is_none());

        harness.feed(Pdu::BindResp(BindResponse::new(BindType::Transceiver, 1, "SMSC")));

        let response = pending.try_take().unwrap().unwrap();
        assert_eq!(response.command_id, CommandId::BindTransceiverResp);
        assert_eq!(harness.engine.state(), SessionState::BoundTrx);
        assert!(!harness.clock.is_scheduled(TimerKind::BindTimeout));
        assert!(harness.clock.is_scheduled(TimerKind::EnquireLink));

        // The first enquire_link goes out right after the bind
        assert_eq!(harness.last_sent(), Pdu::EnquireLink(EnquireLink::new(2)));
        assert_eq!(harness.engine.keepalive_status().outstanding, Some(2));
    }

    #[test]
    fn bind_timeout_disconnects() {
        let mut harness = Harness::new(config());
        let mut pending = harness.engine.connection_made().unwrap();

        harness.advance(Duration::from_secs(29));
        assert_eq!(harness.closes(), 0);

        harness.advance(Duration::from_secs(1));
        assert_eq!(harness.closes(), 1);
        assert_eq!(harness.engine.state(), SessionState::Closed);
        assert!(matches!(
            pending.try_take(),
            Some(Err(SmppError::Bind(BindError::Timeout)))
        ));
    }

    #[test]
    fn late_bind_response_after_timeout_is_ignored() {
        let mut harness = Harness::new(config());
        harness.engine.connection_made().unwrap();
        harness.advance(Duration::from_secs(30));

        harness.feed(Pdu::BindResp(BindResponse::new(BindType::Transceiver, 1, "SMSC")));

        assert_eq!(harness.engine.state(), SessionState::Closed);
        assert_eq!(harness.sent().len(), 1);
    }

    #[test]
    fn bind_rejection_fails_and_disconnects() {
        let mut harness = Harness::new(config());
        let mut pending = harness.engine.connection_made().unwrap();

        harness.feed(Pdu::BindResp(BindResponse::error(
            BindType::Transceiver,
            1,
            CommandStatus::InvalidPassword,
        )));

        assert_eq!(harness.engine.state(), SessionState::Closed);
        assert_eq!(harness.closes(), 1);
        assert!(matches!(
            pending.try_take(),
            Some(Err(SmppError::Bind(BindError::Rejected(
                CommandStatus::InvalidPassword
            ))))
        ));
        assert_eq!(harness.clock.pending(), 0);
    }

    #[test]
    fn generic_nack_to_bind_fails_the_bind() {
        let mut harness = Harness::new(config());
        let mut pending = harness.engine.connection_made().unwrap();

        harness.feed(Pdu::GenericNack(GenericNack::error(
            1,
            CommandStatus::InvalidCommandLength,
        )));

        assert_eq!(harness.engine.state(), SessionState::Closed);
        assert!(matches!(
            pending.try_take(),
            Some(Err(SmppError::Bind(BindError::Rejected(
                CommandStatus::InvalidCommandLength
            ))))
        ));
    }

    #[test]
    fn bind_twice_is_rejected() {
        let mut harness = Harness::new(config());
        harness.engine.connection_made().unwrap();

        assert!(matches!(
            harness.engine.connection_made(),
            Err(SmppError::InvalidState(_))
        ));
        assert_eq!(harness.sent().len(), 1);
        assert_eq!(harness.closes(), 0);
        assert_eq!(harness.engine.state(), SessionState::Open);
    }

    #[test]
    fn oversized_system_id_fails_at_bind_time() {
        let config = EngineConfig::builder(BindCredentials::transceiver(
            "vumitest-vumitest-vumitest",
            "secret",
        ))
        .build()
        .unwrap();
        let mut harness = Harness::new(config);

        let result = harness.engine.connection_made();

        assert!(matches!(result, Err(SmppError::Framing(_))));
        assert!(harness.sent().is_empty());
        assert_eq!(harness.closes(), 1);
        assert_eq!(harness.engine.state(), SessionState::Closed);
        assert_eq!(harness.engine.pending_requests(), 0);
    }

    #[test]
    fn bind_response_split_across_reads() {
        let mut harness = Harness::new(config());
        let mut pending = harness.engine.connection_made().unwrap();

        let bytes = Pdu::BindResp(BindResponse::new(BindType::Transceiver, 1, "SMSC"))
            .to_bytes()
            .unwrap();
        harness.engine.data_received(&bytes[..5]);
        assert!(pending.try_take().is_none());
        harness.engine.data_received(&bytes[5..]);

        assert!(pending.try_take().unwrap().is_ok());
        assert_eq!(harness.engine.state(), SessionState::BoundTrx);
    }
}

#[cfg(test)]
mod inbound {
    use super::*;

    #[test]
    fn unsolicited_unbind_is_acknowledged() {
        let mut harness = Harness::bound(config());

        harness.feed(Pdu::Unbind(Unbind::new(7)));

        assert_eq!(harness.last_sent(), Pdu::UnbindResp(UnbindResponse::new(7)));
        assert_eq!(harness.closes(), 0);
        assert_eq!(harness.engine.state(), SessionState::BoundTrx);
    }

    #[test]
    fn unbind_before_bind_response_is_acknowledged() {
        let mut harness = Harness::new(config());
        harness.engine.connection_made().unwrap();

        harness.feed(Pdu::Unbind(Unbind::new(5)));

        assert_eq!(harness.last_sent(), Pdu::UnbindResp(UnbindResponse::new(5)));
        assert_eq!(harness.closes(), 0);
        assert_eq!(harness.engine.state(), SessionState::Open);
    }

    #[test]
    fn unbind_with_sequence_zero_is_acknowledged() {
        let mut harness = Harness::bound(config());

        let mut raw = BytesMut::new();
        raw.put_u32(16);
        raw.put_u32(0x0000_0006);
        raw.put_u32(0);
        raw.put_u32(0);
        harness.engine.data_received(&raw);

        assert_eq!(harness.last_sent(), Pdu::UnbindResp(UnbindResponse::new(0)));
        assert_eq!(harness.closes(), 0);
        assert_eq!(harness.engine.state(), SessionState::BoundTrx);
    }

    #[test]
    fn enquire_link_with_sequence_zero_is_answered() {
        let mut harness = Harness::bound(config());

        harness.feed(Pdu::EnquireLink(EnquireLink::new(0)));

        assert_eq!(
            harness.last_sent(),
            Pdu::EnquireLinkResp(EnquireLinkResponse::new(0))
        );
        assert_eq!(harness.engine.state(), SessionState::BoundTrx);
    }

    #[test]
    fn deliver_sm_with_sequence_zero_is_answered() {
        let handler = RecordingHandler {
            deliver_status: CommandStatus::DeliveryFailed,
            ..Default::default()
        };
        let mut harness = Harness::with_handler(config(), handler);
        harness.bind_ok();

        harness.feed(Pdu::DeliverSm(Box::new(DeliverSm {
            sequence_number: 0,
            short_message: Bytes::from_static(b"foo"),
            ..Default::default()
        })));

        let reply = harness.last_sent();
        assert_eq!(reply.command_id(), CommandId::DeliverSmResp as u32);
        assert_eq!(reply.sequence_number(), 0);
        assert_eq!(reply.command_status(), CommandStatus::DeliveryFailed);
        assert_eq!(harness.handler.events(), vec!["deliver_sm 0 foo"]);
        assert_eq!(harness.closes(), 0);
    }

    #[test]
    fn enquire_link_from_smsc_is_answered() {
        let mut harness = Harness::bound(config());

        harness.feed(Pdu::EnquireLink(EnquireLink::new(40)));

        assert_eq!(
            harness.last_sent(),
            Pdu::EnquireLinkResp(EnquireLinkResponse::new(40))
        );
    }

    #[test]
    fn deliver_sm_status_comes_from_the_handler() {
        let handler = RecordingHandler {
            deliver_status: CommandStatus::DeliveryFailed,
            ..Default::default()
        };
        let mut harness = Harness::with_handler(config(), handler);
        harness.bind_ok();

        let deliver = DeliverSm {
            sequence_number: 11,
            source_addr: "447700900000".to_string(),
            destination_addr: "12345".to_string(),
            short_message: Bytes::from_static(b"hello"),
            ..Default::default()
        };
        harness.feed(Pdu::DeliverSm(Box::new(deliver)));

        let reply = harness.last_sent();
        assert_eq!(reply.command_id(), CommandId::DeliverSmResp as u32);
        assert_eq!(reply.sequence_number(), 11);
        assert_eq!(reply.command_status(), CommandStatus::DeliveryFailed);
        assert_eq!(reply.command_status().code(), 0xFE);
        assert_eq!(harness.handler.events(), vec!["deliver_sm 11 hello"]);
    }

    #[test]
    fn deliver_sm_on_a_transmitter_is_refused() {
        let config = EngineConfig::builder(BindCredentials::transmitter("tx", "pw"))
            .build()
            .unwrap();
        let mut harness = Harness::bound(config);

        harness.feed(Pdu::DeliverSm(Box::new(DeliverSm {
            sequence_number: 12,
            ..Default::default()
        })));

        assert_eq!(
            harness.last_sent().command_status(),
            CommandStatus::IncorrectBindStatus
        );
        assert!(harness.handler.events().is_empty());
    }

    #[test]
    fn unknown_request_gets_generic_nack() {
        let mut harness = Harness::bound(config());

        // data_sm, which this client does not implement
        let mut raw = BytesMut::new();
        raw.put_u32(16);
        raw.put_u32(0x0000_0103);
        raw.put_u32(0);
        raw.put_u32(9);
        harness.engine.data_received(&raw);

        assert_eq!(
            harness.last_sent(),
            Pdu::GenericNack(GenericNack::error(9, CommandStatus::InvalidCommandId))
        );
        assert_eq!(harness.engine.state(), SessionState::BoundTrx);
    }

    #[test]
    fn unframeable_input_disconnects() {
        let mut harness = Harness::bound(config());

        harness.engine.data_received(&[0x00, 0x00, 0x00, 0x04, 0x00, 0x00]);

        assert_eq!(harness.engine.state(), SessionState::Closed);
        assert_eq!(harness.closes(), 1);
    }

    #[test]
    fn several_pdus_in_one_read() {
        let mut harness = Harness::bound(config());

        let mut chunk = BytesMut::new();
        chunk.extend_from_slice(&Pdu::EnquireLink(EnquireLink::new(50)).to_bytes().unwrap());
        chunk.extend_from_slice(&Pdu::EnquireLink(EnquireLink::new(51)).to_bytes().unwrap());
        harness.engine.data_received(&chunk);

        let sent = harness.sent();
        assert_eq!(
            sent[sent.len() - 2..],
            [
                Pdu::EnquireLinkResp(EnquireLinkResponse::new(50)),
                Pdu::EnquireLinkResp(EnquireLinkResponse::new(51)),
            ]
        );
    }

    #[test]
    fn last_activity_tracks_inbound_pdus() {
        let mut harness = Harness::bound(config());
        let bound_at = harness.engine.last_activity().unwrap();

        harness.advance(Duration::from_secs(5));
        harness.feed(Pdu::EnquireLinkResp(EnquireLinkResponse::new(2)));

        let later = harness.engine.last_activity().unwrap();
        assert_eq!(later - bound_at, Duration::from_secs(5));
    }
}

#[cfg(test)]
mod keepalive {
    use super::*;

    #[test]
    fn answered_enquire_link_keeps_the_session() {
        let mut harness = Harness::bound(config());

        harness.feed(Pdu::EnquireLinkResp(EnquireLinkResponse::new(2)));
        harness.advance(Duration::from_secs(55));

        assert_eq!(harness.engine.state(), SessionState::BoundTrx);
        assert_eq!(harness.last_sent(), Pdu::EnquireLink(EnquireLink::new(3)));

        let status = harness.engine.keepalive_status();
        assert!(status.running);
        assert_eq!(status.total_pings, 2);
        assert_eq!(status.total_pongs, 1);
    }

    #[test]
    fn unanswered_enquire_link_closes_at_the_next_tick() {
        let mut harness = Harness::bound(config());

        harness.advance(Duration::from_secs(54));
        assert_eq!(harness.closes(), 0);

        harness.advance(Duration::from_secs(1));
        assert_eq!(harness.closes(), 1);
        assert_eq!(harness.engine.state(), SessionState::Closed);
        assert!(!harness.engine.keepalive_status().running);
    }

    #[test]
    fn failed_ping_write_disconnects() {
        let mut harness = Harness::bound(config());
        harness.feed(Pdu::EnquireLinkResp(EnquireLinkResponse::new(2)));
        harness.engine.transport_mut().fail_writes = true;

        harness.advance(Duration::from_secs(55));

        assert_eq!(harness.engine.state(), SessionState::Closed);
        assert_eq!(harness.closes(), 1);
        assert!(!harness.engine.keepalive_status().running);
    }

    #[test]
    fn custom_interval_is_honoured() {
        let config = builder()
            .enquire_link_interval(Duration::from_secs(10))
            .build()
            .unwrap();
        let mut harness = Harness::bound(config);

        harness.advance(Duration::from_secs(10));
        assert_eq!(harness.engine.state(), SessionState::Closed);
    }
}

#[cfg(test)]
mod submit {
    use super::*;
    use crate::datatypes::esm_class;

    fn submits(harness: &Harness) -> Vec<SubmitSm> {
        harness
            .sent()
            .into_iter()
            .filter_map(|pdu| match pdu {
                Pdu::SubmitSm(submit) => Some(*submit),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn short_message_is_one_pdu() {
        let mut harness = Harness::bound(config());

        let seqs = harness
            .engine
            .submit_sm(&SmsMessage::new("447700900123", "Sender", "Hello"))
            .unwrap();

        assert_eq!(seqs, vec![3]);
        let sent = submits(&harness);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination_addr, "447700900123");
        assert_eq!(sent[0].source_addr, "Sender");
        assert_eq!(&sent[0].short_message[..], b"Hello");
        assert_eq!(sent[0].esm_class, 0);
        assert!(sent[0].optional_params.is_empty());
    }

    #[test]
    fn message_at_the_limit_is_not_split() {
        let config = builder().send_long_messages(true).build().unwrap();
        let mut harness = Harness::bound(config);

        let text = "x".repeat(254);
        let seqs = harness
            .engine
            .submit_sm(&SmsMessage::new("1", "2", text))
            .unwrap();

        assert_eq!(seqs.len(), 1);
        let sent = submits(&harness);
        assert_eq!(sent[0].short_message.len(), 254);
        assert!(sent[0].optional_params.is_empty());
    }

    #[test]
    fn udh_splits_anything_longer_than_one_segment() {
        let config = builder().send_multipart_udh(true).build().unwrap();
        let mut harness = Harness::bound(config);

        let seqs = harness
            .engine
            .submit_sm(&SmsMessage::new("1", "2", "x".repeat(130)))
            .unwrap();
        assert_eq!(seqs, vec![3]);

        let seqs = harness
            .engine
            .submit_sm(&SmsMessage::new("1", "2", "x".repeat(200)))
            .unwrap();
        assert_eq!(seqs, vec![4, 5]);

        let sent = submits(&harness);
        assert_eq!(sent[0].esm_class, 0);
        assert_eq!(sent[0].short_message.len(), 130);
        assert_eq!(sent[1].esm_class & esm_class::UDHI, esm_class::UDHI);
        assert_eq!(sent[1].short_message.len(), 6 + 130);
        assert_eq!(sent[2].short_message.len(), 6 + 70);
    }

    #[test]
    fn sar_splits_anything_longer_than_one_segment() {
        let config = builder().send_multipart_sar(true).build().unwrap();
        let mut harness = Harness::bound(config);

        harness
            .engine
            .submit_sm(&SmsMessage::new("1", "2", "x".repeat(128)))
            .unwrap();
        let seqs = harness
            .engine
            .submit_sm(&SmsMessage::new("1", "2", "x".repeat(129)))
            .unwrap();
        assert_eq!(seqs.len(), 2);

        let sent = submits(&harness);
        assert!(sent[0].optional_params.is_empty());
        assert_eq!(
            sent[2].tlv(tags::SAR_SEGMENT_SEQNUM).and_then(Tlv::as_u8),
            Some(2)
        );
        assert_eq!(sent[2].short_message.len(), 1);
    }

    #[test]
    fn long_message_without_strategy_is_rejected() {
        let mut harness = Harness::bound(config());
        let before = harness.sent().len();

        let result = harness
            .engine
            .submit_sm(&SmsMessage::new("1", "2", long_text()));

        assert!(matches!(result, Err(SmppError::InvalidData(_))));
        assert_eq!(harness.sent().len(), before);
    }

    #[test]
    fn long_message_as_message_payload() {
        let config = builder().send_long_messages(true).build().unwrap();
        let mut harness = Harness::bound(config);

        let seqs = harness
            .engine
            .submit_sm(&SmsMessage::new("1", "2", long_text()))
            .unwrap();

        assert_eq!(seqs, vec![3]);
        let sent = submits(&harness);
        assert!(sent[0].short_message.is_empty());
        assert_eq!(sent[0].content(), long_text().as_bytes());
    }

    #[test]
    fn long_message_as_udh_segments() {
        let config = builder().send_multipart_udh(true).build().unwrap();
        let mut harness = Harness::bound(config);

        let seqs = harness
            .engine
            .submit_sm(&SmsMessage::new("1", "2", long_text()))
            .unwrap();
        assert_eq!(seqs, vec![3, 4, 5, 6]);

        let sent = submits(&harness);
        assert_eq!(sent.len(), 4);
        let reference = sent[0].short_message[3];
        let mut reassembled = Vec::new();
        for (index, pdu) in sent.iter().enumerate() {
            assert!(esm_class::has_udhi(pdu.esm_class));
            assert!(pdu.short_message.len() <= 136);
            assert_eq!(
                pdu.short_message[..6],
                [0x05, 0x00, 0x03, reference, 4, index as u8 + 1]
            );
            reassembled.extend_from_slice(&pdu.short_message[6..]);
        }
        assert_eq!(reassembled, long_text().into_bytes());
    }

    #[test]
    fn long_message_as_sar_segments() {
        let config = builder().send_multipart_sar(true).build().unwrap();
        let mut harness = Harness::bound(config);

        let seqs = harness
            .engine
            .submit_sm(&SmsMessage::new("1", "2", long_text()))
            .unwrap();
        assert_eq!(seqs.len(), 4);

        let sent = submits(&harness);
        let reference = sent[0].tlv(tags::SAR_MSG_REF_NUM).and_then(Tlv::as_u16);
        assert!(reference.is_some());
        for (index, pdu) in sent.iter().enumerate() {
            assert_eq!(pdu.esm_class, 0);
            assert!(pdu.short_message.len() <= 128);
            assert_eq!(pdu.tlv(tags::SAR_MSG_REF_NUM).and_then(Tlv::as_u16), reference);
            assert_eq!(pdu.tlv(tags::SAR_TOTAL_SEGMENTS).and_then(Tlv::as_u8), Some(4));
            assert_eq!(
                pdu.tlv(tags::SAR_SEGMENT_SEQNUM).and_then(Tlv::as_u8),
                Some(index as u8 + 1)
            );
        }
    }

    #[test]
    fn submit_before_bind_is_rejected() {
        let mut harness = Harness::new(config());
        harness.engine.connection_made().unwrap();

        let result = harness.engine.submit_sm(&SmsMessage::new("1", "2", "early"));

        assert!(matches!(result, Err(SmppError::InvalidState(_))));
        assert_eq!(harness.sent().len(), 1);
    }

    #[test]
    fn submit_on_a_receiver_is_rejected() {
        let config = EngineConfig::builder(BindCredentials::receiver("rx", "pw"))
            .build()
            .unwrap();
        let mut harness = Harness::bound(config);

        let result = harness.engine.submit_sm(&SmsMessage::new("1", "2", "nope"));
        assert!(matches!(result, Err(SmppError::InvalidState(_))));
    }

    #[test]
    fn submit_response_resolves_the_request() {
        let mut harness = Harness::bound(config());
        let mut pending = harness
            .engine
            .submit_sm_tracked(&SmsMessage::new("1", "2", "hi"))
            .unwrap();
        assert_eq!(harness.engine.pending_requests(), 1);

        harness.feed(Pdu::SubmitSmResp(SubmitSmResponse::new(3, "msg-0001")));

        let response = pending[0].try_take().unwrap().unwrap();
        assert!(response.is_ok());
        assert_eq!(response.message_id.as_deref(), Some("msg-0001"));
        assert_eq!(harness.engine.pending_requests(), 0);
        assert_eq!(harness.handler.events(), vec!["submit_sm_resp 3 msg-0001 Ok"]);
    }

    #[test]
    fn error_status_is_delivered_with_the_response() {
        let mut harness = Harness::bound(config());
        let mut pending = harness
            .engine
            .submit_sm_tracked(&SmsMessage::new("1", "2", "hi"))
            .unwrap();

        harness.feed(Pdu::SubmitSmResp(SubmitSmResponse::error(
            3,
            CommandStatus::ThrottlingError,
        )));

        let response = pending[0].try_take().unwrap().unwrap();
        assert_eq!(response.command_status, CommandStatus::ThrottlingError);
    }

    #[test]
    fn unmatched_response_is_dropped() {
        let mut harness = Harness::bound(config());

        harness.feed(Pdu::SubmitSmResp(SubmitSmResponse::new(99, "stray")));

        assert_eq!(harness.engine.state(), SessionState::BoundTrx);
        assert_eq!(harness.closes(), 0);
        assert_eq!(harness.handler.events(), vec!["submit_sm_resp 99 stray Ok"]);
    }

    #[test]
    fn response_with_sequence_zero_reaches_the_handler() {
        let mut harness = Harness::bound(config());

        harness.feed(Pdu::SubmitSmResp(SubmitSmResponse::new(0, "foo")));

        assert_eq!(harness.handler.events(), vec!["submit_sm_resp 0 foo Ok"]);
        assert_eq!(harness.engine.state(), SessionState::BoundTrx);
        assert_eq!(harness.closes(), 0);
    }

    #[test]
    fn generic_nack_resolves_the_matching_request() {
        let mut harness = Harness::bound(config());
        let mut pending = harness
            .engine
            .submit_sm_tracked(&SmsMessage::new("1", "2", "hi"))
            .unwrap();

        harness.feed(Pdu::GenericNack(GenericNack::error(
            3,
            CommandStatus::InvalidCommandLength,
        )));

        let response = pending[0].try_take().unwrap().unwrap();
        assert_eq!(response.command_id, CommandId::GenericNack);
        assert_eq!(response.command_status, CommandStatus::InvalidCommandLength);
    }

    #[test]
    fn response_timeout_fails_the_request() {
        let config = builder()
            .response_timeout(Some(Duration::from_secs(10)))
            .build()
            .unwrap();
        let mut harness = Harness::bound(config);
        harness.feed(Pdu::EnquireLinkResp(EnquireLinkResponse::new(2)));

        let mut pending = harness
            .engine
            .submit_sm_tracked(&SmsMessage::new("1", "2", "hi"))
            .unwrap();
        harness.advance(Duration::from_secs(10));

        assert!(matches!(pending[0].try_take(), Some(Err(SmppError::Timeout))));
        assert_eq!(harness.engine.state(), SessionState::BoundTrx);

        // A late response finds nothing pending
        harness.feed(Pdu::SubmitSmResp(SubmitSmResponse::new(3, "late")));
        assert_eq!(harness.engine.pending_requests(), 0);
    }

    #[test]
    fn query_sm_round_trip() {
        let mut harness = Harness::bound(config());
        let mut pending = harness.engine.query_sm("msg-0001", "Sender").unwrap();

        match harness.last_sent() {
            Pdu::QuerySm(query) => {
                assert_eq!(query.sequence_number, 3);
                assert_eq!(query.message_id, "msg-0001");
                assert_eq!(query.source_addr, "Sender");
            }
            other => panic!("expected query_sm, got {:?}", other),
        }

        harness.feed(Pdu::QuerySmResp(QuerySmResponse {
            command_status: CommandStatus::Ok,
            sequence_number: 3,
            message_id: "msg-0001".to_string(),
            final_date: String::new(),
            message_state: MessageState::Delivered as u8,
            error_code: 0,
        }));

        let response = pending.try_take().unwrap().unwrap();
        match response.pdu {
            Pdu::QuerySmResp(resp) => assert_eq!(resp.state(), Some(MessageState::Delivered)),
            other => panic!("expected query_sm_resp, got {:?}", other),
        }
    }

    #[test]
    fn failed_write_disconnects() {
        let mut harness = Harness::bound(config());
        harness.engine.transport_mut().fail_writes = true;

        let result = harness.engine.submit_sm(&SmsMessage::new("1", "2", "hi"));

        assert!(result.is_err());
        assert_eq!(harness.engine.state(), SessionState::Closed);
    }
}

#[cfg(test)]
mod teardown {
    use super::*;

    #[test]
    fn unbind_round_trip() {
        let mut harness = Harness::bound(config());
        let mut pending = harness.engine.unbind().unwrap();

        assert_eq!(harness.last_sent(), Pdu::Unbind(Unbind::new(3)));
        assert!(matches!(
            harness.engine.submit_sm(&SmsMessage::new("1", "2", "late")),
            Err(SmppError::InvalidState(_))
        ));

        harness.feed(Pdu::UnbindResp(UnbindResponse::new(3)));

        assert!(pending.try_take().unwrap().unwrap().is_ok());
        assert!(!harness.engine.keepalive_status().running);
        assert!(!harness.clock.is_scheduled(TimerKind::EnquireLink));
        assert_eq!(harness.handler.events(), vec!["unbind_resp 3"]);

        // A duplicate response resolves nothing further
        harness.feed(Pdu::UnbindResp(UnbindResponse::new(3)));
        assert_eq!(harness.handler.events().len(), 2);
        assert_eq!(harness.engine.pending_requests(), 0);
    }

    #[test]
    fn connection_loss_fails_pending_requests() {
        let mut harness = Harness::bound(config());
        let mut pending = harness
            .engine
            .submit_sm_tracked(&SmsMessage::new("1", "2", "hi"))
            .unwrap();

        harness.engine.connection_lost();

        assert!(matches!(
            pending[0].try_take(),
            Some(Err(SmppError::ConnectionClosed))
        ));
        assert_eq!(harness.engine.state(), SessionState::Closed);
        assert_eq!(harness.clock.pending(), 0);
        // The transport is already gone
        assert_eq!(harness.closes(), 0);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut harness = Harness::bound(config());

        harness.engine.disconnect();
        harness.engine.disconnect();
        harness.engine.connection_lost();

        assert_eq!(harness.closes(), 1);
        assert_eq!(harness.engine.state(), SessionState::Closed);
    }

    #[test]
    fn data_after_close_is_ignored() {
        let mut harness = Harness::bound(config());
        harness.engine.disconnect();
        let before = harness.sent().len();

        harness.feed(Pdu::EnquireLink(EnquireLink::new(70)));

        assert_eq!(harness.sent().len(), before);
    }

    #[test]
    fn reconnect_binds_again() {
        let sequence = Arc::new(SharedSequence::new());
        let clock = ManualScheduler::new();
        let mut engine = SmppEngine::new(
            config(),
            RecordingTransport::default(),
            clock,
            sequence.clone(),
            Box::new(RecordingHandler::default()),
        );

        engine.connection_made().unwrap();
        engine.connection_lost();
        let pending = engine.connection_made().unwrap();

        assert_eq!(engine.state(), SessionState::Open);
        assert_eq!(pending.sequence_number(), 2);
        assert_eq!(sequence.current(), 2);
    }
}

#[cfg(test)]
mod config_errors {
    use super::*;

    #[test]
    fn conflicting_strategies_name_every_flag() {
        let err = builder()
            .send_long_messages(true)
            .send_multipart_udh(true)
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::MutuallyExclusive(vec!["send_long_messages", "send_multipart_udh"])
        );
        assert_eq!(
            err.to_string(),
            "The following parameters are mutually exclusive: send_long_messages, send_multipart_udh"
        );
    }
}

#[cfg(test)]
mod client {
    use super::*;
    use crate::client::SmppClient;
    use crate::engine::NoopHandler;
    use crate::framer::StreamFramer;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal SMSC: accepts one connection and answers every request,
    /// rejecting the bind with `bind_status` when it is not Ok
    async fn fake_smsc(listener: TcpListener, bind_status: CommandStatus) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let registry = PduRegistry::new();
        let mut framer = StreamFramer::new();
        let mut buf = vec![0u8; 4096];

        loop {
            let n = match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            framer.extend(&buf[..n]);
            while let Some(frame) = framer.next_pdu().unwrap() {
                let reply = match registry.decode(&frame).unwrap() {
                    Pdu::Bind(bind) if bind_status.is_ok() => Pdu::BindResp(BindResponse::new(
                        bind.bind_type,
                        bind.sequence_number,
                        "FAKESMSC",
                    )),
                    Pdu::Bind(bind) => Pdu::BindResp(BindResponse::error(
                        bind.bind_type,
                        bind.sequence_number,
                        bind_status,
                    )),
                    Pdu::EnquireLink(req) => {
                        Pdu::EnquireLinkResp(EnquireLinkResponse::new(req.sequence_number))
                    }
                    Pdu::SubmitSm(submit) => Pdu::SubmitSmResp(SubmitSmResponse::new(
                        submit.sequence_number,
                        &format!("id-{}", submit.sequence_number),
                    )),
                    Pdu::Unbind(req) => Pdu::UnbindResp(UnbindResponse::new(req.sequence_number)),
                    _ => continue,
                };
                if socket.write_all(&reply.to_bytes().unwrap()).await.is_err() {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn bind_submit_unbind_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let smsc = tokio::spawn(fake_smsc(listener, CommandStatus::Ok));

        let config = builder().send_multipart_udh(true).build().unwrap();
        let client = SmppClient::connect(addr, config, NoopHandler, Arc::new(SharedSequence::new()))
            .await
            .unwrap();
        assert_eq!(client.state().await, SessionState::BoundTrx);

        let ids = client
            .send_sms(&SmsMessage::new("447700900123", "Sender", "Hello"))
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids[0].starts_with("id-"));

        let ids = client
            .send_sms(&SmsMessage::new("447700900123", "Sender", long_text()))
            .await
            .unwrap();
        assert_eq!(ids.len(), 4);

        client.unbind().await.unwrap();
        assert_eq!(client.state().await, SessionState::Closed);
        smsc.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_bind_fails_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(fake_smsc(listener, CommandStatus::InvalidSystemId));

        let result =
            SmppClient::connect(addr, config(), NoopHandler, Arc::new(SharedSequence::new())).await;

        assert!(matches!(
            result,
            Err(SmppError::Bind(BindError::Rejected(CommandStatus::InvalidSystemId)))
        ));
    }
}
