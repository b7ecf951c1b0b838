mod common;

#[cfg(test)]
mod tests {
    use crate::common;
    use tls12_core::connection::ConnectionStatus;
    use tls12_core::crypto::{compute_verify_data, CipherSuite, Role};
    use tls12_core::engine::EngineFault;
    use tls12_core::keys::{begin_key_derivation, run_key_derivation};
    use tls12_core::record::{open_record, protect_record, AlertDescription, BufferRequest, ContentType};
    use tls12_core::report::{FunctionId, MemoryReporter};
    use tls12_core::segment::{ConstSegment, RingBuffer, Segment};
    use tls12_core::types::{InternalError, TlsError};

    const SUITE: CipherSuite = CipherSuite::EcdheEcdsaWithAes128CbcSha;

    fn refused(err: &TlsError) -> bool {
        matches!(err, TlsError::Internal { detail: InternalError::InvalidState(_), .. })
    }

    fn seal(pair: &mut common::Pair, data: &[u8]) -> Vec<u8> {
        let mut transport = RingBuffer::new(8192);
        common::send_record(&mut pair.client, &mut pair.client_engine, &mut transport, ContentType::ApplicationData, data);
        transport.to_vec()
    }

    /// Server receives a record whose length is not block aligned.
    fn raise_decode_error(pair: &mut common::Pair) {
        let bytes = [0u8; 47];
        let (mut first, mut second) = (ConstSegment::new(&bytes), ConstSegment::empty());
        let err = open_record(
            &mut pair.server,
            &mut pair.server_engine,
            ContentType::ApplicationData,
            &mut first,
            &mut second,
            0,
        )
        .unwrap_err();
        assert_eq!(err, TlsError::Protocol(AlertDescription::DecodeError));
        assert_eq!(pair.server.status(), ConnectionStatus::AlertPending);
    }

    #[test]
    fn aborted_connection_refuses_every_operation() {
        let reporter = MemoryReporter::new();
        let mut pair = common::connected_pair(SUITE);
        pair.client = pair.client.with_reporter(Box::new(reporter.clone()));

        pair.client.write_plaintext(b"first").unwrap();
        pair.client.stage_record(ContentType::ApplicationData, 5).unwrap();
        pair.client_engine.inject_fault(EngineFault::Entropy("test".into()));
        let mut buf = [0u8; 128];
        {
            let (mut seg1, mut seg2) = (Segment::new(&mut buf), Segment::empty());
            let err = protect_record(&mut pair.client, &mut pair.client_engine, &mut seg1, &mut seg2).unwrap_err();
            assert!(matches!(err, TlsError::Crypto { .. }));
        }
        assert_eq!(pair.client.status(), ConnectionStatus::Aborted);

        {
            let (mut seg1, mut seg2) = (Segment::new(&mut buf), Segment::empty());
            let err = protect_record(&mut pair.client, &mut pair.client_engine, &mut seg1, &mut seg2).unwrap_err();
            assert!(refused(&err), "{err:?}");
            assert_eq!(seg1.usage(), 0);
        }
        assert_eq!(pair.client.tx_seq(), 0);

        let wire = [0u8; 48];
        let (mut first, mut second) = (ConstSegment::new(&wire), ConstSegment::empty());
        let err = open_record(
            &mut pair.client,
            &mut pair.client_engine,
            ContentType::ApplicationData,
            &mut first,
            &mut second,
            0,
        )
        .unwrap_err();
        assert!(refused(&err));
        assert_eq!(first.consumed(), 0);

        assert!(refused(&begin_key_derivation(&mut pair.client).unwrap_err()));
        assert!(refused(&run_key_derivation(&mut pair.client, &mut pair.client_engine).unwrap_err()));
        assert!(refused(&compute_verify_data(&mut pair.client, &mut pair.client_engine, Role::Client, &[0u8; 32]).unwrap_err()));

        assert_eq!(pair.client.status(), ConnectionStatus::Aborted);
        assert_eq!(reporter.user_reports().len(), 1);
        assert!(reporter.dev_reports().is_empty());
    }

    #[test]
    fn alert_pending_connection_opens_nothing() {
        let mut pair = common::connected_pair(SUITE);
        raise_decode_error(&mut pair);

        let wire = seal(&mut pair, b"after alert");
        let (mut first, mut second) = (ConstSegment::new(&wire), ConstSegment::empty());
        let err = open_record(
            &mut pair.server,
            &mut pair.server_engine,
            ContentType::ApplicationData,
            &mut first,
            &mut second,
            0,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TlsError::Internal { function: FunctionId::DecryptRecord, detail: InternalError::InvalidState(_) }
        ));
        assert_eq!(pair.server.rx_seq(), 0);
        assert!(pair.server.rx_buffer().iter().all(|b| *b == 0));
        assert_eq!(pair.server.status(), ConnectionStatus::AlertPending);
        assert_eq!(pair.server.queued_alert(), Some([2, 50]));
    }

    #[test]
    fn alert_pending_connection_protects_only_the_alert() {
        let mut pair = common::connected_pair(SUITE);
        pair.server.write_plaintext(b"reply").unwrap();
        pair.server.stage_record(ContentType::ApplicationData, 5).unwrap();
        raise_decode_error(&mut pair);

        let mut transport = RingBuffer::new(1024);
        {
            let (mut seg1, mut seg2) = transport.free_segments();
            let err = protect_record(&mut pair.server, &mut pair.server_engine, &mut seg1, &mut seg2).unwrap_err();
            assert!(refused(&err));
        }
        assert!(transport.is_empty());

        assert!(pair.server.stage_alert());
        let request = common::flush_record(&mut pair.server, &mut pair.server_engine, &mut transport);
        assert!(matches!(request, BufferRequest::Complete { .. }));
        assert_eq!(pair.server.tx_seq(), 1);

        let alert = common::receive_record(&mut pair.client, &mut pair.client_engine, &mut transport, ContentType::Alert)
            .unwrap();
        assert_eq!(alert, [2u8, 50]);

        pair.server.stage_record(ContentType::ApplicationData, 5).unwrap();
        let (mut seg1, mut seg2) = transport.free_segments();
        let err = protect_record(&mut pair.server, &mut pair.server_engine, &mut seg1, &mut seg2).unwrap_err();
        assert!(refused(&err));
    }
}
