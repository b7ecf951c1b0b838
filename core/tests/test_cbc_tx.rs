mod common;

#[cfg(test)]
mod tests {
    use crate::common::{self, PairOptions};
    use proptest::prelude::*;
    use tls12_core::connection::ConnectionStatus;
    use tls12_core::constants::AES_BLOCK_LEN;
    use tls12_core::crypto::CipherSuite;
    use tls12_core::record::{
        protect_record, AlertDescription, AlertLevel, BufferRequest, ContentType,
    };
    use tls12_core::segment::{RingBuffer, Segment};
    use tls12_core::types::{InternalError, TlsError};
    use tls12_core::utils::{cbc_record_len, padding_len};

    #[test]
    fn five_byte_handshake_fills_three_blocks() {
        let mut pair = common::connected_pair(CipherSuite::EcdheEcdsaWithAes128CbcSha);
        let mut transport = RingBuffer::new(64);
        let request = common::send_record(
            &mut pair.client,
            &mut pair.client_engine,
            &mut transport,
            ContentType::Handshake,
            b"hello",
        );

        assert_eq!(request, BufferRequest::Complete { written: 48 });
        assert_eq!(transport.len(), 48);
        assert_eq!(pair.client.tx_seq(), 1);
        assert!(pair.client.tls_buffer().is_empty());
        assert!(pair.client.pending_record().is_none());
        assert_eq!(pair.client.telemetry().records_protected, 1);
        assert_eq!(pair.client.telemetry().bytes_ciphertext_tx, 48);

        let opened = common::receive_record(&mut pair.server, &mut pair.server_engine, &mut transport, ContentType::Handshake)
            .unwrap();
        assert_eq!(opened, b"hello");
    }

    #[test]
    fn short_segments_defer_without_writing() {
        let mut pair = common::connected_pair(CipherSuite::EcdheEcdsaWithAes128CbcSha);
        pair.client.write_plaintext(b"hello").unwrap();
        pair.client.stage_record(ContentType::Handshake, 5).unwrap();

        let (mut a, mut b) = ([0u8; 30], [0u8; 10]);
        let (mut seg1, mut seg2) = (Segment::new(&mut a), Segment::new(&mut b));
        let request = protect_record(&mut pair.client, &mut pair.client_engine, &mut seg1, &mut seg2).unwrap();

        assert_eq!(request, BufferRequest::NeedMoreSpace { required: 48, available: 40 });
        assert_eq!(seg1.usage(), 0);
        assert_eq!(seg2.usage(), 0);
        assert!(pair.client.pending_record().is_some());
        assert_eq!(pair.client.tx_seq(), 0);
        assert_eq!(pair.client.tls_buffer().len(), 5);
        assert_eq!(pair.client.telemetry().deferrals, 1);
        assert_eq!(pair.client.status(), ConnectionStatus::Open);
        assert_eq!(a, [0u8; 30]);
        assert_eq!(b, [0u8; 10]);
    }

    #[test]
    fn split_destination_matches_contiguous_layout() {
        let mut pair = common::connected_pair(CipherSuite::EcdheEcdsaWithAes128CbcSha);
        pair.client.write_plaintext(b"hello").unwrap();
        pair.client.stage_record(ContentType::Handshake, 5).unwrap();

        let (mut a, mut b) = ([0u8; 30], [0u8; 40]);
        let written = {
            let (mut seg1, mut seg2) = (Segment::new(&mut a), Segment::new(&mut b));
            let request = protect_record(&mut pair.client, &mut pair.client_engine, &mut seg1, &mut seg2).unwrap();
            assert_eq!(request, BufferRequest::Complete { written: 48 });
            assert_eq!((seg1.usage(), seg2.usage()), (30, 18));
            48
        };

        let wire = [&a[..], &b[..written - a.len()]].concat();
        let mut transport = RingBuffer::new(64);
        transport.push(&wire).unwrap();
        let opened = common::receive_record(&mut pair.server, &mut pair.server_engine, &mut transport, ContentType::Handshake)
            .unwrap();
        assert_eq!(opened, b"hello");
    }

    #[test]
    fn empty_first_segment_uses_second() {
        let mut pair = common::connected_pair(CipherSuite::PskWithAes128CbcSha256);
        pair.client.write_plaintext(b"application").unwrap();
        pair.client.stage_record(ContentType::ApplicationData, 11).unwrap();

        let mut b = [0u8; 128];
        let mut seg1 = Segment::empty();
        let mut seg2 = Segment::new(&mut b);
        let request = protect_record(&mut pair.client, &mut pair.client_engine, &mut seg1, &mut seg2).unwrap();
        let expected = cbc_record_len(11, 32);
        assert_eq!(request, BufferRequest::Complete { written: expected });
        assert_eq!(seg2.usage(), expected);
    }

    #[test]
    fn deferral_does_not_draw_an_iv() {
        let suite = CipherSuite::EcdheEcdsaWithAes128CbcSha256;
        let mut reference = common::connected_pair(suite);
        let mut deferred = common::connected_pair(suite);
        let data = [0x42u8; 100];

        let mut expected = RingBuffer::new(1024);
        common::send_record(
            &mut reference.client,
            &mut reference.client_engine,
            &mut expected,
            ContentType::ApplicationData,
            &data,
        );

        deferred.client.write_plaintext(&data).unwrap();
        deferred.client.stage_record(ContentType::ApplicationData, data.len()).unwrap();
        let mut small = [0u8; 16];
        let request = {
            let (mut seg1, mut seg2) = (Segment::new(&mut small), Segment::empty());
            protect_record(&mut deferred.client, &mut deferred.client_engine, &mut seg1, &mut seg2).unwrap()
        };
        assert!(!request.is_complete());

        let mut actual = RingBuffer::new(1024);
        let retry = common::flush_record(&mut deferred.client, &mut deferred.client_engine, &mut actual);
        assert!(retry.is_complete());
        assert_eq!(actual.to_vec(), expected.to_vec());
    }

    #[test]
    fn wrapped_buffers_round_trip() {
        let lengths = [0usize, 1, 15, 16, 17, 4000];
        // (tls ring head, transport head)
        let geometries = [
            (0, 0),
            (4096 - 8, 0),
            (0, 8192 - 20),
            (4096 - 8, 8192 - 20),
            // TLS wrap inside the first transport segment
            (4096 - 8, 8192 - 100),
            // IV straddles the transport wrap
            (0, 8192 - 8),
            (4096 - 3, 8192 - 8),
        ];

        for (tls_head, transport_head) in geometries {
            for len in lengths {
                let options = PairOptions { tls_head, ..PairOptions::default() };
                let mut pair = common::connected_pair_with(CipherSuite::EcdheEcdsaWithAes128CbcSha, options);
                let mut transport = RingBuffer::with_head(8192, transport_head);
                let data: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();

                let request = common::send_record(
                    &mut pair.client,
                    &mut pair.client_engine,
                    &mut transport,
                    ContentType::ApplicationData,
                    &data,
                );
                let expected = cbc_record_len(len, 20);
                assert_eq!(
                    request,
                    BufferRequest::Complete { written: expected },
                    "tls head {tls_head}, transport head {transport_head}, len {len}"
                );
                assert_eq!(expected % AES_BLOCK_LEN, 0);

                let opened = common::receive_record(
                    &mut pair.server,
                    &mut pair.server_engine,
                    &mut transport,
                    ContentType::ApplicationData,
                )
                .unwrap();
                assert_eq!(opened, data, "tls head {tls_head}, transport head {transport_head}, len {len}");
            }
        }
    }

    #[test]
    fn consecutive_records_advance_sequence() {
        let mut pair = common::connected_pair(CipherSuite::PskWithAes128CbcSha);
        let mut transport = RingBuffer::new(4096);
        for i in 0..5u8 {
            let data = vec![i; 10 + i as usize * 13];
            common::send_record(&mut pair.client, &mut pair.client_engine, &mut transport, ContentType::ApplicationData, &data);
            let opened =
                common::receive_record(&mut pair.server, &mut pair.server_engine, &mut transport, ContentType::ApplicationData)
                    .unwrap();
            assert_eq!(opened, data);
        }
        assert_eq!(pair.client.tx_seq(), 5);
        assert_eq!(pair.server.rx_seq(), 5);
    }

    #[test]
    fn alert_and_change_cipher_spec_use_fixed_buffers() {
        let mut pair = common::connected_pair(CipherSuite::EcdheEcdsaWithAes128CbcSha);
        let mut transport = RingBuffer::new(256);

        pair.client.stage_record(ContentType::ChangeCipherSpec, 1).unwrap();
        assert!(common::flush_record(&mut pair.client, &mut pair.client_engine, &mut transport).is_complete());
        let ccs = common::receive_record(&mut pair.server, &mut pair.server_engine, &mut transport, ContentType::ChangeCipherSpec)
            .unwrap();
        assert_eq!(ccs, [1u8]);

        pair.client.queue_alert(AlertLevel::Warning, AlertDescription::CloseNotify);
        assert!(pair.client.stage_alert());
        assert!(common::flush_record(&mut pair.client, &mut pair.client_engine, &mut transport).is_complete());
        assert_eq!(pair.client.queued_alert(), None);
        let alert = common::receive_record(&mut pair.server, &mut pair.server_engine, &mut transport, ContentType::Alert)
            .unwrap();
        assert_eq!(alert, [1u8, 0]);
    }

    #[test]
    fn staging_rules() {
        let mut pair = common::connected_pair(CipherSuite::EcdheEcdsaWithAes128CbcSha);
        assert!(matches!(
            pair.client.stage_record(ContentType::Handshake, 10),
            Err(TlsError::Internal { .. })
        ));

        let mut pair = common::connected_pair(CipherSuite::EcdheEcdsaWithAes128CbcSha);
        pair.client.write_plaintext(b"abc").unwrap();
        pair.client.stage_record(ContentType::Handshake, 3).unwrap();
        assert!(matches!(
            pair.client.stage_record(ContentType::Handshake, 3),
            Err(TlsError::Internal { detail: InternalError::RecordPending, .. })
        ));
    }

    #[test]
    fn protect_without_staged_record_is_internal() {
        let mut pair = common::connected_pair(CipherSuite::EcdheEcdsaWithAes128CbcSha);
        let mut buf = [0u8; 64];
        let (mut seg1, mut seg2) = (Segment::new(&mut buf), Segment::empty());
        let err = protect_record(&mut pair.client, &mut pair.client_engine, &mut seg1, &mut seg2).unwrap_err();
        assert!(matches!(err, TlsError::Internal { detail: InternalError::NoPendingRecord, .. }));
        assert_eq!(pair.client.status(), ConnectionStatus::Aborted);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]
        #[test]
        fn any_wrap_geometry_round_trips(
            tls_head in 0usize..4096,
            transport_head in 0usize..8192,
            len in 0usize..4000,
        ) {
            let options = PairOptions { tls_head, ..PairOptions::default() };
            let mut pair = common::connected_pair_with(CipherSuite::EcdheEcdsaWithAes128CbcSha256, options);
            let mut transport = RingBuffer::with_head(8192, transport_head);
            let data: Vec<u8> = (0..len).map(|i| (i * 13 + 5) as u8).collect();

            let request = common::send_record(
                &mut pair.client,
                &mut pair.client_engine,
                &mut transport,
                ContentType::ApplicationData,
                &data,
            );
            prop_assert_eq!(request, BufferRequest::Complete { written: cbc_record_len(len, 32) });

            let opened = common::receive_record(
                &mut pair.server,
                &mut pair.server_engine,
                &mut transport,
                ContentType::ApplicationData,
            )
            .unwrap();
            prop_assert_eq!(opened, data);
        }
    }

    proptest! {
        #[test]
        fn padding_completes_the_last_block(len in 0usize..2048, mac_len in prop::sample::select(vec![20usize, 32])) {
            let padding = padding_len(len, mac_len);
            prop_assert!(padding < AES_BLOCK_LEN);
            prop_assert_eq!((len + mac_len + padding + 1) % AES_BLOCK_LEN, 0);
            prop_assert_eq!(cbc_record_len(len, mac_len), AES_BLOCK_LEN + len + mac_len + padding + 1);
        }
    }
}
