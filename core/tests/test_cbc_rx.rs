mod common;

#[cfg(test)]
mod tests {
    use crate::common;
    use tls12_core::connection::{ConnectionStatus, TlsConnection};
    use tls12_core::constants::MAX_CIPHERTEXT_LEN;
    use tls12_core::crypto::CipherSuite;
    use tls12_core::engine::SoftwareCipherEngine;
    use tls12_core::record::cbc_rx::{decrypt_record, verify_fragment};
    use tls12_core::record::mac::record_header;
    use tls12_core::record::{open_record, AlertDescription, ContentType, OpenedRecord};
    use tls12_core::report::{FunctionId, MemoryReporter};
    use tls12_core::segment::{ConstSegment, RingBuffer};
    use tls12_core::types::{InternalError, TlsError};

    const SUITE: CipherSuite = CipherSuite::EcdheEcdsaWithAes128CbcSha;

    /// Protect `data` on the client and hand back the wire bytes.
    fn seal(pair: &mut common::Pair, data: &[u8]) -> Vec<u8> {
        let mut transport = RingBuffer::new(8192);
        common::send_record(&mut pair.client, &mut pair.client_engine, &mut transport, ContentType::ApplicationData, data);
        transport.to_vec()
    }

    fn open_split(
        conn: &mut TlsConnection,
        engine: &mut SoftwareCipherEngine,
        wire: &[u8],
        split: usize,
        rx_offset: usize,
    ) -> Result<OpenedRecord, TlsError> {
        let (a, b) = wire.split_at(split);
        let (mut first, mut second) = (ConstSegment::new(a), ConstSegment::new(b));
        open_record(conn, engine, ContentType::ApplicationData, &mut first, &mut second, rx_offset)
    }

    #[test]
    fn record_opens_at_offset() {
        let mut pair = common::connected_pair(SUITE);
        let wire = seal(&mut pair, b"payload bytes");
        let record = open_split(&mut pair.server, &mut pair.server_engine, &wire, wire.len(), 100).unwrap();
        assert_eq!(record.offset, 100);
        assert_eq!(record.len, 13);
        assert_eq!(&pair.server.rx_buffer()[100..113], b"payload bytes");
        assert_eq!(pair.server.rx_seq(), 1);
        assert_eq!(pair.server.telemetry().records_opened, 1);
    }

    #[test]
    fn every_split_point_opens() {
        let data: Vec<u8> = (0..77u8).collect();
        let mut pair = common::connected_pair(SUITE);
        let len = tls12_core::utils::cbc_record_len(data.len(), 20);
        for split in 0..=len {
            let wire = seal(&mut pair, &data);
            assert_eq!(wire.len(), len);
            let record = open_split(&mut pair.server, &mut pair.server_engine, &wire, split, 0).unwrap();
            assert_eq!(&pair.server.rx_buffer()[..record.len], &data[..], "split at {split}");
        }
        assert_eq!(pair.server.rx_seq(), len as u64 + 1);
    }

    #[test]
    fn iv_straddling_the_wrap_point() {
        let mut pair = common::connected_pair(SUITE);
        let mut transport = RingBuffer::with_head(8192, 8192 - 8);
        common::send_record(&mut pair.client, &mut pair.client_engine, &mut transport, ContentType::Handshake, b"finished");
        assert!(transport.wraps(transport.len()));
        let opened =
            common::receive_record(&mut pair.server, &mut pair.server_engine, &mut transport, ContentType::Handshake).unwrap();
        assert_eq!(opened, b"finished");
    }

    #[test]
    fn rx_offset_past_buffer_is_internal() {
        let reporter = MemoryReporter::new();
        let mut pair = common::connected_pair(SUITE);
        pair.server = pair.server.with_reporter(Box::new(reporter.clone()));
        let wire = seal(&mut pair, b"hello");
        let offset = pair.server.rx_buffer_size() - 10;

        let err = open_split(&mut pair.server, &mut pair.server_engine, &wire, wire.len(), offset).unwrap_err();
        assert!(matches!(
            err,
            TlsError::Internal { function: FunctionId::DecryptRecord, detail: InternalError::RxBufferOverflow { .. } }
        ));
        assert_eq!(pair.server.status(), ConnectionStatus::Aborted);
        assert_eq!(err.alert(), Some(AlertDescription::InternalError));
        assert_eq!(pair.server.rx_seq(), 0);
        assert_eq!(reporter.dev_reports().len(), 1);
        assert!(pair.server.rx_buffer().iter().all(|b| *b == 0));
    }

    #[test]
    fn unaligned_length_is_decode_error() {
        let mut pair = common::connected_pair(SUITE);
        let wire = seal(&mut pair, b"hello");
        let truncated = &wire[..wire.len() - 1];
        let (mut first, mut second) = (ConstSegment::new(truncated), ConstSegment::empty());

        let err = decrypt_record(
            &mut pair.server,
            &mut pair.server_engine,
            ContentType::ApplicationData,
            &mut first,
            &mut second,
            0,
        )
        .unwrap_err();
        assert_eq!(err, TlsError::Protocol(AlertDescription::DecodeError));
        assert_eq!(pair.server.queued_alert(), Some([2, 50]));
        assert_eq!(pair.server.status(), ConnectionStatus::AlertPending);
        assert_eq!(first.consumed(), 0);
    }

    #[test]
    fn too_short_is_decode_error() {
        let mut pair = common::connected_pair(SUITE);
        let err = open_split(&mut pair.server, &mut pair.server_engine, &[0u8; 32], 32, 0).unwrap_err();
        assert_eq!(err, TlsError::Protocol(AlertDescription::DecodeError));
    }

    #[test]
    fn tampering_is_bad_record_mac() {
        let sealed_len = {
            let mut pair = common::connected_pair(SUITE);
            seal(&mut pair, b"sensitive content").len()
        };
        for position in [0, 15, 16, 30, sealed_len - 17, sealed_len - 1] {
            let mut pair = common::connected_pair(SUITE);
            let mut wire = seal(&mut pair, b"sensitive content");
            wire[position] ^= 0x01;

            let err = open_split(&mut pair.server, &mut pair.server_engine, &wire, wire.len(), 0).unwrap_err();
            assert_eq!(err, TlsError::Protocol(AlertDescription::BadRecordMac), "flip at {position}");
            assert_eq!(err.alert(), Some(AlertDescription::BadRecordMac));
            assert_eq!(pair.server.queued_alert(), Some([2, 20]));
            assert_eq!(pair.server.rx_seq(), 0);
            assert_eq!(pair.server.telemetry().alerts_raised, 1);
            assert!(pair.server.rx_buffer().iter().all(|b| *b == 0), "flip at {position}");
        }
    }

    #[test]
    fn oversized_record_is_record_overflow() {
        let mut pair = common::connected_pair(SUITE);
        let bytes = vec![0x33u8; MAX_CIPHERTEXT_LEN + 16];
        let (mut first, mut second) = (ConstSegment::new(&bytes), ConstSegment::empty());
        let err = decrypt_record(
            &mut pair.server,
            &mut pair.server_engine,
            ContentType::ApplicationData,
            &mut first,
            &mut second,
            0,
        )
        .unwrap_err();
        assert_eq!(err, TlsError::Protocol(AlertDescription::RecordOverflow));
        assert_eq!(pair.server.queued_alert(), Some([2, 22]));
        assert_eq!(first.consumed(), 0);
        assert!(pair.server.rx_buffer().iter().all(|b| *b == 0));
    }

    #[test]
    fn largest_record_is_decrypted_then_wiped_on_bad_mac() {
        let mut pair = common::connected_pair(SUITE);
        assert!(pair.server.rx_buffer_size() >= MAX_CIPHERTEXT_LEN - 16);
        let bytes = vec![0x33u8; MAX_CIPHERTEXT_LEN];
        let (a, b) = bytes.split_at(1000);
        let (mut first, mut second) = (ConstSegment::new(a), ConstSegment::new(b));
        let err = open_record(
            &mut pair.server,
            &mut pair.server_engine,
            ContentType::ApplicationData,
            &mut first,
            &mut second,
            0,
        )
        .unwrap_err();
        assert_eq!(err, TlsError::Protocol(AlertDescription::BadRecordMac));
        assert!(first.is_empty() && second.is_empty());
        assert!(pair.server.rx_buffer().iter().all(|b| *b == 0));
    }

    #[test]
    fn pseudo_header_carries_length_big_endian() {
        let header = record_header(0x0102_0304_0506_0708, ContentType::Handshake, 0x1234);
        assert_eq!(hex::encode(header), "01020304050607081603031234");
    }

    #[test]
    fn decrypt_then_verify_separately() {
        let mut pair = common::connected_pair(CipherSuite::PskWithAes128CbcSha256);
        let wire = seal(&mut pair, b"two step");
        let (mut first, mut second) = (ConstSegment::new(&wire[..20]), ConstSegment::new(&wire[20..]));
        let fragment = decrypt_record(
            &mut pair.server,
            &mut pair.server_engine,
            ContentType::ApplicationData,
            &mut first,
            &mut second,
            0,
        )
        .unwrap();
        assert!(first.is_empty() && second.is_empty());
        assert_eq!(fragment.len, wire.len() - 16);
        assert_eq!(pair.server.rx_seq(), 0);

        let record = verify_fragment(&mut pair.server, &mut pair.server_engine, &fragment).unwrap();
        assert_eq!(record.len, 8);
        assert_eq!(&pair.server.rx_buffer()[..8], b"two step");
        assert_eq!(pair.server.rx_seq(), 1);
    }

    #[test]
    fn wrong_content_type_fails_mac() {
        let mut pair = common::connected_pair(SUITE);
        let wire = seal(&mut pair, b"data");
        let (mut first, mut second) = (ConstSegment::new(&wire), ConstSegment::empty());
        let err = open_record(&mut pair.server, &mut pair.server_engine, ContentType::Handshake, &mut first, &mut second, 0)
            .unwrap_err();
        assert_eq!(err, TlsError::Protocol(AlertDescription::BadRecordMac));
    }
}
