mod common;

#[cfg(test)]
mod tests {
    use crate::common;
    use tls12_core::crypto::CipherSuite;
    use tls12_core::record::{open_record, protect_record, AlertDescription, BufferRequest, ContentType};
    use tls12_core::segment::{ConstSegment, RingBuffer, Segment};
    use tls12_core::types::TlsError;

    #[test]
    fn content_travels_in_clear_with_mac() {
        for (suite, mac_len) in [(CipherSuite::PskWithNullSha, 20), (CipherSuite::EcdheEcdsaWithNullSha, 20), (CipherSuite::PskWithNullSha256, 32)] {
            let mut pair = common::connected_pair(suite);
            let mut transport = RingBuffer::new(1024);
            let request =
                common::send_record(&mut pair.client, &mut pair.client_engine, &mut transport, ContentType::Handshake, b"visible");
            assert_eq!(request, BufferRequest::Complete { written: 7 + mac_len });
            assert_eq!(&transport.to_vec()[..7], b"visible");

            let opened =
                common::receive_record(&mut pair.server, &mut pair.server_engine, &mut transport, ContentType::Handshake)
                    .unwrap();
            assert_eq!(opened, b"visible", "{suite:?}");
        }
    }

    #[test]
    fn split_destination() {
        let mut pair = common::connected_pair(CipherSuite::PskWithNullSha256);
        pair.client.write_plaintext(b"0123456789").unwrap();
        pair.client.stage_record(ContentType::ApplicationData, 10).unwrap();

        let (mut a, mut b) = ([0u8; 5], [0u8; 64]);
        {
            let (mut seg1, mut seg2) = (Segment::new(&mut a), Segment::new(&mut b));
            let request = protect_record(&mut pair.client, &mut pair.client_engine, &mut seg1, &mut seg2).unwrap();
            assert_eq!(request, BufferRequest::Complete { written: 42 });
        }
        assert_eq!(&a, b"01234");
        assert_eq!(&b[..5], b"56789");

        let (mut first, mut second) = (ConstSegment::new(&a), ConstSegment::new(&b[..37]));
        let record = open_record(
            &mut pair.server,
            &mut pair.server_engine,
            ContentType::ApplicationData,
            &mut first,
            &mut second,
            0,
        )
        .unwrap();
        assert_eq!(&pair.server.rx_buffer()[..record.len], b"0123456789");
    }

    #[test]
    fn short_space_defers() {
        let mut pair = common::connected_pair(CipherSuite::PskWithNullSha);
        pair.client.write_plaintext(b"abc").unwrap();
        pair.client.stage_record(ContentType::ApplicationData, 3).unwrap();
        let mut a = [0u8; 22];
        let (mut seg1, mut seg2) = (Segment::new(&mut a), Segment::empty());
        let request = protect_record(&mut pair.client, &mut pair.client_engine, &mut seg1, &mut seg2).unwrap();
        assert_eq!(request, BufferRequest::NeedMoreSpace { required: 23, available: 22 });
        assert_eq!(seg1.usage(), 0);
        assert!(pair.client.pending_record().is_some());
    }

    #[test]
    fn modified_content_fails() {
        let mut pair = common::connected_pair(CipherSuite::PskWithNullSha);
        let mut transport = RingBuffer::new(1024);
        common::send_record(&mut pair.client, &mut pair.client_engine, &mut transport, ContentType::ApplicationData, b"amount=10");
        let mut wire = transport.to_vec();
        wire[7] = b'9';

        let (mut first, mut second) = (ConstSegment::new(&wire), ConstSegment::empty());
        let err = open_record(&mut pair.server, &mut pair.server_engine, ContentType::ApplicationData, &mut first, &mut second, 0)
            .unwrap_err();
        assert_eq!(err, TlsError::Protocol(AlertDescription::BadRecordMac));
        assert_eq!(pair.server.queued_alert(), Some([2, 20]));
    }

    #[test]
    fn shorter_than_mac_is_decode_error() {
        let mut pair = common::connected_pair(CipherSuite::PskWithNullSha);
        let bytes = [0u8; 19];
        let (mut first, mut second) = (ConstSegment::new(&bytes), ConstSegment::empty());
        let err = open_record(&mut pair.server, &mut pair.server_engine, ContentType::ApplicationData, &mut first, &mut second, 0)
            .unwrap_err();
        assert_eq!(err, TlsError::Protocol(AlertDescription::DecodeError));
    }
}
