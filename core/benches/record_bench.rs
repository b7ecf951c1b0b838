use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tls12_core::config::ConnectionConfig;
use tls12_core::connection::TlsConnection;
use tls12_core::crypto::{CipherSuite, Role};
use tls12_core::engine::{CipherEngine, SoftwareCipherEngine};
use tls12_core::keys::{assemble_psk_premaster, begin_key_derivation, run_key_derivation};
use tls12_core::record::{open_record, protect_record, ContentType};
use tls12_core::segment::RingBuffer;

fn endpoint(suite: CipherSuite, role: Role) -> (TlsConnection, SoftwareCipherEngine) {
    let config = ConnectionConfig {
        role,
        cipher_suite: suite.id(),
        tls_buffer_size: 16 * 1024,
        ..ConnectionConfig::default()
    };
    let mut conn = TlsConnection::new(&config).expect("config");
    let mut engine = SoftwareCipherEngine::with_seed(42);
    engine.provision(conn.worker(), conn.params());
    conn.set_randoms(&[1u8; 32], &[2u8; 32]);
    match conn.params().key_exchange {
        tls12_core::crypto::KeyExchange::Psk => {
            assemble_psk_premaster(&mut conn, &mut engine, b"bench-psk-000000").expect("psk");
        }
        tls12_core::crypto::KeyExchange::Ecdhe => {
            engine.key_element_set(conn.worker().shared_secret, &[9u8; 32]).expect("shared");
        }
    }
    begin_key_derivation(&mut conn).expect("begin");
    run_key_derivation(&mut conn, &mut engine).expect("derive");
    (conn, engine)
}

fn bench_records(c: &mut Criterion) {
    let suites = [
        ("aes128-cbc-sha256", CipherSuite::EcdheEcdsaWithAes128CbcSha256),
        ("aes128-gcm", CipherSuite::EcdheEcdsaWithAes128GcmSha256),
        ("chacha20-poly1305", CipherSuite::EcdheEcdsaWithChaCha20Poly1305Sha256),
    ];
    let mut group = c.benchmark_group("record_round_trip");

    for (name, suite) in suites {
        for size in [64usize, 1024, 16 * 1024] {
            let (mut client, mut client_engine) = endpoint(suite, Role::Client);
            let (mut server, mut server_engine) = endpoint(suite, Role::Server);
            let data = vec![0x5au8; size];
            let mut transport = RingBuffer::new(32 * 1024);

            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    client.write_plaintext(&data).expect("plaintext");
                    client.stage_record(ContentType::ApplicationData, data.len()).expect("stage");
                    let written = {
                        let (mut seg1, mut seg2) = transport.free_segments();
                        match protect_record(&mut client, &mut client_engine, &mut seg1, &mut seg2).expect("protect") {
                            tls12_core::record::BufferRequest::Complete { written } => written,
                            other => panic!("unexpected {other:?}"),
                        }
                    };
                    transport.commit_write(written).expect("commit");

                    let opened = {
                        let (mut first, mut second) = transport.data_segments();
                        open_record(&mut server, &mut server_engine, ContentType::ApplicationData, &mut first, &mut second, 0)
                            .expect("open")
                    };
                    transport.consume(written).expect("consume");
                    opened.len
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_records);
criterion_main!(benches);
