//! Shared fixtures: provisioned client/server pairs, transport helpers and an
//! independent PRF built directly on `hmac`/`sha2`.
#![allow(dead_code)]

use hmac::{Hmac, Mac};
use sha2::Sha256;

use tls12_core::config::ConnectionConfig;
use tls12_core::connection::TlsConnection;
use tls12_core::crypto::{CipherSuite, KeyExchange, Role};
use tls12_core::engine::{CipherEngine, SoftwareCipherEngine};
use tls12_core::keys::{assemble_psk_premaster, begin_key_derivation, run_key_derivation, DerivationProgress};
use tls12_core::record::{open_record, protect_record, BufferRequest, ContentType};
use tls12_core::segment::RingBuffer;
use tls12_core::types::TlsError;

pub const CLIENT_RANDOM: [u8; 32] = [0x11; 32];
pub const SERVER_RANDOM: [u8; 32] = [0x22; 32];
pub const PSK: &[u8] = b"0123456789abcdef";
pub const SHARED_VALUE: [u8; 32] = [0x5a; 32];

pub struct PairOptions {
    pub client_seed: u64,
    pub tls_capacity: usize,
    pub tls_head: usize,
}

impl Default for PairOptions {
    fn default() -> Self {
        Self { client_seed: 1, tls_capacity: 4096, tls_head: 0 }
    }
}

pub struct Pair {
    pub client: TlsConnection,
    pub client_engine: SoftwareCipherEngine,
    pub server: TlsConnection,
    pub server_engine: SoftwareCipherEngine,
}

pub fn config(suite: CipherSuite, role: Role, connection_id: u16) -> ConnectionConfig {
    ConnectionConfig {
        connection_id,
        role,
        cipher_suite: suite.id(),
        ..ConnectionConfig::default()
    }
}

/// Connection plus an engine provisioned for its suite, keys not yet derived.
pub fn endpoint(suite: CipherSuite, role: Role, connection_id: u16, seed: u64) -> (TlsConnection, SoftwareCipherEngine) {
    let conn = TlsConnection::new(&config(suite, role, connection_id)).expect("valid config");
    let mut engine = SoftwareCipherEngine::with_seed(seed);
    engine.provision(conn.worker(), conn.params());
    (conn, engine)
}

/// Install the pre-master input for the suite and run the deriver to completion.
pub fn derive(conn: &mut TlsConnection, engine: &mut SoftwareCipherEngine) {
    conn.set_randoms(&CLIENT_RANDOM, &SERVER_RANDOM);
    match conn.params().key_exchange {
        KeyExchange::Psk => assemble_psk_premaster(conn, engine, PSK).expect("psk pre-master"),
        KeyExchange::Ecdhe => engine
            .key_element_set(conn.worker().shared_secret, &SHARED_VALUE)
            .expect("shared value"),
    }
    begin_key_derivation(conn).expect("begin derivation");
    let progress = run_key_derivation(conn, engine).expect("derivation");
    assert_eq!(progress, DerivationProgress::Complete);
}

pub fn connected_pair_with(suite: CipherSuite, options: PairOptions) -> Pair {
    let (client, mut client_engine) = endpoint(suite, Role::Client, 1, options.client_seed);
    let (server, mut server_engine) = endpoint(suite, Role::Server, 2, options.client_seed.wrapping_add(1000));
    let mut client = client
        .with_tls_buffer(RingBuffer::with_head(options.tls_capacity, options.tls_head))
        .expect("fresh tls buffer");
    let mut server = server;

    derive(&mut client, &mut client_engine);
    derive(&mut server, &mut server_engine);
    Pair { client, client_engine, server, server_engine }
}

pub fn connected_pair(suite: CipherSuite) -> Pair {
    connected_pair_with(suite, PairOptions::default())
}

/// Protect the staged record into the transport's free space.
pub fn flush_record(
    conn: &mut TlsConnection,
    engine: &mut SoftwareCipherEngine,
    transport: &mut RingBuffer,
) -> BufferRequest {
    let request = {
        let (mut seg1, mut seg2) = transport.free_segments();
        protect_record(conn, engine, &mut seg1, &mut seg2).expect("protect record")
    };
    if let BufferRequest::Complete { written } = request {
        transport.commit_write(written).expect("commit transport write");
    }
    request
}

/// Write `data` to the TLS ring, stage it as one record and protect it.
pub fn send_record(
    conn: &mut TlsConnection,
    engine: &mut SoftwareCipherEngine,
    transport: &mut RingBuffer,
    content_type: ContentType,
    data: &[u8],
) -> BufferRequest {
    assert!(conn.write_plaintext(data).expect("write plaintext").is_complete());
    conn.stage_record(content_type, data.len()).expect("stage record");
    flush_record(conn, engine, transport)
}

/// Open everything in the transport as one record body and return the content.
pub fn receive_record(
    conn: &mut TlsConnection,
    engine: &mut SoftwareCipherEngine,
    transport: &mut RingBuffer,
    content_type: ContentType,
) -> Result<Vec<u8>, TlsError> {
    let (opened, total) = {
        let (mut first, mut second) = transport.data_segments();
        let total = first.remaining() + second.remaining();
        (open_record(conn, engine, content_type, &mut first, &mut second, 0), total)
    };
    transport.consume(total).expect("consume transport");
    let record = opened?;
    assert_eq!(record.content_type, content_type);
    Ok(conn.rx_buffer()[record.offset..record.offset + record.len].to_vec())
}

fn hmac_sha256(secret: &[u8], data: &[&[u8]]) -> Vec<u8> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret).expect("any key length");
    for part in data {
        mac.update(part);
    }
    mac.finalize().into_bytes().to_vec()
}

/// RFC 5246 `P_SHA256`, computed without the engine.
pub fn reference_prf(secret: &[u8], label: &[u8], seed: &[u8], len: usize) -> Vec<u8> {
    let label_seed = [label, seed].concat();
    let mut a = label_seed.clone();
    let mut out = Vec::with_capacity(len + 32);
    while out.len() < len {
        a = hmac_sha256(secret, &[a.as_slice()]);
        out.extend_from_slice(&hmac_sha256(secret, &[a.as_slice(), label_seed.as_slice()]));
    }
    out.truncate(len);
    out
}

pub fn client_server_randoms() -> Vec<u8> {
    [CLIENT_RANDOM, SERVER_RANDOM].concat()
}

pub fn server_client_randoms() -> Vec<u8> {
    [SERVER_RANDOM, CLIENT_RANDOM].concat()
}
