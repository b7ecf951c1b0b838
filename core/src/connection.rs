// ## 📂 File: `src/connection.rs`

//! connection.rs
//! Per-connection state shared by the record pipeline and the key deriver.
//!
//! Ownership:
//! - One task drives one connection; nothing here is synchronized.
//! - Plaintext staging (TLS Tx ring) and the Rx buffer are zeroized on drop.
//! - Key material never lives here; only the job/key bindings pointing into the engine.

use std::time::Instant;

use log::{debug, error, warn};
use zeroize::Zeroizing;

use crate::config::{CipherWorkerConfig, ConnectionConfig};
use crate::constants::{MAX_PLAINTEXT_LEN, RANDOM_LEN};
use crate::crypto::key_block::Role;
use crate::crypto::suites::{CipherSuite, SuiteParams};
use crate::keys::deriver::DerivationContext;
use crate::record::types::{AlertDescription, AlertLevel, BufferRequest, ContentType};
use crate::report::{DevErrorReport, ErrorReporter, FunctionId, LogReporter, UserErrorReport};
use crate::segment::RingBuffer;
use crate::telemetry::{Stage, StageTimes, TelemetryCounters, TelemetrySnapshot};
use crate::types::{InternalError, StepFailure, TlsError};

const CHANGE_CIPHER_SPEC_BODY: [u8; 1] = [1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Open,
    /// A fatal alert is queued for the peer; no further records are opened.
    AlertPending,
    Aborted,
}

/// Kind of work a record or key operation is about to do, for the status gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activity {
    Protect,
    Open,
    Keys,
}

/// Record staged for the next protect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRecord {
    pub content_type: ContentType,
    pub len: usize,
}

pub struct TlsConnection {
    pub(crate) id: u16,
    pub(crate) role: Role,
    pub(crate) suite: CipherSuite,
    pub(crate) params: SuiteParams,
    pub(crate) worker: CipherWorkerConfig,
    pub(crate) ecdh_field_len: usize,
    pub(crate) tls_tx: RingBuffer,
    pub(crate) rx_buffer: Zeroizing<Vec<u8>>,
    alert_buffer: [u8; 2],
    alert_queued: bool,
    pub(crate) tx_record: Option<PendingRecord>,
    pub(crate) tx_seq: u64,
    pub(crate) rx_seq: u64,
    pub(crate) client_random: [u8; RANDOM_LEN],
    pub(crate) server_random: [u8; RANDOM_LEN],
    pub(crate) derivation: DerivationContext,
    status: ConnectionStatus,
    pub(crate) telemetry: TelemetryCounters,
    pub(crate) stage_times: StageTimes,
    reporter: Box<dyn ErrorReporter + Send>,
}

impl TlsConnection {
    pub fn new(config: &ConnectionConfig) -> Result<Self, TlsError> {
        config.validate()?;
        let suite = config.suite()?;
        Ok(Self {
            id: config.connection_id,
            role: config.role,
            suite,
            params: suite.params(),
            worker: config.worker,
            ecdh_field_len: config.ecdh_field_len,
            tls_tx: RingBuffer::new(config.tls_buffer_size),
            rx_buffer: Zeroizing::new(vec![0u8; config.rx_buffer_size]),
            alert_buffer: [0u8; 2],
            alert_queued: false,
            tx_record: None,
            tx_seq: 0,
            rx_seq: 0,
            client_random: [0u8; RANDOM_LEN],
            server_random: [0u8; RANDOM_LEN],
            derivation: DerivationContext::default(),
            status: ConnectionStatus::Open,
            telemetry: TelemetryCounters::default(),
            stage_times: StageTimes::default(),
            reporter: Box::new(LogReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ErrorReporter + Send>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the TLS Tx ring, e.g. with one whose head sits near the wrap point.
    ///
    /// Only allowed while nothing is staged.
    pub fn with_tls_buffer(mut self, ring: RingBuffer) -> Result<Self, TlsError> {
        if !self.tls_tx.is_empty() || self.tx_record.is_some() {
            return Err(TlsError::Internal {
                function: FunctionId::StageRecord,
                detail: InternalError::InvalidState("tls buffer replaced while in use"),
            });
        }
        self.tls_tx = ring;
        Ok(self)
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    pub fn params(&self) -> SuiteParams {
        self.params
    }

    pub fn worker(&self) -> &CipherWorkerConfig {
        &self.worker
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn tx_seq(&self) -> u64 {
        self.tx_seq
    }

    pub fn rx_seq(&self) -> u64 {
        self.rx_seq
    }

    pub fn set_randoms(&mut self, client: &[u8; RANDOM_LEN], server: &[u8; RANDOM_LEN]) {
        self.client_random = *client;
        self.server_random = *server;
    }

    /// Reset both sequence numbers, as on a ChangeCipherSpec.
    pub fn reset_sequence_numbers(&mut self) {
        self.tx_seq = 0;
        self.rx_seq = 0;
    }

    pub fn rx_buffer(&self) -> &[u8] {
        &self.rx_buffer
    }

    pub fn rx_buffer_size(&self) -> usize {
        self.rx_buffer.len()
    }

    pub fn tls_buffer(&self) -> &RingBuffer {
        &self.tls_tx
    }

    pub fn derivation(&self) -> &DerivationContext {
        &self.derivation
    }

    pub fn pending_record(&self) -> Option<PendingRecord> {
        self.tx_record
    }

    /// Append outbound plaintext to the TLS Tx ring. A full ring is backpressure, not an error.
    pub fn write_plaintext(&mut self, data: &[u8]) -> Result<BufferRequest, TlsError> {
        let available = self.tls_tx.free();
        if data.len() > available {
            return Ok(BufferRequest::NeedMoreSpace { required: data.len(), available });
        }
        self.tls_tx
            .push(data)
            .map_err(|e| self.escalate(FunctionId::StageRecord, StepFailure::from(e)))?;
        Ok(BufferRequest::Complete { written: data.len() })
    }

    /// Mark the next `len` bytes of the TLS Tx ring (or the CCS body) as one record.
    pub fn stage_record(&mut self, content_type: ContentType, len: usize) -> Result<(), TlsError> {
        self.check_stage(content_type, len)
            .map_err(|f| self.escalate(FunctionId::StageRecord, f))?;
        self.tx_record = Some(PendingRecord { content_type, len });
        debug!("[conn {}] staged {:?} record of {} bytes", self.id, content_type, len);
        Ok(())
    }

    fn check_stage(&self, content_type: ContentType, len: usize) -> Result<(), StepFailure> {
        if self.tx_record.is_some() {
            return Err(InternalError::RecordPending.into());
        }
        if len > MAX_PLAINTEXT_LEN {
            return Err(InternalError::RecordTooLarge { len, max: MAX_PLAINTEXT_LEN }.into());
        }
        if content_type.uses_tls_buffer() {
            self.tls_tx.regions(len)?;
        } else if content_type != ContentType::ChangeCipherSpec || len != CHANGE_CIPHER_SPEC_BODY.len() {
            return Err(InternalError::InvalidState("alerts use stage_alert; change_cipher_spec is one byte").into());
        }
        Ok(())
    }

    /// Store an alert for transmission; `stage_alert` turns it into the next record.
    pub fn queue_alert(&mut self, level: AlertLevel, description: AlertDescription) {
        self.alert_buffer = [level.into(), description.into()];
        self.alert_queued = true;
    }

    pub fn queued_alert(&self) -> Option<[u8; 2]> {
        self.alert_queued.then_some(self.alert_buffer)
    }

    /// Stage the queued alert. Returns whether it was staged.
    ///
    /// Another staged record blocks it, except after a fatal alert: that alert replaces
    /// any record not yet protected, whose content stays unsent in the TLS ring.
    pub fn stage_alert(&mut self) -> bool {
        if !self.alert_queued {
            return false;
        }
        let fatal = self.status == ConnectionStatus::AlertPending;
        match self.tx_record {
            None => {}
            Some(pending) if fatal && pending.content_type != ContentType::Alert => {
                debug!("[conn {}] fatal alert replaces staged {:?} record", self.id, pending.content_type);
            }
            Some(_) => return false,
        }
        self.tx_record = Some(PendingRecord { content_type: ContentType::Alert, len: self.alert_buffer.len() });
        true
    }

    /// Content of a pending record as `(before_wrap, after_wrap)`.
    pub(crate) fn content_regions(&self, record: &PendingRecord) -> Result<(&[u8], &[u8]), StepFailure> {
        match record.content_type {
            ContentType::Alert => Ok((&self.alert_buffer[..], &[][..])),
            ContentType::ChangeCipherSpec => Ok((&CHANGE_CIPHER_SPEC_BODY[..], &[][..])),
            _ => Ok(self.tls_tx.regions(record.len)?),
        }
    }

    /// Reserve the sequence number for the next outbound record.
    pub(crate) fn next_tx_seq(&self) -> Result<u64, StepFailure> {
        self.tx_seq
            .checked_add(1)
            .map(|_| self.tx_seq)
            .ok_or(StepFailure::Internal(InternalError::SequenceExhausted))
    }

    pub(crate) fn next_rx_seq(&self) -> Result<u64, StepFailure> {
        self.rx_seq
            .checked_add(1)
            .map(|_| self.rx_seq)
            .ok_or(StepFailure::Internal(InternalError::SequenceExhausted))
    }

    /// Release a protected record: consume its content, advance the Tx sequence number.
    pub(crate) fn complete_tx_record(
        &mut self,
        record: &PendingRecord,
        written: usize,
        started: Instant,
    ) -> Result<(), StepFailure> {
        match record.content_type {
            ContentType::Handshake | ContentType::ApplicationData => self.tls_tx.consume(record.len)?,
            ContentType::Alert => self.alert_queued = false,
            ContentType::ChangeCipherSpec => {}
        }
        self.tx_record = None;
        self.tx_seq += 1;
        self.telemetry.add_protected(record.len, written);
        self.stage_times.add_since(Stage::Encrypt, started);
        Ok(())
    }

    pub(crate) fn complete_rx_record(&mut self, pt_len: usize, ct_len: usize, started: Instant) {
        self.rx_seq += 1;
        self.telemetry.add_opened(pt_len, ct_len);
        self.stage_times.add_since(Stage::Decrypt, started);
    }

    /// Refuse work the connection status no longer allows.
    ///
    /// - `Aborted`: every record and key operation is refused.
    /// - `AlertPending`: nothing is opened, and the only record that may be protected is
    ///   the queued alert.
    ///
    /// A refusal does not escalate, so the pending alert survives it.
    pub(crate) fn ensure_usable(&self, function: FunctionId, activity: Activity) -> Result<(), TlsError> {
        let refused = match (self.status, activity) {
            (ConnectionStatus::Open, _) => None,
            (ConnectionStatus::Aborted, _) => Some("connection aborted"),
            (ConnectionStatus::AlertPending, Activity::Open) => Some("fatal alert pending; records are no longer opened"),
            (ConnectionStatus::AlertPending, Activity::Protect) => match self.tx_record {
                Some(pending) if pending.content_type == ContentType::Alert => None,
                _ => Some("fatal alert pending; only the alert may be protected"),
            },
            (ConnectionStatus::AlertPending, Activity::Keys) => None,
        };
        match refused {
            None => Ok(()),
            Some(reason) => {
                warn!("[conn {}] {} refused: {}", self.id, function, reason);
                Err(TlsError::Internal { function, detail: InternalError::InvalidState(reason) })
            }
        }
    }

    /// Turn a step failure into the connection-level outcome.
    ///
    /// - Protocol: queue a fatal alert.
    /// - Crypto: user error report, abort.
    /// - Internal: development error report, abort.
    pub(crate) fn escalate(&mut self, function: FunctionId, failure: StepFailure) -> TlsError {
        match failure {
            StepFailure::Protocol(description) => {
                warn!("[conn {}] {} raised alert {:?}", self.id, function, description);
                self.queue_alert(AlertLevel::Fatal, description);
                self.telemetry.add_alert();
                if self.status == ConnectionStatus::Open {
                    self.status = ConnectionStatus::AlertPending;
                }
                TlsError::Protocol(description)
            }
            StepFailure::Crypto(fault) => {
                error!("[conn {}] {} cipher engine failure: {}", self.id, function, fault);
                self.reporter.report_user(&UserErrorReport {
                    function_id: function,
                    error_id: fault.code(),
                    connection_id: self.id,
                });
                self.telemetry.add_crypto_failure();
                self.status = ConnectionStatus::Aborted;
                TlsError::Crypto { function, connection: self.id, fault }
            }
            StepFailure::Internal(detail) => {
                error!("[conn {}] {} internal error: {}", self.id, function, detail);
                self.reporter.report_dev(&DevErrorReport {
                    function_id: function,
                    connection_id: self.id,
                    detail: detail.to_string(),
                });
                self.telemetry.add_internal_error();
                self.status = ConnectionStatus::Aborted;
                TlsError::Internal { function, detail }
            }
        }
    }

    pub fn telemetry(&self) -> &TelemetryCounters {
        &self.telemetry
    }

    pub fn stage_times(&self) -> &StageTimes {
        &self.stage_times
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from(self.id, &self.telemetry, &self.stage_times)
    }
}
