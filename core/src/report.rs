// ## 📂 File: `src/report.rs`

//! report.rs
//! Error-reporting collaborator.
//!
//! - User errors: cryptographic failures that abort a connection, reported as
//!   `{function_id, error_id, connection_id}`.
//! - Development errors: internal-consistency violations that indicate a caller or
//!   configuration bug.
//!
//! Reports never carry key bytes or record contents.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::error;
use serde::{Deserialize, Serialize};

/// Operation that raised a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionId {
    StageRecord,
    EncryptRecord,
    DecryptRecord,
    VerifyRecord,
    SetAeadIv,
    ProtectAead,
    OpenAead,
    ProtectNull,
    OpenNull,
    Prf,
    DeriveKeys,
    PskPremaster,
    VerifyData,
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserErrorReport {
    pub function_id: FunctionId,
    pub error_id: u16,
    pub connection_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevErrorReport {
    pub function_id: FunctionId,
    pub connection_id: u16,
    pub detail: String,
}

pub trait ErrorReporter {
    fn report_user(&self, report: &UserErrorReport);
    fn report_dev(&self, report: &DevErrorReport);
}

/// Default reporter: forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report_user(&self, report: &UserErrorReport) {
        error!(
            "[conn {}] {} failed with error 0x{:04x}",
            report.connection_id, report.function_id, report.error_id
        );
    }

    fn report_dev(&self, report: &DevErrorReport) {
        error!(
            "[conn {}] internal consistency violation in {}: {}",
            report.connection_id, report.function_id, report.detail
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    User(UserErrorReport),
    Dev(DevErrorReport),
}

/// Collects reports in memory; clones share the same store.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn user_reports(&self) -> Vec<UserErrorReport> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::User(u) => Some(u),
                Report::Dev(_) => None,
            })
            .collect()
    }

    pub fn dev_reports(&self) -> Vec<DevErrorReport> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Dev(d) => Some(d),
                Report::User(_) => None,
            })
            .collect()
    }

    fn push(&self, report: Report) {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).push(report);
    }
}

impl ErrorReporter for MemoryReporter {
    fn report_user(&self, report: &UserErrorReport) {
        self.push(Report::User(report.clone()));
    }

    fn report_dev(&self, report: &DevErrorReport) {
        self.push(Report::Dev(report.clone()));
    }
}
