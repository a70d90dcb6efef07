//! Error kinds.
//!
//! Configuration and resource errors are fatal and surface as `anyhow`
//! errors from `main`; protocol and crypto errors are non-fatal and are
//! recorded through the trace sink, with the offending session reset
//! locally by the caller.

use thiserror::Error;

/// Fatal at startup: bad CLI argument, unknown cluster, can't open a handle.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid argument for --{flag}: {value}")]
    InvalidArgument { flag: &'static str, value: String },

    #[error("too many --cluster arguments (max {max})")]
    TooManyClusters { max: usize },

    #[error("failed to open capture handle for cluster {cluster}: {reason}")]
    OpenHandle { cluster: String, reason: String },
}

/// Non-fatal: malformed A-field, Lc overrun, sequencing problems.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MacError {
    #[error("A-field shorter than a T-MUX header ({have} bytes)")]
    AFieldTooShort { have: usize },

    #[error("unrecognized MAC control message in tail")]
    UnknownMacControl,

    #[error("access-request on occupied slot {slot}")]
    SlotOccupied { slot: u8 },

    #[error("no TBC occupies slot {slot}")]
    NoSuchTbc { slot: u8 },

    #[error("duplex peer slot {slot} is occupied")]
    PeerSlotOccupied { slot: u8 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DlcError {
    #[error("Lc segment exceeds declared length: received {received} > lsig {lsig}")]
    Overrun { received: usize, lsig: u16 },

    #[error("Lc segment too short to contain a length-signal header")]
    MissingLsig,
}

/// Unexpected MM message given the PT's current procedure, or a crypto mismatch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MmError {
    #[error("MM procedure already in progress for this PT")]
    ProcedureBusy,

    #[error("MM message does not match any in-flight procedure")]
    UnexpectedMessage,

    #[error("authentication response mismatch (RES1 != RES)")]
    ResMismatch,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error(transparent)]
    Mac(#[from] MacError),
    #[error(transparent)]
    Dlc(#[from] DlcError),
    #[error(transparent)]
    Mm(#[from] MmError),
}
