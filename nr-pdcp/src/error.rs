use thiserror::Error;

/// Errors raised on the PDCP data paths. All of them are recovered locally
/// by dropping the offending SDU/PDU and counting it; none are fatal for
/// the bearer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PdcpError {
    #[error("PDU too short for a data PDU header")]
    TruncatedHeader,
    #[error("malformed control PDU")]
    MalformedControlPdu,
    #[error("SDU window is full")]
    WindowFull,
    #[error("COUNT {0} outside the window")]
    OutsideWindow(u32),
    #[error("COUNT {0} already present in the window")]
    DuplicateCount(u32),
}
