//! Per-bearer configuration. Everything here is read-only after the entity
//! has been created; reestablishment replaces the security configuration
//! but never these parameters.

use std::fmt;
use std::time::Duration;

pub use nr_security::SecurityDirection;

/// PDCP sequence number length (TS 38.323 Sec. 6.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnSize {
    Size12Bits,
    Size18Bits,
}

impl SnSize {
    pub fn bits(self) -> u32 {
        match self {
            SnSize::Size12Bits => 12,
            SnSize::Size18Bits => 18,
        }
    }

    /// Number of distinct sequence numbers.
    pub fn cardinality(self) -> u32 {
        1 << self.bits()
    }

    /// Half the SN space: the reordering / duplicate-detection window.
    pub fn window_size(self) -> u32 {
        1 << (self.bits() - 1)
    }

    /// Data PDU header length in bytes.
    pub fn hdr_len(self) -> usize {
        match self {
            SnSize::Size12Bits => 2,
            SnSize::Size18Bits => 3,
        }
    }
}

impl fmt::Display for SnSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RbType {
    Srb,
    Drb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlcMode {
    Um,
    Am,
}

/// Radio bearer identity. The 1-based identity is what RRC signals; the
/// 0-based `bearer_id` seeds integrity and ciphering (TS 33.501).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RbId {
    Srb(u8),
    Drb(u8),
}

impl RbId {
    pub fn bearer_id(self) -> u8 {
        match self {
            RbId::Srb(id) | RbId::Drb(id) => id - 1,
        }
    }

    pub fn is_srb(self) -> bool {
        matches!(self, RbId::Srb(_))
    }
}

impl fmt::Display for RbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RbId::Srb(id) => write!(f, "SRB{id}"),
            RbId::Drb(id) => write!(f, "DRB{id}"),
        }
    }
}

/// Per-SDU discard timer (TS 38.331 `discardTimer`): one of
/// ms{10,20,30,40,50,60,75,100,150,200,250,300,500,750,1500} or infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardTimer {
    Ms(u32),
    Infinity,
}

impl DiscardTimer {
    pub fn duration(self) -> Option<Duration> {
        match self {
            DiscardTimer::Ms(ms) => Some(Duration::from_millis(ms as u64)),
            DiscardTimer::Infinity => None,
        }
    }
}

/// Reordering timer (TS 38.331 `t-Reordering`): ms{0,10,20,…,3000} or
/// infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TReordering {
    Ms(u32),
    Infinity,
}

impl TReordering {
    pub fn duration(self) -> Option<Duration> {
        match self {
            TReordering::Ms(ms) => Some(Duration::from_millis(ms as u64)),
            TReordering::Infinity => None,
        }
    }
}

/// COUNT wrap-around guard: a soft notification threshold and a hard stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxCount {
    pub notify: u32,
    pub hard: u32,
}

pub const DEFAULT_MAX_COUNT_NOTIFY: u32 = 4_294_967_040;
pub const DEFAULT_MAX_COUNT_HARD: u32 = u32::MAX;

impl Default for MaxCount {
    fn default() -> Self {
        Self {
            notify: DEFAULT_MAX_COUNT_NOTIFY,
            hard: DEFAULT_MAX_COUNT_HARD,
        }
    }
}

/// Guard delay for the TX crypto drain: when the next COUNT slot stays
/// unfilled for this long the drain skips over it instead of stalling the
/// bearer behind a completion that will never arrive.
pub const DEFAULT_CRYPTO_REORDER_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdcpTxConfig {
    pub sn_size: SnSize,
    pub rb_type: RbType,
    pub rlc_mode: RlcMode,
    pub direction: SecurityDirection,
    pub discard_timer: DiscardTimer,
    pub status_report_required: bool,
    pub max_count: MaxCount,
    pub crypto_reorder_timeout: Duration,
    pub metrics_period: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdcpRxConfig {
    pub sn_size: SnSize,
    pub rb_type: RbType,
    pub rlc_mode: RlcMode,
    pub direction: SecurityDirection,
    pub t_reordering: TReordering,
    pub status_report_required: bool,
    pub max_count: MaxCount,
    pub metrics_period: Option<Duration>,
}

/// Full bearer configuration, one half each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdcpConfig {
    pub tx: PdcpTxConfig,
    pub rx: PdcpRxConfig,
}
