//! # NR PDCP
//!
//! The Packet Data Convergence Protocol entity of a 5G NR gNB
//! (TS 38.323). One entity terminates a single radio bearer (SRB or DRB)
//! and mediates between upper-layer SDUs and the RLC / F1-U below it.
//!
//! ## Architecture
//!
//! - **TX half** ([`PdcpTx`]): COUNT assignment, per-SDU discard timers,
//!   integrity protection and ciphering offloaded to a worker pool with a
//!   strictly in-order drain, RLC backpressure, status-report consumption
//!   and data recovery.
//! - **RX half** ([`PdcpRx`]): COUNT reconstruction, deciphering and
//!   verification, the `t-Reordering` window discipline, status-report
//!   compilation and in-order delivery.
//! - **Concurrency**: each half runs on its own task executor; crypto runs
//!   on a shared bounded worker pool and posts completions back, so the
//!   windows are only ever touched single-threaded. Crypto tokens let
//!   `stop()` expose an awaitable that fires when all in-flight work has
//!   drained.
//!
//! Timers (discard, reordering, metrics) are tick-driven via
//! [`TimerManager`], which keeps every expiry deterministic under test.

pub mod config;
pub mod crypto_token;
pub mod entity;
pub mod error;
pub mod executor;
pub mod interconnect;
pub mod metrics;
pub mod pdu;
pub mod rx;
pub mod sn;
pub mod testing;
pub mod timers;
pub mod tx;
pub mod window;

pub use config::{
    DiscardTimer, MaxCount, PdcpConfig, PdcpRxConfig, PdcpTxConfig, RbId, RbType, RlcMode, SnSize,
    TReordering,
};
pub use entity::{PdcpEntity, PdcpEntityConfig};
pub use error::PdcpError;
pub use executor::{InlineExecutor, ManualExecutor, TaskExecutor, WorkerPool, WorkerPoolExecutor};
pub use rx::{PdcpRx, RxState};
pub use timers::{TimerManager, UniqueTimer};
pub use tx::{PdcpTx, TxState};

pub use nr_security::{
    CipheringAlgorithm, IntegrityAlgorithm, SecurityConfig, SecurityDirection, SecurityDomain,
};
