//! Per-half metrics and the bearer-level aggregator.
//!
//! Each half counts on its own executor; the only cross-thread counter is
//! the crypto processing latency, which workers add with a relaxed atomic.
//! Snapshots are pushed periodically and paired by a monotonically
//! increasing counter before one combined report goes to the notifier.

use crate::config::RbId;
use crate::executor::TaskExecutor;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Histogram bins for SDU/PDU latency, 2 us each, last bin open-ended.
pub const LATENCY_HIST_BINS: usize = 8;
pub const LATENCY_USEC_PER_BIN: u64 = 2;

fn hist_bin(latency_ns: u64) -> usize {
    let bin = latency_ns / (1000 * LATENCY_USEC_PER_BIN);
    (bin as usize).min(LATENCY_HIST_BINS - 1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxMetricsSnapshot {
    pub num_sdus: u32,
    pub num_sdu_bytes: u64,
    pub num_dropped_sdus: u32,
    pub num_pdus: u32,
    pub num_pdu_bytes: u64,
    pub num_discard_timeouts: u32,
    pub sum_pdu_latency_ns: u64,
    pub pdu_latency_hist: [u32; LATENCY_HIST_BINS],
    pub min_pdu_latency_ns: Option<u64>,
    pub max_pdu_latency_ns: Option<u64>,
    pub sum_crypto_processing_latency_ns: u64,
    pub counter: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RxMetricsSnapshot {
    pub num_sdus: u32,
    pub num_sdu_bytes: u64,
    pub num_pdus: u32,
    pub num_pdu_bytes: u64,
    pub num_data_pdus: u32,
    pub num_data_pdu_bytes: u64,
    pub num_dropped_pdus: u32,
    pub num_integrity_verified_pdus: u32,
    pub num_integrity_failed_pdus: u32,
    pub num_t_reordering_timeouts: u32,
    pub reordering_delay_us: u64,
    pub reordering_counter: u32,
    pub sum_sdu_latency_ns: u64,
    pub sdu_latency_hist: [u32; LATENCY_HIST_BINS],
    pub min_sdu_latency_ns: Option<u64>,
    pub max_sdu_latency_ns: Option<u64>,
    pub sum_crypto_processing_latency_ns: u64,
    pub counter: u32,
}

/// TX-side counters. Owned by the TX half and mutated on its executor.
pub struct TxMetrics {
    m: TxMetricsSnapshot,
    crypto_latency_ns: Arc<AtomicU64>,
    next_counter: u32,
}

impl Default for TxMetrics {
    fn default() -> Self {
        Self {
            m: TxMetricsSnapshot::default(),
            crypto_latency_ns: Arc::new(AtomicU64::new(0)),
            next_counter: 0,
        }
    }
}

impl TxMetrics {
    pub fn add_sdus(&mut self, n: u32, bytes: u64) {
        self.m.num_sdus += n;
        self.m.num_sdu_bytes += bytes;
    }

    pub fn add_dropped_sdus(&mut self, n: u32) {
        self.m.num_dropped_sdus += n;
    }

    pub fn add_pdus(&mut self, n: u32, bytes: u64) {
        self.m.num_pdus += n;
        self.m.num_pdu_bytes += bytes;
    }

    pub fn add_discard_timeouts(&mut self, n: u32) {
        self.m.num_discard_timeouts += n;
    }

    pub fn add_pdu_latency_ns(&mut self, latency_ns: u64) {
        self.m.sum_pdu_latency_ns += latency_ns;
        self.m.pdu_latency_hist[hist_bin(latency_ns)] += 1;
        self.m.min_pdu_latency_ns = Some(match self.m.min_pdu_latency_ns {
            Some(min) => min.min(latency_ns),
            None => latency_ns,
        });
        self.m.max_pdu_latency_ns = Some(self.m.max_pdu_latency_ns.unwrap_or(0).max(latency_ns));
    }

    /// Handle for crypto workers; added with relaxed ordering off-executor.
    pub fn crypto_latency_handle(&self) -> Arc<AtomicU64> {
        self.crypto_latency_ns.clone()
    }

    pub fn snapshot_and_reset(&mut self) -> TxMetricsSnapshot {
        let mut out = std::mem::take(&mut self.m);
        out.sum_crypto_processing_latency_ns = self.crypto_latency_ns.swap(0, Ordering::Relaxed);
        out.counter = self.next_counter;
        self.next_counter += 1;
        out
    }
}

/// RX-side counters. Owned by the RX half and mutated on its executor.
pub struct RxMetrics {
    m: RxMetricsSnapshot,
    crypto_latency_ns: Arc<AtomicU64>,
    next_counter: u32,
}

impl Default for RxMetrics {
    fn default() -> Self {
        Self {
            m: RxMetricsSnapshot::default(),
            crypto_latency_ns: Arc::new(AtomicU64::new(0)),
            next_counter: 0,
        }
    }
}

impl RxMetrics {
    pub fn add_sdus(&mut self, n: u32, bytes: u64) {
        self.m.num_sdus += n;
        self.m.num_sdu_bytes += bytes;
    }

    pub fn add_pdus(&mut self, n: u32, bytes: u64) {
        self.m.num_pdus += n;
        self.m.num_pdu_bytes += bytes;
    }

    pub fn add_data_pdus(&mut self, n: u32, bytes: u64) {
        self.m.num_data_pdus += n;
        self.m.num_data_pdu_bytes += bytes;
    }

    pub fn add_dropped_pdus(&mut self, n: u32) {
        self.m.num_dropped_pdus += n;
    }

    pub fn add_integrity_verified_pdus(&mut self, n: u32) {
        self.m.num_integrity_verified_pdus += n;
    }

    pub fn add_integrity_failed_pdus(&mut self, n: u32) {
        self.m.num_integrity_failed_pdus += n;
    }

    pub fn add_t_reordering_timeouts(&mut self, n: u32) {
        self.m.num_t_reordering_timeouts += n;
    }

    pub fn add_reordering_delay_us(&mut self, delay_us: u64) {
        self.m.reordering_delay_us += delay_us;
        self.m.reordering_counter += 1;
    }

    pub fn add_sdu_latency_ns(&mut self, latency_ns: u64) {
        self.m.sum_sdu_latency_ns += latency_ns;
        self.m.sdu_latency_hist[hist_bin(latency_ns)] += 1;
        self.m.min_sdu_latency_ns = Some(match self.m.min_sdu_latency_ns {
            Some(min) => min.min(latency_ns),
            None => latency_ns,
        });
        self.m.max_sdu_latency_ns = Some(self.m.max_sdu_latency_ns.unwrap_or(0).max(latency_ns));
    }

    pub fn crypto_latency_handle(&self) -> Arc<AtomicU64> {
        self.crypto_latency_ns.clone()
    }

    pub fn snapshot_and_reset(&mut self) -> RxMetricsSnapshot {
        let mut out = std::mem::take(&mut self.m);
        out.sum_crypto_processing_latency_ns = self.crypto_latency_ns.swap(0, Ordering::Relaxed);
        out.counter = self.next_counter;
        self.next_counter += 1;
        out
    }
}

/// Combined report for one bearer over one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsReport {
    pub ue_index: u32,
    pub rb_id: RbId,
    pub tx: TxMetricsSnapshot,
    pub rx: RxMetricsSnapshot,
    pub period: Duration,
}

pub trait MetricsNotifier: Send + Sync {
    fn report_metrics(&self, report: &MetricsReport);
}

struct AggState {
    tx: Option<TxMetricsSnapshot>,
    rx: Option<RxMetricsSnapshot>,
}

/// Buffers one snapshot per half and emits a combined report. All pushes
/// are funneled through the bearer's control executor so emission is
/// serialized.
pub struct MetricsAggregator {
    ue_index: u32,
    rb_id: RbId,
    period: Duration,
    paired: bool,
    notifier: Option<Arc<dyn MetricsNotifier>>,
    exec: Arc<dyn TaskExecutor>,
    state: Mutex<AggState>,
}

impl MetricsAggregator {
    pub fn new(
        ue_index: u32,
        rb_id: RbId,
        period: Duration,
        notifier: Option<Arc<dyn MetricsNotifier>>,
        exec: Arc<dyn TaskExecutor>,
        paired: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            ue_index,
            rb_id,
            period,
            paired,
            notifier,
            exec,
            state: Mutex::new(AggState { tx: None, rx: None }),
        })
    }

    pub fn push_tx_metrics(self: &Arc<Self>, m: TxMetricsSnapshot) {
        let agg = self.clone();
        if !self.exec.execute(Box::new(move || {
            agg.state.lock().tx = Some(m);
            agg.push_report();
        })) {
            tracing::error!(ue = self.ue_index, rb = %self.rb_id, "could not push TX metrics");
        }
    }

    pub fn push_rx_metrics(self: &Arc<Self>, m: RxMetricsSnapshot) {
        let agg = self.clone();
        if !self.exec.execute(Box::new(move || {
            agg.state.lock().rx = Some(m);
            agg.push_report();
        })) {
            tracing::error!(ue = self.ue_index, rb = %self.rb_id, "could not push RX metrics");
        }
    }

    fn push_report(&self) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let state = self.state.lock();
        let (Some(tx), Some(rx)) = (&state.tx, &state.rx) else {
            return;
        };
        if self.paired && tx.counter != rx.counter {
            return;
        }
        notifier.report_metrics(&MetricsReport {
            ue_index: self.ue_index,
            rb_id: self.rb_id,
            tx: tx.clone(),
            rx: rx.clone(),
            period: self.period,
        });
    }
}
