//! Transmitting side of a PDCP entity.
//!
//! SDUs are assigned consecutive COUNT values, recorded in the TX window
//! with a per-SDU discard timer, protected on the crypto executor and
//! emitted to the lower layer strictly in COUNT order: completions land in
//! per-COUNT slots and a drain step walks `tx_trans_crypto` upward over
//! filled slots only. A guard timer skips slots whose completion was lost
//! so one dropped crypto task cannot stall the bearer.

use crate::config::{PdcpTxConfig, RbId, RbType, RlcMode};
use crate::crypto_token::{CryptoTokenManager, EventFlag};
use crate::executor::{Task, TaskExecutor};
use crate::interconnect::{
    RxStatusProvider, TxLowerNotifier, TxStatusHandler, TxUpperControlNotifier,
};
use crate::metrics::{MetricsAggregator, TxMetrics, TxMetricsSnapshot};
use crate::pdu::{write_data_pdu_header, StatusReport};
use crate::sn::{count_of, hfn_of, sn_of};
use crate::timers::{TimerManager, UniqueTimer};
use crate::window::{TxSduInfo, TxWindow};
use nr_security::{SecurityConfig, SecurityEngineTx, MAC_LEN};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// TX state variables (TS 38.323 Sec. 7.1 plus the two custom drain
/// cursors).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxState {
    /// COUNT of the next SDU to enqueue.
    pub tx_next: u32,
    /// Next COUNT awaiting a transmit notification from the lower layer.
    pub tx_trans: u32,
    /// Next COUNT awaiting completion of its crypto task.
    pub tx_trans_crypto: u32,
    /// Lower edge of the TX window: the oldest COUNT still tracked.
    pub tx_next_ack: u32,
}

enum TxAction {
    Pdu { pdu: Vec<u8>, is_retx: bool },
    DiscardPdu(u32),
    MaxCountReached,
    ProtocolFailure,
    Crypto { buf: Vec<u8>, count: u32, epoch: u64, engine: Option<Arc<SecurityEngineTx>> },
}

type TxActions = SmallVec<[TxAction; 4]>;

struct TxDeps {
    ue_index: u32,
    rb_id: RbId,
    cfg: PdcpTxConfig,
    lower: Arc<dyn TxLowerNotifier>,
    upper: Arc<dyn TxUpperControlNotifier>,
    dl_exec: Arc<dyn TaskExecutor>,
    crypto_exec: Arc<dyn TaskExecutor>,
    timers: TimerManager,
    metrics_agg: Arc<MetricsAggregator>,
    token_mngr: CryptoTokenManager,
}

struct TxInner {
    st: TxState,
    window: TxWindow,
    /// Completed crypto results awaiting in-order emission.
    crypto_slots: BTreeMap<u32, Vec<u8>>,
    desired_buffer_size: u64,
    engine: Option<Arc<SecurityEngineTx>>,
    integrity_enabled: bool,
    ciphering_enabled: bool,
    status_provider: Option<Arc<dyn RxStatusProvider>>,
    max_count_notified: bool,
    max_count_overflow: bool,
    crypto_enqueue_failed: bool,
    /// Bumped on every reset; stale crypto completions carry an old epoch.
    epoch: u64,
    stopped: bool,
    metrics: TxMetrics,
    crypto_reorder_timer: Option<UniqueTimer>,
    metrics_timer: Option<UniqueTimer>,
}

/// Handle to the TX half. Cloning shares the same entity; all state
/// transitions are expected to run on the bearer's DL executor.
#[derive(Clone)]
pub struct PdcpTx {
    inner: Arc<Mutex<TxInner>>,
    deps: Arc<TxDeps>,
}

impl PdcpTx {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ue_index: u32,
        rb_id: RbId,
        cfg: PdcpTxConfig,
        lower: Arc<dyn TxLowerNotifier>,
        upper: Arc<dyn TxUpperControlNotifier>,
        timers: TimerManager,
        dl_exec: Arc<dyn TaskExecutor>,
        crypto_exec: Arc<dyn TaskExecutor>,
        metrics_agg: Arc<MetricsAggregator>,
    ) -> Self {
        let deps = Arc::new(TxDeps {
            ue_index,
            rb_id,
            cfg,
            lower,
            upper,
            dl_exec,
            crypto_exec,
            timers,
            metrics_agg,
            token_mngr: CryptoTokenManager::new(),
        });
        let inner = Arc::new(Mutex::new(TxInner {
            st: TxState::default(),
            window: TxWindow::new(cfg.sn_size),
            crypto_slots: BTreeMap::new(),
            desired_buffer_size: 0,
            engine: None,
            integrity_enabled: false,
            ciphering_enabled: false,
            status_provider: None,
            max_count_notified: false,
            max_count_overflow: false,
            crypto_enqueue_failed: false,
            epoch: 0,
            stopped: false,
            metrics: TxMetrics::default(),
            crypto_reorder_timer: None,
            metrics_timer: None,
        }));
        let tx = Self { inner, deps };
        tx.init_timers();
        tx
    }

    fn init_timers(&self) {
        let mut reorder = self.deps.timers.create_timer();
        let handle = self.clone();
        let dl_exec = self.deps.dl_exec.clone();
        reorder.set(self.deps.cfg.crypto_reorder_timeout, move || {
            let h = handle.clone();
            if !dl_exec.execute(Box::new(move || h.handle_crypto_reorder_timeout())) {
                warn!("DL executor rejected crypto reorder timeout task");
            }
        });

        let metrics_timer = self.deps.cfg.metrics_period.map(|period| {
            let mut timer = self.deps.timers.create_timer();
            let handle = self.clone();
            let dl_exec = self.deps.dl_exec.clone();
            timer.set(period, move || {
                let h = handle.clone();
                if !dl_exec.execute(Box::new(move || h.push_metrics())) {
                    warn!("DL executor rejected metrics task");
                }
            });
            timer.run();
            timer
        });

        let mut inner = self.inner.lock();
        inner.crypto_reorder_timer = Some(reorder);
        inner.metrics_timer = metrics_timer;
    }

    /// Wires the status provider of the peer RX entity.
    pub fn set_status_provider(&self, provider: Arc<dyn RxStatusProvider>) {
        self.inner.lock().status_provider = Some(provider);
    }

    /// Replaces keys and algorithms; subsequent crypto uses the new
    /// configuration.
    pub fn configure_security(&self, sec_cfg: SecurityConfig, integrity: bool, ciphering: bool) {
        let mut inner = self.inner.lock();
        inner.integrity_enabled = integrity;
        inner.ciphering_enabled = ciphering;
        inner.engine = Some(Arc::new(SecurityEngineTx::new(
            sec_cfg,
            self.deps.rb_id.bearer_id(),
            self.deps.cfg.direction,
            integrity,
            ciphering,
        )));
        info!(ue = self.deps.ue_index, rb = %self.deps.rb_id,
              "configured TX security: NIA{:?} NEA{:?}", sec_cfg.integ_algo, sec_cfg.cipher_algo);
    }

    /// Accepts one SDU from the upper layer (TS 38.323 Sec. 5.2.1).
    pub fn handle_sdu(&self, sdu: Vec<u8>) {
        let actions = {
            let mut inner = self.inner.lock();
            self.handle_sdu_locked(&mut inner, sdu)
        };
        self.run_actions(actions);
    }

    fn handle_sdu_locked(&self, inner: &mut TxInner, sdu: Vec<u8>) -> TxActions {
        let mut actions = TxActions::new();
        if inner.stopped {
            return actions;
        }
        let cfg = &self.deps.cfg;
        let count = inner.st.tx_next;

        if count >= cfg.max_count.hard {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                  "reached hard maximum COUNT, dropping SDU");
            if !inner.max_count_overflow {
                inner.max_count_overflow = true;
                actions.push(TxAction::ProtocolFailure);
            }
            return actions;
        }
        if count >= cfg.max_count.notify && !inner.max_count_notified {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                  "approaching COUNT wrap-around");
            inner.max_count_notified = true;
            actions.push(TxAction::MaxCountReached);
        }

        if inner.st.tx_next.wrapping_sub(inner.st.tx_next_ack) >= cfg.sn_size.window_size() {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count, "TX window full, dropping SDU");
            inner.metrics.add_dropped_sdus(1);
            return actions;
        }
        if sdu.len() > crate::pdu::MAX_SDU_SIZE {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                  sdu_len = sdu.len(), "SDU exceeds maximum size, dropping");
            inner.metrics.add_dropped_sdus(1);
            return actions;
        }

        let sdu_len = sdu.len();
        let overhead = cfg.sn_size.hdr_len() + if inner.integrity_enabled { MAC_LEN } else { 0 };
        let pdu_size = (sdu_len + overhead) as u64;
        if inner.window.pdu_bytes(inner.integrity_enabled) + pdu_size > inner.desired_buffer_size {
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                   "RLC buffer budget exhausted, dropping SDU");
            inner.metrics.add_dropped_sdus(1);
            actions.push(TxAction::DiscardPdu(sn_of(count, cfg.sn_size)));
            return actions;
        }

        let discard_timer = cfg.discard_timer.duration().map(|duration| {
            let mut timer = self.deps.timers.create_timer();
            let handle = self.clone();
            let dl_exec = self.deps.dl_exec.clone();
            timer.set(duration, move || {
                let h = handle.clone();
                if !dl_exec.execute(Box::new(move || h.handle_discard_expiry(count))) {
                    warn!("DL executor rejected discard expiry task");
                }
            });
            timer.run();
            timer
        });

        // AM keeps the SDU for data recovery, UM for the reestablishment
        // flush; SRBs never retransmit.
        let keep_sdu = cfg.rb_type == RbType::Drb;
        let info = TxSduInfo {
            sdu: keep_sdu.then(|| sdu.clone()),
            discard_timer,
            sdu_len: sdu_len as u32,
            queued_at: Instant::now(),
        };
        if let Err(e) = inner.window.add_sdu(count, info) {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                  "could not store SDU in TX window: {e}");
            inner.metrics.add_dropped_sdus(1);
            return actions;
        }

        inner.metrics.add_sdus(1, sdu_len as u64);
        inner.st.tx_next = inner.st.tx_next.wrapping_add(1);

        let mut buf = Vec::with_capacity(pdu_size as usize);
        write_data_pdu_header(&mut buf, sn_of(count, cfg.sn_size), cfg.sn_size);
        buf.extend_from_slice(&sdu);
        debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count, sdu_len, "TX SDU queued");
        actions.push(TxAction::Crypto {
            buf,
            count,
            epoch: inner.epoch,
            engine: inner.engine.clone(),
        });
        actions
    }

    /// Lower layer confirmed transmission up to `sn` (first transmissions).
    pub fn handle_transmit_notification(&self, sn: u32) {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return;
        }
        let Some(count) = self.notification_count(&inner.st, sn) else {
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, sn,
                   "ignoring transmit notification outside TX window");
            return;
        };
        inner.st.tx_trans = count.wrapping_add(1);
        if self.deps.cfg.rlc_mode == RlcMode::Um {
            // UM bearers see no delivery notifications; the transmit
            // confirmation releases the window.
            self.release_up_to(&mut inner, count);
        }
    }

    /// Lower layer confirmed delivery up to `sn` (AM).
    pub fn handle_delivery_notification(&self, sn: u32) {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return;
        }
        let Some(count) = self.notification_count(&inner.st, sn) else {
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, sn,
                   "ignoring delivery notification outside TX window");
            return;
        };
        self.release_up_to(&mut inner, count);
    }

    /// Lower layer started retransmitting up to `sn` (AM).
    pub fn handle_retransmit_notification(&self, sn: u32) {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return;
        }
        let Some(count) = self.notification_count(&inner.st, sn) else {
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, sn,
                   "ignoring retransmit notification outside TX window");
            return;
        };
        inner.st.tx_trans = count.wrapping_add(1);
    }

    /// Lower layer confirmed delivery of retransmissions up to `sn` (AM).
    pub fn handle_delivery_retransmitted_notification(&self, sn: u32) {
        self.handle_delivery_notification(sn);
    }

    /// Updates the RLC buffer budget used for backpressure.
    pub fn handle_desired_buffer_size_notification(&self, desired_bs: u32) {
        let mut inner = self.inner.lock();
        inner.desired_buffer_size = desired_bs as u64;
        debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, desired_bs, "desired buffer size updated");
    }

    /// Consumes a status report (TS 38.323 Sec. 5.4.2): everything below
    /// FMC and every set bitmap bit is acknowledged and discarded.
    pub fn handle_status_report(&self, report: Vec<u8>) {
        let actions = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            let report = match StatusReport::parse(&report) {
                Ok(report) => report,
                Err(e) => {
                    warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, "invalid status report: {e}");
                    return;
                }
            };
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, fmc = report.fmc,
                   "processing status report");
            let mut actions = TxActions::new();
            let inner = &mut *inner;

            let below_fmc_end = report.fmc.min(inner.st.tx_next);
            let mut count = inner.st.tx_next_ack;
            while count < below_fmc_end {
                self.discard_entry(inner, count, &mut actions);
                count = count.wrapping_add(1);
            }
            for count in report.set_counts() {
                if count < inner.st.tx_next {
                    self.discard_entry(inner, count, &mut actions);
                }
            }
            self.advance_tx_next_ack(inner);
            actions
        };
        self.run_actions(actions);
    }

    /// Sends a status report compiled by the RX peer (TS 38.323 Sec. 5.4).
    pub fn send_status_report(&self) {
        let provider = self.inner.lock().status_provider.clone();
        let Some(provider) = provider else {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, "no status provider wired");
            return;
        };
        let report = provider.compile_status_report();
        {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            inner.metrics.add_pdus(1, report.len() as u64);
        }
        self.deps.lower.on_new_pdu(report, false);
    }

    /// Data recovery (TS 38.323 Sec. 5.5): send a status report, then
    /// retransmit everything still unacknowledged.
    pub fn data_recovery(&self) {
        if self.deps.cfg.rb_type != RbType::Drb || self.deps.cfg.rlc_mode != RlcMode::Am {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, "data recovery is only defined for AM DRBs");
            return;
        }
        self.send_status_report();
        let actions = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            self.retransmit_all_locked(&mut inner)
        };
        self.run_actions(actions);
    }

    /// Reestablishment (TS 38.323 Sec. 5.1.2).
    pub fn reestablish(&self, sec_cfg: SecurityConfig) {
        let actions = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            inner.engine = Some(Arc::new(SecurityEngineTx::new(
                sec_cfg,
                self.deps.rb_id.bearer_id(),
                self.deps.cfg.direction,
                inner.integrity_enabled,
                inner.ciphering_enabled,
            )));
            info!(ue = self.deps.ue_index, rb = %self.deps.rb_id, "reestablishing TX entity");

            match (self.deps.cfg.rb_type, self.deps.cfg.rlc_mode) {
                (RbType::Srb, _) => {
                    self.reset_locked(&mut inner);
                    TxActions::new()
                }
                (RbType::Drb, RlcMode::Um) => {
                    // SDUs already associated with a COUNT go out before the
                    // state is wiped.
                    let actions = self.flush_window_locked(&mut inner, false);
                    self.reset_locked(&mut inner);
                    actions
                }
                (RbType::Drb, RlcMode::Am) => {
                    let inner = &mut *inner;
                    inner.st.tx_trans = inner.st.tx_next_ack;
                    inner.epoch += 1;
                    inner.crypto_slots.clear();
                    inner.st.tx_trans_crypto = inner.st.tx_next;
                    if let Some(timer) = inner.crypto_reorder_timer.as_mut() {
                        timer.stop();
                    }
                    self.retransmit_all_locked(inner)
                }
            }
        };
        self.run_actions(actions);
    }

    /// Stops accepting SDUs and cancels the entity's timers. The crypto
    /// awaitable is set once every in-flight crypto task has returned.
    pub fn stop(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            inner.stopped = true;
            if let Some(timer) = inner.metrics_timer.as_mut() {
                timer.stop();
            }
            if let Some(timer) = inner.crypto_reorder_timer.as_mut() {
                timer.stop();
            }
            inner.window.stop_discard_timers();
        }
        self.deps.token_mngr.stop();
    }

    /// Set once all in-flight crypto has completed after [`stop`].
    ///
    /// [`stop`]: PdcpTx::stop
    pub fn crypto_awaitable(&self) -> &EventFlag {
        self.deps.token_mngr.awaitable()
    }

    pub fn get_state(&self) -> TxState {
        self.inner.lock().st
    }

    /// Resets the entity and installs the given state (testing and
    /// handover).
    pub fn set_state(&self, st: TxState) {
        let mut inner = self.inner.lock();
        self.reset_locked(&mut inner);
        inner.st = st;
        inner.window.set_lower_edge(st.tx_next_ack);
    }

    pub fn nof_pdus_in_window(&self) -> u32 {
        let inner = self.inner.lock();
        inner.st.tx_next.wrapping_sub(inner.st.tx_next_ack)
    }

    pub fn get_metrics_and_reset(&self) -> TxMetricsSnapshot {
        self.inner.lock().metrics.snapshot_and_reset()
    }

    /*
     * Internals. Everything below runs with the inner lock held and
     * reports outbound calls as actions so notifiers run unlocked.
     */

    fn run_actions(&self, actions: TxActions) {
        for action in actions {
            match action {
                TxAction::Pdu { pdu, is_retx } => self.deps.lower.on_new_pdu(pdu, is_retx),
                TxAction::DiscardPdu(sn) => self.deps.lower.on_discard_pdu(sn),
                TxAction::MaxCountReached => self.deps.upper.on_max_count_reached(),
                TxAction::ProtocolFailure => self.deps.upper.on_protocol_failure(),
                TxAction::Crypto { buf, count, epoch, engine } => {
                    self.dispatch_crypto(buf, count, epoch, engine)
                }
            }
        }
    }

    fn dispatch_crypto(
        &self,
        buf: Vec<u8>,
        count: u32,
        epoch: u64,
        engine: Option<Arc<SecurityEngineTx>>,
    ) {
        let token = self.deps.token_mngr.token();
        let latency = self.inner.lock().metrics.crypto_latency_handle();
        let handle = self.clone();
        let hdr_len = self.deps.cfg.sn_size.hdr_len();
        let dl_exec = self.deps.dl_exec.clone();
        let task: Task = Box::new(move || {
            let started = Instant::now();
            let pdu = match &engine {
                Some(engine) => engine.protect(buf, hdr_len, count),
                None => buf,
            };
            latency.fetch_add(
                started.elapsed().as_nanos() as u64,
                std::sync::atomic::Ordering::Relaxed,
            );
            let completion: Task = Box::new(move || {
                handle.handle_crypto_result(epoch, count, pdu);
                drop(token);
            });
            if !dl_exec.execute(completion) {
                warn!("DL executor queue full, dropping protected PDU");
            }
        });
        if !self.deps.crypto_exec.execute(task) {
            self.handle_crypto_enqueue_failure(count);
        }
    }

    fn handle_crypto_result(&self, epoch: u64, count: u32, pdu: Vec<u8>) {
        let actions = {
            let mut inner = self.inner.lock();
            let inner = &mut *inner;
            if inner.stopped || epoch != inner.epoch {
                debug!(count, "discarding stale crypto completion");
                return;
            }
            if count < inner.st.tx_trans_crypto {
                debug!(count, "crypto completion for an already drained slot");
                return;
            }
            inner.crypto_slots.insert(count, pdu);
            self.drain_crypto_slots(inner)
        };
        self.run_actions(actions);
    }

    fn handle_crypto_enqueue_failure(&self, count: u32) {
        let actions = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                  "crypto executor queue full, dropping SDU");
            inner.metrics.add_dropped_sdus(1);
            inner.window.remove_sdu(count);
            let mut actions = TxActions::new();
            if !inner.crypto_enqueue_failed {
                inner.crypto_enqueue_failed = true;
                actions.push(TxAction::ProtocolFailure);
            }
            actions
        };
        self.run_actions(actions);
    }

    /// Emits every consecutive completed slot starting at
    /// `tx_trans_crypto`; arms the guard timer while a gap remains.
    fn drain_crypto_slots(&self, inner: &mut TxInner) -> TxActions {
        let mut actions = TxActions::new();
        while let Some(pdu) = inner.crypto_slots.remove(&inner.st.tx_trans_crypto) {
            let count = inner.st.tx_trans_crypto;
            self.emit_pdu(inner, count, pdu, false, &mut actions);
            inner.st.tx_trans_crypto = inner.st.tx_trans_crypto.wrapping_add(1);
        }
        if let Some(timer) = inner.crypto_reorder_timer.as_mut() {
            if inner.crypto_slots.is_empty() {
                timer.stop();
            } else if !timer.is_running() {
                timer.run();
            }
        }
        actions
    }

    fn handle_crypto_reorder_timeout(&self) {
        let actions = {
            let mut inner = self.inner.lock();
            let inner = &mut *inner;
            if inner.stopped || inner.crypto_slots.is_empty() {
                return;
            }
            if let Some((&oldest, _)) = inner.crypto_slots.first_key_value() {
                if oldest > inner.st.tx_trans_crypto {
                    warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id,
                          from = inner.st.tx_trans_crypto, to = oldest,
                          "crypto completions missing, skipping ahead");
                    inner.st.tx_trans_crypto = oldest;
                }
            }
            self.drain_crypto_slots(inner)
        };
        self.run_actions(actions);
    }

    fn emit_pdu(
        &self,
        inner: &mut TxInner,
        count: u32,
        pdu: Vec<u8>,
        is_retx: bool,
        actions: &mut TxActions,
    ) {
        inner.metrics.add_pdus(1, pdu.len() as u64);
        if let Some(info) = inner.window.get(count) {
            inner
                .metrics
                .add_pdu_latency_ns(info.queued_at.elapsed().as_nanos() as u64);
        }
        actions.push(TxAction::Pdu { pdu, is_retx });
    }

    fn handle_discard_expiry(&self, count: u32) {
        let actions = {
            let mut inner = self.inner.lock();
            let inner = &mut *inner;
            if inner.stopped || !inner.window.has(count) {
                return;
            }
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count, "discard timer expired");
            inner.metrics.add_discard_timeouts(1);
            let mut actions = TxActions::new();
            self.discard_entry(inner, count, &mut actions);
            self.advance_tx_next_ack(inner);
            actions
        };
        self.run_actions(actions);
    }

    /// Removes one SDU from the window and tells the lower layer to drop
    /// the corresponding PDU.
    fn discard_entry(&self, inner: &mut TxInner, count: u32, actions: &mut TxActions) {
        if inner.window.remove_sdu(count).is_some() {
            actions.push(TxAction::DiscardPdu(sn_of(count, self.deps.cfg.sn_size)));
        }
    }

    /// Moves `tx_next_ack` past leading holes left by discards or
    /// acknowledgements.
    fn advance_tx_next_ack(&self, inner: &mut TxInner) {
        while inner.st.tx_next_ack != inner.st.tx_next && !inner.window.has(inner.st.tx_next_ack) {
            inner.st.tx_next_ack = inner.st.tx_next_ack.wrapping_add(1);
        }
        if inner.st.tx_trans < inner.st.tx_next_ack {
            inner.st.tx_trans = inner.st.tx_next_ack;
        }
        inner.window.set_lower_edge(inner.st.tx_next_ack);
    }

    /// Releases every window entry up to and including `count` and moves
    /// the window lower edge behind it.
    fn release_up_to(&self, inner: &mut TxInner, count: u32) {
        let mut c = inner.st.tx_next_ack;
        loop {
            inner.window.remove_sdu(c);
            if c == count {
                break;
            }
            c = c.wrapping_add(1);
        }
        inner.st.tx_next_ack = count.wrapping_add(1);
        if inner.st.tx_trans < inner.st.tx_next_ack {
            inner.st.tx_trans = inner.st.tx_next_ack;
        }
        inner.window.set_lower_edge(inner.st.tx_next_ack);
    }

    /// Recovers the COUNT for a lower-layer notification carrying only the
    /// SN. Notifications outside `[tx_next_ack, tx_next)` are ignored.
    fn notification_count(&self, st: &TxState, sn: u32) -> Option<u32> {
        let sn_size = self.deps.cfg.sn_size;
        let base = st.tx_next_ack;
        let mut count = count_of(hfn_of(base, sn_size), sn, sn_size);
        if count < base {
            count = count.wrapping_add(sn_size.cardinality());
        }
        (count < st.tx_next).then_some(count)
    }

    /// Protects and re-emits every SDU still held in the window, ascending
    /// in COUNT, as retransmissions.
    fn retransmit_all_locked(&self, inner: &mut TxInner) -> TxActions {
        self.flush_window_locked(inner, true)
    }

    fn flush_window_locked(&self, inner: &mut TxInner, is_retx: bool) -> TxActions {
        let cfg = &self.deps.cfg;
        let mut framed: Vec<(u32, Vec<u8>)> = Vec::new();
        let mut count = inner.st.tx_next_ack;
        while count != inner.st.tx_next {
            if let Some(info) = inner.window.get(count) {
                if let Some(sdu) = &info.sdu {
                    let mut buf = Vec::with_capacity(cfg.sn_size.hdr_len() + sdu.len() + MAC_LEN);
                    write_data_pdu_header(&mut buf, sn_of(count, cfg.sn_size), cfg.sn_size);
                    buf.extend_from_slice(sdu);
                    let pdu = match &inner.engine {
                        Some(engine) => engine.protect(buf, cfg.sn_size.hdr_len(), count),
                        None => buf,
                    };
                    framed.push((count, pdu));
                }
            }
            count = count.wrapping_add(1);
        }
        let mut actions = TxActions::new();
        for (count, pdu) in framed {
            self.emit_pdu(inner, count, pdu, is_retx, &mut actions);
        }
        actions
    }

    fn reset_locked(&self, inner: &mut TxInner) {
        inner.epoch += 1;
        inner.crypto_slots.clear();
        if let Some(timer) = inner.crypto_reorder_timer.as_mut() {
            timer.stop();
        }
        inner.window.clear();
        inner.window.set_lower_edge(0);
        inner.st = TxState::default();
        inner.max_count_notified = false;
        inner.max_count_overflow = false;
        inner.crypto_enqueue_failed = false;
    }

    fn push_metrics(&self) {
        let snapshot = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            let snapshot = inner.metrics.snapshot_and_reset();
            if let Some(timer) = inner.metrics_timer.as_mut() {
                timer.run();
            }
            snapshot
        };
        self.deps.metrics_agg.push_tx_metrics(snapshot);
    }
}

impl TxStatusHandler for PdcpTx {
    fn on_status_report(&self, report: Vec<u8>) {
        self.handle_status_report(report);
    }
}
