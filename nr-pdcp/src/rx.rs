//! Receiving side of a PDCP entity.
//!
//! PDUs are deciphered and verified on the crypto executor, then reordered
//! on the UL executor: the window buffers out-of-order COUNTs, `t-Reordering`
//! bounds how long delivery waits for a hole to close, and status reports
//! describe the window to the transmitting peer.

use crate::config::{PdcpRxConfig, RbId, RbType, RlcMode, TReordering};
use crate::crypto_token::{CryptoTokenManager, EventFlag};
use crate::executor::{Task, TaskExecutor};
use crate::interconnect::{CountInfo, RxStatusProvider, RxUpperControlNotifier, RxUpperDataNotifier, TxStatusHandler};
use crate::metrics::{MetricsAggregator, RxMetrics, RxMetricsSnapshot};
use crate::pdu::{
    control_pdu_header, control_pdu_type, dc_field, read_data_pdu_header, ControlPduType, DcField,
    MAX_CONTROL_PDU_SIZE, STATUS_REPORT_OVERHEAD,
};
use crate::sn::{count_of, hfn_of, rx_count_from_sn, sn_of};
use crate::timers::{TimerManager, UniqueTimer};
use crate::window::SduWindow;
use nr_security::{SecurityConfig, SecurityEngineRx, SecurityError};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// RX state variables (TS 38.323 Sec. 7.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxState {
    /// COUNT of the next PDU expected to be received.
    pub rx_next: u32,
    /// COUNT of the first SDU not yet delivered upward.
    pub rx_deliv: u32,
    /// COUNT following the PDU that triggered `t-Reordering`.
    pub rx_reord: u32,
}

struct RxSduInfo {
    sdu: Vec<u8>,
    time_of_arrival: Instant,
}

enum RxAction {
    Sdu(Vec<u8>),
    IntegrityFailure,
    MaxCountReached,
    ProtocolFailure,
    ForwardStatus(Vec<u8>),
    Crypto { buf: Vec<u8>, count: u32, time_of_arrival: Instant, epoch: u64, engine: Option<Arc<SecurityEngineRx>> },
}

type RxActions = SmallVec<[RxAction; 4]>;

struct RxDeps {
    ue_index: u32,
    rb_id: RbId,
    cfg: PdcpRxConfig,
    upper_dn: Arc<dyn RxUpperDataNotifier>,
    upper_cn: Arc<dyn RxUpperControlNotifier>,
    ul_exec: Arc<dyn TaskExecutor>,
    crypto_exec: Arc<dyn TaskExecutor>,
    timers: TimerManager,
    metrics_agg: Arc<MetricsAggregator>,
    token_mngr: CryptoTokenManager,
}

struct RxInner {
    st: RxState,
    window: SduWindow<RxSduInfo>,
    engine: Option<Arc<SecurityEngineRx>>,
    integrity_enabled: bool,
    ciphering_enabled: bool,
    status_handler: Option<Arc<dyn TxStatusHandler>>,
    reordering_timer: Option<UniqueTimer>,
    metrics_timer: Option<UniqueTimer>,
    max_count_notified: bool,
    max_count_overflow: bool,
    epoch: u64,
    stopped: bool,
    processing_stopped: bool,
    metrics: RxMetrics,
}

/// Handle to the RX half. Cloning shares the same entity; all state
/// transitions are expected to run on the bearer's UL executor.
#[derive(Clone)]
pub struct PdcpRx {
    inner: Arc<Mutex<RxInner>>,
    deps: Arc<RxDeps>,
}

impl PdcpRx {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ue_index: u32,
        rb_id: RbId,
        cfg: PdcpRxConfig,
        upper_dn: Arc<dyn RxUpperDataNotifier>,
        upper_cn: Arc<dyn RxUpperControlNotifier>,
        timers: TimerManager,
        ul_exec: Arc<dyn TaskExecutor>,
        crypto_exec: Arc<dyn TaskExecutor>,
        metrics_agg: Arc<MetricsAggregator>,
    ) -> Self {
        let deps = Arc::new(RxDeps {
            ue_index,
            rb_id,
            cfg,
            upper_dn,
            upper_cn,
            ul_exec,
            crypto_exec,
            timers,
            metrics_agg,
            token_mngr: CryptoTokenManager::new(),
        });
        let inner = Arc::new(Mutex::new(RxInner {
            st: RxState::default(),
            window: SduWindow::new(cfg.sn_size.window_size()),
            engine: None,
            integrity_enabled: false,
            ciphering_enabled: false,
            status_handler: None,
            reordering_timer: None,
            metrics_timer: None,
            max_count_notified: false,
            max_count_overflow: false,
            epoch: 0,
            stopped: false,
            processing_stopped: false,
            metrics: RxMetrics::default(),
        }));
        let rx = Self { inner, deps };
        rx.init_timers();
        rx
    }

    fn init_timers(&self) {
        let reordering_timer = match self.deps.cfg.t_reordering {
            TReordering::Ms(ms) if ms > 0 => {
                let mut timer = self.deps.timers.create_timer();
                let handle = self.clone();
                let ul_exec = self.deps.ul_exec.clone();
                timer.set(std::time::Duration::from_millis(ms as u64), move || {
                    let h = handle.clone();
                    if !ul_exec.execute(Box::new(move || h.handle_t_reordering_expire())) {
                        warn!("UL executor rejected t-Reordering expiry task");
                    }
                });
                Some(timer)
            }
            _ => None,
        };

        let metrics_timer = self.deps.cfg.metrics_period.map(|period| {
            let mut timer = self.deps.timers.create_timer();
            let handle = self.clone();
            let ul_exec = self.deps.ul_exec.clone();
            timer.set(period, move || {
                let h = handle.clone();
                if !ul_exec.execute(Box::new(move || h.push_metrics())) {
                    warn!("UL executor rejected metrics task");
                }
            });
            timer.run();
            timer
        });

        let mut inner = self.inner.lock();
        inner.reordering_timer = reordering_timer;
        inner.metrics_timer = metrics_timer;
    }

    /// Wires the status handler of the peer TX entity.
    pub fn set_status_handler(&self, handler: Arc<dyn TxStatusHandler>) {
        self.inner.lock().status_handler = Some(handler);
    }

    /// Replaces keys and algorithms; subsequent crypto uses the new
    /// configuration.
    pub fn configure_security(&self, sec_cfg: SecurityConfig, integrity: bool, ciphering: bool) {
        let mut inner = self.inner.lock();
        inner.integrity_enabled = integrity;
        inner.ciphering_enabled = ciphering;
        inner.engine = Some(Arc::new(SecurityEngineRx::new(
            sec_cfg,
            self.deps.rb_id.bearer_id(),
            self.deps.cfg.direction,
            integrity,
            ciphering,
        )));
        info!(ue = self.deps.ue_index, rb = %self.deps.rb_id,
              "configured RX security: NIA{:?} NEA{:?}", sec_cfg.integ_algo, sec_cfg.cipher_algo);
    }

    /// Accepts one PDU from the lower layer and dispatches on the D/C bit.
    pub fn handle_pdu(&self, buf: Vec<u8>) {
        let actions = {
            let mut inner = self.inner.lock();
            self.handle_pdu_locked(&mut inner, buf)
        };
        self.run_actions(actions);
    }

    fn handle_pdu_locked(&self, inner: &mut RxInner, buf: Vec<u8>) -> RxActions {
        let mut actions = RxActions::new();
        if inner.stopped {
            return actions;
        }
        if inner.processing_stopped {
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, "PDU processing is stopped, dropping PDU");
            inner.metrics.add_dropped_pdus(1);
            return actions;
        }
        if buf.is_empty() {
            inner.metrics.add_dropped_pdus(1);
            return actions;
        }
        inner.metrics.add_pdus(1, buf.len() as u64);
        match dc_field(buf[0]) {
            DcField::Control => self.handle_control_pdu_locked(inner, buf, &mut actions),
            DcField::Data => self.handle_data_pdu_locked(inner, buf, &mut actions),
        }
        actions
    }

    fn handle_control_pdu_locked(&self, inner: &mut RxInner, buf: Vec<u8>, actions: &mut RxActions) {
        match control_pdu_type(buf[0]) {
            Some(ControlPduType::StatusReport) => actions.push(RxAction::ForwardStatus(buf)),
            other => {
                debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, ?other,
                       "ignoring unhandled control PDU");
                inner.metrics.add_dropped_pdus(1);
            }
        }
    }

    fn handle_data_pdu_locked(&self, inner: &mut RxInner, buf: Vec<u8>, actions: &mut RxActions) {
        let cfg = &self.deps.cfg;
        inner.metrics.add_data_pdus(1, buf.len() as u64);

        let hdr = match read_data_pdu_header(&buf, cfg.sn_size) {
            Ok(hdr) => hdr,
            Err(e) => {
                warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, "dropping PDU: {e}");
                inner.metrics.add_dropped_pdus(1);
                return;
            }
        };
        let count = rx_count_from_sn(hdr.sn, inner.st.rx_deliv, cfg.sn_size);

        if count < inner.st.rx_deliv || inner.window.has(count) {
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count, "dropping duplicate PDU");
            inner.metrics.add_dropped_pdus(1);
            return;
        }
        if count >= cfg.max_count.hard {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                  "reached hard maximum COUNT, dropping PDU");
            if !inner.max_count_overflow {
                inner.max_count_overflow = true;
                actions.push(RxAction::ProtocolFailure);
            }
            inner.metrics.add_dropped_pdus(1);
            return;
        }
        if count >= cfg.max_count.notify && !inner.max_count_notified {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count, "approaching COUNT wrap-around");
            inner.max_count_notified = true;
            actions.push(RxAction::MaxCountReached);
        }

        debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, sn = hdr.sn, count, "RX data PDU");
        actions.push(RxAction::Crypto {
            buf,
            count,
            time_of_arrival: Instant::now(),
            epoch: inner.epoch,
            engine: inner.engine.clone(),
        });
    }

    fn dispatch_crypto(
        &self,
        buf: Vec<u8>,
        count: u32,
        time_of_arrival: Instant,
        epoch: u64,
        engine: Option<Arc<SecurityEngineRx>>,
    ) {
        let token = self.deps.token_mngr.token();
        let latency = self.inner.lock().metrics.crypto_latency_handle();
        let handle = self.clone();
        let hdr_len = self.deps.cfg.sn_size.hdr_len();
        let ul_exec = self.deps.ul_exec.clone();
        let task: Task = Box::new(move || {
            let started = Instant::now();
            let result = match &engine {
                Some(engine) => engine.unprotect(buf, hdr_len, count),
                None => Ok((buf, false)),
            };
            latency.fetch_add(
                started.elapsed().as_nanos() as u64,
                std::sync::atomic::Ordering::Relaxed,
            );
            let completion: Task = Box::new(move || {
                handle.handle_crypto_result(epoch, count, time_of_arrival, result);
                drop(token);
            });
            if !ul_exec.execute(completion) {
                warn!("UL executor queue full, dropping deciphered PDU");
            }
        });
        if !self.deps.crypto_exec.execute(task) {
            let mut inner = self.inner.lock();
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                  "crypto executor queue full, dropping PDU");
            inner.metrics.add_dropped_pdus(1);
        }
    }

    fn handle_crypto_result(
        &self,
        epoch: u64,
        count: u32,
        time_of_arrival: Instant,
        result: Result<(Vec<u8>, bool), SecurityError>,
    ) {
        let actions = {
            let mut inner = self.inner.lock();
            let inner = &mut *inner;
            if inner.stopped || epoch != inner.epoch {
                debug!(count, "discarding stale crypto completion");
                return;
            }
            let mut actions = RxActions::new();
            match result {
                Err(SecurityError::IntegrityFailure) => {
                    warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                          "integrity verification failed, dropping PDU");
                    inner.metrics.add_integrity_failed_pdus(1);
                    inner.metrics.add_dropped_pdus(1);
                    actions.push(RxAction::IntegrityFailure);
                }
                Err(e) => {
                    warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count, "dropping PDU: {e}");
                    inner.metrics.add_dropped_pdus(1);
                }
                Ok((buf, verified)) => {
                    if verified {
                        inner.metrics.add_integrity_verified_pdus(1);
                    }
                    let sdu = buf[self.deps.cfg.sn_size.hdr_len()..].to_vec();
                    self.apply_reordering(inner, count, sdu, time_of_arrival, &mut actions);
                }
            }
            actions
        };
        self.run_actions(actions);
    }

    /// Window update and in-order delivery (TS 38.323 Sec. 5.2.2.1).
    fn apply_reordering(
        &self,
        inner: &mut RxInner,
        count: u32,
        sdu: Vec<u8>,
        time_of_arrival: Instant,
        actions: &mut RxActions,
    ) {
        // State may have moved on while the PDU was in the crypto engine.
        if count < inner.st.rx_deliv || inner.window.has(count) {
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count, "dropping duplicate PDU");
            inner.metrics.add_dropped_pdus(1);
            return;
        }
        if let Err(e) = inner.window.add(
            count,
            RxSduInfo {
                sdu,
                time_of_arrival,
            },
        ) {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                  "could not store SDU in RX window: {e}");
            inner.metrics.add_dropped_pdus(1);
            return;
        }

        if count >= inner.st.rx_next {
            inner.st.rx_next = count.wrapping_add(1);
        }
        if count == inner.st.rx_deliv {
            self.deliver_consecutive(inner, actions);
        }

        let timer_running = inner
            .reordering_timer
            .as_ref()
            .is_some_and(|timer| timer.is_running());
        if timer_running && inner.st.rx_deliv >= inner.st.rx_reord {
            if let Some(timer) = inner.reordering_timer.as_mut() {
                timer.stop();
            }
        }
        let timer_running = inner
            .reordering_timer
            .as_ref()
            .is_some_and(|timer| timer.is_running());
        if !timer_running && inner.st.rx_deliv < inner.st.rx_next {
            match self.deps.cfg.t_reordering {
                TReordering::Ms(0) => {
                    // Zero reordering delay: deliver straight away, holes
                    // included.
                    inner.st.rx_reord = inner.st.rx_next;
                    self.flush_up_to_reord(inner, actions);
                }
                TReordering::Ms(_) => {
                    inner.st.rx_reord = inner.st.rx_next;
                    if let Some(timer) = inner.reordering_timer.as_mut() {
                        timer.run();
                    }
                }
                TReordering::Infinity => {}
            }
        }
    }

    fn deliver_consecutive(&self, inner: &mut RxInner, actions: &mut RxActions) {
        let mut next = inner.st.rx_deliv;
        let run: Vec<u32> = inner
            .window
            .ascending_from(next)
            .map(|(count, _)| count)
            .take_while(|count| {
                let consecutive = *count == next;
                next = next.wrapping_add(1);
                consecutive
            })
            .collect();
        for count in run {
            if let Some(info) = inner.window.remove(count) {
                self.deliver_sdu(inner, info, actions);
            }
            inner.st.rx_deliv = count.wrapping_add(1);
        }
        let edge = inner.st.rx_deliv;
        inner.window.set_lower_edge(edge);
    }

    /// Delivers everything below `rx_reord`, tolerating holes, then
    /// everything consecutive from there (t-Reordering semantics).
    fn flush_up_to_reord(&self, inner: &mut RxInner, actions: &mut RxActions) {
        let rx_reord = inner.st.rx_reord;
        let pending: Vec<u32> = inner
            .window
            .ascending_from(inner.st.rx_deliv)
            .map(|(count, _)| count)
            .take_while(|count| *count < rx_reord)
            .collect();
        for count in pending {
            if let Some(info) = inner.window.remove(count) {
                self.deliver_sdu(inner, info, actions);
            }
        }
        inner.st.rx_deliv = rx_reord;
        inner.window.set_lower_edge(rx_reord);
        self.deliver_consecutive(inner, actions);
    }

    fn deliver_sdu(&self, inner: &mut RxInner, info: RxSduInfo, actions: &mut RxActions) {
        let latency_ns = info.time_of_arrival.elapsed().as_nanos() as u64;
        inner.metrics.add_sdus(1, info.sdu.len() as u64);
        inner.metrics.add_sdu_latency_ns(latency_ns);
        inner.metrics.add_reordering_delay_us(latency_ns / 1000);
        actions.push(RxAction::Sdu(info.sdu));
    }

    fn handle_t_reordering_expire(&self) {
        let actions = {
            let mut inner = self.inner.lock();
            let inner = &mut *inner;
            if inner.stopped {
                return;
            }
            debug!(ue = self.deps.ue_index, rb = %self.deps.rb_id,
                   rx_reord = inner.st.rx_reord, "t-Reordering expired");
            inner.metrics.add_t_reordering_timeouts(1);
            let mut actions = RxActions::new();
            self.flush_up_to_reord(inner, &mut actions);
            if inner.st.rx_deliv < inner.st.rx_next {
                inner.st.rx_reord = inner.st.rx_next;
                if let Some(timer) = inner.reordering_timer.as_mut() {
                    timer.run();
                }
            }
            actions
        };
        self.run_actions(actions);
    }

    /// Compiles a status report for the TX peer (TS 38.323 Sec. 5.4.1):
    /// FMC plus a bitmap where a set bit marks a still-missing COUNT. The
    /// report is truncated to the control-PDU size cap.
    pub fn compile_status_report(&self) -> Vec<u8> {
        let inner = self.inner.lock();
        let mut buf = vec![control_pdu_header(ControlPduType::StatusReport)];
        buf.extend_from_slice(&inner.st.rx_deliv.to_be_bytes());

        if inner.st.rx_next != inner.st.rx_deliv {
            let max_bits = ((MAX_CONTROL_PDU_SIZE - STATUS_REPORT_OVERHEAD) * 8) as u32;
            let nof_bits = inner
                .st
                .rx_next
                .wrapping_sub(inner.st.rx_deliv)
                .wrapping_sub(1)
                .min(max_bits);
            if nof_bits > 0 {
                let nof_bytes = nof_bits.div_ceil(8) as usize;
                // Start from all-missing, then clear the bit of every
                // COUNT the window holds.
                let mut bitmap = vec![0xffu8; nof_bytes];
                let pad_bits = nof_bytes as u32 * 8 - nof_bits;
                if pad_bits > 0 {
                    bitmap[nof_bytes - 1] = 0xff << pad_bits;
                }
                let fmc = inner.st.rx_deliv;
                let end = fmc as u64 + 1 + nof_bits as u64;
                for (count, _) in inner.window.ascending_from(fmc.wrapping_add(1)) {
                    if (count as u64) >= end {
                        break;
                    }
                    let i = count - fmc - 1;
                    bitmap[(i / 8) as usize] &= !(0x80 >> (i % 8));
                }
                buf.extend_from_slice(&bitmap);
            }
        }
        buf
    }

    /// Reestablishment (TS 38.323 Sec. 5.1.2).
    pub fn reestablish(&self, sec_cfg: SecurityConfig) {
        let actions = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            inner.engine = Some(Arc::new(SecurityEngineRx::new(
                sec_cfg,
                self.deps.rb_id.bearer_id(),
                self.deps.cfg.direction,
                inner.integrity_enabled,
                inner.ciphering_enabled,
            )));
            info!(ue = self.deps.ue_index, rb = %self.deps.rb_id, "reestablishing RX entity");

            let inner = &mut *inner;
            match (self.deps.cfg.rb_type, self.deps.cfg.rlc_mode) {
                (RbType::Srb, _) => {
                    self.reset_locked(inner);
                    RxActions::new()
                }
                (RbType::Drb, RlcMode::Um) => {
                    // Whatever sits in the window goes up before the state
                    // is wiped, out-of-order included.
                    let mut actions = RxActions::new();
                    let pending: Vec<u32> = inner
                        .window
                        .ascending_from(inner.st.rx_deliv)
                        .map(|(count, _)| count)
                        .collect();
                    for count in pending {
                        if let Some(info) = inner.window.remove(count) {
                            self.deliver_sdu(inner, info, &mut actions);
                        }
                    }
                    self.reset_locked(inner);
                    actions
                }
                // AM keeps state, window and a running t-Reordering.
                (RbType::Drb, RlcMode::Am) => RxActions::new(),
            }
        };
        self.run_actions(actions);
    }

    /// Stops accepting PDUs and cancels the entity's timers. The crypto
    /// awaitable is set once every in-flight crypto task has returned.
    pub fn stop(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            inner.stopped = true;
            if let Some(timer) = inner.reordering_timer.as_mut() {
                timer.stop();
            }
            if let Some(timer) = inner.metrics_timer.as_mut() {
                timer.stop();
            }
        }
        self.deps.token_mngr.stop();
    }

    /// Set once all in-flight crypto has completed after [`stop`].
    ///
    /// [`stop`]: PdcpRx::stop
    pub fn crypto_awaitable(&self) -> &EventFlag {
        self.deps.token_mngr.awaitable()
    }

    /// RX COUNT for handover status transfer.
    pub fn get_count(&self) -> CountInfo {
        let inner = self.inner.lock();
        CountInfo {
            hfn: hfn_of(inner.st.rx_deliv, self.deps.cfg.sn_size),
            sn: sn_of(inner.st.rx_deliv, self.deps.cfg.sn_size),
        }
    }

    /// Installs the COUNT received in a handover status transfer.
    pub fn set_count(&self, count_info: CountInfo) {
        let mut inner = self.inner.lock();
        let count = count_of(count_info.hfn, count_info.sn, self.deps.cfg.sn_size);
        if inner.st != RxState::default() {
            warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count,
                  "status transfer applied to bearer with non-zero state");
        }
        self.reset_locked(&mut inner);
        inner.st = RxState {
            rx_next: count,
            rx_deliv: count,
            rx_reord: count,
        };
        inner.window.set_lower_edge(count);
        info!(ue = self.deps.ue_index, rb = %self.deps.rb_id, count, "RX state installed");
    }

    /// Gate used by the CU-CP during mobility: incoming PDUs are dropped
    /// until processing is restarted.
    pub fn notify_pdu_processing_stopped(&self) {
        self.inner.lock().processing_stopped = true;
        info!(ue = self.deps.ue_index, rb = %self.deps.rb_id, "PDU processing stopped");
    }

    pub fn restart_pdu_processing(&self) {
        self.inner.lock().processing_stopped = false;
        info!(ue = self.deps.ue_index, rb = %self.deps.rb_id, "PDU processing restarted");
    }

    pub fn get_state(&self) -> RxState {
        self.inner.lock().st
    }

    /// Resets the entity and installs the given state (testing and
    /// handover).
    pub fn set_state(&self, st: RxState) {
        let mut inner = self.inner.lock();
        self.reset_locked(&mut inner);
        inner.st = st;
        inner.window.set_lower_edge(st.rx_deliv);
    }

    pub fn is_reordering_timer_running(&self) -> bool {
        self.inner
            .lock()
            .reordering_timer
            .as_ref()
            .is_some_and(|timer| timer.is_running())
    }

    pub fn get_metrics_and_reset(&self) -> RxMetricsSnapshot {
        self.inner.lock().metrics.snapshot_and_reset()
    }

    fn reset_locked(&self, inner: &mut RxInner) {
        inner.epoch += 1;
        inner.window.clear();
        inner.window.set_lower_edge(0);
        inner.st = RxState::default();
        if let Some(timer) = inner.reordering_timer.as_mut() {
            timer.stop();
        }
        inner.max_count_notified = false;
        inner.max_count_overflow = false;
    }

    fn run_actions(&self, actions: RxActions) {
        for action in actions {
            match action {
                RxAction::Sdu(sdu) => self.deps.upper_dn.on_new_sdu(sdu),
                RxAction::IntegrityFailure => self.deps.upper_cn.on_integrity_failure(),
                RxAction::MaxCountReached => self.deps.upper_cn.on_max_count_reached(),
                RxAction::ProtocolFailure => self.deps.upper_cn.on_protocol_failure(),
                RxAction::ForwardStatus(report) => {
                    let handler = self.inner.lock().status_handler.clone();
                    match handler {
                        Some(handler) => handler.on_status_report(report),
                        None => warn!(ue = self.deps.ue_index, rb = %self.deps.rb_id,
                                      "no status handler wired, dropping status report"),
                    }
                }
                RxAction::Crypto { buf, count, time_of_arrival, epoch, engine } => {
                    self.dispatch_crypto(buf, count, time_of_arrival, epoch, engine)
                }
            }
        }
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
        self.deps.metrics_agg.push_rx_metrics(snapshot);
    }
}

impl RxStatusProvider for PdcpRx {
    fn compile_status_report(&self) -> Vec<u8> {
        PdcpRx::compile_status_report(self)
    }
}
