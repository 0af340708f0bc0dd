//! The PDCP entity: one TX half and one RX half terminating a radio
//! bearer, wired together through the status interconnect.
//!
//! Both halves are owned here; the interconnect handles are cloned entity
//! handles, so there is no ownership cycle.

use crate::config::PdcpConfig;
use crate::crypto_token::EventFlag;
use crate::executor::TaskExecutor;
use crate::interconnect::{
    RxUpperControlNotifier, RxUpperDataNotifier, TxLowerNotifier, TxUpperControlNotifier,
};
use crate::metrics::{MetricsAggregator, MetricsNotifier};
use crate::rx::PdcpRx;
use crate::timers::TimerManager;
use crate::tx::PdcpTx;
use crate::config::RbId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Everything the entity needs from its host: notifiers implemented by
/// the surrounding adapters, the bearer's executors and its timer source.
pub struct PdcpEntityConfig {
    pub ue_index: u32,
    pub rb_id: RbId,
    pub config: PdcpConfig,
    pub tx_lower: Arc<dyn TxLowerNotifier>,
    pub tx_upper_control: Arc<dyn TxUpperControlNotifier>,
    pub rx_upper_data: Arc<dyn RxUpperDataNotifier>,
    pub rx_upper_control: Arc<dyn RxUpperControlNotifier>,
    pub timers: TimerManager,
    pub dl_exec: Arc<dyn TaskExecutor>,
    pub ul_exec: Arc<dyn TaskExecutor>,
    pub ctrl_exec: Arc<dyn TaskExecutor>,
    pub crypto_exec: Arc<dyn TaskExecutor>,
    pub metrics_notifier: Option<Arc<dyn MetricsNotifier>>,
}

pub struct PdcpEntity {
    tx: PdcpTx,
    rx: PdcpRx,
    stopped: Mutex<bool>,
}

impl PdcpEntity {
    pub fn new(cfg: PdcpEntityConfig) -> Self {
        let metrics_agg = MetricsAggregator::new(
            cfg.ue_index,
            cfg.rb_id,
            cfg.config.tx.metrics_period.unwrap_or(Duration::ZERO),
            cfg.metrics_notifier,
            cfg.ctrl_exec,
            true,
        );
        let tx = PdcpTx::new(
            cfg.ue_index,
            cfg.rb_id,
            cfg.config.tx,
            cfg.tx_lower,
            cfg.tx_upper_control,
            cfg.timers.clone(),
            cfg.dl_exec,
            cfg.crypto_exec.clone(),
            metrics_agg.clone(),
        );
        let rx = PdcpRx::new(
            cfg.ue_index,
            cfg.rb_id,
            cfg.config.rx,
            cfg.rx_upper_data,
            cfg.rx_upper_control,
            cfg.timers,
            cfg.ul_exec,
            cfg.crypto_exec,
            metrics_agg,
        );

        tx.set_status_provider(Arc::new(rx.clone()));
        rx.set_status_handler(Arc::new(tx.clone()));

        Self {
            tx,
            rx,
            stopped: Mutex::new(false),
        }
    }

    pub fn tx(&self) -> &PdcpTx {
        &self.tx
    }

    pub fn rx(&self) -> &PdcpRx {
        &self.rx
    }

    /// Stops both halves. Idempotent; afterwards the crypto awaitables
    /// report when all in-flight crypto has drained.
    pub fn stop(&self) {
        let mut stopped = self.stopped.lock();
        if *stopped {
            return;
        }
        *stopped = true;
        self.tx.stop();
        self.rx.stop();
    }

    pub fn tx_crypto_awaitable(&self) -> &EventFlag {
        self.tx.crypto_awaitable()
    }

    pub fn rx_crypto_awaitable(&self) -> &EventFlag {
        self.rx.crypto_awaitable()
    }
}

impl Drop for PdcpEntity {
    fn drop(&mut self) {
        self.stop();
    }
}
