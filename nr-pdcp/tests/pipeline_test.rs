//! End-to-end pipeline with a real crypto worker pool: SDUs in, PDUs out
//! in strict COUNT order despite parallel crypto, then back through an RX
//! entity that restores in-order delivery.

use nr_pdcp::config::{
    DiscardTimer, MaxCount, PdcpConfig, PdcpRxConfig, PdcpTxConfig, RbId, RbType, RlcMode, SnSize,
    TReordering, DEFAULT_CRYPTO_REORDER_TIMEOUT,
};
use nr_pdcp::entity::{PdcpEntity, PdcpEntityConfig};
use nr_pdcp::executor::{InlineExecutor, ManualExecutor, WorkerPool};
use nr_pdcp::testing::{test_sec_cfg, RxTestFrame, TxTestFrame};
use nr_pdcp::timers::TimerManager;
use nr_pdcp::SecurityDirection;
use nr_security::SecurityDomain;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};

const NOF_SDUS: usize = 64;

fn config() -> PdcpConfig {
    PdcpConfig {
        tx: PdcpTxConfig {
            sn_size: SnSize::Size12Bits,
            rb_type: RbType::Drb,
            rlc_mode: RlcMode::Am,
            direction: SecurityDirection::Downlink,
            discard_timer: DiscardTimer::Infinity,
            status_report_required: true,
            max_count: MaxCount::default(),
            crypto_reorder_timeout: DEFAULT_CRYPTO_REORDER_TIMEOUT,
            metrics_period: None,
        },
        rx: PdcpRxConfig {
            sn_size: SnSize::Size12Bits,
            rb_type: RbType::Drb,
            rlc_mode: RlcMode::Am,
            direction: SecurityDirection::Downlink,
            t_reordering: TReordering::Ms(100),
            status_report_required: true,
            max_count: MaxCount::default(),
            metrics_period: None,
        },
    }
}

fn sdu(i: usize) -> Vec<u8> {
    let mut payload = vec![0u8; 64];
    payload[0] = i as u8;
    payload[1] = (i >> 8) as u8;
    payload
}

/// Drains `worker` until `done` holds or the deadline passes.
fn drain_until(worker: &ManualExecutor, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        worker.run_pending_tasks();
        assert!(Instant::now() < deadline, "timed out draining executor");
        std::thread::yield_now();
    }
}

#[test]
fn parallel_crypto_preserves_fifo_order_end_to_end() {
    let pool = WorkerPool::new("pdcp-crypto", 4, 1024);
    let tx_frame = Arc::new(TxTestFrame::default());
    let rx_frame = Arc::new(RxTestFrame::default());
    let dl_worker = Arc::new(ManualExecutor::new(4096));
    let ul_worker = Arc::new(ManualExecutor::new(4096));

    let entity = PdcpEntity::new(PdcpEntityConfig {
        ue_index: 0,
        rb_id: RbId::Drb(1),
        config: config(),
        tx_lower: tx_frame.clone(),
        tx_upper_control: tx_frame.clone(),
        rx_upper_data: rx_frame.clone(),
        rx_upper_control: rx_frame.clone(),
        timers: TimerManager::new(),
        dl_exec: dl_worker.clone(),
        ul_exec: ul_worker.clone(),
        ctrl_exec: Arc::new(InlineExecutor),
        crypto_exec: Arc::new(pool.executor()),
        metrics_notifier: None,
    });
    let sec_cfg = test_sec_cfg(SecurityDomain::Up);
    entity.tx().configure_security(sec_cfg, true, true);
    entity.rx().configure_security(sec_cfg, true, true);
    entity
        .tx()
        .handle_desired_buffer_size_notification(20 * (1 << 20));

    for i in 0..NOF_SDUS {
        entity.tx().handle_sdu(sdu(i));
    }
    drain_until(&dl_worker, || tx_frame.nof_pdus() == NOF_SDUS);

    // Emission is strictly FIFO even though four workers raced.
    let mut pdus = Vec::new();
    while let Some(pdu) = tx_frame.pop_pdu() {
        let sn = (((pdu[0] & 0x0f) as u32) << 8) | pdu[1] as u32;
        assert_eq!(sn as usize, pdus.len());
        pdus.push(pdu);
    }

    // Feed the PDUs back shuffled; the RX window restores COUNT order.
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    pdus.shuffle(&mut rng);
    for pdu in pdus {
        entity.rx().handle_pdu(pdu);
    }
    drain_until(&ul_worker, || rx_frame.nof_sdus() == NOF_SDUS);

    for i in 0..NOF_SDUS {
        assert_eq!(rx_frame.pop_sdu().unwrap(), sdu(i));
    }

    entity.stop();
    drain_until(&dl_worker, || entity.tx_crypto_awaitable().is_set());
    drain_until(&ul_worker, || entity.rx_crypto_awaitable().is_set());
    drop(entity);
}
