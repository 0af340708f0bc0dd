//! Metrics tests: per-half counters, snapshot pairing in the aggregator
//! and the periodic report driven by the entity's timers.

use nr_pdcp::config::{
    DiscardTimer, MaxCount, PdcpConfig, PdcpRxConfig, PdcpTxConfig, RbId, RbType, RlcMode, SnSize,
    TReordering, DEFAULT_CRYPTO_REORDER_TIMEOUT,
};
use nr_pdcp::entity::{PdcpEntity, PdcpEntityConfig};
use nr_pdcp::executor::InlineExecutor;
use nr_pdcp::metrics::{MetricsAggregator, RxMetricsSnapshot, TxMetricsSnapshot};
use nr_pdcp::testing::{
    reference_pdu_sn12, test_sec_cfg, MetricsTestNotifier, RxTestFrame, TxTestFrame, SDU1,
};
use nr_pdcp::timers::TimerManager;
use nr_pdcp::SecurityDirection;
use nr_security::SecurityDomain;
use std::sync::Arc;
use std::time::Duration;

fn entity_config(sn_size: SnSize) -> PdcpConfig {
    PdcpConfig {
        tx: PdcpTxConfig {
            sn_size,
            rb_type: RbType::Drb,
            rlc_mode: RlcMode::Am,
            direction: SecurityDirection::Downlink,
            discard_timer: DiscardTimer::Ms(10),
            status_report_required: true,
            max_count: MaxCount::default(),
            crypto_reorder_timeout: DEFAULT_CRYPTO_REORDER_TIMEOUT,
            metrics_period: Some(Duration::from_millis(100)),
        },
        rx: PdcpRxConfig {
            sn_size,
            rb_type: RbType::Drb,
            rlc_mode: RlcMode::Am,
            direction: SecurityDirection::Downlink,
            t_reordering: TReordering::Ms(10),
            status_report_required: true,
            max_count: MaxCount::default(),
            metrics_period: Some(Duration::from_millis(100)),
        },
    }
}

struct EntityFixture {
    tx_frame: Arc<TxTestFrame>,
    rx_frame: Arc<RxTestFrame>,
    notifier: Arc<MetricsTestNotifier>,
    timers: TimerManager,
    entity: PdcpEntity,
}

fn setup_entity() -> EntityFixture {
    let tx_frame = Arc::new(TxTestFrame::default());
    let rx_frame = Arc::new(RxTestFrame::default());
    let notifier = Arc::new(MetricsTestNotifier::default());
    let timers = TimerManager::new();
    let entity = PdcpEntity::new(PdcpEntityConfig {
        ue_index: 7,
        rb_id: RbId::Drb(1),
        config: entity_config(SnSize::Size12Bits),
        tx_lower: tx_frame.clone(),
        tx_upper_control: tx_frame.clone(),
        rx_upper_data: rx_frame.clone(),
        rx_upper_control: rx_frame.clone(),
        timers: timers.clone(),
        dl_exec: Arc::new(InlineExecutor),
        ul_exec: Arc::new(InlineExecutor),
        ctrl_exec: Arc::new(InlineExecutor),
        crypto_exec: Arc::new(InlineExecutor),
        metrics_notifier: Some(notifier.clone()),
    });
    entity
        .tx()
        .handle_desired_buffer_size_notification(20 * (1 << 20));
    EntityFixture {
        tx_frame,
        rx_frame,
        notifier,
        timers,
        entity,
    }
}

#[test]
fn tx_counters_track_traffic() {
    let f = setup_entity();
    f.entity
        .tx()
        .configure_security(test_sec_cfg(SecurityDomain::Up), true, true);
    for _ in 0..4 {
        f.entity.tx().handle_sdu(SDU1.to_vec());
    }
    let m = f.entity.tx().get_metrics_and_reset();
    assert_eq!(m.num_sdus, 4);
    assert_eq!(m.num_sdu_bytes, 8);
    assert_eq!(m.num_pdus, 4);
    assert_eq!(m.num_pdu_bytes, 4 * 8);
    assert_eq!(m.num_dropped_sdus, 0);
    assert_eq!(m.pdu_latency_hist.iter().sum::<u32>(), 4);
    assert!(m.min_pdu_latency_ns.is_some());
    assert!(m.sum_crypto_processing_latency_ns > 0);
    assert_eq!(f.tx_frame.nof_pdus(), 4);
}

#[test]
fn rx_counters_track_traffic() {
    let f = setup_entity();
    f.entity
        .rx()
        .configure_security(test_sec_cfg(SecurityDomain::Up), true, true);
    f.entity.rx().handle_pdu(reference_pdu_sn12(0).unwrap());
    f.entity.rx().handle_pdu(reference_pdu_sn12(1).unwrap());
    // A duplicate on top.
    f.entity.rx().handle_pdu(reference_pdu_sn12(1).unwrap());
    let m = f.entity.rx().get_metrics_and_reset();
    assert_eq!(m.num_pdus, 3);
    assert_eq!(m.num_data_pdus, 3);
    assert_eq!(m.num_sdus, 2);
    assert_eq!(m.num_dropped_pdus, 1);
    assert_eq!(m.num_integrity_verified_pdus, 2);
    assert_eq!(m.sdu_latency_hist.iter().sum::<u32>(), 2);
    assert_eq!(f.rx_frame.nof_sdus(), 2);
}

#[test]
fn snapshot_counter_increases() {
    let f = setup_entity();
    let m0 = f.entity.tx().get_metrics_and_reset();
    let m1 = f.entity.tx().get_metrics_and_reset();
    assert_eq!(m0.counter, 0);
    assert_eq!(m1.counter, 1);
}

#[test]
fn aggregator_pairs_snapshots_by_counter() {
    let notifier = Arc::new(MetricsTestNotifier::default());
    let agg = MetricsAggregator::new(
        1,
        RbId::Drb(2),
        Duration::from_millis(100),
        Some(notifier.clone()),
        Arc::new(InlineExecutor),
        true,
    );

    let tx = TxMetricsSnapshot {
        counter: 0,
        ..Default::default()
    };
    agg.push_tx_metrics(tx);
    assert!(notifier.reports.lock().is_empty());

    let rx = RxMetricsSnapshot {
        counter: 0,
        ..Default::default()
    };
    agg.push_rx_metrics(rx);
    assert_eq!(notifier.reports.lock().len(), 1);

    // A mismatched pair stays buffered.
    agg.push_tx_metrics(TxMetricsSnapshot {
        counter: 1,
        ..Default::default()
    });
    assert_eq!(notifier.reports.lock().len(), 1);
    agg.push_rx_metrics(RxMetricsSnapshot {
        counter: 1,
        ..Default::default()
    });
    assert_eq!(notifier.reports.lock().len(), 2);

    let report = notifier.reports.lock()[0].clone();
    assert_eq!(report.ue_index, 1);
    assert_eq!(report.rb_id, RbId::Drb(2));
    assert_eq!(report.period, Duration::from_millis(100));
}

#[test]
fn periodic_timer_emits_combined_reports() {
    let f = setup_entity();
    f.entity.tx().handle_sdu(SDU1.to_vec());
    assert!(f.notifier.reports.lock().is_empty());

    f.timers.tick_many(100);
    {
        let reports = f.notifier.reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].ue_index, 7);
        assert_eq!(reports[0].tx.num_sdus, 1);
        assert_eq!(reports[0].tx.counter, reports[0].rx.counter);
    }

    f.timers.tick_many(100);
    assert_eq!(f.notifier.reports.lock().len(), 2);
}
