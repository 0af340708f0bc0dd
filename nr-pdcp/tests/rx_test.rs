//! RX entity tests: in-order and out-of-order reception, t-Reordering in
//! all its configurations, integrity failures and the COUNT wrap-around
//! limits.

use nr_pdcp::config::{MaxCount, PdcpRxConfig, RbId, RbType, RlcMode, SnSize, TReordering};
use nr_pdcp::executor::InlineExecutor;
use nr_pdcp::interconnect::CountInfo;
use nr_pdcp::metrics::MetricsAggregator;
use nr_pdcp::pdu::write_data_pdu_header;
use nr_pdcp::rx::{PdcpRx, RxState};
use nr_pdcp::sn::sn_of;
use nr_pdcp::testing::{reference_pdu_sn12, reference_pdu_sn18, test_sec_cfg, RxTestFrame, SDU1};
use nr_pdcp::timers::TimerManager;
use nr_pdcp::SecurityDirection;
use nr_security::SecurityDomain;
use std::sync::Arc;

struct RxFixture {
    frame: Arc<RxTestFrame>,
    timers: TimerManager,
    rx: PdcpRx,
}

fn rx_config(sn_size: SnSize) -> PdcpRxConfig {
    PdcpRxConfig {
        sn_size,
        rb_type: RbType::Drb,
        rlc_mode: RlcMode::Am,
        direction: SecurityDirection::Downlink,
        t_reordering: TReordering::Ms(10),
        status_report_required: true,
        max_count: MaxCount::default(),
        metrics_period: None,
    }
}

fn setup(cfg: PdcpRxConfig) -> RxFixture {
    let frame = Arc::new(RxTestFrame::default());
    let timers = TimerManager::new();
    let agg = MetricsAggregator::new(
        0,
        RbId::Drb(1),
        std::time::Duration::ZERO,
        None,
        Arc::new(InlineExecutor),
        false,
    );
    let rx = PdcpRx::new(
        0,
        RbId::Drb(1),
        cfg,
        frame.clone(),
        frame.clone(),
        timers.clone(),
        Arc::new(InlineExecutor),
        Arc::new(InlineExecutor),
        agg,
    );
    rx.set_status_handler(frame.clone());
    RxFixture { frame, timers, rx }
}

fn secured(cfg: PdcpRxConfig) -> RxFixture {
    let f = setup(cfg);
    f.rx
        .configure_security(test_sec_cfg(SecurityDomain::Up), true, true);
    f
}

fn state_at(count: u32) -> RxState {
    RxState {
        rx_next: count,
        rx_deliv: count,
        rx_reord: 0,
    }
}

/// Plaintext data PDU for entities without a security configuration.
fn plain_pdu(count: u32, sn_size: SnSize, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_data_pdu_header(&mut buf, sn_of(count, sn_size), sn_size);
    buf.extend_from_slice(payload);
    buf
}

#[test]
fn rx_in_order_12bit() {
    for count in [0u32, 2047, 4095] {
        let f = secured(rx_config(SnSize::Size12Bits));
        f.rx.set_state(state_at(count));
        f.rx.handle_pdu(reference_pdu_sn12(count).unwrap());
        assert_eq!(f.frame.nof_sdus(), 1, "count={count}");
        f.rx.handle_pdu(reference_pdu_sn12(count + 1).unwrap());
        assert_eq!(f.frame.nof_sdus(), 2);
        while let Some(sdu) = f.frame.pop_sdu() {
            assert_eq!(sdu, SDU1);
        }
    }
}

#[test]
fn rx_in_order_18bit() {
    for count in [0u32, 131071, 262143] {
        let f = secured(rx_config(SnSize::Size18Bits));
        f.rx.set_state(state_at(count));
        f.rx.handle_pdu(reference_pdu_sn18(count).unwrap());
        f.rx.handle_pdu(reference_pdu_sn18(count + 1).unwrap());
        assert_eq!(f.frame.nof_sdus(), 2, "count={count}");
        while let Some(sdu) = f.frame.pop_sdu() {
            assert_eq!(sdu, SDU1);
        }
    }
}

#[test]
fn rx_out_of_order_delivers_on_hole_close() {
    let f = secured(rx_config(SnSize::Size12Bits));

    f.rx.handle_pdu(reference_pdu_sn12(2).unwrap());
    assert_eq!(f.frame.nof_sdus(), 0);
    let st = f.rx.get_state();
    assert_eq!(st.rx_next, 3);
    assert_eq!(st.rx_reord, 3);
    assert!(f.rx.is_reordering_timer_running());

    f.rx.handle_pdu(reference_pdu_sn12(1).unwrap());
    assert_eq!(f.frame.nof_sdus(), 0);
    // rx_reord is pinned while the timer runs.
    assert_eq!(f.rx.get_state().rx_reord, 3);

    f.rx.handle_pdu(reference_pdu_sn12(0).unwrap());
    assert_eq!(f.frame.nof_sdus(), 3);
    assert!(!f.rx.is_reordering_timer_running());
    assert_eq!(f.rx.get_state().rx_deliv, 3);
}

#[test]
fn rx_duplicate_is_dropped() {
    let f = secured(rx_config(SnSize::Size12Bits));
    f.rx.handle_pdu(reference_pdu_sn12(0).unwrap());
    f.rx.handle_pdu(reference_pdu_sn12(0).unwrap());
    assert_eq!(f.frame.nof_sdus(), 1);
    let m = f.rx.get_metrics_and_reset();
    assert_eq!(m.num_dropped_pdus, 1);
}

#[test]
fn t_reordering_expiry_flushes_past_hole() {
    let f = secured(rx_config(SnSize::Size12Bits));
    f.rx.handle_pdu(reference_pdu_sn12(1).unwrap());
    assert_eq!(f.frame.nof_sdus(), 0);

    // One tick short of expiry: nothing delivered yet.
    f.timers.tick_many(9);
    assert_eq!(f.frame.nof_sdus(), 0);
    f.timers.tick_many(1);
    assert_eq!(f.frame.nof_sdus(), 1);
    let st = f.rx.get_state();
    assert_eq!(st.rx_deliv, 2);
    let m = f.rx.get_metrics_and_reset();
    assert_eq!(m.num_t_reordering_timeouts, 1);

    // The late PDU for COUNT 0 is now stale.
    f.rx.handle_pdu(reference_pdu_sn12(0).unwrap());
    assert_eq!(f.frame.nof_sdus(), 1);
    let m = f.rx.get_metrics_and_reset();
    assert_eq!(m.num_dropped_pdus, 1);
}

#[test]
fn t_reordering_restarts_while_holes_remain() {
    let f = setup(rx_config(SnSize::Size12Bits));
    f.rx.handle_pdu(plain_pdu(1, SnSize::Size12Bits, &SDU1));
    f.rx.handle_pdu(plain_pdu(3, SnSize::Size12Bits, &SDU1));
    assert_eq!(f.rx.get_state().rx_reord, 2);

    // First expiry flushes up to the trigger and rearms for the next hole.
    f.timers.tick_many(10);
    assert_eq!(f.frame.nof_sdus(), 1);
    assert_eq!(f.rx.get_state().rx_deliv, 2);
    assert_eq!(f.rx.get_state().rx_reord, 4);
    assert!(f.rx.is_reordering_timer_running());

    f.timers.tick_many(10);
    assert_eq!(f.frame.nof_sdus(), 2);
    assert_eq!(f.rx.get_state().rx_deliv, 4);
    assert!(!f.rx.is_reordering_timer_running());
    let m = f.rx.get_metrics_and_reset();
    assert_eq!(m.num_t_reordering_timeouts, 2);
}

#[test]
fn t_reordering_zero_delivers_immediately() {
    let mut cfg = rx_config(SnSize::Size12Bits);
    cfg.t_reordering = TReordering::Ms(0);
    let f = secured(cfg);
    f.rx.handle_pdu(reference_pdu_sn12(1).unwrap());
    // Out of order, but delivered straight away.
    assert_eq!(f.frame.nof_sdus(), 1);
    assert_eq!(f.rx.get_state().rx_deliv, 2);
    f.rx.handle_pdu(reference_pdu_sn12(0).unwrap());
    assert_eq!(f.frame.nof_sdus(), 1);
}

#[test]
fn t_reordering_infinity_waits_for_holes() {
    let mut cfg = rx_config(SnSize::Size12Bits);
    cfg.t_reordering = TReordering::Infinity;
    let f = secured(cfg);
    f.rx.handle_pdu(reference_pdu_sn12(1).unwrap());
    f.timers.tick_many(6000);
    assert_eq!(f.frame.nof_sdus(), 0);
    assert!(!f.rx.is_reordering_timer_running());

    f.rx.handle_pdu(reference_pdu_sn12(0).unwrap());
    assert_eq!(f.frame.nof_sdus(), 2);
}

#[test]
fn integrity_failure_drops_pdu_and_notifies() {
    let f = secured(rx_config(SnSize::Size12Bits));
    let mut pdu = reference_pdu_sn12(0).unwrap();
    let last = pdu.len() - 1;
    pdu[last] ^= 0x01;
    f.rx.handle_pdu(pdu);
    assert_eq!(f.frame.nof_sdus(), 0);
    assert_eq!(*f.frame.nof_integrity_failure.lock(), 1);
    let m = f.rx.get_metrics_and_reset();
    assert_eq!(m.num_integrity_failed_pdus, 1);
    assert_eq!(m.num_dropped_pdus, 1);
}

#[test]
fn truncated_header_is_dropped() {
    let f = setup(rx_config(SnSize::Size18Bits));
    f.rx.handle_pdu(vec![0x80, 0x00]);
    assert_eq!(f.frame.nof_sdus(), 0);
    let m = f.rx.get_metrics_and_reset();
    assert_eq!(m.num_dropped_pdus, 1);
}

#[test]
fn count_wraparound_notifies_then_stops() {
    let start = 262143u32;
    let mut cfg = rx_config(SnSize::Size12Bits);
    cfg.max_count = MaxCount {
        notify: 262144,
        hard: 262148,
    };
    let f = setup(cfg);
    f.rx.set_state(state_at(start));
    for i in 0..6 {
        f.rx.handle_pdu(plain_pdu(start + i, SnSize::Size12Bits, &SDU1));
    }
    assert_eq!(f.frame.nof_sdus(), 5);
    assert_eq!(*f.frame.nof_max_count_reached.lock(), 1);
    assert_eq!(*f.frame.nof_protocol_failure.lock(), 1);
}

#[test]
fn count_status_transfer() {
    let f = setup(rx_config(SnSize::Size18Bits));
    f.rx.set_count(CountInfo { hfn: 2, sn: 7 });
    let count = (2 << 18) | 7;
    assert_eq!(f.rx.get_state(), RxState { rx_next: count, rx_deliv: count, rx_reord: count });
    let info = f.rx.get_count();
    assert_eq!(info, CountInfo { hfn: 2, sn: 7 });
}

#[test]
fn processing_gate_drops_pdus_until_restarted() {
    let f = secured(rx_config(SnSize::Size12Bits));
    f.rx.notify_pdu_processing_stopped();
    f.rx.handle_pdu(reference_pdu_sn12(0).unwrap());
    assert_eq!(f.frame.nof_sdus(), 0);

    f.rx.restart_pdu_processing();
    f.rx.handle_pdu(reference_pdu_sn12(0).unwrap());
    assert_eq!(f.frame.nof_sdus(), 1);
}

#[test]
fn sdu_payload_roundtrip_without_security() {
    let f = setup(rx_config(SnSize::Size12Bits));
    let payload = [1u8, 2, 3, 4, 5];
    f.rx.handle_pdu(plain_pdu(0, SnSize::Size12Bits, &payload));
    assert_eq!(f.frame.pop_sdu().unwrap(), payload);
}
