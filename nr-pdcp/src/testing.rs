//! Test doubles and reference data shared by the crate's tests and
//! benchmarks: mock adapters recording everything the entity emits, the
//! security configuration used to generate the reference PDUs, and the
//! reference PDUs themselves (payload {0x18, 0xe2} protected with
//! NIA1/NEA1 at selected COUNT values).

use crate::interconnect::{
    RxStatusProvider, RxUpperControlNotifier, RxUpperDataNotifier, TxLowerNotifier,
    TxStatusHandler, TxUpperControlNotifier,
};
use crate::metrics::{MetricsNotifier, MetricsReport};
use nr_security::{
    CipheringAlgorithm, IntegrityAlgorithm, SecurityConfig, SecurityDomain,
};
use parking_lot::Mutex;
use std::collections::VecDeque;

pub const SDU1: [u8; 2] = [0x18, 0xe2];
pub const SDU2: [u8; 2] = [0xde, 0xad];

pub const K_128_INT: [u8; 16] = [
    0x16, 0x17, 0x18, 0x19, 0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x30, 0x31,
];
pub const K_128_ENC: [u8; 16] = K_128_INT;

/// Security configuration matching the reference PDUs below.
pub fn test_sec_cfg(domain: SecurityDomain) -> SecurityConfig {
    SecurityConfig {
        k_128_int: K_128_INT,
        k_128_enc: K_128_ENC,
        integ_algo: IntegrityAlgorithm::Nia1,
        cipher_algo: CipheringAlgorithm::Nea1,
        domain,
    }
}

/// Reference PDUs for 12-bit SNs: (COUNT, full PDU with MAC-I).
pub const PDUS_SN12: &[(u32, [u8; 8])] = &[
    (0, [0x80, 0x00, 0x28, 0xb7, 0xe0, 0xc5, 0x10, 0x48]),
    (1, [0x80, 0x01, 0x34, 0x68, 0xae, 0x56, 0xdc, 0x2c]),
    (2, [0x80, 0x02, 0x78, 0x72, 0x65, 0xa9, 0x09, 0xdb]),
    (2047, [0x87, 0xff, 0x39, 0xb4, 0x2c, 0x50, 0x9f, 0xf6]),
    (2048, [0x88, 0x00, 0xe3, 0x37, 0xfe, 0x24, 0xc3, 0xe9]),
    (2049, [0x88, 0x01, 0xdf, 0xc8, 0x5c, 0xa6, 0x9b, 0x11]),
    (4095, [0x8f, 0xff, 0x1a, 0x08, 0xbe, 0xa4, 0x32, 0x86]),
    (4096, [0x80, 0x00, 0x4f, 0xd2, 0x5c, 0xdc, 0x86, 0xfe]),
    (4097, [0x80, 0x01, 0x1d, 0x2c, 0x66, 0xd3, 0xcb, 0xd1]),
    (262143, [0x8f, 0xff, 0xa7, 0xe3, 0x3f, 0x0d, 0xc0, 0x94]),
    (262144, [0x80, 0x00, 0x6d, 0xc2, 0x76, 0xe8, 0xe1, 0x55]),
    (262145, [0x80, 0x01, 0xed, 0xb2, 0x64, 0x36, 0x40, 0x80]),
    (262146, [0x80, 0x02, 0xe0, 0x06, 0x0d, 0x18, 0xc1, 0xf6]),
    (262147, [0x80, 0x03, 0x10, 0x49, 0x14, 0x0d, 0xd1, 0x1b]),
    (262148, [0x80, 0x04, 0xfc, 0x2d, 0x3e, 0xcf, 0xb4, 0xa2]),
    (4294967295, [0x8f, 0xff, 0xaa, 0x13, 0xb5, 0x1f, 0x8a, 0x68]),
];

/// Reference PDUs for 18-bit SNs.
pub const PDUS_SN18: &[(u32, [u8; 9])] = &[
    (0, [0x80, 0x00, 0x00, 0x28, 0xb7, 0x87, 0xb7, 0x5f, 0xd7]),
    (1, [0x80, 0x00, 0x01, 0x34, 0x68, 0x44, 0x26, 0xcc, 0xe5]),
    (2, [0x80, 0x00, 0x02, 0x78, 0x72, 0xfc, 0xdf, 0xba, 0xa9]),
    (131071, [0x81, 0xff, 0xff, 0x74, 0x2f, 0xce, 0x85, 0x95, 0xc4]),
    (131072, [0x82, 0x00, 0x00, 0x23, 0xd6, 0x92, 0x6f, 0x3b, 0xb0]),
    (131073, [0x82, 0x00, 0x01, 0xcb, 0x24, 0x4b, 0x64, 0x0e, 0x88]),
    (262143, [0x83, 0xff, 0xff, 0x79, 0xae, 0xc4, 0x4e, 0xe8, 0x41]),
    (262144, [0x80, 0x00, 0x00, 0x74, 0xb7, 0x50, 0x4e, 0xb9, 0x0c]),
    (262145, [0x80, 0x00, 0x01, 0x40, 0x38, 0xec, 0x5a, 0x41, 0x19]),
    (262146, [0x80, 0x00, 0x02, 0x0c, 0x98, 0xdc, 0x6f, 0xf4, 0xc8]),
    (262147, [0x80, 0x00, 0x03, 0x71, 0x8c, 0x89, 0x7e, 0x99, 0x56]),
    (262148, [0x80, 0x00, 0x04, 0x5b, 0x48, 0xdd, 0xc5, 0xc0, 0x5a]),
    (334103, [0x81, 0x19, 0x17, 0x7c, 0xcb, 0x24, 0xf1, 0x05, 0xfc]),
    (334104, [0x81, 0x19, 0x18, 0x62, 0xbd, 0x16, 0x72, 0x33, 0x16]),
    (4294967295, [0x83, 0xff, 0xff, 0xaa, 0x13, 0x1a, 0x29, 0x54, 0x12]),
];

/// Looks up the reference PDU for `count`, if the table carries it.
pub fn reference_pdu_sn12(count: u32) -> Option<Vec<u8>> {
    PDUS_SN12
        .iter()
        .find(|(c, _)| *c == count)
        .map(|(_, pdu)| pdu.to_vec())
}

pub fn reference_pdu_sn18(count: u32) -> Option<Vec<u8>> {
    PDUS_SN18
        .iter()
        .find(|(c, _)| *c == count)
        .map(|(_, pdu)| pdu.to_vec())
}

/// Mock of the layers below and above a TX entity.
#[derive(Default)]
pub struct TxTestFrame {
    pub pdu_queue: Mutex<VecDeque<Vec<u8>>>,
    pub retx_queue: Mutex<VecDeque<Vec<u8>>>,
    pub sdu_discard_queue: Mutex<VecDeque<u32>>,
    pub nof_max_count_reached: Mutex<u32>,
    pub nof_protocol_failure: Mutex<u32>,
    /// Canned report returned when the TX entity asks for one.
    pub status_report: Mutex<Vec<u8>>,
}

impl TxTestFrame {
    pub fn pop_pdu(&self) -> Option<Vec<u8>> {
        self.pdu_queue.lock().pop_front()
    }

    pub fn pop_retx(&self) -> Option<Vec<u8>> {
        self.retx_queue.lock().pop_front()
    }

    pub fn nof_pdus(&self) -> usize {
        self.pdu_queue.lock().len()
    }

    pub fn nof_retx(&self) -> usize {
        self.retx_queue.lock().len()
    }

    pub fn pop_discard(&self) -> Option<u32> {
        self.sdu_discard_queue.lock().pop_front()
    }

    pub fn nof_discards(&self) -> usize {
        self.sdu_discard_queue.lock().len()
    }
}

impl TxLowerNotifier for TxTestFrame {
    fn on_new_pdu(&self, pdu: Vec<u8>, is_retx: bool) {
        if is_retx {
            self.retx_queue.lock().push_back(pdu);
        } else {
            self.pdu_queue.lock().push_back(pdu);
        }
    }

    fn on_discard_pdu(&self, sn: u32) {
        self.sdu_discard_queue.lock().push_back(sn);
    }
}

impl TxUpperControlNotifier for TxTestFrame {
    fn on_max_count_reached(&self) {
        *self.nof_max_count_reached.lock() += 1;
    }

    fn on_protocol_failure(&self) {
        *self.nof_protocol_failure.lock() += 1;
    }
}

impl RxStatusProvider for TxTestFrame {
    fn compile_status_report(&self) -> Vec<u8> {
        self.status_report.lock().clone()
    }
}

/// Mock of the layers above an RX entity.
#[derive(Default)]
pub struct RxTestFrame {
    pub sdu_queue: Mutex<VecDeque<Vec<u8>>>,
    pub status_report_queue: Mutex<VecDeque<Vec<u8>>>,
    pub nof_integrity_failure: Mutex<u32>,
    pub nof_max_count_reached: Mutex<u32>,
    pub nof_protocol_failure: Mutex<u32>,
}

impl RxTestFrame {
    pub fn pop_sdu(&self) -> Option<Vec<u8>> {
        self.sdu_queue.lock().pop_front()
    }

    pub fn nof_sdus(&self) -> usize {
        self.sdu_queue.lock().len()
    }

    pub fn pop_status_report(&self) -> Option<Vec<u8>> {
        self.status_report_queue.lock().pop_front()
    }
}

impl RxUpperDataNotifier for RxTestFrame {
    fn on_new_sdu(&self, sdu: Vec<u8>) {
        self.sdu_queue.lock().push_back(sdu);
    }
}

impl RxUpperControlNotifier for RxTestFrame {
    fn on_integrity_failure(&self) {
        *self.nof_integrity_failure.lock() += 1;
    }

    fn on_protocol_failure(&self) {
        *self.nof_protocol_failure.lock() += 1;
    }

    fn on_max_count_reached(&self) {
        *self.nof_max_count_reached.lock() += 1;
    }
}

impl TxStatusHandler for RxTestFrame {
    fn on_status_report(&self, report: Vec<u8>) {
        self.status_report_queue.lock().push_back(report);
    }
}

/// Collects metrics reports for inspection.
#[derive(Default)]
pub struct MetricsTestNotifier {
    pub reports: Mutex<Vec<MetricsReport>>,
}

impl MetricsNotifier for MetricsTestNotifier {
    fn report_metrics(&self, report: &MetricsReport) {
        self.reports.lock().push(report.clone());
    }
}
