//! Interfaces between the PDCP entity and its collaborators.
//!
//! The upper/lower notifiers are implemented by the adapters around the
//! entity (RRC, SDAP, RLC/F1-U); the status provider/handler pair is the
//! TX↔RX interconnect inside one bearer. All notifiers take `&self` and
//! must be safe to call from the half's executor context.

/// PDU sink towards RLC / F1-U, implemented by the lower-layer adapter.
pub trait TxLowerNotifier: Send + Sync {
    fn on_new_pdu(&self, pdu: Vec<u8>, is_retx: bool);
    /// Asks the lower layer to discard the PDU with the given SN.
    fn on_discard_pdu(&self, sn: u32);
}

/// TX-side control events towards upper layers.
pub trait TxUpperControlNotifier: Send + Sync {
    fn on_max_count_reached(&self);
    fn on_protocol_failure(&self);
}

/// In-order SDU delivery towards upper layers.
pub trait RxUpperDataNotifier: Send + Sync {
    fn on_new_sdu(&self, sdu: Vec<u8>);
}

/// RX-side control events towards upper layers.
pub trait RxUpperControlNotifier: Send + Sync {
    fn on_integrity_failure(&self);
    fn on_protocol_failure(&self);
    fn on_max_count_reached(&self);
}

/// Implemented by the RX half: the TX half fetches a fresh status report
/// through this when sending one (TS 38.323 Sec. 5.4.1).
pub trait RxStatusProvider: Send + Sync {
    fn compile_status_report(&self) -> Vec<u8>;
}

/// Implemented by the TX half: the RX half forwards received status
/// reports through this (TS 38.323 Sec. 5.4.2).
pub trait TxStatusHandler: Send + Sync {
    fn on_status_report(&self, report: Vec<u8>);
}

/// RX COUNT split for handover status transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountInfo {
    pub hfn: u32,
    pub sn: u32,
}
