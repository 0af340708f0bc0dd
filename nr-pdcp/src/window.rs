//! SDU windows.
//!
//! A [`SduWindow`] is a bounded sparse map from COUNT to per-SDU
//! bookkeeping, sized to half the SN space. Slots are addressed modulo the
//! capacity, so lookup, insert and removal are O(1); the lower edge guards
//! against stale and too-far-ahead COUNTs reusing a live slot.

use crate::config::SnSize;
use crate::error::PdcpError;
use crate::timers::UniqueTimer;
use nr_security::MAC_LEN;
use std::time::Instant;

pub struct SduWindow<T> {
    slots: Vec<Option<T>>,
    capacity: u32,
    lower_edge: u32,
    /// One past the highest COUNT stored since the last clear; bounds the
    /// ascending scan so it never walks the empty tail of the window.
    upper: u64,
    numel: usize,
}

impl<T> SduWindow<T> {
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            capacity,
            lower_edge: 0,
            upper: 0,
            numel: 0,
        }
    }

    fn idx(&self, count: u32) -> usize {
        (count % self.capacity) as usize
    }

    fn in_range(&self, count: u32) -> bool {
        let count = count as u64;
        let lower = self.lower_edge as u64;
        count >= lower && count < lower + self.capacity as u64
    }

    pub fn has(&self, count: u32) -> bool {
        self.in_range(count) && self.slots[self.idx(count)].is_some()
    }

    pub fn get(&self, count: u32) -> Option<&T> {
        if !self.in_range(count) {
            return None;
        }
        self.slots[self.idx(count)].as_ref()
    }

    pub fn get_mut(&mut self, count: u32) -> Option<&mut T> {
        if !self.in_range(count) {
            return None;
        }
        let idx = self.idx(count);
        self.slots[idx].as_mut()
    }

    pub fn add(&mut self, count: u32, value: T) -> Result<(), PdcpError> {
        if !self.in_range(count) {
            return Err(PdcpError::OutsideWindow(count));
        }
        if self.numel as u32 >= self.capacity {
            return Err(PdcpError::WindowFull);
        }
        let idx = self.idx(count);
        if self.slots[idx].is_some() {
            return Err(PdcpError::DuplicateCount(count));
        }
        self.slots[idx] = Some(value);
        self.upper = self.upper.max(count as u64 + 1);
        self.numel += 1;
        Ok(())
    }

    pub fn remove(&mut self, count: u32) -> Option<T> {
        if !self.in_range(count) {
            return None;
        }
        let idx = self.idx(count);
        let value = self.slots[idx].take();
        if value.is_some() {
            self.numel -= 1;
        }
        value
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.upper = self.lower_edge as u64;
        self.numel = 0;
    }

    /// Moves the lower edge. COUNTs below it can no longer be addressed.
    pub fn set_lower_edge(&mut self, count: u32) {
        self.lower_edge = count;
        self.upper = self.upper.max(count as u64);
    }

    /// Occupied entries in ascending COUNT order, starting at `start`
    /// (clamped to the lower edge). Reordering delivery and the status
    /// report bitmap scan walk the window through this.
    pub fn ascending_from(&self, start: u32) -> impl Iterator<Item = (u32, &T)> {
        let begin = start.max(self.lower_edge) as u64;
        let end = self
            .upper
            .min(self.lower_edge as u64 + self.capacity as u64);
        (begin..end).filter_map(move |count| {
            let count = count as u32;
            self.get(count).map(|value| (count, value))
        })
    }

    /// Mutable access to every occupied slot, in storage order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn len(&self) -> usize {
        self.numel
    }

    pub fn is_empty(&self) -> bool {
        self.numel == 0
    }
}

/// TX window entry: discard timer bookkeeping and, where retransmission or
/// a reestablishment flush may need it, a copy of the SDU.
pub struct TxSduInfo {
    pub sdu: Option<Vec<u8>>,
    pub discard_timer: Option<UniqueTimer>,
    pub sdu_len: u32,
    pub queued_at: Instant,
}

/// TX window with byte accounting for the RLC buffer budget.
pub struct TxWindow {
    window: SduWindow<TxSduInfo>,
    hdr_len: u32,
    sdu_bytes: u64,
    nof_sdus: u32,
}

impl TxWindow {
    pub fn new(sn_size: SnSize) -> Self {
        Self {
            window: SduWindow::new(sn_size.window_size()),
            hdr_len: sn_size.hdr_len() as u32,
            sdu_bytes: 0,
            nof_sdus: 0,
        }
    }

    pub fn has(&self, count: u32) -> bool {
        self.window.has(count)
    }

    pub fn get(&self, count: u32) -> Option<&TxSduInfo> {
        self.window.get(count)
    }

    pub fn get_mut(&mut self, count: u32) -> Option<&mut TxSduInfo> {
        self.window.get_mut(count)
    }

    pub fn add_sdu(&mut self, count: u32, info: TxSduInfo) -> Result<(), PdcpError> {
        let sdu_len = info.sdu_len as u64;
        self.window.add(count, info)?;
        self.sdu_bytes += sdu_len;
        self.nof_sdus += 1;
        Ok(())
    }

    pub fn remove_sdu(&mut self, count: u32) -> Option<TxSduInfo> {
        let info = self.window.remove(count)?;
        self.sdu_bytes -= info.sdu_len as u64;
        self.nof_sdus -= 1;
        Some(info)
    }

    pub fn clear(&mut self) {
        self.window.clear();
        self.sdu_bytes = 0;
        self.nof_sdus = 0;
    }

    pub fn set_lower_edge(&mut self, count: u32) {
        self.window.set_lower_edge(count);
    }

    /// Cancels every running discard timer without dropping the entries.
    pub fn stop_discard_timers(&mut self) {
        for info in self.window.iter_mut() {
            if let Some(timer) = info.discard_timer.as_mut() {
                timer.stop();
            }
        }
    }

    /// Bytes the in-window SDUs occupy once framed as PDUs.
    pub fn pdu_bytes(&self, integrity: bool) -> u64 {
        let overhead = self.hdr_len + if integrity { MAC_LEN as u32 } else { 0 };
        self.sdu_bytes + self.nof_sdus as u64 * overhead as u64
    }

    pub fn nof_sdus(&self) -> u32 {
        self.nof_sdus
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_get_remove() {
        let mut w: SduWindow<u32> = SduWindow::new(2048);
        assert!(w.add(0, 10).is_ok());
        assert!(w.add(5, 15).is_ok());
        assert!(w.has(0));
        assert_eq!(w.get(5), Some(&15));
        assert_eq!(w.remove(0), Some(10));
        assert!(!w.has(0));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn rejects_duplicates_and_out_of_range() {
        let mut w: SduWindow<u32> = SduWindow::new(2048);
        w.set_lower_edge(100);
        assert_eq!(w.add(99, 0), Err(PdcpError::OutsideWindow(99)));
        assert_eq!(w.add(100 + 2048, 0), Err(PdcpError::OutsideWindow(2148)));
        assert!(w.add(100, 0).is_ok());
        assert_eq!(w.add(100, 1), Err(PdcpError::DuplicateCount(100)));
    }

    #[test]
    fn ascending_iteration_skips_holes() {
        let mut w: SduWindow<u32> = SduWindow::new(2048);
        w.set_lower_edge(10);
        for count in [14, 10, 12, 17] {
            w.add(count, count * 2).unwrap();
        }
        let all: Vec<(u32, u32)> = w.ascending_from(0).map(|(c, v)| (c, *v)).collect();
        assert_eq!(all, vec![(10, 20), (12, 24), (14, 28), (17, 34)]);

        let tail: Vec<u32> = w.ascending_from(12).map(|(c, _)| c).collect();
        assert_eq!(tail, vec![12, 14, 17]);
    }

    #[test]
    fn lower_edge_hides_stale_counts() {
        let mut w: SduWindow<u32> = SduWindow::new(2048);
        assert!(w.add(3, 33).is_ok());
        w.set_lower_edge(4);
        assert!(!w.has(3));
        assert_eq!(w.remove(3), None);
    }

    #[test]
    fn tx_window_tracks_pdu_bytes() {
        let mut w = TxWindow::new(SnSize::Size12Bits);
        let info = |len: u32| TxSduInfo {
            sdu: None,
            discard_timer: None,
            sdu_len: len,
            queued_at: Instant::now(),
        };
        w.add_sdu(0, info(100)).unwrap();
        w.add_sdu(1, info(50)).unwrap();
        // Two SDUs with a 2-byte header each, MAC-I included when integrity
        // is on.
        assert_eq!(w.pdu_bytes(false), 154);
        assert_eq!(w.pdu_bytes(true), 162);
        w.remove_sdu(0).unwrap();
        assert_eq!(w.pdu_bytes(false), 52);
    }
}
