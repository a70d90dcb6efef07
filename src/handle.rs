//! Cluster handle: per-capture-cluster lock state, PARI, PT roster and
//! the 24-slot TBC map.

use core::time::Duration;

use crate::ari::{FpCapabilities, Pari};
use crate::error::MacError;
use crate::ids::{HandleId, PtId, TbcId, TimerId};
use crate::ingress::SLOTS_PER_FRAME;
use crate::runtime::EventLoop;
use crate::state::MonitorState;
use crate::trace;

pub const LOCK_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug)]
pub struct ClusterHandle {
    pub name: String,
    pub pari: Pari,
    pub locked: bool,
    pub lock_timer: Option<TimerId>,
    pub pts: Vec<PtId>,
    slots: [Option<TbcId>; SLOTS_PER_FRAME as usize],
}

impl ClusterHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pari: Pari::EMPTY,
            locked: false,
            lock_timer: None,
            pts: Vec::new(),
            slots: [None; SLOTS_PER_FRAME as usize],
        }
    }

    pub fn slot_at(&self, slot: u8) -> Option<TbcId> {
        self.slots[slot as usize]
    }

    /// Reserves `slot` (and `peer`, for a duplex bearer) for `tbc`.
    /// Rejects if either is already occupied.
    pub fn occupy_slots(
        &mut self,
        slot: u8,
        peer: Option<u8>,
        tbc: TbcId,
    ) -> Result<(), MacError> {
        if self.slots[slot as usize].is_some() {
            return Err(MacError::SlotOccupied { slot });
        }
        if let Some(peer) = peer {
            if self.slots[peer as usize].is_some() {
                return Err(MacError::PeerSlotOccupied { slot: peer });
            }
        }
        self.slots[slot as usize] = Some(tbc);
        if let Some(peer) = peer {
            self.slots[peer as usize] = Some(tbc);
        }
        Ok(())
    }

    /// Frees every slot occupied by `tbc`.
    pub fn free_tbc_slots(&mut self, tbc: TbcId) {
        for slot in self.slots.iter_mut() {
            if *slot == Some(tbc) {
                *slot = None;
            }
        }
    }

    /// A `MAC_ME_INFO-ind` carrying a PARI. Adopts
    /// the PARI and starts the lock timer if no other handle owns it;
    /// otherwise the indication is silently dropped (a PARI can only
    /// ever be claimed by one handle at a time).
    pub fn on_mac_me_info(
        state: &mut MonitorState,
        ev: &mut impl EventLoop,
        id: HandleId,
        pari: Pari,
    ) {
        if state.claim_pari(id, pari).is_err() {
            return;
        }
        let timer = state.next_timer_id();
        let handle = state.handle_mut(id);
        handle.pari = pari;
        handle.lock_timer = Some(timer);
        ev.register_timer(timer, LOCK_TIMEOUT);
        trace::handle(&state.handle(id).name, &format!("scan adopted {pari}"));
    }

    /// A `MAC_ME_INFO-ind` carrying FP capabilities. Promotion to locked
    /// only happens while the lock timer is still running — an
    /// indication observed after it already fired (and thus already
    /// unlocked/rescanned) must not double-increment `locked_count`.
    /// A zero-capabilities indication always unlocks, whether or not a
    /// lock timer is currently running, since it is the "FP went away"
    /// signal on an already-locked handle.
    pub fn on_capabilities(
        state: &mut MonitorState,
        ev: &mut impl EventLoop,
        id: HandleId,
        fpc: FpCapabilities,
    ) {
        if !fpc.is_present() {
            Self::unlock(state, ev, id);
            return;
        }
        let Some(timer) = state.handle(id).lock_timer else {
            return;
        };
        ev.cancel_timer(timer);
        let pari = state.handle(id).pari;
        let handle = state.handle_mut(id);
        handle.lock_timer = None;
        handle.locked = true;
        state.on_lock();
        trace::handle(&state.handle(id).name, &format!("locked, pari {pari}"));
    }

    /// Lock timer expiry: return to scanning.
    pub fn on_lock_timeout(state: &mut MonitorState, ev: &mut impl EventLoop, id: HandleId) {
        trace::handle(&state.handle(id).name, "timeout, lock failed");
        Self::unlock(state, ev, id);
    }

    fn unlock(state: &mut MonitorState, ev: &mut impl EventLoop, id: HandleId) {
        let handle = state.handle_mut(id);
        let pari = handle.pari;
        let was_locked = handle.locked;
        handle.locked = false;
        handle.pari = Pari::EMPTY;
        if let Some(timer) = handle.lock_timer.take() {
            ev.cancel_timer(timer);
        }
        state.release_pari(pari);
        if was_locked {
            state.on_unlock();
        }
        trace::handle(&state.handle(id).name, "unlocked, re-scanning");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{SimClock, SimEventLoop};

    #[test]
    fn scan_then_capabilities_locks_and_increments_count() {
        let mut state = MonitorState::new(b"0000".to_vec());
        let id = state.add_handle(ClusterHandle::new("a"));
        let mut ev = SimEventLoop::new();
        let pari = Pari::new(0x1234, 0x56789);

        ClusterHandle::on_mac_me_info(&mut state, &mut ev, id, pari);
        assert!(state.handle(id).lock_timer.is_some());

        ClusterHandle::on_capabilities(&mut state, &mut ev, id, FpCapabilities(0x00F0));
        assert!(state.handle(id).locked);
        assert_eq!(state.locked_count(), 1);
        assert_eq!(state.handle(id).pari, pari);
    }

    #[test]
    fn lock_timeout_unlocks_and_clears_pari() {
        let clock = SimClock::new();
        let mut state = MonitorState::new(b"0000".to_vec());
        let id = state.add_handle(ClusterHandle::new("a"));
        let mut ev = SimEventLoop::new();
        let pari = Pari::new(1, 2);

        ClusterHandle::on_mac_me_info(&mut state, &mut ev, id, pari);
        clock.advance(LOCK_TIMEOUT);
        let fired = ev.fire_due(&clock);
        assert_eq!(fired.len(), 1);
        ClusterHandle::on_lock_timeout(&mut state, &mut ev, id);

        assert!(!state.handle(id).locked);
        assert!(state.handle(id).pari.is_empty());
        assert_eq!(state.locked_count(), 0);
    }

    #[test]
    fn capabilities_after_timeout_does_not_double_lock() {
        let clock = SimClock::new();
        let mut state = MonitorState::new(b"0000".to_vec());
        let id = state.add_handle(ClusterHandle::new("a"));
        let mut ev = SimEventLoop::new();
        let pari = Pari::new(1, 2);

        ClusterHandle::on_mac_me_info(&mut state, &mut ev, id, pari);
        clock.advance(LOCK_TIMEOUT);
        ev.fire_due(&clock);
        ClusterHandle::on_lock_timeout(&mut state, &mut ev, id);

        // A stray late indication must not re-lock: the timer is gone.
        ClusterHandle::on_capabilities(&mut state, &mut ev, id, FpCapabilities(0x00F0));
        assert!(!state.handle(id).locked);
        assert_eq!(state.locked_count(), 0);
    }

    #[test]
    fn zero_capabilities_unlocks_an_already_locked_handle() {
        let mut state = MonitorState::new(b"0000".to_vec());
        let id = state.add_handle(ClusterHandle::new("a"));
        let mut ev = SimEventLoop::new();
        let pari = Pari::new(1, 2);

        ClusterHandle::on_mac_me_info(&mut state, &mut ev, id, pari);
        ClusterHandle::on_capabilities(&mut state, &mut ev, id, FpCapabilities(0x00F0));
        assert!(state.handle(id).locked);
        assert_eq!(state.locked_count(), 1);

        // The FP going away is signaled by a zero-capabilities indication,
        // with no lock timer running at this point.
        ClusterHandle::on_capabilities(&mut state, &mut ev, id, FpCapabilities(0));
        assert!(!state.handle(id).locked);
        assert!(state.handle(id).pari.is_empty());
        assert_eq!(state.locked_count(), 0);
    }

    #[test]
    fn duplex_teardown_frees_both_slots() {
        let mut handle = ClusterHandle::new("a");
        let tbc = TbcId(0);
        handle.occupy_slots(5, Some(17), tbc).unwrap();
        assert_eq!(handle.slot_at(5), Some(tbc));
        assert_eq!(handle.slot_at(17), Some(tbc));
        handle.free_tbc_slots(tbc);
        assert_eq!(handle.slot_at(5), None);
        assert_eq!(handle.slot_at(17), None);
    }
}
