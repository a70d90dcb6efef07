//! Top-level monitor state: an explicit value threaded through the
//! core instead of process-global state. Every cross-reference
//! elsewhere is a small integer id into one of this struct's arenas.

use std::collections::HashMap;

use crate::ari::{Ipui, Pari};
use crate::arena::Arena;
use crate::handle::ClusterHandle;
use crate::ids::{HandleId, PtId, TbcId, TimerId};
use crate::mac::Tbc;
use crate::pt::Pt;

/// Returned when a handle tries to adopt a PARI another handle already
/// owns. The caller drops the indication; this is not a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PariAlreadyOwned;

#[derive(Debug)]
pub struct MonitorState {
    pub handles: Arena<ClusterHandle>,
    pub pts: Arena<Pt>,
    pub tbcs: Arena<Tbc>,
    pari_owner: HashMap<Pari, HandleId>,
    pt_by_ipui: HashMap<Ipui, PtId>,
    locked_count: usize,
    next_timer: usize,
    pub auth_pin: Vec<u8>,
}

impl MonitorState {
    pub fn new(auth_pin: Vec<u8>) -> Self {
        Self {
            handles: Arena::new(),
            pts: Arena::new(),
            tbcs: Arena::new(),
            pari_owner: HashMap::new(),
            pt_by_ipui: HashMap::new(),
            locked_count: 0,
            next_timer: 0,
            auth_pin,
        }
    }

    pub fn locked_count(&self) -> usize {
        self.locked_count
    }

    pub fn next_timer_id(&mut self) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        id
    }

    pub fn add_handle(&mut self, handle: ClusterHandle) -> HandleId {
        HandleId(self.handles.insert(handle))
    }

    pub fn handle(&self, id: HandleId) -> &ClusterHandle {
        self.handles.get(id.index()).expect("stale HandleId")
    }

    pub fn handle_mut(&mut self, id: HandleId) -> &mut ClusterHandle {
        self.handles.get_mut(id.index()).expect("stale HandleId")
    }

    /// Finds (creating if needed) the [`Pt`] for `ipui`.
    pub fn pt_for(&mut self, ipui: Ipui) -> PtId {
        if let Some(&id) = self.pt_by_ipui.get(&ipui) {
            return id;
        }
        let id = PtId(self.pts.insert(Pt::new(ipui)));
        self.pt_by_ipui.insert(ipui, id);
        id
    }

    pub fn pt(&self, id: PtId) -> &Pt {
        self.pts.get(id.index()).expect("stale PtId")
    }

    pub fn pt_mut(&mut self, id: PtId) -> &mut Pt {
        self.pts.get_mut(id.index()).expect("stale PtId")
    }

    /// Drops a PT once it is reclaimable.
    pub fn reclaim_pt_if_idle(&mut self, id: PtId) {
        if self.pts.get(id.index()).is_some_and(|pt| pt.is_reclaimable()) {
            if let Some(pt) = self.pts.remove(id.index()) {
                self.pt_by_ipui.remove(&pt.ipui);
            }
        }
    }

    pub fn add_tbc(&mut self, tbc: Tbc) -> TbcId {
        TbcId(self.tbcs.insert(tbc))
    }

    pub fn tbc(&self, id: TbcId) -> &Tbc {
        self.tbcs.get(id.index()).expect("stale TbcId")
    }

    pub fn tbc_mut(&mut self, id: TbcId) -> &mut Tbc {
        self.tbcs.get_mut(id.index()).expect("stale TbcId")
    }

    pub fn remove_tbc(&mut self, id: TbcId) -> Option<Tbc> {
        self.tbcs.remove(id.index())
    }

    /// Claims `pari` for `handle` if no other handle owns it; a non-empty PARI is unique across all handles.
    pub fn claim_pari(&mut self, handle: HandleId, pari: Pari) -> Result<(), PariAlreadyOwned> {
        match self.pari_owner.get(&pari) {
            Some(&owner) if owner != handle => Err(PariAlreadyOwned),
            _ => {
                self.pari_owner.insert(pari, handle);
                Ok(())
            }
        }
    }

    pub fn release_pari(&mut self, pari: Pari) {
        self.pari_owner.remove(&pari);
    }

    pub fn on_lock(&mut self) {
        self.locked_count += 1;
    }

    pub fn on_unlock(&mut self) {
        self.locked_count -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_handle_cannot_claim_same_pari() {
        let mut state = MonitorState::new(b"0000".to_vec());
        let h1 = state.add_handle(ClusterHandle::new("a"));
        let h2 = state.add_handle(ClusterHandle::new("b"));
        let pari = Pari::new(0x1234, 0x56789);
        assert!(state.claim_pari(h1, pari).is_ok());
        assert_eq!(state.claim_pari(h2, pari), Err(PariAlreadyOwned));
        // same owner re-claiming (e.g. a repeat indication) is fine.
        assert!(state.claim_pari(h1, pari).is_ok());
    }

    #[test]
    fn releasing_a_pari_lets_another_handle_claim_it() {
        let mut state = MonitorState::new(b"0000".to_vec());
        let h1 = state.add_handle(ClusterHandle::new("a"));
        let h2 = state.add_handle(ClusterHandle::new("b"));
        let pari = Pari::new(1, 2);
        state.claim_pari(h1, pari).unwrap();
        state.release_pari(pari);
        assert!(state.claim_pari(h2, pari).is_ok());
    }

    #[test]
    fn pt_lookup_is_stable_across_repeated_observations() {
        let mut state = MonitorState::new(b"0000".to_vec());
        let ipui = Ipui([1, 2, 3, 4, 5]);
        let a = state.pt_for(ipui);
        let b = state.pt_for(ipui);
        assert_eq!(a, b);
    }
}
