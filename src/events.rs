//! The event vocabulary the core is driven by. Ingress, the
//! capture driver's `MAC_ME_INFO` indications, and timer expiry are the
//! only three things that can happen to the engine.

use crate::ari::{FpCapabilities, Pari};
use crate::ids::{HandleId, TimerId};
use crate::ingress::RawBurst;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacMeInfoKind {
    Pari(Pari),
    Capabilities(FpCapabilities),
}

#[derive(Debug, Clone)]
pub enum Event {
    Burst { handle: HandleId, burst: RawBurst },
    MacMeInfo { handle: HandleId, kind: MacMeInfoKind },
    TimerFired(TimerId),
}
