//! Portable Part (PT) state.
//!
//! The "procedure" field is the design-notes' tagged union rather than
//! a bare enum discriminant plus loose `rs`/`rand_f`/`res` fields: each
//! variant only carries the material that actually exists at that stage,
//! so an `Authenticate` state without a `rand_f` is unrepresentable.

use crate::ari::Ipui;
use crate::audio::AudioHandle;
use crate::ids::TbcId;
use crate::nwk::MmMessage;

/// In-flight MM procedure on one PT. At most one is
/// active at a time; a second observed transaction is rejected rather
/// than displacing this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmProcedure {
    None,
    KeyAlloc { rs: u64, rand_f: u64 },
    Authenticate { rs: u64, rand_f: u64 },
    Ciphering { dck: u64 },
}

impl Default for MmProcedure {
    fn default() -> Self {
        MmProcedure::None
    }
}

/// A tracked Portable Part, keyed by its [`Ipui`] in
/// [`crate::state::MonitorState`].
#[derive(Debug)]
pub struct Pt {
    pub ipui: Ipui,
    /// The TBC currently backing this PT's DLC link, if any.
    pub dl: Option<TbcId>,
    pub uak: Option<[u8; 16]>,
    pub dck: Option<u64>,
    pub audio: Option<AudioHandle>,
    pub procedure: MmProcedure,
    pub last_msg: Option<MmMessage>,
}

impl Pt {
    pub fn new(ipui: Ipui) -> Self {
        Self {
            ipui,
            dl: None,
            uak: None,
            dck: None,
            audio: None,
            procedure: MmProcedure::None,
            last_msg: None,
        }
    }

    /// A PT may be reclaimed once its bearer is gone and no MM
    /// procedure is in flight.
    pub fn is_reclaimable(&self) -> bool {
        self.dl.is_none() && self.procedure == MmProcedure::None
    }
}
