//! Small integer handles into [`crate::state::MonitorState`]'s arenas.
//!
//! Components hold these ids, never raw cross-pointers, so a
//! TBC <-> DL <-> PT <-> Handle back-reference cycle can't be
//! expressed at the type level.

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);

        impl $name {
            pub(crate) fn index(self) -> usize {
                self.0
            }
        }
    };
}

define_id!(
    /// Identifies one [`crate::handle::ClusterHandle`].
    HandleId
);
define_id!(
    /// Identifies one [`crate::pt::Pt`].
    PtId
);
define_id!(
    /// Identifies one [`crate::mac::Tbc`].
    TbcId
);
define_id!(
    /// Identifies a registered timer (lock timer or TBC silence timer).
    TimerId
);
