//! `dectmon`: a passive, promiscuous protocol monitor for the DECT air
//! interface. This crate is the protocol engine; the capture driver,
//! NWK message decoders, ADPCM codec, and concrete event loop are
//! external collaborators wired up by `src/bin/dectmon.rs`.

pub mod ari;
pub mod arena;
pub mod audio;
pub mod auth;
pub mod cli;
pub mod dlc;
pub mod dsc;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod ids;
pub mod ingress;
pub mod mac;
pub mod mm;
pub mod nwk;
pub mod pt;
pub mod runtime;
pub mod state;
pub mod trace;

pub use engine::dispatch;
pub use error::ProtocolError;
pub use events::Event;
pub use state::MonitorState;
