//! MM side-channel: snoops key-allocation, authentication
//! and ciphering exchanges passing through DLC/NWK and feeds derived
//! material back into the auth derivation (4.C) and MAC layer (4.D.6).
//!
//! Each PT carries a single [`MmProcedure`] slot; a transaction observed
//! while one is already in flight is rejected rather than displacing it.

use crate::auth::{compute_res1, derive_dck, derive_uak};
use crate::error::MmError;
use crate::nwk::MmMessage;
use crate::pt::{MmProcedure, Pt};

/// What happened as a result of feeding one [`MmMessage`] to a PT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmOutcome {
    /// Procedure advanced; nothing externally actionable yet.
    Progressed,
    /// Key-allocation completed; UAK is now stored on the PT.
    UakEstablished,
    /// Authentication completed; DCK is now stored on the PT.
    DckEstablished,
    /// A cipher request/suggest was recognized and a DCK was present;
    /// the caller should set `ciphered = true` on the PT's TBC and seed
    /// the DSC engine with this key.
    CipheringActivated(u64),
    /// `CIPHER-REJECT` observed; any in-flight ciphering attempt is abandoned.
    CipheringRejected,
}

/// Advances `pt`'s MM procedure given `msg`, using `auth_pin` for UAK
/// derivation. `msg` is assumed to already be attributed to `pt`'s DLC
/// link by the caller.
pub fn handle_mm_message(
    pt: &mut Pt,
    auth_pin: &[u8],
    msg: MmMessage,
) -> Result<MmOutcome, MmError> {
    pt.last_msg = Some(msg);

    match msg {
        MmMessage::KeyAllocate { rs, rand_f } => {
            if pt.procedure != MmProcedure::None {
                return Err(MmError::ProcedureBusy);
            }
            pt.procedure = MmProcedure::KeyAlloc { rs, rand_f };
            Ok(MmOutcome::Progressed)
        }

        MmMessage::AuthenticationRequest { rs, rand_f, .. } => {
            if pt.procedure != MmProcedure::None {
                return Err(MmError::ProcedureBusy);
            }
            pt.procedure = MmProcedure::Authenticate { rs, rand_f };
            Ok(MmOutcome::Progressed)
        }

        MmMessage::AuthenticationReply { res } => match pt.procedure {
            MmProcedure::KeyAlloc { rs, rand_f } => {
                let uak = derive_uak(auth_pin, rs);
                let res1 = compute_res1(&uak, rs, rand_f);
                pt.procedure = MmProcedure::None;
                if res1 != res {
                    return Err(MmError::ResMismatch);
                }
                pt.uak = Some(uak);
                Ok(MmOutcome::UakEstablished)
            }
            MmProcedure::Authenticate { rs, rand_f } => {
                let Some(uak) = pt.uak else {
                    pt.procedure = MmProcedure::None;
                    return Err(MmError::UnexpectedMessage);
                };
                let res1 = compute_res1(&uak, rs, rand_f);
                pt.procedure = MmProcedure::None;
                if res1 != res {
                    return Err(MmError::ResMismatch);
                }
                let dck = derive_dck(&uak, rs, rand_f);
                pt.dck = Some(dck);
                Ok(MmOutcome::DckEstablished)
            }
            MmProcedure::None | MmProcedure::Ciphering { .. } => {
                Err(MmError::UnexpectedMessage)
            }
        },

        MmMessage::CipherRequest | MmMessage::CipherSuggest => {
            if !matches!(pt.procedure, MmProcedure::None) {
                return Err(MmError::ProcedureBusy);
            }
            let Some(dck) = pt.dck else {
                return Err(MmError::UnexpectedMessage);
            };
            pt.procedure = MmProcedure::Ciphering { dck };
            Ok(MmOutcome::CipheringActivated(dck))
        }

        MmMessage::CipherReject => {
            if matches!(pt.procedure, MmProcedure::Ciphering { .. }) {
                pt.procedure = MmProcedure::None;
            }
            Ok(MmOutcome::CipheringRejected)
        }
    }
}
