//! NWK-layer boundary.
//!
//! The NWK message decoders themselves are an external collaborator
//!; this module only defines the contract a decoder sits
//! behind and the narrow slice of MM messages the engine must recognize
//! passively to drive key allocation, authentication and ciphering
//!. General NWK SDU decoding (call control, etc.) is not
//! reproduced here.

use crate::ari::Ipui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    FpToPt,
    PtToFp,
}

/// One reassembled NWK SDU handed to the external decoder contract.
#[derive(Debug, Clone)]
pub struct NwkSdu {
    pub direction: Direction,
    pub pt: Ipui,
    pub bytes: Vec<u8>,
}

/// Sink a reassembled NWK SDU is handed to once DLC completes
/// reassembly. The production binary logs it through the trace sink;
/// tests can capture it in a `Vec`.
pub trait NwkSink {
    fn deliver(&mut self, sdu: NwkSdu);
}

/// The MM messages the side-channel recognizes. A real
/// NWK decoder emits many more message types; everything else passes
/// through `NwkSink` unparsed as far as this engine is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmMessage {
    KeyAllocate { rs: u64, rand_f: u64 },
    AuthenticationRequest { auth_type: u8, rs: u64, rand_f: u64 },
    AuthenticationReply { res: u32 },
    CipherRequest,
    CipherSuggest,
    CipherReject,
}

/// Best-effort recognition of one of the MM messages above from a
/// reassembled Lc SDU. Any other NWK content (call control, etc.)
/// yields `None` and is simply not acted on by the MM side-channel.
pub fn recognize_mm_message(sdu: &[u8]) -> Option<MmMessage> {
    match sdu.first().copied()? {
        0x01 if sdu.len() >= 17 => Some(MmMessage::KeyAllocate {
            rs: u64::from_be_bytes(sdu[1..9].try_into().ok()?),
            rand_f: u64::from_be_bytes(sdu[9..17].try_into().ok()?),
        }),
        0x02 if sdu.len() >= 18 => Some(MmMessage::AuthenticationRequest {
            auth_type: sdu[1],
            rs: u64::from_be_bytes(sdu[2..10].try_into().ok()?),
            rand_f: u64::from_be_bytes(sdu[10..18].try_into().ok()?),
        }),
        0x03 if sdu.len() >= 5 => Some(MmMessage::AuthenticationReply {
            res: u32::from_be_bytes(sdu[1..5].try_into().ok()?),
        }),
        0x04 => Some(MmMessage::CipherRequest),
        0x05 => Some(MmMessage::CipherSuggest),
        0x06 => Some(MmMessage::CipherReject),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_key_allocate() {
        let mut sdu = vec![0x01];
        sdu.extend_from_slice(&1u64.to_be_bytes());
        sdu.extend_from_slice(&2u64.to_be_bytes());
        assert_eq!(
            recognize_mm_message(&sdu),
            Some(MmMessage::KeyAllocate { rs: 1, rand_f: 2 })
        );
    }

    #[test]
    fn unrecognized_message_is_none() {
        assert_eq!(recognize_mm_message(&[0xFF, 0x00]), None);
        assert_eq!(recognize_mm_message(&[]), None);
    }
}
