//! MAC layer: A-field parsing, TBC lifecycle, C/F
//! sequence tracking, and the encryption envelope over ciphered
//! B-fields.

use modular_bitfield::prelude::*;

use crate::ari::{Fmid, Pmid};
use crate::dlc::LcReassembler;
use crate::error::MacError;
use crate::ids::{PtId, TimerId};

/// Trailing CRC bytes on every A-field; validated and stripped upstream
/// by the capture driver's framing, but still present in the buffer.
pub const A_FIELD_CRC_LEN: usize = 2;

/// Bytes of keystream spanning a duplex slot pair.
pub const KEYSTREAM_LEN: usize = 90;
const SLOT1_RANGE: core::ops::Range<usize> = 0..45;
const SLOT2_RANGE: core::ops::Range<usize> = 45..90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[bits = 3]
pub enum TailId {
    /// Broadcast identity / static system info.
    Identities = 0,
    Paging = 1,
    /// System info carried on the Q-channel.
    QChannel = 2,
    /// Connection-oriented signalling.
    Ct = 3,
    /// MAC control (bearer setup/teardown).
    Mt = 4,
    /// Identification.
    Nt = 5,
    Pt = 6,
    Reserved = 7,
}

/// T-MUX header: the first byte of every A-field.
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct TMuxHeader {
    #[bits = 3]
    pub tail_id: TailId,
    pub rfu: B5,
}

/// Splits an A-field into its tail identification and tail payload
/// (CRC bytes excluded).
pub fn classify_tail(a_field: &[u8]) -> Result<(TailId, &[u8]), MacError> {
    if a_field.is_empty() {
        return Err(MacError::AFieldTooShort { have: 0 });
    }
    let header = TMuxHeader::from_bytes([a_field[0]]);
    let payload_end = a_field.len().saturating_sub(A_FIELD_CRC_LEN);
    let payload = if payload_end > 1 {
        &a_field[1..payload_end]
    } else {
        &[]
    };
    Ok((header.tail_id(), payload))
}

/// A parsed M_T (MAC control) message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacControl {
    AccessRequest {
        fmid: Fmid,
        pmid: Pmid,
        duplex: bool,
    },
    BearerConfirm {
        fmid: Fmid,
        pmid: Pmid,
    },
    Release,
}

const MC_ACCESS_REQUEST: u8 = 0;
const MC_BEARER_CONFIRM: u8 = 1;
const MC_RELEASE: u8 = 2;

pub fn parse_mac_control(payload: &[u8]) -> Result<MacControl, MacError> {
    match payload.first().copied() {
        Some(MC_ACCESS_REQUEST) if payload.len() >= 6 => {
            let fmid = Fmid::new(u16::from_be_bytes([payload[1], payload[2]]));
            let pmid = Pmid::new(u32::from_be_bytes([0, payload[3], payload[4], payload[5]]));
            let duplex = payload.get(6).copied().unwrap_or(0) & 0x1 != 0;
            Ok(MacControl::AccessRequest { fmid, pmid, duplex })
        }
        Some(MC_BEARER_CONFIRM) if payload.len() >= 6 => {
            let fmid = Fmid::new(u16::from_be_bytes([payload[1], payload[2]]));
            let pmid = Pmid::new(u32::from_be_bytes([0, payload[3], payload[4], payload[5]]));
            Ok(MacControl::BearerConfirm { fmid, pmid })
        }
        Some(MC_RELEASE) => Ok(MacControl::Release),
        _ => Err(MacError::UnknownMacControl),
    }
}

/// Which half of a duplex TBC's direction pair an MBC tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    FpToPt,
    PtToFp,
}

impl Direction {
    fn idx(self) -> usize {
        match self {
            Direction::FpToPt => 0,
            Direction::PtToFp => 1,
        }
    }
}

/// Per-direction MAC-connection reassembly context.
#[derive(Debug, Default)]
pub struct MacConnection {
    pub lc: LcReassembler,
}

/// Per-direction sub-state of a TBC: sequence bits plus its MAC
/// connection. `None` means "no segment observed yet" (the sequence
/// bits are zeroed at TBC creation and must not be mistaken for a
/// duplicate of the first real segment of either polarity).
#[derive(Debug, Default)]
pub struct Mbc {
    cs_seq: Option<bool>,
    cf_seq: Option<bool>,
    pub mc: MacConnection,
}

impl Mbc {
    /// `true` if `seq_bit` is a new (non-duplicate) C-channel segment.
    pub fn accept_cs(&mut self, seq_bit: bool) -> bool {
        if self.cs_seq == Some(seq_bit) {
            false
        } else {
            self.cs_seq = Some(seq_bit);
            true
        }
    }

    /// `true` if `seq_bit` is a new (non-duplicate) F-channel segment.
    pub fn accept_cf(&mut self, seq_bit: bool) -> bool {
        if self.cf_seq == Some(seq_bit) {
            false
        } else {
            self.cf_seq = Some(seq_bit);
            true
        }
    }

    pub fn is_zeroed(&self) -> bool {
        self.cs_seq.is_none() && self.cf_seq.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TbcState {
    Idle,
    Requested,
    Established,
    Ciphered,
    Releasing,
}

/// The MAC-level session for one call.
#[derive(Debug)]
pub struct Tbc {
    pub slot1: u8,
    pub slot2: Option<u8>,
    pub fmid: Fmid,
    pub pmid: Pmid,
    pub state: TbcState,
    pub mbc: [Mbc; 2],
    pub ciphered: bool,
    pub pt: PtId,
    pub silence_timer: Option<TimerId>,
}

impl Tbc {
    pub fn new(slot1: u8, slot2: Option<u8>, fmid: Fmid, pmid: Pmid, pt: PtId) -> Self {
        Self {
            slot1,
            slot2,
            fmid,
            pmid,
            state: TbcState::Requested,
            mbc: [Mbc::default(), Mbc::default()],
            ciphered: false,
            pt,
            silence_timer: None,
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = u8> {
        core::iter::once(self.slot1).chain(self.slot2)
    }

    pub fn is_duplex(&self) -> bool {
        self.slot2.is_some()
    }

    pub fn mbc(&mut self, dir: Direction) -> &mut Mbc {
        &mut self.mbc[dir.idx()]
    }
}

/// Applies the DSC keystream to a ciphered B-field in place. `is_primary_slot` selects which 45-byte half of the
/// 90-byte keystream window this slot consumes.
pub fn decrypt_b_field(b_field: &mut [u8], is_primary_slot: bool, mfn: u32, frame: u8, dck: u64) {
    let iv = crate::dsc::dsc_iv(mfn, frame);
    let ks = crate::dsc::keystream(iv, dck, KEYSTREAM_LEN);
    let window = if is_primary_slot {
        &ks[SLOT1_RANGE]
    } else {
        &ks[SLOT2_RANGE]
    };
    for (b, k) in b_field.iter_mut().zip(window.iter()) {
        *b ^= k;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_tail_reads_tmux_header() {
        let header = TMuxHeader::new().with_tail_id(TailId::Mt);
        let mut a_field = vec![header.into_bytes()[0]];
        a_field.extend_from_slice(&[0xAA, 0xBB, 0x00, 0x00]); // payload + fake CRC
        let (tail, payload) = classify_tail(&a_field).unwrap();
        assert_eq!(tail, TailId::Mt);
        assert_eq!(payload, &[0xAA, 0xBB]);
    }

    #[test]
    fn access_request_round_trips_fmid_pmid() {
        let payload = [
            MC_ACCESS_REQUEST,
            0x0A,
            0xBC, // fmid = 0xABC
            0x01,
            0x23,
            0x45, // pmid = 0x12345
            0x01, // duplex
        ];
        let mc = parse_mac_control(&payload).unwrap();
        assert_eq!(
            mc,
            MacControl::AccessRequest {
                fmid: Fmid::new(0x0ABC),
                pmid: Pmid::new(0x012345),
                duplex: true,
            }
        );
    }

    #[test]
    fn mbc_sequence_bits_start_zeroed_and_suppress_duplicates() {
        let mut mbc = Mbc::default();
        assert!(mbc.is_zeroed());
        assert!(mbc.accept_cs(false), "first segment is always new");
        assert!(!mbc.accept_cs(false), "repeat of same bit is a duplicate");
        assert!(mbc.accept_cs(true), "flipped bit is a new segment");
    }

    #[test]
    fn b_field_decrypt_round_trips() {
        let dck = 0x1122_3344_5566_7788;
        let original = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut buf = original.clone();
        decrypt_b_field(&mut buf, true, 100, 4, dck);
        assert_ne!(buf, original);
        decrypt_b_field(&mut buf, true, 100, 4, dck);
        assert_eq!(buf, original);
    }

    #[test]
    fn slot1_and_slot2_use_disjoint_keystream_windows() {
        let dck = 7;
        let mut slot1 = vec![0u8; 45];
        let mut slot2 = vec![0u8; 45];
        decrypt_b_field(&mut slot1, true, 1, 1, dck);
        decrypt_b_field(&mut slot2, false, 1, 1, dck);
        assert_ne!(slot1, slot2);
    }
}
