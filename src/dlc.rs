//! DLC layer: C-plane Lc reassembly and U-plane voice
//! reassembly. Sequence discipline (duplicate suppression) is enforced
//! by MAC (`mac::Mbc`) before a segment ever reaches here — DLC never
//! sees a duplicate.

use crate::error::DlcError;

/// Size of one voice frame handed to the audio codec per direction.
/// DECT's B-field carries 320 bits (40 bytes) of user data per slot in
/// the common ADPCM-32 configuration; see `DESIGN.md`.
pub const AUDIO_FRAME_BYTES: usize = 40;

/// Reassembles a Class-A/B signalling frame from successive A-tail
/// segments.
#[derive(Debug, Default)]
pub struct LcReassembler {
    lsig: Option<u16>,
    buf: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LcFeedResult {
    /// Assembly still in progress.
    InProgress,
    /// Assembly complete; ready to hand to NWK.
    Complete(Vec<u8>),
}

impl LcReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received_len(&self) -> usize {
        self.buf.len()
    }

    pub fn lsig(&self) -> Option<u16> {
        self.lsig
    }

    fn reset(&mut self) {
        self.lsig = None;
        self.buf.clear();
    }

    /// Feeds one A-tail segment. A segment arriving with no assembly in
    /// progress starts one: its first two bytes are the 16-bit `lsig`
    /// length-signal header, the rest is initial payload. Subsequent
    /// segments append directly until `received_length == lsig`.
    pub fn feed(&mut self, segment: &[u8]) -> Result<LcFeedResult, DlcError> {
        if self.lsig.is_none() {
            if segment.len() < 2 {
                return Err(DlcError::MissingLsig);
            }
            let lsig = u16::from_be_bytes([segment[0], segment[1]]);
            self.lsig = Some(lsig);
            self.buf.extend_from_slice(&segment[2..]);
        } else {
            self.buf.extend_from_slice(segment);
        }

        let lsig = self.lsig.unwrap();
        if self.buf.len() as u32 > u32::from(lsig) {
            self.reset();
            return Err(DlcError::Overrun {
                received: self.buf.len(),
                lsig,
            });
        }

        if self.buf.len() == usize::from(lsig) {
            let sdu = std::mem::take(&mut self.buf);
            self.reset();
            Ok(LcFeedResult::Complete(sdu))
        } else {
            Ok(LcFeedResult::InProgress)
        }
    }
}

/// Reassembles post-decryption B-field bytes into fixed-size voice
/// frames for one direction of one bearer.
#[derive(Debug, Default)]
pub struct UPlaneReassembler {
    buf: Vec<u8>,
}

impl UPlaneReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `data` and drains any complete [`AUDIO_FRAME_BYTES`]-sized
    /// chunks now available.
    pub fn push(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(data);
        let mut chunks = Vec::new();
        while self.buf.len() >= AUDIO_FRAME_BYTES {
            chunks.push(self.buf.drain(0..AUDIO_FRAME_BYTES).collect());
        }
        chunks
    }
}
