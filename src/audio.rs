//! Audio Handle: two G.726 codec states and
//! two per-direction pending buffers for the U-plane. The codec body
//! itself is an external collaborator; this module models
//! the handle and the trait boundary it plugs into.

use crate::dlc::UPlaneReassembler;
use crate::nwk::Direction;

/// Opaque per-direction codec state. The real ADPCM (G.726) decoder is
/// out of scope; this crate only carries the slot so a real codec can
/// be dropped in behind [`AudioCodec`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CodecState;

/// Capability boundary a real ADPCM decoder implements. Kept minimal:
/// one fixed-size frame of decrypted B-field bytes in, PCM samples out.
pub trait AudioCodec {
    fn decode_frame(&mut self, state: &mut CodecState, frame: &[u8]) -> Vec<i16>;
}

#[derive(Debug, Default)]
pub struct AudioHandle {
    codec: [CodecState; 2],
    reassembler: [UPlaneReassembler; 2],
}

impl AudioHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn idx(direction: Direction) -> usize {
        match direction {
            Direction::FpToPt => 0,
            Direction::PtToFp => 1,
        }
    }

    /// Appends decrypted B-field bytes for `direction` and drains any
    /// whole frames now available, ready for [`AudioCodec::decode_frame`].
    pub fn push(&mut self, direction: Direction, data: &[u8]) -> Vec<Vec<u8>> {
        self.reassembler[Self::idx(direction)].push(data)
    }

    pub fn codec_state_mut(&mut self, direction: Direction) -> &mut CodecState {
        &mut self.codec[Self::idx(direction)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_reassemble_independently() {
        let mut handle = AudioHandle::new();
        assert!(handle
            .push(Direction::FpToPt, &[0u8; crate::dlc::AUDIO_FRAME_BYTES])
            .len()
            == 1);
        assert!(handle.push(Direction::PtToFp, &[0u8; 5]).is_empty());
    }
}
