//! DECT Standard Cipher keystream engine.
//!
//! ETSI never published the DSC algorithm itself, so this implements
//! the documented *shape* of the contract — a 64-bit IV built from
//! (multiframe, frame), a 64-bit key, a multi-round prekey schedule,
//! then per-byte output, fully re-keyed on every call — using the
//! AES/CMAC primitives already in this crate's dependency stack rather
//! than guessing at undisclosed constants. See `DESIGN.md` for the
//! open question this resolves.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use cmac::{Cmac, Mac};

/// Rounds run before the first keystream byte is produced.
pub const PREKEY_ROUNDS: u8 = 35;

/// `low 4 bits = frame number, next 24 bits = multiframe number, rest zero`.
pub fn dsc_iv(mfn: u32, frame: u8) -> u64 {
    let frame_bits = u64::from(frame) & 0xF;
    let mfn_bits = (u64::from(mfn) & 0x00FF_FFFF) << 4;
    mfn_bits | frame_bits
}

fn expand_key(key: u64) -> GenericArray<u8, aes::cipher::consts::U16> {
    let half = key.to_le_bytes();
    let mut full = [0u8; 16];
    full[0..8].copy_from_slice(&half);
    full[8..16].copy_from_slice(&half);
    GenericArray::from(full)
}

fn prekey(iv: u64, aes_key: &GenericArray<u8, aes::cipher::consts::U16>) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[0..8].copy_from_slice(&iv.to_le_bytes());
    for round in 0..PREKEY_ROUNDS {
        let mut mac = <Cmac<Aes128> as Mac>::new(aes_key);
        mac.update(&block);
        mac.update(&[round]);
        block = mac.finalize().into_bytes().into();
    }
    block
}

/// Produces `len` bytes of keystream for `(iv, key)`. Stateless across
/// calls: every call re-derives the prekey schedule from scratch.
pub fn keystream(iv: u64, key: u64, len: usize) -> Vec<u8> {
    let aes_key = expand_key(key);
    let cipher = Aes128::new(&aes_key);
    let seed = prekey(iv, &aes_key);

    let mut out = Vec::with_capacity(len + 16);
    let mut counter: u64 = 0;
    while out.len() < len {
        let mut block = GenericArray::from(seed);
        for (b, c) in block[8..16].iter_mut().zip(counter.to_le_bytes()) {
            *b ^= c;
        }
        cipher.encrypt_block(&mut block);
        out.extend_from_slice(&block);
        counter = counter.wrapping_add(1);
    }
    out.truncate(len);
    out
}

/// XORs `data` in place against the keystream for `(iv, key)`.
pub fn xor_in_place(data: &mut [u8], iv: u64, key: u64) {
    let ks = keystream(iv, key, data.len());
    for (d, k) in data.iter_mut().zip(ks) {
        *d ^= k;
    }
}
