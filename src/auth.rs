//! Passive authentication derivation.
//!
//! DECT's own DSAA is, like DSC, never published by ETSI. This derives
//! UAK/RES1/DCK with AES-CMAC, tagging each derivation so the UAK
//! itself is keyed material for a fixed-purpose byte run rather than
//! reused directly as output — the same shape other link-layer
//! protocols use to derive several distinct session keys from one root
//! key — rather than guessing at DSAA's undisclosed internals.

use aes::cipher::{generic_array::GenericArray, KeyInit};
use aes::Aes128;
use cmac::{Cmac, Mac};

pub const UAK_LEN: usize = 16;
pub const DCK_LEN: usize = 8;

const TAG_RES1: u8 = 0x01;
const TAG_DCK: u8 = 0x02;

fn pin_to_key(pin: &[u8]) -> GenericArray<u8, aes::cipher::consts::U16> {
    // "the PIN is zero-padded into an auth-key input"
    let mut key = [0u8; UAK_LEN];
    let n = pin.len().min(UAK_LEN);
    key[..n].copy_from_slice(&pin[..n]);
    GenericArray::from(key)
}

/// Derive the 128-bit UAK from the configured PIN and RS, for the
/// key-allocation exchange.
pub fn derive_uak(pin: &[u8], rs: u64) -> [u8; UAK_LEN] {
    let pin_key = pin_to_key(pin);
    let mut mac = <Cmac<Aes128> as Mac>::new(&pin_key);
    mac.update(&rs.to_le_bytes());
    mac.finalize().into_bytes().into()
}

fn uak_cmac(uak: &[u8; UAK_LEN], tag: u8, rs: u64, rand_f: u64) -> [u8; 16] {
    let key = GenericArray::from(*uak);
    let mut mac = <Cmac<Aes128> as Mac>::new(&key);
    mac.update(&[tag]);
    mac.update(&rs.to_le_bytes());
    mac.update(&rand_f.to_le_bytes());
    mac.finalize().into_bytes().into()
}

/// The 32-bit response the PT is expected to return; matching the
/// observed RES confirms the PIN.
pub fn compute_res1(uak: &[u8; UAK_LEN], rs: u64, rand_f: u64) -> u32 {
    let tag = uak_cmac(uak, TAG_RES1, rs, rand_f);
    u32::from_le_bytes(tag[0..4].try_into().unwrap())
}

/// The 64-bit Derived Cipher Key.
pub fn derive_dck(uak: &[u8; UAK_LEN], rs: u64, rand_f: u64) -> u64 {
    let tag = uak_cmac(uak, TAG_DCK, rs, rand_f);
    u64::from_le_bytes(tag[0..8].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let uak1 = derive_uak(b"1234", 0xAABB_CCDD);
        let uak2 = derive_uak(b"1234", 0xAABB_CCDD);
        assert_eq!(uak1, uak2);
    }

    #[test]
    fn different_pins_yield_different_uak() {
        assert_ne!(derive_uak(b"1234", 7), derive_uak(b"4321", 7));
    }

    #[test]
    fn res1_and_dck_differ_even_from_same_uak() {
        let uak = derive_uak(b"0000", 1);
        let res1 = compute_res1(&uak, 1, 2);
        let dck = derive_dck(&uak, 1, 2);
        assert_ne!(res1 as u64, dck);
    }

    #[test]
    fn empty_or_non_numeric_pin_still_runs() {
        let uak = derive_uak(b"", 99);
        let _res1 = compute_res1(&uak, 99, 1);
        let uak2 = derive_uak(b"not-a-pin", 99);
        assert_ne!(uak, uak2);
    }
}
