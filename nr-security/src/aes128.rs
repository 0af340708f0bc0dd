//! 128-NEA2 / 128-NIA2: AES-128 in counter mode for confidentiality and
//! AES-128 CMAC for integrity (TS 33.401 Annexes B.1.3 and B.2.3, carried
//! into 5G by TS 33.501).

use aes::Aes128;
use cipher::{KeyIvInit, StreamCipher};
use cmac::{Cmac, Mac};

use crate::SecKey128;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// First counter block: COUNT || BEARER || DIRECTION || 0^26 || 0^64.
fn counter_block(count: u32, bearer: u8, direction: u32) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[0..4].copy_from_slice(&count.to_be_bytes());
    iv[4] = (bearer << 3) | ((direction as u8) << 2);
    iv
}

/// 128-NEA2: AES-128-CTR keystream, XORed in place.
pub fn nea2(key: &SecKey128, count: u32, bearer: u8, direction: u32, data: &mut [u8]) {
    let iv = counter_block(count, bearer, direction);
    let mut cipher = Aes128Ctr::new(key.into(), &iv.into());
    cipher.apply_keystream(data);
}

/// 128-NIA2: AES-128 CMAC over COUNT || BEARER || DIRECTION || 0^26 || message,
/// truncated to the 32 most significant bits.
pub fn nia2(key: &SecKey128, count: u32, bearer: u8, direction: u32, msg: &[u8]) -> [u8; 4] {
    let mut mac = <Cmac<Aes128> as Mac>::new(key.into());
    mac.update(&counter_block(count, bearer, direction)[0..8]);
    mac.update(msg);
    let tag = mac.finalize().into_bytes();
    [tag[0], tag[1], tag[2], tag[3]]
}
