//! # NR AS Security
//!
//! Integrity protection and ciphering for 5G NR radio bearers, as used by the
//! PDCP layer (TS 38.323 / TS 33.501).
//!
//! Every algorithm takes the same per-packet inputs: a 128-bit key, the
//! 32-bit COUNT, the 5-bit bearer identity and the direction bit. The
//! algorithm families are:
//!
//! - **NEA0/NIA0**: null ciphering / all-zero MAC.
//! - **NEA1/NIA1**: SNOW 3G based (f8/f9 constructions).
//! - **NEA2/NIA2**: AES-128 in CTR mode / AES-128 CMAC.
//! - **NEA3/NIA3**: ZUC based (128-EEA3/128-EIA3 constructions).
//!
//! The [`SecurityEngineTx`] and [`SecurityEngineRx`] facades apply the
//! configured pair of algorithms to a framed PDU. They are stateless per
//! call and safe to invoke from a pool of worker threads.

pub mod aes128;
pub mod engine;
pub mod snow3g;
pub mod zuc;

pub use engine::{SecurityEngineRx, SecurityEngineTx};

use thiserror::Error;

/// A 128-bit AS key (K_RRCint, K_RRCenc, K_UPint or K_UPenc).
pub type SecKey128 = [u8; 16];

/// Length of the MAC-I trailer appended by integrity protection.
pub const MAC_LEN: usize = 4;

/// NR integrity protection algorithm (TS 33.501, Annex D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityAlgorithm {
    Nia0,
    Nia1,
    Nia2,
    Nia3,
}

/// NR ciphering algorithm (TS 33.501, Annex D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipheringAlgorithm {
    Nea0,
    Nea1,
    Nea2,
    Nea3,
}

/// Whether keys protect control plane (RRC) or user plane traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityDomain {
    Rrc,
    Up,
}

/// Transfer direction, as seen from the UE (TS 33.501: uplink = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityDirection {
    Uplink,
    Downlink,
}

impl SecurityDirection {
    pub fn bit(self) -> u32 {
        match self {
            SecurityDirection::Uplink => 0,
            SecurityDirection::Downlink => 1,
        }
    }
}

/// Keys and algorithm selection for one bearer. Replaced atomically on
/// security (re)configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityConfig {
    pub k_128_int: SecKey128,
    pub k_128_enc: SecKey128,
    pub integ_algo: IntegrityAlgorithm,
    pub cipher_algo: CipheringAlgorithm,
    pub domain: SecurityDomain,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("integrity verification failed")]
    IntegrityFailure,
    #[error("PDU too short to carry a MAC-I")]
    TruncatedPdu,
}

/// Computes the 4-byte MAC-I over `msg` with the selected algorithm.
pub fn compute_mac(
    algo: IntegrityAlgorithm,
    key: &SecKey128,
    count: u32,
    bearer: u8,
    direction: SecurityDirection,
    msg: &[u8],
) -> [u8; MAC_LEN] {
    match algo {
        IntegrityAlgorithm::Nia0 => [0; MAC_LEN],
        IntegrityAlgorithm::Nia1 => snow3g::nia1(key, count, bearer, direction.bit(), msg),
        IntegrityAlgorithm::Nia2 => aes128::nia2(key, count, bearer, direction.bit(), msg),
        IntegrityAlgorithm::Nia3 => zuc::nia3(key, count, bearer, direction.bit(), msg),
    }
}

/// Applies the selected keystream in place. Encryption and decryption are
/// the same operation for every NEA family.
pub fn apply_keystream(
    algo: CipheringAlgorithm,
    key: &SecKey128,
    count: u32,
    bearer: u8,
    direction: SecurityDirection,
    data: &mut [u8],
) {
    match algo {
        CipheringAlgorithm::Nea0 => {}
        CipheringAlgorithm::Nea1 => snow3g::nea1(key, count, bearer, direction.bit(), data),
        CipheringAlgorithm::Nea2 => aes128::nea2(key, count, bearer, direction.bit(), data),
        CipheringAlgorithm::Nea3 => zuc::nea3(key, count, bearer, direction.bit(), data),
    }
}
