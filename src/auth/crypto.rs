//! Stellar signature verification
//!
//! Proves that a caller controls the private key for a wallet address by
//! checking an ed25519 signature over the challenge string. The public key
//! is recovered from the Stellar G-address (base32 strkey with a version
//! byte and CRC16-XModem checksum).

use base32::Alphabet;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

/// Errors that can occur during signature verification
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid Stellar address format: {0}")]
    InvalidAddressFormat(String),

    #[error("Invalid address checksum")]
    InvalidChecksum,

    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Capability that proves control of a wallet's private key.
///
/// Returns `Ok(true)` only when `signature` is a valid signature over
/// `challenge` by the key behind `wallet_address`. Malformed inputs are
/// errors; a well-formed but wrong signature is `Ok(false)`.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        wallet_address: &str,
        signature: &str,
        challenge: &str,
    ) -> Result<bool, CryptoError>;
}

/// Ed25519 verifier for Stellar wallets
#[derive(Debug, Clone, Default)]
pub struct StellarSignatureVerifier;

impl SignatureVerifier for StellarSignatureVerifier {
    fn verify(
        &self,
        wallet_address: &str,
        signature_base64: &str,
        challenge: &str,
    ) -> Result<bool, CryptoError> {
        let public_key_bytes = decode_stellar_public_key(wallet_address)?;

        let signature_bytes = base64::engine::general_purpose::STANDARD
            .decode(signature_base64)
            .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(signature_base64))
            .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

        let verifying_key = VerifyingKey::from_bytes(&public_key_bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

        Ok(verifying_key.verify(challenge.as_bytes(), &signature).is_ok())
    }
}

/// Decode a Stellar public key from G-address format.
///
/// The strkey layout is 1 version byte + 32 key bytes + 2 checksum bytes,
/// base32-encoded without padding.
pub fn decode_stellar_public_key(address: &str) -> Result<[u8; 32], CryptoError> {
    if !address.starts_with('G') {
        return Err(CryptoError::InvalidAddressFormat(
            "Stellar public keys must start with 'G'".to_string(),
        ));
    }

    let decoded = base32::decode(Alphabet::Rfc4648 { padding: false }, address)
        .ok_or_else(|| CryptoError::InvalidAddressFormat("Invalid base32 encoding".to_string()))?;

    if decoded.len() != 35 {
        return Err(CryptoError::InvalidAddressFormat(format!(
            "Expected 35 bytes, got {}",
            decoded.len()
        )));
    }

    let payload = &decoded[..33];
    let checksum = &decoded[33..35];
    if checksum != crc16_xmodem(payload) {
        return Err(CryptoError::InvalidChecksum);
    }

    // Skip the version byte
    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&decoded[1..33]);

    Ok(public_key)
}

/// Encode raw ed25519 public key bytes as a Stellar G-address
pub fn encode_stellar_address(public_key: &[u8; 32]) -> String {
    // Version byte 6 << 3 = 0x30, which maps to 'G' in the strkey alphabet
    let mut payload = Vec::with_capacity(35);
    payload.push(6 << 3);
    payload.extend_from_slice(public_key);
    let checksum = crc16_xmodem(&payload);
    payload.extend_from_slice(&checksum);

    base32::encode(Alphabet::Rfc4648 { padding: false }, &payload)
}

/// Calculate CRC16-XModem checksum (used by Stellar strkeys)
fn crc16_xmodem(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0;

    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }

    // Little-endian byte order
    [(crc & 0xff) as u8, (crc >> 8) as u8]
}
