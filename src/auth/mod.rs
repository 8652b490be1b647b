//! Authentication module for the DOB Validator backend
//!
//! Provides wallet-based authentication using Stellar addresses.
//! - Challenge-response authentication with single-use challenges
//! - JWT token generation and two-layer validation
//! - Session management with server-side revocation
//! - Periodic expiry sweep over both stores

pub mod cleanup;
mod crypto;
mod jwt;
mod service;

pub use cleanup::{CleanupScheduler, SweepStats};
pub use crypto::{
    decode_stellar_public_key, encode_stellar_address, CryptoError, SignatureVerifier,
    StellarSignatureVerifier,
};
pub use jwt::{issue_token, verify_token, Claims, JwtError};
pub use service::{AuthError, AuthService, AuthenticatedIdentity, IssuedSession};
