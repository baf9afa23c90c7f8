//! One-time password reset tokens.
//!
//! The plaintext token only ever travels to the person (inside the reset email job).
//! Storage keeps its SHA-256 digest, so a leaked row cannot be replayed.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const RESET_TOKEN_LENGTH: usize = 48;

lazy_static! {
    static ref RESET_TOKEN_REGEX: Regex = Regex::new(r"^[A-Za-z0-9]{48}$").unwrap();
}

/// Draws a fresh token from the thread-local CSPRNG.
pub fn generate_reset_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Hex-encoded SHA-256 digest of a token, as stored.
pub fn hash_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Cheap shape check done before touching storage.
pub fn is_well_formed(token: &str) -> bool {
    RESET_TOKEN_REGEX.is_match(token)
}

/// URL-safe, unpadded base64 of the person id's bytes, as carried in reset links.
pub fn encode_uid(person_id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(person_id.as_bytes())
}

/// Reverses [`encode_uid`]. Anything that is not 16 encoded bytes yields `None`.
pub fn decode_uid(uidb64: &str) -> Option<Uuid> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64).ok()?;
    Uuid::from_slice(&bytes).ok()
}
