// src/auth/secret.rs
use astra::Request;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::errors::ServerError;

const LOCK_TOKEN_BYTES: usize = 16;

/// Random, URL-safe owner id for the sync lease.
pub fn new_lock_token() -> String {
    let mut buf = [0u8; LOCK_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

fn digest(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

/// Compare two secrets without leaking where they differ. Both sides are
/// hashed first so the comparison length never depends on the input.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let a = digest(provided);
    let b = digest(expected);
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get("Authorization")?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

/// Scheduler endpoints accept the shared secret either as a bearer token or
/// as a `secret` query parameter. With no secret configured nothing passes.
pub fn authorize_cron(
    req: &Request,
    query_secret: Option<&str>,
    expected: Option<&str>,
) -> Result<(), ServerError> {
    let Some(expected) = expected.filter(|s| !s.is_empty()) else {
        log::warn!("CRON_SECRET is not configured; refusing scheduler request");
        return Err(ServerError::Unauthorized);
    };

    let header_ok = bearer_token(req).is_some_and(|t| secrets_match(t, expected));
    let query_ok = query_secret.is_some_and(|s| secrets_match(s, expected));

    if header_ok || query_ok {
        Ok(())
    } else {
        Err(ServerError::Unauthorized)
    }
}
