// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pass-phrase check gating self-signup with the authority role.
//!
//! This is a shared secret, not a credential: anyone who knows the
//! pass-phrase can sign up as an authority.

use subtle::ConstantTimeEq;

/// Pass-phrase used when `ADMIN_SECRET_KEY` is not set.
pub const DEFAULT_ADMIN_SECRET_KEY: &str = "TIDE_GUARD_2024";

/// Returns true iff `secret` equals `configured` exactly.
///
/// Case-sensitive, no trimming.
pub fn validate_admin_secret(secret: &str, configured: &str) -> bool {
    secret.as_bytes().ct_eq(configured.as_bytes()).into()
}
