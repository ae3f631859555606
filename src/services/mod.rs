// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - external collaborators of the exchange flow.

pub mod firebase_auth;
pub mod google_oauth;

pub use firebase_auth::{FirebaseTokenVerifier, IdentityError, IdentityVerifier, VerifiedUser};
pub use google_oauth::{CodeExchanger, ExchangeError, GoogleTokenExchanger, ProviderCredentials};
