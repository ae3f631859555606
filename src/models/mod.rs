// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod exchange;
pub mod user;

pub use exchange::ExchangeRequest;
pub use user::UserCredentials;
