// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar;
pub mod google_oidc;
pub mod identity;

pub use calendar::{CalendarCoordinator, NicknameChange};
pub use google_oidc::{GoogleIdentity, GoogleOidcVerifier, OidcError};
pub use identity::{Identity, IdentityService};
