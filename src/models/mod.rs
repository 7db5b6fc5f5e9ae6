// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod coupon;
pub mod establishment;
pub mod filter;
pub mod user;

pub use coupon::Coupon;
pub use establishment::{Establishment, RankedEstablishment};
pub use filter::{EstablishmentFilter, FilterState, Origin};
pub use user::{BirthdayUser, Role, UserRole};
