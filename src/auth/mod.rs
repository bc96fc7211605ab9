// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! # Authentication Module
//!
//! Bearer JWT authentication for the Hearth Marketplace API.
//!
//! ## Auth Flow
//!
//! 1. The client authenticates with the identity provider
//! 2. The client sends `Authorization: Bearer <JWT>`
//! 3. This server:
//!    - Fetches the provider JWKS via HTTPS
//!    - Verifies JWT signature, expiry, issuer, audience
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `publicMetadata.role` → marketplace role
//!      - `email` → used for gateway checkout
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - JWT verification uses HTTPS-only JWKS fetching
//! - JWKS is cached with TTL for performance
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod roles;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, CreatorOnly, OptionalAuth};
pub use jwks::JwksManager;
pub use roles::Role;
