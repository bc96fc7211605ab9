// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Payment gateway clients.

pub mod paystack;

pub use paystack::{
    CreateRecipientRequest, GatewayExecutionStatus, InitializeChargeRequest, InitializedCharge,
    InitiatedTransfer, PaystackClient, PaystackError, VerifiedCharge,
};
