// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Paystack integration for wallet deposits and withdrawals.
//!
//! Deposits run through hosted checkout: `initialize_charge` returns an
//! authorization URL the client completes, and `verify_charge` confirms
//! the result. Withdrawals create a transfer recipient once per bank
//! account and then initiate transfers against it. Webhook payloads are
//! authenticated with the HMAC-SHA512 signature Paystack sends in
//! `x-paystack-signature`.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha512;
use tracing::info;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://api.paystack.co";
const DEFAULT_CALLBACK_URL: &str = "http://localhost:3000/wallet/callback";
const DEFAULT_CURRENCY: &str = "NGN";

type HmacSha512 = Hmac<Sha512>;

/// Provider-side outcome of a charge or transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayExecutionStatus {
    Pending,
    Completed,
    Failed,
}

/// Request to initialize a hosted-checkout deposit.
pub struct InitializeChargeRequest<'a> {
    pub reference: &'a str,
    pub email: &'a str,
    pub amount_minor: i64,
    pub wallet_id: &'a str,
}

/// Result of initializing a charge.
#[derive(Debug, Clone)]
pub struct InitializedCharge {
    pub authorization_url: String,
    pub reference: String,
}

/// Result of verifying a charge.
#[derive(Debug, Clone)]
pub struct VerifiedCharge {
    pub status: GatewayExecutionStatus,
    pub amount_minor: i64,
    pub raw_status: String,
}

/// Request to register a transfer recipient.
pub struct CreateRecipientRequest<'a> {
    pub account_name: &'a str,
    pub account_number: &'a str,
    pub bank_code: &'a str,
}

/// Result of initiating a transfer.
#[derive(Debug, Clone)]
pub struct InitiatedTransfer {
    pub transfer_code: String,
    pub status: GatewayExecutionStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum PaystackError {
    #[error("Paystack configuration missing: {0}")]
    MissingConfig(String),

    #[error("Paystack request failed: {0}")]
    Request(String),

    #[error("Paystack response was invalid: {0}")]
    InvalidResponse(String),

    #[error("Paystack declined the operation: {0}")]
    Declined(String),
}

#[derive(Debug, Clone)]
pub struct PaystackClient {
    api_base_url: String,
    secret_key: String,
    callback_url: String,
    currency: String,
    http: Client,
}

impl PaystackClient {
    pub fn is_configured() -> bool {
        env_optional("PAYSTACK_SECRET_KEY").is_some()
    }

    pub fn from_env() -> Result<Self, PaystackError> {
        let api_base_url = env_or_default("PAYSTACK_API_BASE_URL", DEFAULT_API_BASE_URL);
        let secret_key = env_required("PAYSTACK_SECRET_KEY")?;
        let callback_url = env_or_default("PAYSTACK_CALLBACK_URL", DEFAULT_CALLBACK_URL);
        Url::parse(&callback_url).map_err(|e| {
            PaystackError::MissingConfig(format!("PAYSTACK_CALLBACK_URL is not a valid URL: {e}"))
        })?;
        let currency = env_or_default("PAYSTACK_CURRENCY", DEFAULT_CURRENCY).to_ascii_uppercase();

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| PaystackError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url,
            secret_key,
            callback_url,
            currency,
            http,
        })
    }

    /// Initialize a hosted-checkout charge for a deposit.
    pub async fn initialize_charge(
        &self,
        request: InitializeChargeRequest<'_>,
    ) -> Result<InitializedCharge, PaystackError> {
        let payload = json!({
            "email": request.email,
            "amount": request.amount_minor,
            "currency": self.currency,
            "reference": request.reference,
            "callback_url": self.callback_url,
            "metadata": {
                "wallet_id": request.wallet_id,
            }
        });

        let data = self.post_json("/transaction/initialize", &payload).await?;

        let authorization_url = data
            .get("authorization_url")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PaystackError::InvalidResponse("missing authorization_url in response".to_string())
            })?
            .to_string();

        let reference = data
            .get("reference")
            .and_then(Value::as_str)
            .unwrap_or(request.reference)
            .to_string();

        Ok(InitializedCharge {
            authorization_url,
            reference,
        })
    }

    /// Verify a charge by its reference.
    pub async fn verify_charge(&self, reference: &str) -> Result<VerifiedCharge, PaystackError> {
        let data = self
            .get_json(&format!("/transaction/verify/{reference}"))
            .await?;

        let raw_status = data
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PaystackError::InvalidResponse("missing charge status in response".to_string())
            })?
            .to_string();

        let amount_minor = data.get("amount").and_then(Value::as_i64).unwrap_or(0);

        Ok(VerifiedCharge {
            status: map_charge_status(&raw_status),
            amount_minor,
            raw_status,
        })
    }

    /// Register a bank account as a transfer recipient.
    ///
    /// Returns the recipient code to reference in later transfers.
    pub async fn create_transfer_recipient(
        &self,
        request: CreateRecipientRequest<'_>,
    ) -> Result<String, PaystackError> {
        let payload = json!({
            "type": "nuban",
            "name": request.account_name,
            "account_number": request.account_number,
            "bank_code": request.bank_code,
            "currency": self.currency,
        });

        let data = self.post_json("/transferrecipient", &payload).await?;

        data.get("recipient_code")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PaystackError::InvalidResponse("missing recipient_code in response".to_string())
            })
    }

    /// Initiate a transfer to a registered recipient.
    pub async fn initiate_transfer(
        &self,
        recipient_code: &str,
        amount_minor: i64,
        reference: &str,
        reason: &str,
    ) -> Result<InitiatedTransfer, PaystackError> {
        let payload = json!({
            "source": "balance",
            "amount": amount_minor,
            "recipient": recipient_code,
            "reference": reference,
            "reason": reason,
        });

        info!(reference = %reference, "initiating gateway transfer");
        let data = self.post_json("/transfer", &payload).await?;

        let transfer_code = data
            .get("transfer_code")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PaystackError::InvalidResponse("missing transfer_code in response".to_string())
            })?
            .to_string();

        let raw_status = data.get("status").and_then(Value::as_str).unwrap_or("pending");

        Ok(InitiatedTransfer {
            transfer_code,
            status: map_transfer_status(raw_status),
        })
    }

    /// Fetch the current status of a transfer by code.
    pub async fn fetch_transfer_status(
        &self,
        transfer_code: &str,
    ) -> Result<GatewayExecutionStatus, PaystackError> {
        let data = self.get_json(&format!("/transfer/{transfer_code}")).await?;
        let raw_status = data
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PaystackError::InvalidResponse("missing transfer status in response".to_string())
            })?;
        Ok(map_transfer_status(raw_status))
    }

    /// Verify a webhook body against the `x-paystack-signature` header.
    pub fn verify_webhook_signature(&self, body: &[u8], signature_hex: &str) -> bool {
        let mut mac = HmacSha512::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(body);
        let Ok(expected) = decode_hex(signature_hex) else {
            return false;
        };
        mac.verify_slice(&expected).is_ok()
    }

    // =========================================================================
    // HTTP helpers
    //
    // Paystack wraps every response in `{ status, message, data }`; these
    // helpers unwrap to `data` and surface declined operations as errors.
    // =========================================================================

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, PaystackError> {
        let response = self
            .http
            .post(format!("{}{}", self.api_base_url.trim_end_matches('/'), path))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| PaystackError::Request(format!("POST {path} failed: {e}")))?;

        unwrap_envelope(path, response).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, PaystackError> {
        let response = self
            .http
            .get(format!("{}{}", self.api_base_url.trim_end_matches('/'), path))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .send()
            .await
            .map_err(|e| PaystackError::Request(format!("GET {path} failed: {e}")))?;

        unwrap_envelope(path, response).await
    }
}

async fn unwrap_envelope(path: &str, response: reqwest::Response) -> Result<Value, PaystackError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| PaystackError::InvalidResponse(format!("{path} invalid JSON: {e}")))?;

    let ok = body.get("status").and_then(Value::as_bool).unwrap_or(false);
    if !status.is_success() || !ok {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown gateway error");
        return Err(PaystackError::Declined(format!("{path}: {message}")));
    }

    body.get("data")
        .cloned()
        .ok_or_else(|| PaystackError::InvalidResponse(format!("{path} missing data field")))
}

pub fn map_charge_status(raw_status: &str) -> GatewayExecutionStatus {
    match raw_status.trim().to_ascii_lowercase().as_str() {
        "success" => GatewayExecutionStatus::Completed,
        "failed" | "abandoned" | "reversed" => GatewayExecutionStatus::Failed,
        _ => GatewayExecutionStatus::Pending,
    }
}

pub fn map_transfer_status(raw_status: &str) -> GatewayExecutionStatus {
    match raw_status.trim().to_ascii_lowercase().as_str() {
        "success" => GatewayExecutionStatus::Completed,
        "failed" | "reversed" | "rejected" => GatewayExecutionStatus::Failed,
        _ => GatewayExecutionStatus::Pending,
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, ()> {
    let value = value.trim();
    if value.len() % 2 != 0 {
        return Err(());
    }
    (0..value.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&value[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

fn env_required(name: &str) -> Result<String, PaystackError> {
    env_optional(name).ok_or_else(|| PaystackError::MissingConfig(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_status_mapping() {
        assert_eq!(map_charge_status("success"), GatewayExecutionStatus::Completed);
        assert_eq!(map_charge_status("FAILED"), GatewayExecutionStatus::Failed);
        assert_eq!(map_charge_status("abandoned"), GatewayExecutionStatus::Failed);
        assert_eq!(map_charge_status("ongoing"), GatewayExecutionStatus::Pending);
    }

    #[test]
    fn transfer_status_mapping() {
        assert_eq!(map_transfer_status("success"), GatewayExecutionStatus::Completed);
        assert_eq!(map_transfer_status("reversed"), GatewayExecutionStatus::Failed);
        assert_eq!(map_transfer_status("otp"), GatewayExecutionStatus::Pending);
        assert_eq!(map_transfer_status("pending"), GatewayExecutionStatus::Pending);
    }

    #[test]
    fn webhook_signature_roundtrip() {
        let client = PaystackClient {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            secret_key: "sk_test_secret".to_string(),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            currency: "NGN".to_string(),
            http: Client::new(),
        };

        let body = br#"{"event":"charge.success"}"#;
        let mut mac = HmacSha512::new_from_slice(b"sk_test_secret").unwrap();
        mac.update(body);
        let signature: String = mac
            .finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        assert!(client.verify_webhook_signature(body, &signature));
        assert!(!client.verify_webhook_signature(body, "deadbeef"));
        assert!(!client.verify_webhook_signature(b"tampered", &signature));
    }

    #[test]
    fn hex_decoding_rejects_odd_lengths() {
        assert!(decode_hex("abc").is_err());
        assert_eq!(decode_hex("ab").unwrap(), vec![0xab]);
    }
}
