//! Mobile-money payment seam.
//!
//! Subscriptions ask a [`PaymentGateway`] to push a payment prompt to the
//! customer's phone. The provider reports the result later through the
//! billing callback, keyed by the checkout request id returned here.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::info;

/// A payment prompt to push to a customer.
#[derive(Debug, Clone)]
pub struct PaymentRequest<'a> {
    /// MSISDN in international form without `+`, e.g. `254712345678`.
    pub phone: &'a str,
    /// Whole shillings.
    pub amount: i64,
    /// Our reference, echoed back by the provider.
    pub reference: &'a str,
    pub description: &'a str,
}

/// Provider acknowledgement of an accepted prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAck {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment request rejected: {0}")]
    Rejected(String),

    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

pub trait PaymentGateway: Send + Sync {
    fn initiate_payment(&self, request: &PaymentRequest<'_>) -> Result<PaymentAck, PaymentError>;
}

/// Offline gateway that accepts well-formed requests and hands out
/// sandbox-style checkout ids. No network traffic.
pub struct SandboxGateway {
    shortcode: String,
    seq: AtomicU64,
}

impl SandboxGateway {
    pub fn new(shortcode: impl Into<String>) -> Self {
        Self {
            shortcode: shortcode.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn shortcode(&self) -> &str {
        &self.shortcode
    }
}

impl PaymentGateway for SandboxGateway {
    fn initiate_payment(&self, request: &PaymentRequest<'_>) -> Result<PaymentAck, PaymentError> {
        if !is_kenyan_msisdn(request.phone) {
            return Err(PaymentError::Rejected(format!(
                "invalid PhoneNumber {}",
                request.phone
            )));
        }
        if request.amount <= 0 {
            return Err(PaymentError::Rejected("Amount must be positive".to_string()));
        }
        if request.reference.is_empty() {
            return Err(PaymentError::Rejected("AccountReference is required".to_string()));
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let stamp = chrono::Utc::now().format("%d%m%Y%H%M%S");
        let ack = PaymentAck {
            merchant_request_id: format!("{}-{}-{}", self.shortcode, stamp, seq),
            checkout_request_id: format!("ws_CO_{}{:06}", stamp, seq),
        };
        info!(
            shortcode = %self.shortcode,
            reference = request.reference,
            amount = request.amount,
            checkout_request_id = %ack.checkout_request_id,
            "sandbox payment prompt accepted"
        );
        Ok(ack)
    }
}

fn is_kenyan_msisdn(phone: &str) -> bool {
    phone.len() == 12 && phone.starts_with("254") && phone.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(phone: &str, amount: i64) -> PaymentRequest<'_> {
        PaymentRequest {
            phone,
            amount,
            reference: "SUB-1",
            description: "Subscription Payment",
        }
    }

    #[test]
    fn test_sandbox_accepts_valid_request() {
        let gw = SandboxGateway::new("174379");
        let a = gw.initiate_payment(&request("254712345678", 500)).unwrap();
        let b = gw.initiate_payment(&request("254712345678", 500)).unwrap();
        assert!(a.checkout_request_id.starts_with("ws_CO_"));
        assert_ne!(a.checkout_request_id, b.checkout_request_id);
        assert!(a.merchant_request_id.starts_with("174379-"));
    }

    #[test]
    fn test_sandbox_rejects_bad_input() {
        let gw = SandboxGateway::new("174379");
        assert!(matches!(
            gw.initiate_payment(&request("0712345678", 500)),
            Err(PaymentError::Rejected(_))
        ));
        assert!(matches!(
            gw.initiate_payment(&request("254712345678", 0)),
            Err(PaymentError::Rejected(_))
        ));
    }
}
