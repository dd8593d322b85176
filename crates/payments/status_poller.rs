use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use mockall::automock;
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::value_objects::{
    enums::payment_statuses::PaymentStatus,
    payments::{PaymentStatusEnvelope, PaymentStatusModel},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLookup {
    Found(PaymentStatusModel),
    NotFound,
}

#[automock]
#[async_trait]
pub trait PaymentStatusSource {
    async fn fetch_status(&self, order_id: String) -> Result<StatusLookup>;
}

/// Reads the public status endpoint, e.g. from a return-page client.
pub struct HttpPaymentStatusSource {
    http: reqwest::Client,
    status_url: Url,
}

impl HttpPaymentStatusSource {
    pub fn new(api_base_url: &Url) -> Result<Self> {
        let status_url = Url::parse(&format!(
            "{}/api/v1/payments/payhere/status",
            api_base_url.as_str().trim_end_matches('/')
        ))
        .context("invalid payment status url")?;

        Ok(Self {
            http: reqwest::Client::new(),
            status_url,
        })
    }
}

#[async_trait]
impl PaymentStatusSource for HttpPaymentStatusSource {
    async fn fetch_status(&self, order_id: String) -> Result<StatusLookup> {
        let resp = self
            .http
            .get(self.status_url.clone())
            .query(&[("orderId", order_id.as_str())])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(StatusLookup::NotFound);
        }
        if !resp.status().is_success() {
            anyhow::bail!("payment status request failed with {}", resp.status());
        }

        let envelope: PaymentStatusEnvelope = resp.json().await?;
        Ok(StatusLookup::Found(envelope.payment))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            interval: Duration::from_secs(2),
        }
    }
}

/// `Inconclusive` means "we don't know yet", never "it failed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed(PaymentStatusModel),
    Failed(PaymentStatusModel),
    Inconclusive {
        attempts: u32,
        last_seen: Option<PaymentStatusModel>,
    },
}

fn settle(payment: &PaymentStatusModel) -> Option<bool> {
    match payment.status {
        PaymentStatus::Success if payment.md5sig_verified => Some(true),
        PaymentStatus::Failed | PaymentStatus::Canceled | PaymentStatus::Chargedback => Some(false),
        _ => None,
    }
}

/// Polls until the payment settles or the attempts run out. Lookup errors and unknown
/// orders use up an attempt without ending the loop. Dropping the future stops polling.
pub async fn poll_until_settled<S>(source: &S, order_id: &str, policy: PollPolicy) -> PollOutcome
where
    S: PaymentStatusSource + Send + Sync + ?Sized,
{
    let mut last_seen = None;

    for attempt in 1..=policy.max_attempts {
        match source.fetch_status(order_id.to_string()).await {
            Ok(StatusLookup::Found(payment)) => match settle(&payment) {
                Some(true) => {
                    info!(%order_id, attempt, "payment_status: confirmed");
                    return PollOutcome::Confirmed(payment);
                }
                Some(false) => {
                    info!(%order_id, attempt, status = %payment.status, "payment_status: failed");
                    return PollOutcome::Failed(payment);
                }
                None => {
                    debug!(%order_id, attempt, status = %payment.status, "payment_status: not settled yet");
                    last_seen = Some(payment);
                }
            },
            Ok(StatusLookup::NotFound) => {
                debug!(%order_id, attempt, "payment_status: order not found yet");
            }
            Err(err) => {
                warn!(%order_id, attempt, error = ?err, "payment_status: lookup failed");
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    warn!(%order_id, attempts = policy.max_attempts, "payment_status: gave up without a final status");
    PollOutcome::Inconclusive {
        attempts: policy.max_attempts,
        last_seen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn fast_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            interval: Duration::from_millis(1),
        }
    }

    fn payment(status: PaymentStatus, verified: bool) -> PaymentStatusModel {
        PaymentStatusModel {
            status,
            md5sig_verified: verified,
            order_id: "TO-ABC123-1718000000000".to_string(),
            payhere_payment_id: None,
        }
    }

    #[test]
    fn default_policy_is_fifteen_tries_two_seconds_apart() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 15);
        assert_eq!(policy.interval, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn confirms_after_pending_rounds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut source = MockPaymentStatusSource::new();
        source.expect_fetch_status().times(3).returning(move |_| {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            Ok(StatusLookup::Found(if call < 2 {
                payment(PaymentStatus::Initiated, false)
            } else {
                payment(PaymentStatus::Success, true)
            }))
        });

        let outcome = poll_until_settled(&source, "TO-ABC123-1718000000000", fast_policy(15)).await;

        assert_eq!(outcome, PollOutcome::Confirmed(payment(PaymentStatus::Success, true)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failure_and_cancel_end_the_loop() {
        for status in [PaymentStatus::Failed, PaymentStatus::Canceled] {
            let mut source = MockPaymentStatusSource::new();
            source
                .expect_fetch_status()
                .times(1)
                .returning(move |_| Ok(StatusLookup::Found(payment(status, true))));

            let outcome = poll_until_settled(&source, "order", fast_policy(15)).await;

            assert_eq!(outcome, PollOutcome::Failed(payment(status, true)));
        }
    }

    #[tokio::test]
    async fn unverified_success_is_not_confirmation() {
        let mut source = MockPaymentStatusSource::new();
        source
            .expect_fetch_status()
            .times(4)
            .returning(|_| Ok(StatusLookup::Found(payment(PaymentStatus::Success, false))));

        let outcome = poll_until_settled(&source, "order", fast_policy(4)).await;

        assert_eq!(
            outcome,
            PollOutcome::Inconclusive {
                attempts: 4,
                last_seen: Some(payment(PaymentStatus::Success, false)),
            }
        );
    }

    #[tokio::test]
    async fn errors_and_not_found_use_up_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut source = MockPaymentStatusSource::new();
        source.expect_fetch_status().times(5).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(anyhow::anyhow!("connection reset"))
            } else {
                Ok(StatusLookup::NotFound)
            }
        });

        let outcome = poll_until_settled(&source, "order", fast_policy(5)).await;

        assert_eq!(
            outcome,
            PollOutcome::Inconclusive {
                attempts: 5,
                last_seen: None,
            }
        );
    }

    #[tokio::test]
    async fn dropping_the_future_stops_polling() {
        let mut source = MockPaymentStatusSource::new();
        source
            .expect_fetch_status()
            .times(1)
            .returning(|_| Ok(StatusLookup::Found(payment(PaymentStatus::Pending, true))));

        let policy = PollPolicy {
            max_attempts: 15,
            interval: Duration::from_secs(3600),
        };
        let result = tokio::time::timeout(
            Duration::from_millis(20),
            poll_until_settled(&source, "order", policy),
        )
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn builds_status_url_from_base() {
        let source =
            HttpPaymentStatusSource::new(&Url::parse("https://api.tours.example.lk/").unwrap())
                .unwrap();
        assert_eq!(
            source.status_url.as_str(),
            "https://api.tours.example.lk/api/v1/payments/payhere/status"
        );
    }
}
