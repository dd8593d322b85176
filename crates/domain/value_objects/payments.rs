use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::payments::{PaymentEntity, PaymentNotificationChangeset};
use crate::domain::value_objects::enums::{
    payment_methods::PaymentMethod, payment_statuses::PaymentStatus,
};
use crate::domain::value_objects::validation::FieldViolation;

/// Notification body exactly as the provider posted it. Kept for audit, never interpreted
/// beyond the fields of [`PayHereNotification`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawNotifyPayload(BTreeMap<String, String>);

impl RawNotifyPayload {
    /// Parses an `application/x-www-form-urlencoded` body. Repeated keys keep the last value.
    pub fn from_form(body: &[u8]) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
        Ok(Self(pairs.into_iter().collect()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
                .collect(),
        )
    }
}

impl FromIterator<(String, String)> for RawNotifyPayload {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Typed view over the notify fields. Missing signed fields become empty strings so the
/// signature check fails instead of the request being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayHereNotification {
    pub merchant_id: String,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub payhere_amount: String,
    pub payhere_currency: String,
    pub status_code: String,
    pub md5sig: String,
    pub method: Option<String>,
}

impl PayHereNotification {
    pub fn from_payload(payload: &RawNotifyPayload) -> Result<Self, FieldViolation> {
        let text = |key: &str| payload.get(key).map(str::trim).unwrap_or_default().to_string();
        let optional = |key: &str| {
            payload
                .get(key)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let order_id = text("order_id");
        if order_id.is_empty() {
            return Err(FieldViolation::new("order_id", "is required"));
        }

        Ok(Self {
            merchant_id: text("merchant_id"),
            order_id,
            payment_id: optional("payment_id"),
            payhere_amount: text("payhere_amount"),
            payhere_currency: text("payhere_currency"),
            status_code: text("status_code"),
            md5sig: text("md5sig"),
            method: optional("method"),
        })
    }

    pub fn mapped_status(&self) -> PaymentStatus {
        PaymentStatus::from_payhere_code(&self.status_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyDecision {
    Apply {
        status: PaymentStatus,
        signature_verified: bool,
    },
    NoChange,
}

/// Compare-and-set rule for an incoming notification against the stored payment state.
///
/// An unverified notification fails any payment that has not settled yet, whatever code it
/// carries. A verified `SUCCESS` is left only for a verified `CHARGEDBACK`, and `CHARGEDBACK`
/// is final.
pub fn decide_notification(
    current_status: PaymentStatus,
    current_verified: bool,
    incoming_status: PaymentStatus,
    incoming_verified: bool,
) -> NotifyDecision {
    if !incoming_verified {
        if current_status.is_terminal() {
            return NotifyDecision::NoChange;
        }
        return NotifyDecision::Apply {
            status: PaymentStatus::Failed,
            signature_verified: false,
        };
    }

    if current_verified {
        if current_status == incoming_status {
            return NotifyDecision::NoChange;
        }
        match current_status {
            PaymentStatus::Chargedback => return NotifyDecision::NoChange,
            PaymentStatus::Success if incoming_status != PaymentStatus::Chargedback => {
                return NotifyDecision::NoChange;
            }
            status if status.is_terminal() && incoming_status == PaymentStatus::Pending => {
                return NotifyDecision::NoChange;
            }
            _ => {}
        }
    }

    NotifyDecision::Apply {
        status: incoming_status,
        signature_verified: true,
    }
}

/// Columns written for an applied decision. `paid_at` is only stamped for a verified success.
pub fn notification_changeset(
    status: PaymentStatus,
    signature_verified: bool,
    notification: &PayHereNotification,
    payload: &RawNotifyPayload,
    now: DateTime<Utc>,
) -> PaymentNotificationChangeset {
    let mut changeset = PaymentNotificationChangeset {
        status: Some(status.as_str().to_string()),
        signature_verified: Some(signature_verified),
        raw_notify_payload: Some(payload.to_json()),
        updated_at: Some(now),
        ..Default::default()
    };

    if signature_verified {
        changeset.provider_payment_id = notification.payment_id.clone();
        changeset.method = Some(PaymentMethod::Online.as_str().to_string());
        if status == PaymentStatus::Success {
            changeset.paid_at = Some(now);
        }
    }

    changeset
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCustomerModel {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutModel {
    pub booking_id: Uuid,
    #[serde(default)]
    pub customer: CheckoutCustomerModel,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub items: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusModel {
    pub status: PaymentStatus,
    pub md5sig_verified: bool,
    pub order_id: String,
    pub payhere_payment_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentStatusEnvelope {
    pub payment: PaymentStatusModel,
}

impl TryFrom<&PaymentEntity> for PaymentStatusModel {
    type Error = anyhow::Error;

    fn try_from(value: &PaymentEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            status: value.payment_status()?,
            md5sig_verified: value.signature_verified,
            order_id: value.order_id.clone().unwrap_or_default(),
            payhere_payment_id: value.provider_payment_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    fn payload(pairs: &[(&str, &str)]) -> RawNotifyPayload {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn parses_form_body_and_keeps_last_duplicate() {
        let raw = RawNotifyPayload::from_form(
            b"order_id=TO-ORDER-1&status_code=0&status_code=2&custom_1=hello+world",
        )
        .unwrap();

        assert_eq!(raw.get("order_id"), Some("TO-ORDER-1"));
        assert_eq!(raw.get("status_code"), Some("2"));
        assert_eq!(raw.get("custom_1"), Some("hello world"));
        assert_eq!(raw.len(), 3);
        assert_eq!(raw.to_json()["custom_1"], "hello world");
    }

    #[test]
    fn notification_requires_order_id() {
        let err = PayHereNotification::from_payload(&payload(&[("status_code", "2")])).unwrap_err();
        assert_eq!(err.field, "order_id");
    }

    #[test]
    fn notification_tolerates_missing_signed_fields() {
        let notification =
            PayHereNotification::from_payload(&payload(&[("order_id", "TO-ORDER-1")])).unwrap();
        assert_eq!(notification.md5sig, "");
        assert_eq!(notification.payment_id, None);
        assert_eq!(notification.mapped_status(), Failed);
    }

    #[test]
    fn verified_notification_applies_to_fresh_payment() {
        for incoming in [Success, Pending, Failed, Canceled, Chargedback] {
            assert_eq!(
                decide_notification(Initiated, false, incoming, true),
                NotifyDecision::Apply {
                    status: incoming,
                    signature_verified: true
                }
            );
        }
    }

    #[test]
    fn unverified_notification_forces_failure_on_unverified_payment() {
        assert_eq!(
            decide_notification(Initiated, false, Success, false),
            NotifyDecision::Apply {
                status: Failed,
                signature_verified: false
            }
        );
        assert_eq!(
            decide_notification(Failed, false, Success, false),
            NotifyDecision::NoChange
        );
    }

    #[test]
    fn unverified_notification_fails_verified_pending_payment() {
        for incoming in [Success, Pending, Chargedback] {
            assert_eq!(
                decide_notification(Pending, true, incoming, false),
                NotifyDecision::Apply {
                    status: Failed,
                    signature_verified: false
                }
            );
        }
    }

    #[test]
    fn unverified_notification_never_touches_settled_payment() {
        for current in [Success, Failed, Canceled, Chargedback] {
            for verified in [true, false] {
                assert_eq!(
                    decide_notification(current, verified, Success, false),
                    NotifyDecision::NoChange
                );
            }
        }
    }

    #[test]
    fn replaying_same_verified_status_is_a_no_op() {
        assert_eq!(
            decide_notification(Success, true, Success, true),
            NotifyDecision::NoChange
        );
        assert_eq!(
            decide_notification(Failed, true, Failed, true),
            NotifyDecision::NoChange
        );
    }

    #[test]
    fn verified_success_only_yields_to_chargeback() {
        for incoming in [Pending, Failed, Canceled] {
            assert_eq!(
                decide_notification(Success, true, incoming, true),
                NotifyDecision::NoChange
            );
        }
        assert_eq!(
            decide_notification(Success, true, Chargedback, true),
            NotifyDecision::Apply {
                status: Chargedback,
                signature_verified: true
            }
        );
        assert_eq!(
            decide_notification(Chargedback, true, Success, true),
            NotifyDecision::NoChange
        );
    }

    #[test]
    fn pending_does_not_regress_terminal_status() {
        assert_eq!(
            decide_notification(Failed, true, Pending, true),
            NotifyDecision::NoChange
        );
        assert_eq!(
            decide_notification(Pending, true, Success, true),
            NotifyDecision::Apply {
                status: Success,
                signature_verified: true
            }
        );
    }

    #[test]
    fn verified_notification_recovers_forced_failure() {
        assert_eq!(
            decide_notification(Failed, false, Success, true),
            NotifyDecision::Apply {
                status: Success,
                signature_verified: true
            }
        );
    }

    #[test]
    fn changeset_stamps_paid_at_only_for_verified_success() {
        let raw = payload(&[
            ("order_id", "TO-ORDER-1"),
            ("payment_id", "320025071278"),
            ("status_code", "2"),
        ]);
        let notification = PayHereNotification::from_payload(&raw).unwrap();
        let now = Utc::now();

        let success = notification_changeset(Success, true, &notification, &raw, now);
        assert_eq!(success.paid_at, Some(now));
        assert_eq!(success.method.as_deref(), Some("ONLINE"));
        assert_eq!(success.provider_payment_id.as_deref(), Some("320025071278"));

        let failed = notification_changeset(Failed, true, &notification, &raw, now);
        assert_eq!(failed.paid_at, None);

        let forced = notification_changeset(Failed, false, &notification, &raw, now);
        assert_eq!(forced.signature_verified, Some(false));
        assert_eq!(forced.provider_payment_id, None);
        assert_eq!(forced.method, None);
        assert!(forced.raw_notify_payload.is_some());
    }

    #[test]
    fn status_envelope_uses_client_field_names() {
        let envelope = PaymentStatusEnvelope {
            payment: PaymentStatusModel {
                status: Success,
                md5sig_verified: true,
                order_id: "TO-ORDER-1".to_string(),
                payhere_payment_id: Some("320025071278".to_string()),
            },
        };

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["payment"]["status"], "SUCCESS");
        assert_eq!(json["payment"]["md5sigVerified"], true);
        assert_eq!(json["payment"]["orderId"], "TO-ORDER-1");
        assert_eq!(json["payment"]["payherePaymentId"], "320025071278");
    }
}
