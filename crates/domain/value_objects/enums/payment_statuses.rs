use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Initiated,
    Pending,
    Success,
    Failed,
    Canceled,
    Chargedback,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "INITIATED",
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Canceled => "CANCELED",
            PaymentStatus::Chargedback => "CHARGEDBACK",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "INITIATED" => Some(PaymentStatus::Initiated),
            "PENDING" => Some(PaymentStatus::Pending),
            "SUCCESS" => Some(PaymentStatus::Success),
            "FAILED" => Some(PaymentStatus::Failed),
            "CANCELED" => Some(PaymentStatus::Canceled),
            "CHARGEDBACK" => Some(PaymentStatus::Chargedback),
            _ => None,
        }
    }

    /// Maps a PayHere `status_code` to a payment status. Unknown codes are failures.
    pub fn from_payhere_code(code: &str) -> Self {
        match code.trim() {
            "2" => PaymentStatus::Success,
            "0" => PaymentStatus::Pending,
            "-1" => PaymentStatus::Canceled,
            "-2" => PaymentStatus::Failed,
            "-3" => PaymentStatus::Chargedback,
            _ => PaymentStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Success
                | PaymentStatus::Failed
                | PaymentStatus::Canceled
                | PaymentStatus::Chargedback
        )
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
