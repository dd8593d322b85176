use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Payment,
    Refund,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Payment => "PAYMENT",
            PaymentType::Refund => "REFUND",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PAYMENT" => Some(PaymentType::Payment),
            "REFUND" => Some(PaymentType::Refund),
            _ => None,
        }
    }
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
