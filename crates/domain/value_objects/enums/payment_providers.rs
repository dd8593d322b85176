use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    PayHere,
    Manual,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::PayHere => "PAYHERE",
            PaymentProvider::Manual => "MANUAL",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PAYHERE" => Some(PaymentProvider::PayHere),
            "MANUAL" => Some(PaymentProvider::Manual),
            _ => None,
        }
    }
}

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
