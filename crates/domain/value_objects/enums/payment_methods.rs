use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Bank,
    CardOther,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Bank => "BANK",
            PaymentMethod::CardOther => "CARD_OTHER",
            PaymentMethod::Online => "ONLINE",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "CASH" => Some(PaymentMethod::Cash),
            "BANK" => Some(PaymentMethod::Bank),
            "CARD_OTHER" => Some(PaymentMethod::CardOther),
            "ONLINE" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
