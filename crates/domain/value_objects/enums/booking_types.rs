use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingType {
    Package,
    Vehicle,
    Custom,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Package => "PACKAGE",
            BookingType::Vehicle => "VEHICLE",
            BookingType::Custom => "CUSTOM",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PACKAGE" => Some(BookingType::Package),
            "VEHICLE" => Some(BookingType::Vehicle),
            "CUSTOM" => Some(BookingType::Custom),
            _ => None,
        }
    }
}

impl Display for BookingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
