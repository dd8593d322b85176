use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    Booking,
    Maintenance,
    Personal,
    Other,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Booking => "BOOKING",
            BlockReason::Maintenance => "MAINTENANCE",
            BlockReason::Personal => "PERSONAL",
            BlockReason::Other => "OTHER",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "BOOKING" => Some(BlockReason::Booking),
            "MAINTENANCE" => Some(BlockReason::Maintenance),
            "PERSONAL" => Some(BlockReason::Personal),
            "OTHER" => Some(BlockReason::Other),
            _ => None,
        }
    }
}

impl Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
