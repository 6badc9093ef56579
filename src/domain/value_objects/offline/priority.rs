use serde::{Deserialize, Serialize};
use std::fmt;

/// 値が大きいほど先に処理される。既定値は範囲の中央。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionPriority(u8);

impl ActionPriority {
    pub const LOWEST: Self = Self(0);
    pub const DEFAULT: Self = Self(u8::MAX / 2 + 1);
    pub const HIGHEST: Self = Self(u8::MAX);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for ActionPriority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for ActionPriority {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for ActionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
