use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier of a broker, unique within one cluster.
///
/// Pods and nodes carry broker ids as string labels; they are parsed into a
/// `BrokerId` once at the boundary and compared as integers afterwards.
/// Used as a map key in the status, where serde_json renders it as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrokerId(i32);

impl BrokerId {
    pub const fn new(id: i32) -> Self {
        BrokerId(id)
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for BrokerId {
    fn from(id: i32) -> Self {
        BrokerId(id)
    }
}

impl FromStr for BrokerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i32>().map(BrokerId)
    }
}

impl fmt::Display for BrokerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
