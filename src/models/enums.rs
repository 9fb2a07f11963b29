use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Staff groups a user can belong to. A user in neither group is a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Role {
    #[serde(rename = "Manager")]
    Manager,
    #[serde(rename = "Delivery Crew")]
    DeliveryCrew,
}

impl Role {
    /// Group name as stored on the user record
    pub fn group_name(&self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::DeliveryCrew => "Delivery Crew",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manager" => Ok(Role::Manager),
            "delivery crew" | "delivery_crew" => Ok(Role::DeliveryCrew),
            _ => Err(format!("Unknown group: {}", s)),
        }
    }
}
