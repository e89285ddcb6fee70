//! Caller identity as resolved by the upstream authentication collaborator.

use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// Role
///
/// Closed role vocabulary. Role names arriving from untrusted sources that do
/// not match a known role deserialize to `Unrecognized`, which every policy
/// table resolves to deny-all.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[display("admin")]
    Admin,
    #[display("operator")]
    Operator,
    #[serde(other)]
    #[display("unrecognized")]
    Unrecognized,
}

///
/// Identity
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Identity {
    pub id: i64,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub const fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }
}
