//! Team roster payloads.

use serde::{Deserialize, Serialize};

use crate::Id;

/// A member of the team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    /// Member identifier (integer on the wire).
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Contact e-mail.
    pub email: String,
}

/// Response of `GET /team/members`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRoster {
    /// All members.
    #[serde(default)]
    pub members: Vec<TeamMember>,
}
