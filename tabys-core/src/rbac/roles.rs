//! Role, module and operation vocabulary shared with the backend

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity class assigned by the backend
///
/// Roles the bot does not know are kept verbatim in [`Role::Other`] so a
/// session written by a newer backend still round-trips; such roles hold no
/// permissions and sit at the lowest privilege level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Client,
    VolunteerAdmin,
    Msb,
    Npo,
    Government,
    Administrator,
    SuperAdmin,
    /// Role string not known to this build
    Other(String),
}

impl Role {
    /// All roles known to the permission table, lowest privilege first
    pub const KNOWN: [Role; 7] = [
        Role::Client,
        Role::VolunteerAdmin,
        Role::Msb,
        Role::Npo,
        Role::Government,
        Role::Administrator,
        Role::SuperAdmin,
    ];

    /// Wire name of the role
    pub fn as_str(&self) -> &str {
        match self {
            Role::Client => "client",
            Role::VolunteerAdmin => "volunteer_admin",
            Role::Msb => "msb",
            Role::Npo => "npo",
            Role::Government => "government",
            Role::Administrator => "administrator",
            Role::SuperAdmin => "super_admin",
            Role::Other(name) => name,
        }
    }

    /// Whether this role is one of the known variants
    pub fn is_known(&self) -> bool {
        !matches!(self, Role::Other(_))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "client" => Role::Client,
            "volunteer_admin" => Role::VolunteerAdmin,
            "msb" => Role::Msb,
            "npo" => Role::Npo,
            "government" => Role::Government,
            "administrator" => Role::Administrator,
            "super_admin" => Role::SuperAdmin,
            _ => Role::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content domain gated independently by the permission table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Volunteers,
    Vacancies,
    Leisure,
    Projects,
    Events,
    News,
    Users,
    Courses,
    Certificates,
    Experts,
    Resumes,
}

impl Module {
    pub const ALL: [Module; 11] = [
        Module::Volunteers,
        Module::Vacancies,
        Module::Leisure,
        Module::Projects,
        Module::Events,
        Module::News,
        Module::Users,
        Module::Courses,
        Module::Certificates,
        Module::Experts,
        Module::Resumes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Volunteers => "volunteers",
            Module::Vacancies => "vacancies",
            Module::Leisure => "leisure",
            Module::Projects => "projects",
            Module::Events => "events",
            Module::News => "news",
            Module::Users => "users",
            Module::Courses => "courses",
            Module::Certificates => "certificates",
            Module::Experts => "experts",
            Module::Resumes => "resumes",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownName { kind: "module", name: s.to_string() })
    }
}

/// Action checked per (role, module)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] =
        [Operation::Read, Operation::Create, Operation::Update, Operation::Delete];

    /// Operations that change data
    pub const WRITES: [Operation; 3] = [Operation::Create, Operation::Update, Operation::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownName { kind: "operation", name: s.to_string() })
    }
}

/// Parse failure for module and operation names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {name}")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_round_trip() {
        for role in Role::KNOWN {
            let name: String = role.clone().into();
            assert_eq!(Role::from(name), role);
        }
    }

    #[test]
    fn test_unknown_role_kept_verbatim() {
        let role = Role::from("moderator");
        assert_eq!(role, Role::Other("moderator".to_string()));
        assert!(!role.is_known());
        assert_eq!(role.to_string(), "moderator");

        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"moderator\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, role);
    }

    #[test]
    fn test_role_serde_uses_wire_names() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
        let role: Role = serde_json::from_str("\"volunteer_admin\"").unwrap();
        assert_eq!(role, Role::VolunteerAdmin);
    }

    #[test]
    fn test_module_and_operation_parsing() {
        assert_eq!("certificates".parse::<Module>().unwrap(), Module::Certificates);
        assert_eq!("delete".parse::<Operation>().unwrap(), Operation::Delete);

        let err = "payments".parse::<Module>().unwrap_err();
        assert_eq!(err.to_string(), "unknown module: payments");
        assert!("READ".parse::<Operation>().is_err());
    }
}
