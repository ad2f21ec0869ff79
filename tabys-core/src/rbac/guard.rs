//! Explicit guards for handlers
//!
//! Handlers call these at the top instead of relying on wrappers, and branch
//! on the returned [`Guard`]. Denials are logged; rendering is left to the
//! caller.

use super::context::RbacContext;
use super::roles::{Module, Operation, Role};
use crate::gate::RequestContext;
use crate::logging;
use std::fmt;

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Allow,
    Deny(Denial),
}

impl Guard {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Guard::Allow)
    }

    /// Convert into a `Result` so handlers can use `?`
    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Guard::Allow => Ok(()),
            Guard::Deny(denial) => Err(denial),
        }
    }
}

/// Why a guard denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    NotAuthenticated,
    MissingPermission { role: String, module: Module, operation: Operation },
    MissingRole { role: String, required: Vec<Role> },
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::NotAuthenticated => write!(f, "Authentication required"),
            Denial::MissingPermission { role, module, operation } => {
                write!(f, "Access denied: {} cannot {} {}", role, operation, module)
            }
            Denial::MissingRole { role, required } => {
                let names: Vec<&str> = required.iter().map(Role::as_str).collect();
                write!(f, "Access denied: requires one of {}, got {}", names.join(", "), role)
            }
        }
    }
}

impl std::error::Error for Denial {}

/// Caller must hold a live session
pub fn require_auth(ctx: &RequestContext) -> Guard {
    if ctx.is_authenticated() {
        Guard::Allow
    } else {
        Guard::Deny(Denial::NotAuthenticated)
    }
}

/// Caller's role must grant `operation` on `module`
pub fn require_permission(rbac: &RbacContext, module: Module, operation: Operation) -> Guard {
    if rbac.role().is_none() {
        return Guard::Deny(Denial::NotAuthenticated);
    }
    if rbac.can(module, operation) {
        return Guard::Allow;
    }
    logging::permission_denied(rbac.role_label(), module, operation);
    Guard::Deny(Denial::MissingPermission {
        role: rbac.role_label().to_string(),
        module,
        operation,
    })
}

/// Caller's role must be one of `roles`
pub fn require_role(rbac: &RbacContext, roles: &[Role]) -> Guard {
    if rbac.role().is_none() {
        return Guard::Deny(Denial::NotAuthenticated);
    }
    if rbac.has_role(roles) {
        return Guard::Allow;
    }
    log::warn!("[RBAC:DENIED] role={} | requires one of {:?}", rbac.role_label(), roles);
    Guard::Deny(Denial::MissingRole { role: rbac.role_label().to_string(), required: roles.to_vec() })
}

/// Caller's role must be at least as privileged as `required`
pub fn require_rank(rbac: &RbacContext, required: &Role) -> Guard {
    if rbac.role().is_none() {
        return Guard::Deny(Denial::NotAuthenticated);
    }
    if rbac.outranks(required) {
        return Guard::Allow;
    }
    log::warn!("[RBAC:DENIED] role={} | ranks below {}", rbac.role_label(), required);
    Guard::Deny(Denial::MissingRole {
        role: rbac.role_label().to_string(),
        required: vec![required.clone()],
    })
}
