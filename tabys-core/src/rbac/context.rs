//! Access-control context scoped to the caller's role

use super::permissions;
use super::roles::{Module, Operation, Role};

/// Permission checker for one request
///
/// Built from the session's role, or with no role for anonymous callers, in
/// which case every check answers deny and no module is accessible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RbacContext {
    role: Option<Role>,
}

impl RbacContext {
    /// Context for an authenticated role
    pub fn for_role(role: Role) -> Self {
        Self { role: Some(role) }
    }

    /// Context with no role
    pub fn anonymous() -> Self {
        Self { role: None }
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    /// Role name for messages, `guest` when anonymous
    pub fn role_label(&self) -> &str {
        self.role.as_ref().map(Role::as_str).unwrap_or("guest")
    }

    pub fn can(&self, module: Module, operation: Operation) -> bool {
        self.role.as_ref().is_some_and(|r| permissions::has_permission(r, module, operation))
    }

    pub fn can_read(&self, module: Module) -> bool {
        self.can(module, Operation::Read)
    }

    pub fn can_create(&self, module: Module) -> bool {
        self.can(module, Operation::Create)
    }

    pub fn can_update(&self, module: Module) -> bool {
        self.can(module, Operation::Update)
    }

    pub fn can_delete(&self, module: Module) -> bool {
        self.can(module, Operation::Delete)
    }

    /// Check by wire names, e.g. from callback data; unparsable names deny
    pub fn can_named(&self, module: &str, operation: &str) -> bool {
        match (module.parse::<Module>(), operation.parse::<Operation>()) {
            (Ok(m), Ok(op)) => self.can(m, op),
            _ => false,
        }
    }

    pub fn is_read_only(&self, module: Module) -> bool {
        self.role.as_ref().is_some_and(|r| permissions::is_read_only(r, module))
    }

    pub fn accessible_modules(&self) -> Vec<Module> {
        self.role.as_ref().map(permissions::accessible_modules).unwrap_or_default()
    }

    /// True when the role is one of `roles`
    pub fn has_role(&self, roles: &[Role]) -> bool {
        self.role.as_ref().is_some_and(|r| roles.contains(r))
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_ref().is_some_and(permissions::is_admin)
    }

    pub fn is_super_admin(&self) -> bool {
        self.role.as_ref().is_some_and(permissions::is_super_admin)
    }

    /// Hierarchy check against `required`; anonymous never outranks
    pub fn outranks(&self, required: &Role) -> bool {
        self.role.as_ref().is_some_and(|r| permissions::outranks(r, required))
    }
}
