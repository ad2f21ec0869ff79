//! Tabys RBAC (Role-Based Access Control) Module
//!
//! Every operation in the bot is gated on a (role, module, operation) triple
//! looked up in a static permission table. A separate privilege ordering over
//! roles answers "does role A outrank role B"; the two mechanisms are
//! independent and both apply.
//!
//! # Example
//! ```rust,ignore
//! use tabys_core::rbac::{Module, Operation, RbacContext, Role};
//!
//! let rbac = RbacContext::for_role(Role::Npo);
//! assert!(rbac.can(Module::Events, Operation::Delete));
//! assert!(!rbac.can_read(Module::News));
//! ```

mod context;
pub mod guard;
pub mod permissions;
mod roles;

pub use context::RbacContext;
pub use guard::{Denial, Guard};
pub use permissions::{
    accessible_modules, has_permission, is_admin, is_read_only, is_super_admin, outranks,
    privilege_level,
};
pub use roles::{Module, Operation, Role, UnknownName};
