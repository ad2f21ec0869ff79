//! Static permission table and role hierarchy
//!
//! Mirrors the backend RBAC table. Every known role has an entry (possibly
//! empty); a module missing from a role's entry grants nothing. Both the table
//! and the hierarchy are compile-time constants, so every function here is pure
//! and can be called from any task without coordination.

use super::roles::{Module, Operation, Role};

/// Operations granted on one module
pub type ModuleGrant = (Module, &'static [Operation]);

const FULL: &[Operation] =
    &[Operation::Read, Operation::Create, Operation::Update, Operation::Delete];
const READ_ONLY: &[Operation] = &[Operation::Read];

const CLIENT: &[ModuleGrant] = &[];

const VOLUNTEER_ADMIN: &[ModuleGrant] = &[(Module::Volunteers, FULL)];

const MSB: &[ModuleGrant] = &[(Module::Vacancies, FULL), (Module::Leisure, FULL)];

const NPO: &[ModuleGrant] = &[(Module::Projects, FULL), (Module::Events, FULL)];

const GOVERNMENT: &[ModuleGrant] = &[
    (Module::Volunteers, READ_ONLY),
    (Module::Vacancies, READ_ONLY),
    (Module::Leisure, READ_ONLY),
    (Module::Projects, READ_ONLY),
    (Module::Events, READ_ONLY),
    (Module::News, READ_ONLY),
    (Module::Users, READ_ONLY),
    (Module::Courses, READ_ONLY),
    (Module::Certificates, READ_ONLY),
    (Module::Experts, READ_ONLY),
    (Module::Resumes, READ_ONLY),
];

const ADMINISTRATOR: &[ModuleGrant] = &[
    (Module::News, FULL),
    (Module::Users, FULL),
    (Module::Volunteers, FULL),
    (Module::Vacancies, FULL),
    (Module::Leisure, FULL),
    (Module::Projects, FULL),
    (Module::Events, FULL),
    (Module::Courses, FULL),
    (Module::Certificates, FULL),
    (Module::Experts, FULL),
    (Module::Resumes, FULL),
];

const SUPER_ADMIN: &[ModuleGrant] = &[
    (Module::Volunteers, FULL),
    (Module::Vacancies, FULL),
    (Module::Leisure, FULL),
    (Module::Projects, FULL),
    (Module::Events, FULL),
    (Module::News, FULL),
    (Module::Users, FULL),
    (Module::Courses, FULL),
    (Module::Certificates, FULL),
    (Module::Experts, FULL),
    (Module::Resumes, FULL),
];

/// Roles allowed into the admin area
const ADMIN_ROLES: &[Role] = &[Role::Administrator, Role::SuperAdmin];

/// Table entry for a role; unknown roles get the empty entry
pub fn grants(role: &Role) -> &'static [ModuleGrant] {
    match role {
        Role::Client => CLIENT,
        Role::VolunteerAdmin => VOLUNTEER_ADMIN,
        Role::Msb => MSB,
        Role::Npo => NPO,
        Role::Government => GOVERNMENT,
        Role::Administrator => ADMINISTRATOR,
        Role::SuperAdmin => SUPER_ADMIN,
        Role::Other(_) => &[],
    }
}

/// Operations a role holds on a module (empty when the module is absent)
pub fn operations(role: &Role, module: Module) -> &'static [Operation] {
    grants(role).iter().find(|(m, _)| *m == module).map(|(_, ops)| *ops).unwrap_or(&[])
}

/// True iff `operation` is granted to `role` on `module`
pub fn has_permission(role: &Role, module: Module, operation: Operation) -> bool {
    operations(role, module).contains(&operation)
}

/// Modules on which the role holds at least one operation, in table order
pub fn accessible_modules(role: &Role) -> Vec<Module> {
    grants(role).iter().filter(|(_, ops)| !ops.is_empty()).map(|(m, _)| *m).collect()
}

/// Read granted and no write operation granted
pub fn is_read_only(role: &Role, module: Module) -> bool {
    let ops = operations(role, module);
    ops.contains(&Operation::Read) && !Operation::WRITES.iter().any(|op| ops.contains(op))
}

/// Privilege level (0 lowest); unknown roles sit at 0
pub fn privilege_level(role: &Role) -> u8 {
    match role {
        Role::Client => 0,
        Role::VolunteerAdmin | Role::Msb | Role::Npo => 1,
        Role::Government => 2,
        Role::Administrator => 3,
        Role::SuperAdmin => 4,
        Role::Other(_) => 0,
    }
}

/// True iff `role` is at least as privileged as `other`
///
/// Independent of the permission table: a lower-ranked role may still hold
/// module permissions a higher one lacks.
pub fn outranks(role: &Role, other: &Role) -> bool {
    privilege_level(role) >= privilege_level(other)
}

pub fn is_admin(role: &Role) -> bool {
    ADMIN_ROLES.contains(role)
}

pub fn is_super_admin(role: &Role) -> bool {
    *role == Role::SuperAdmin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_roles() -> Vec<Role> {
        let mut roles = Role::KNOWN.to_vec();
        roles.push(Role::Other("moderator".to_string()));
        roles
    }

    #[test]
    fn test_absent_module_grants_nothing() {
        for role in all_roles() {
            let present: Vec<Module> = grants(&role).iter().map(|(m, _)| *m).collect();
            for module in Module::ALL.iter().filter(|m| !present.contains(m)) {
                for op in Operation::ALL {
                    assert!(
                        !has_permission(&role, *module, op),
                        "{} should not {} {}",
                        role,
                        op,
                        module
                    );
                }
            }
        }
    }

    #[test]
    fn test_read_only_matches_definition() {
        for role in all_roles() {
            for module in Module::ALL {
                let expected = has_permission(&role, module, Operation::Read)
                    && !Operation::WRITES.iter().any(|op| has_permission(&role, module, *op));
                assert_eq!(is_read_only(&role, module), expected, "{} on {}", role, module);
            }
        }
    }

    #[test]
    fn test_specific_grants() {
        assert!(has_permission(&Role::Npo, Module::Events, Operation::Delete));
        assert!(!has_permission(&Role::Npo, Module::News, Operation::Read));
        assert!(has_permission(&Role::Msb, Module::Leisure, Operation::Create));
        assert!(has_permission(&Role::Government, Module::Users, Operation::Read));
        assert!(!has_permission(&Role::Government, Module::Users, Operation::Update));
        assert!(is_read_only(&Role::Government, Module::Resumes));
        assert!(!is_read_only(&Role::Administrator, Module::Resumes));
        assert!(!is_read_only(&Role::Client, Module::News));
    }

    #[test]
    fn test_accessible_modules() {
        assert!(accessible_modules(&Role::Client).is_empty());
        assert!(accessible_modules(&Role::Other("ghost".to_string())).is_empty());
        assert_eq!(accessible_modules(&Role::VolunteerAdmin), vec![Module::Volunteers]);
        assert_eq!(accessible_modules(&Role::Npo), vec![Module::Projects, Module::Events]);

        let admin = accessible_modules(&Role::Administrator);
        assert_eq!(admin.len(), Module::ALL.len());
        for module in Module::ALL {
            assert!(admin.contains(&module));
        }
    }

    #[test]
    fn test_hierarchy() {
        assert!(outranks(&Role::SuperAdmin, &Role::Administrator));
        assert!(!outranks(&Role::Government, &Role::Administrator));
        assert!(outranks(&Role::Npo, &Role::Npo));
        assert!(outranks(&Role::Msb, &Role::VolunteerAdmin));
        assert!(outranks(&Role::VolunteerAdmin, &Role::Msb));
        assert!(!outranks(&Role::Other("ghost".to_string()), &Role::Npo));
        assert!(outranks(&Role::Client, &Role::Other("ghost".to_string())));
    }

    #[test]
    fn test_hierarchy_orthogonal_to_table() {
        // npo ranks below government but may delete events, government may not
        assert!(!outranks(&Role::Npo, &Role::Government));
        assert!(has_permission(&Role::Npo, Module::Events, Operation::Delete));
        assert!(!has_permission(&Role::Government, Module::Events, Operation::Delete));
    }

    #[test]
    fn test_admin_predicates() {
        assert!(is_admin(&Role::Administrator));
        assert!(is_admin(&Role::SuperAdmin));
        assert!(!is_admin(&Role::Government));
        assert!(is_super_admin(&Role::SuperAdmin));
        assert!(!is_super_admin(&Role::Administrator));
    }
}
