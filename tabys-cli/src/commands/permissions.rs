use tabys_core::rbac::{self, Module, Operation, Role};

/// Permission table of one role, one module per line
pub fn render(role: &Role) -> String {
    if !role.is_known() {
        return format!("{}: unknown role (level 0, no permissions)\n", role);
    }

    let mut out = format!("{} (level {})\n", role, rbac::privilege_level(role));
    let modules = rbac::accessible_modules(role);
    if modules.is_empty() {
        out.push_str("  no modules\n");
    }
    for module in modules {
        out.push_str(&format!("  {:<13}{}\n", module.as_str(), operations(role, module)));
    }
    out
}

fn operations(role: &Role, module: Module) -> String {
    if rbac::is_read_only(role, module) {
        return "read (read-only)".to_string();
    }
    Operation::ALL
        .iter()
        .filter(|op| rbac::has_permission(role, module, **op))
        .map(|op| op.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
