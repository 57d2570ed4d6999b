use std::collections::BTreeSet;

/// Decides whether the current user holds a permission.
pub trait PermissionChecker: Send + Sync {
    fn is_granted(&self, permission: &str) -> bool;
}

/// Fixed set of granted permissions.
///
/// A permission ending in `*` grants everything starting with the part before
/// it, so `orm.model.*` grants `orm.model.Article.read`.
#[derive(Debug, Clone, Default)]
pub struct GrantedPermissions {
    permissions: BTreeSet<String>,
    admin: bool,
}

impl GrantedPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants every permission.
    pub fn admin() -> Self {
        Self {
            permissions: BTreeSet::new(),
            admin: true,
        }
    }

    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Parses a comma separated list, `*` alone grants everything.
    pub fn parse(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .fold(Self::new(), |granted, permission| {
                if permission == "*" {
                    Self { admin: true, ..granted }
                } else {
                    granted.grant(permission)
                }
            })
    }
}

impl PermissionChecker for GrantedPermissions {
    fn is_granted(&self, permission: &str) -> bool {
        if self.admin || self.permissions.contains(permission) {
            return true;
        }

        self.permissions.iter().any(|granted| {
            granted
                .strip_suffix('*')
                .is_some_and(|prefix| permission.starts_with(prefix))
        })
    }
}
