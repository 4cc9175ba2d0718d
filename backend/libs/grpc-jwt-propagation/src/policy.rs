//! Method-level access policy
//!
//! Maps full gRPC method paths (`/package.Service/Method`) to the roles
//! allowed to call them. A method with no entry is public.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<String, Vec<String>>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `method` to `roles`, replacing any previous entry
    pub fn allow<R: Into<String>>(
        mut self,
        method: impl Into<String>,
        roles: impl IntoIterator<Item = R>,
    ) -> Self {
        self.rules
            .insert(method.into(), roles.into_iter().map(Into::into).collect());
        self
    }

    /// Roles allowed to call `method`, or `None` when the method is public
    pub fn allowed_roles(&self, method: &str) -> Option<&[String]> {
        self.rules.get(method).map(Vec::as_slice)
    }

    pub fn requires_auth(&self, method: &str) -> bool {
        self.rules.contains_key(method)
    }

    /// Every method that requires a token
    pub fn protected_methods(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}
