//! Identity data that access expressions are evaluated against.

/// What an access expression can ask about the requesting identity.
pub trait EvaluationContext {
    fn is_user(&self, name: &str) -> bool;
    fn belongs_to_group(&self, group: &str) -> bool;
}

/// Identity container backed by plain user/group data, with optional
/// simulation overlays.
///
/// Simulated sets are consulted first and are additive: a name found in the
/// overlay answers true, anything else falls through to the real identity.
/// Overlays survive until `clear_simulation`, so a caller can probe how an
/// expression behaves for other identities without losing its own.
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    user: Option<String>,
    groups: Vec<String>,
    simulated_users: Option<Vec<String>>,
    simulated_groups: Option<Vec<String>>,
}

impl AccessContext {
    /// An anonymous context: no user, no groups.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(
        user: impl Into<String>,
        groups: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        AccessContext {
            user: Some(user.into()),
            groups: groups.into_iter().map(Into::into).collect(),
            simulated_users: None,
            simulated_groups: None,
        }
    }

    pub fn set_user(&mut self, user: Option<String>) {
        self.user = user;
    }

    pub fn set_groups(&mut self, groups: impl IntoIterator<Item = impl Into<String>>) {
        self.groups = groups.into_iter().map(Into::into).collect();
    }

    pub fn simulate_users(&mut self, users: impl IntoIterator<Item = impl Into<String>>) {
        self.simulated_users = Some(users.into_iter().map(Into::into).collect());
    }

    pub fn simulate_groups(&mut self, groups: impl IntoIterator<Item = impl Into<String>>) {
        self.simulated_groups = Some(groups.into_iter().map(Into::into).collect());
    }

    pub fn clear_simulation(&mut self) {
        self.simulated_users = None;
        self.simulated_groups = None;
    }
}

impl EvaluationContext for AccessContext {
    fn is_user(&self, name: &str) -> bool {
        if let Some(sim) = &self.simulated_users {
            if sim.iter().any(|u| u == name) {
                return true;
            }
        }
        self.user.as_deref() == Some(name)
    }

    fn belongs_to_group(&self, group: &str) -> bool {
        if let Some(sim) = &self.simulated_groups {
            if sim.iter().any(|g| g == group) {
                return true;
            }
        }
        self.groups.iter().any(|g| g == group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_context_matches_nothing() {
        let ctx = AccessContext::new();
        assert!(!ctx.is_user("alice"));
        assert!(!ctx.belongs_to_group("staff"));
    }

    #[test]
    fn test_identity_lookup() {
        let ctx = AccessContext::with_identity("alice", ["staff", "admin"]);
        assert!(ctx.is_user("alice"));
        assert!(!ctx.is_user("bob"));
        assert!(ctx.belongs_to_group("admin"));
        assert!(!ctx.belongs_to_group("guests"));
    }

    #[test]
    fn test_simulation_is_additive_and_clearable() {
        let mut ctx = AccessContext::with_identity("alice", ["staff"]);
        ctx.simulate_users(["bob"]);
        ctx.simulate_groups(["guests"]);
        assert!(ctx.is_user("alice"));
        assert!(ctx.is_user("bob"));
        assert!(ctx.belongs_to_group("guests"));
        ctx.clear_simulation();
        assert!(!ctx.is_user("bob"));
        assert!(!ctx.belongs_to_group("guests"));
    }
}
