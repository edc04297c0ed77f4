//! Injectable access to environment variables.

use std::env::VarError;

/// Read-only view of the process environment.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Result<String, VarError>;
}

/// Delegates to `std::env`.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    #[inline]
    fn var(&self, key: &str) -> Result<String, VarError> {
        std::env::var(key)
    }
}

/// Map-backed environment that never touches the real process environment.
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryEnv {
    vars: std::cell::RefCell<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl InMemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.borrow_mut().insert(key.into(), value.into());
    }
}

#[cfg(test)]
impl ReadEnv for InMemoryEnv {
    fn var(&self, key: &str) -> Result<String, VarError> {
        self.vars
            .borrow()
            .get(key)
            .cloned()
            .ok_or(VarError::NotPresent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_matches_std() {
        assert_eq!(SystemEnv.var("PATH").is_ok(), std::env::var("PATH").is_ok());
    }

    #[test]
    fn in_memory_env_set_and_missing() {
        let env = InMemoryEnv::new();
        env.set("KEY", "value");
        assert_eq!(env.var("KEY").unwrap(), "value");
        assert!(matches!(env.var("OTHER"), Err(VarError::NotPresent)));
    }
}
