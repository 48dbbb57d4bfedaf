use std::collections::HashMap;

/// A source of environment variables.
///
/// Connectors read their credentials through this trait so that the process
/// environment can be swapped for a fixed map when embedding or testing.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads variables from the environment of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Picks the caller's override when it is non-empty, otherwise the variable.
pub(crate) fn override_or_var(
    env: &impl Environment,
    value: Option<&str>,
    key: &str,
) -> Option<String> {
    match value {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => env.var(key),
    }
}
