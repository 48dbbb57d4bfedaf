use std::fmt;

use indexmap::IndexMap;

const REDACTED: &str = "********";
const PASSWORD: &str = "password";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Snowflake,
}

/// Connection parameters assembled from the environment.
///
/// Keys keep the order they were inserted in. A key may be present with a `None`
/// value, which is different from the key being absent: the Snowflake SSO path
/// relies on removing `password` altogether.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    backend: Backend,
    params: IndexMap<String, Option<String>>,
}

impl ConnectionConfig {
    pub(crate) fn new<K, I>(backend: Backend, params: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<String>)>,
    {
        Self {
            backend,
            params: params
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Returns the value of `key`, or `None` when it is absent or null.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|value| value.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns a copy with `key` set to `value`, appended if it was absent.
    pub fn with(&self, key: &str, value: Option<&str>) -> Self {
        let mut params = self.params.clone();
        params.insert(key.to_string(), value.map(str::to_string));
        Self {
            backend: self.backend,
            params,
        }
    }

    /// Returns a copy without `key`.
    pub fn without(&self, key: &str) -> Self {
        let mut params = self.params.clone();
        params.shift_remove(key);
        Self {
            backend: self.backend,
            params,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in self.iter() {
            match (key, value) {
                (PASSWORD, Some(_)) => map.entry(&key, &Some(REDACTED)),
                _ => map.entry(&key, &value),
            };
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConnectionConfig {
        ConnectionConfig::new(
            Backend::Snowflake,
            [
                ("user", Some("alice".to_string())),
                ("password", Some("hunter2".to_string())),
                ("role", None),
            ],
        )
    }

    #[test]
    fn null_values_are_present_but_empty() {
        let config = config();
        assert!(config.contains_key("role"));
        assert_eq!(config.get("role"), None);
        assert!(!config.contains_key("schema"));
    }

    #[test]
    fn derived_configs_leave_the_original_untouched() {
        let config = config();
        let derived = config
            .without("password")
            .with("authenticator", Some("externalbrowser"));

        assert_eq!(config.get("password"), Some("hunter2"));
        assert!(!derived.contains_key("password"));
        assert_eq!(derived.get("authenticator"), Some("externalbrowser"));
        assert_eq!(
            derived.keys().collect::<Vec<_>>(),
            vec!["user", "role", "authenticator"]
        );
    }

    #[test]
    fn debug_redacts_the_password() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains(REDACTED));
        assert!(rendered.contains("alice"));
    }
}
