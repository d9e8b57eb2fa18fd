//! Generation Manager
//!
//! Names the current cache generation and decides which persisted
//! generations are obsolete.

// == Generation Manager ==
/// Owns the namespace prefix and the current version.
///
/// Pure: every method is a function of the configured values and its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationManager {
    prefix: String,
    version: String,
}

impl GenerationManager {
    /// # Arguments
    /// * `prefix` - Namespace shared by every generation of this application
    /// * `version` - Deploy-time version suffix of the current generation
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            version: version.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `prefix` followed by `version`.
    pub fn current_generation_key(&self) -> String {
        format!("{}{}", self.prefix, self.version)
    }

    /// True iff the key lives in this application's namespace.
    pub fn is_owned_by_namespace(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }

    /// Every namespaced key, current included.
    pub fn owned_generations<'a, I>(&self, all_keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        all_keys
            .into_iter()
            .filter(|key| self.is_owned_by_namespace(key))
            .cloned()
            .collect()
    }

    /// Namespaced keys other than the current one. Keys outside the
    /// namespace are never returned.
    pub fn obsolete_generations<'a, I>(&self, all_keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let current = self.current_generation_key();
        all_keys
            .into_iter()
            .filter(|key| self.is_owned_by_namespace(key) && **key != current)
            .cloned()
            .collect()
    }
}
