//! Configuration flags for `srm`.
//!
//! Every setting is declared once as a `static` [`Config`] with a default value, registered into
//! a [`ConfigSetBuilder`], and then read from the resulting [`ConfigSet`]. Values can be
//! overridden at startup from the environment with [`ConfigSet::update_from_env`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use compact_str::CompactString;

/// A single configuration setting.
pub struct Config<V: ConfigType> {
    name: &'static str,
    desc: &'static str,
    default: V,
}

impl<V: ConfigType> Config<V> {
    /// Define a new [`Config`] with a default value.
    pub const fn new(name: &'static str, desc: &'static str, default: V) -> Self {
        Config {
            name,
            desc,
            default,
        }
    }

    /// Read the value of this [`Config`] from the provided [`ConfigSet`].
    ///
    /// # Panics
    /// * If this [`Config`] was never registered with the [`ConfigSetBuilder`] of `set`.
    pub fn read(&self, set: &ConfigSet) -> V::Stored {
        let Some(entry) = set.configs.get(self.name) else {
            panic!("tried to read unregistered config {}", self.name);
        };
        V::load(&entry.value)
    }
}

/// A thread-safe shareable set of [`Config`]s.
///
/// Clones share their values, an override applied through one is seen by all of them.
#[derive(Clone, Debug)]
pub struct ConfigSet {
    configs: Arc<BTreeMap<CompactString, ConfigSetEntry>>,
}

impl ConfigSet {
    /// Returns a new [`ConfigSetBuilder`].
    pub fn builder() -> ConfigSetBuilder {
        ConfigSetBuilder::default()
    }

    /// Override every registered [`Config`] that has a matching environment variable.
    ///
    /// The variable for a config is its name upper-cased and prefixed with `prefix`, see
    /// [`srm_ore::env::override_var`]. Returns the names of the configs that were updated.
    ///
    /// Stops at the first variable that can't be parsed, configs before it keep their override.
    pub fn update_from_env(&self, prefix: &str) -> Result<Vec<&str>, anyhow::Error> {
        let mut updated = Vec::new();
        for (name, entry) in &*self.configs {
            let var = srm_ore::env::override_var(prefix, name);
            let Some(value) = std::env::var_os(&var) else {
                continue;
            };
            let value = value
                .into_string()
                .map_err(|value| anyhow::anyhow!("{var} is not valid UTF-8: {value:?}"))?;
            entry
                .value
                .parse_from(&value)
                .map_err(|err| anyhow::anyhow!("invalid value for {var}: {err}"))?;
            tracing::debug!(%var, %value, "config overridden from environment");
            updated.push(name.as_str());
        }
        Ok(updated)
    }
}

impl fmt::Display for ConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, entry) in &*self.configs {
            writeln!(f, "{} => {}\n\t└─ '{}'", name, entry.value, entry.desc)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct ConfigSetEntry {
    value: SharedValue,
    desc: &'static str,
}

/// A builder for a [`ConfigSet`].
#[derive(Default, Debug)]
pub struct ConfigSetBuilder {
    configs: BTreeMap<CompactString, ConfigSetEntry>,
}

impl ConfigSetBuilder {
    /// Register a [`Config`] into this [`ConfigSetBuilder`] with the default value.
    ///
    /// # Panics
    /// * If a [`Config`] with the same name was already registered.
    pub fn register<V: ConfigType>(&mut self, config: &'static Config<V>) -> &mut Self {
        let entry = ConfigSetEntry {
            value: config.default.to_shared(),
            desc: config.desc,
        };
        let prev = self
            .configs
            .insert(CompactString::const_new(config.name), entry);
        if let Some(prev) = prev {
            panic!("config '{}' registered more than once, previously {prev:?}", config.name);
        }
        self
    }

    /// Consumes this [`ConfigSetBuilder`] constructing a [`ConfigSet`].
    pub fn build(self) -> ConfigSet {
        ConfigSet {
            configs: Arc::new(self.configs),
        }
    }
}

/// Types that can be the value of a [`Config`].
pub trait ConfigType {
    /// What reading the [`Config`] returns.
    type Stored;

    fn to_shared(&self) -> SharedValue;
    fn load(shared: &SharedValue) -> Self::Stored;
}

impl ConfigType for u64 {
    type Stored = u64;

    fn to_shared(&self) -> SharedValue {
        SharedValue::Count(Arc::new(AtomicU64::new(*self)))
    }

    fn load(shared: &SharedValue) -> u64 {
        let SharedValue::Count(val) = shared else {
            panic!("programming error, found {shared:?} for u64")
        };
        val.load(Ordering::SeqCst)
    }
}

impl ConfigType for &str {
    type Stored = CompactString;

    fn to_shared(&self) -> SharedValue {
        SharedValue::Text(Arc::new(RwLock::new(CompactString::new(self))))
    }

    fn load(shared: &SharedValue) -> CompactString {
        let SharedValue::Text(val) = shared else {
            panic!("programming error, found {shared:?} for string")
        };
        val.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// The current value of a registered [`Config`], shared by every clone of a [`ConfigSet`].
#[derive(Clone, Debug)]
pub enum SharedValue {
    Count(Arc<AtomicU64>),
    Text(Arc<RwLock<CompactString>>),
}

impl SharedValue {
    /// Replace the value with one parsed from `raw`, leaving it untouched if `raw` is invalid.
    fn parse_from(&self, raw: &str) -> Result<(), anyhow::Error> {
        match self {
            SharedValue::Count(shared) => {
                let val: u64 = raw.trim().parse()?;
                shared.store(val, Ordering::SeqCst);
            }
            SharedValue::Text(shared) => {
                let mut value = shared.write().unwrap_or_else(PoisonError::into_inner);
                *value = CompactString::new(raw);
            }
        }
        Ok(())
    }
}

impl fmt::Display for SharedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharedValue::Count(val) => write!(f, "{}", val.load(Ordering::SeqCst)),
            SharedValue::Text(val) => {
                let value = val.read().unwrap_or_else(PoisonError::into_inner);
                write!(f, "{}", *value)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static TEST_NAME: Config<&'static str> = Config::new("test_name", "A test name.", ".trash");
    static TEST_SECS: Config<u64> = Config::new("test_secs", "A test duration.", 60);

    fn test_set() -> ConfigSet {
        let mut builder = ConfigSet::builder();
        builder.register(&TEST_NAME).register(&TEST_SECS);
        builder.build()
    }

    /// Set `{prefix}_{suffix}` for every pair, every test uses a prefix of its own.
    fn set_vars(prefix: &str, vars: &[(&str, &str)]) {
        for (suffix, value) in vars {
            // SAFETY: No other test reads or writes variables with this prefix.
            unsafe { std::env::set_var(format!("{prefix}_{suffix}"), value) };
        }
    }

    #[test]
    fn smoketest_read_defaults() {
        let config_set = test_set();
        assert_eq!(TEST_NAME.read(&config_set), ".trash");
        assert_eq!(TEST_SECS.read(&config_set), 60);
    }

    #[test]
    fn smoketest_update_from_env() {
        let prefix = "SRM_CFG_TEST_ENV";
        set_vars(prefix, &[("TEST_SECS", " 120 "), ("TEST_NAME", ".bin")]);

        let config_set = test_set();
        let updated = config_set.update_from_env(prefix).unwrap();
        assert_eq!(updated, vec!["test_name", "test_secs"]);
        assert_eq!(TEST_SECS.read(&config_set), 120);
        assert_eq!(TEST_NAME.read(&config_set), ".bin");
    }

    #[test]
    fn update_from_env_is_shared() {
        let prefix = "SRM_CFG_TEST_SHARED";
        set_vars(prefix, &[("TEST_SECS", "3600")]);

        let config_set = test_set();
        let config_set_2 = config_set.clone();
        config_set.update_from_env(prefix).unwrap();
        assert_eq!(TEST_SECS.read(&config_set_2), 3600);
    }

    #[test]
    fn update_from_env_nothing_set() {
        let config_set = test_set();
        let updated = config_set.update_from_env("SRM_CFG_TEST_UNSET").unwrap();
        assert!(updated.is_empty());
        assert_eq!(TEST_SECS.read(&config_set), 60);
    }

    #[test]
    fn smoketest_update_from_env_invalid() {
        let prefix = "SRM_CFG_TEST_BAD";
        set_vars(prefix, &[("TEST_SECS", "-1")]);

        let config_set = test_set();
        let err = config_set.update_from_env(prefix).unwrap_err();
        assert!(err.to_string().contains("SRM_CFG_TEST_BAD_TEST_SECS"));
        // A failed parse leaves the old value in place.
        assert_eq!(TEST_SECS.read(&config_set), 60);
    }

    #[test]
    fn smoketest_display() {
        let rendered = test_set().to_string();
        assert_eq!(
            rendered,
            "test_name => .trash\n\t└─ 'A test name.'\ntest_secs => 60\n\t└─ 'A test duration.'\n"
        );
    }

    #[test]
    #[should_panic(expected = "registered more than once")]
    fn smoketest_double_register() {
        let mut builder = ConfigSet::builder();
        builder.register(&TEST_SECS).register(&TEST_SECS);
    }
}
