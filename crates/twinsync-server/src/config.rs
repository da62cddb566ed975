//! Server configuration: TOML file plus CLI overrides.
//!
//! Every section is optional; an empty file (or no file) runs the test
//! stand with its defaults and no users, so every external write is
//! rejected.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use twinsync_core::{Value, VariableDef};
use twinsync_engine::SyncConfig;
use twinsync_models::{teststand, SubstationParams};
use twinsync_store::UserDatabase;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Synchronization loop settings.
    #[serde(default)]
    pub sync: SyncSection,

    /// Model selection and parameters.
    #[serde(default)]
    pub model: ModelSection,

    /// Initial values of writable variables, overriding the layout defaults.
    #[serde(default)]
    pub inputs: BTreeMap<String, InputValue>,

    /// Credentials allowed to write variables.
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

/// `[sync]` section. Defaults match [`SyncConfig::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    /// Seconds per cycle, wall-clock and simulated.
    pub step_size: f64,
    /// Sync point comparison tolerance, in seconds.
    pub epsilon: f64,
    /// Integration calls allowed per cycle.
    pub max_sub_steps: u32,
    /// Bounded wait on the store mutex, in milliseconds.
    pub store_lock_timeout_ms: u64,
    /// Timer polling interval, in seconds.
    pub poll_interval: Option<f64>,
}

impl Default for SyncSection {
    fn default() -> Self {
        let d = SyncConfig::default();
        Self {
            step_size: d.step_size,
            epsilon: d.epsilon,
            max_sub_steps: d.max_sub_steps,
            store_lock_timeout_ms: d.store_lock_timeout_ms,
            poll_interval: d.poll_interval,
        }
    }
}

/// `[model]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    /// Model reference passed to the provider.
    #[serde(default = "default_model_ref")]
    pub reference: String,

    /// Parameter overrides.
    #[serde(default)]
    pub params: ParamsSection,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            reference: default_model_ref(),
            params: ParamsSection::default(),
        }
    }
}

fn default_model_ref() -> String {
    teststand::MODEL_REF.to_string()
}

/// `[model.params]` section; unset fields keep the model defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamsSection {
    pub ua: Option<f64>,
    pub cp: Option<f64>,
    pub tau: Option<f64>,
    pub kv_primary: Option<f64>,
    pub kv_secondary: Option<f64>,
    pub supply_setpoint: Option<f64>,
    pub kp: Option<f64>,
    pub ki: Option<f64>,
    pub tracking_time: Option<f64>,
    pub internal_step: Option<f64>,
}

/// A TOML scalar for an `[inputs]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Boolean(bool),
    Real(f64),
}

impl From<InputValue> for Value {
    fn from(v: InputValue) -> Self {
        match v {
            InputValue::Boolean(b) => Value::Boolean(b),
            InputValue::Real(r) => Value::Real(r),
        }
    }
}

/// One `[[users]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply CLI overrides.
    pub fn apply_overrides(&mut self, step_size: Option<f64>, model: Option<String>) {
        if let Some(step_size) = step_size {
            self.sync.step_size = step_size;
        }
        if let Some(model) = model {
            self.model.reference = model;
        }
    }

    /// Engine configuration from the `[sync]` section.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            step_size: self.sync.step_size,
            epsilon: self.sync.epsilon,
            max_sub_steps: self.sync.max_sub_steps,
            store_lock_timeout_ms: self.sync.store_lock_timeout_ms,
            poll_interval: self.sync.poll_interval,
        }
    }

    /// Model parameters with overrides applied.
    pub fn model_params(&self) -> SubstationParams {
        let p = &self.model.params;
        let d = SubstationParams::default();
        SubstationParams {
            ua: p.ua.unwrap_or(d.ua),
            cp: p.cp.unwrap_or(d.cp),
            tau: p.tau.unwrap_or(d.tau),
            kv_primary: p.kv_primary.unwrap_or(d.kv_primary),
            kv_secondary: p.kv_secondary.unwrap_or(d.kv_secondary),
            supply_setpoint: p.supply_setpoint.unwrap_or(d.supply_setpoint),
            kp: p.kp.unwrap_or(d.kp),
            ki: p.ki.unwrap_or(d.ki),
            tracking_time: p.tracking_time.unwrap_or(d.tracking_time),
            internal_step: p.internal_step.unwrap_or(d.internal_step),
        }
    }

    /// Test stand layout with `[inputs]` initial values applied.
    ///
    /// Fails on names that are not writable variables and on values of
    /// the wrong kind.
    pub fn layout(&self) -> Result<Vec<VariableDef>> {
        let mut defs = teststand::layout();
        for (name, value) in &self.inputs {
            let value = Value::from(*value);
            let Some(def) = defs.iter_mut().find(|d| &d.name == name) else {
                bail!("[inputs] names unknown variable '{name}'");
            };
            if !def.writable {
                bail!("[inputs] sets '{name}', which is a model output");
            }
            if value.kind() != def.kind {
                bail!(
                    "[inputs] gives '{name}' a {} value, expected {}",
                    value.kind(),
                    def.kind
                );
            }
            def.initial = value;
        }
        Ok(defs)
    }

    /// Credentials from the `[[users]]` entries.
    pub fn user_database(&self) -> UserDatabase {
        let mut users = UserDatabase::new();
        for entry in &self.users {
            users.insert(entry.username.clone(), entry.password.clone());
        }
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_config_parses() {
        let config: ServerConfig =
            toml::from_str(include_str!("../config/teststand.toml")).unwrap();
        assert_eq!(config.sync.step_size, 10.0);
        assert_eq!(config.model.reference, "teststand");
        assert_eq!(config.model_params().tau, 60.0);
        assert_eq!(config.users.len(), 1);
        assert!(config.user_database().verify("LablinkTestUser", "change-me"));
        assert!(config.sync_config().validate().is_ok());
        assert_eq!(config.layout().unwrap().len(), 12);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.sync_config(), SyncConfig::default());
        assert_eq!(config.model_params(), SubstationParams::default());
        assert!(config.user_database().is_empty());
        assert_eq!(config.layout().unwrap(), teststand::layout());
    }

    #[test]
    fn cli_overrides_file() {
        let mut config: ServerConfig = toml::from_str("[sync]\nstep_size = 5.0\n").unwrap();
        config.apply_overrides(Some(2.5), Some("other".to_string()));
        assert_eq!(config.sync.step_size, 2.5);
        assert_eq!(config.model.reference, "other");
        config.apply_overrides(None, None);
        assert_eq!(config.sync.step_size, 2.5);
    }

    #[test]
    fn inputs_override_initial_values() {
        let config: ServerConfig = toml::from_str(
            "[inputs]\ndelta_p_primary_set = 100000\nT_supply_secondary_ctrl = true\n",
        )
        .unwrap();
        let defs = config.layout().unwrap();
        let initial = |name: &str| defs.iter().find(|d| d.name == name).unwrap().initial;
        // Integers are accepted for real variables.
        assert_eq!(initial("delta_p_primary_set"), Value::Real(100_000.0));
        assert_eq!(initial("T_supply_secondary_ctrl"), Value::Boolean(true));
    }

    #[test]
    fn bad_inputs_are_rejected() {
        for toml_src in [
            "[inputs]\nT_outdoor = 280.0\n",
            "[inputs]\nT_supply_secondary = 330.0\n",
            "[inputs]\nT_supply_secondary_ctrl = 1.0\n",
        ] {
            let config: ServerConfig = toml::from_str(toml_src).unwrap();
            assert!(config.layout().is_err(), "accepted {toml_src}");
        }
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(toml::from_str::<ServerConfig>("[network]\nport = 1\n").is_err());
    }
}
