//! Actuator driver registry for runtime configuration.

use std::collections::BTreeSet;
use std::collections::HashMap;

use smol_str::SmolStr;

use crate::control::ControlClient;
use crate::error::ControlError;

use super::{ActuatorDriver, LoggedDriver, PwmServoDriver, RecordingDriver};

pub struct DriverRegistry {
    entries: HashMap<SmolStr, DriverRegistryEntry>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DriverSpec {
    pub name: SmolStr,
    pub driver: Box<dyn ActuatorDriver + Send>,
}

impl std::fmt::Debug for DriverSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverSpec")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

type DriverCreate = fn(&toml::Value) -> Result<Box<dyn ActuatorDriver + Send>, ControlError>;
type DriverValidate = fn(&toml::Value) -> Result<(), ControlError>;

#[derive(Clone)]
struct DriverRegistryEntry {
    canonical: SmolStr,
    create: DriverCreate,
    validate: DriverValidate,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn default_registry() -> Self {
        let mut registry = Self::new();
        registry.register("logged", create_logged, validate_any);
        registry.register_alias("log", "logged");
        registry.register_alias("dummy", "logged");
        registry.register_alias("sim", "logged");

        registry.register("recording", create_recording, validate_any);

        registry.register("pwm-sysfs", create_pwm, validate_pwm);
        registry.register_alias("pwm", "pwm-sysfs");
        registry.register_alias("pwm_sysfs", "pwm-sysfs");

        registry.register("remote", create_remote, validate_remote);
        registry.register_alias("socket-client", "remote");
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<SmolStr>,
        create: DriverCreate,
        validate: DriverValidate,
    ) {
        let canonical = normalize_name(name.into());
        let entry = DriverRegistryEntry {
            canonical: canonical.clone(),
            create,
            validate,
        };
        self.entries.insert(canonical, entry);
    }

    pub fn register_alias(&mut self, alias: impl Into<SmolStr>, target: &str) {
        let alias = normalize_name(alias.into());
        let target = normalize_name(SmolStr::new(target));
        if let Some(entry) = self.entries.get(&target).cloned() {
            self.entries.insert(alias, entry);
        }
    }

    pub fn validate(&self, driver: &str, params: &toml::Value) -> Result<(), ControlError> {
        let entry = self.entry(driver)?;
        (entry.validate)(params)
    }

    pub fn build(&self, driver: &str, params: &toml::Value) -> Result<DriverSpec, ControlError> {
        let entry = self.entry(driver)?;
        let driver = (entry.create)(params)?;
        Ok(DriverSpec {
            name: entry.canonical.clone(),
            driver,
        })
    }

    /// Canonical name for a driver name or alias.
    pub fn canonical_name(&self, driver: &str) -> Option<SmolStr> {
        self.entries
            .get(&normalize_name(SmolStr::new(driver)))
            .map(|entry| entry.canonical.clone())
    }

    /// Return the canonical built-in driver names (stable sorted).
    pub fn canonical_driver_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for entry in self.entries.values() {
            names.insert(entry.canonical.to_string());
        }
        names.into_iter().collect()
    }

    fn entry(&self, driver: &str) -> Result<&DriverRegistryEntry, ControlError> {
        self.entries
            .get(&normalize_name(SmolStr::new(driver)))
            .ok_or_else(|| {
                ControlError::InvalidConfig(format!("unsupported driver.kind '{driver}'").into())
            })
    }
}

fn normalize_name(name: SmolStr) -> SmolStr {
    SmolStr::new(name.as_str().trim().to_ascii_lowercase())
}

fn validate_any(_params: &toml::Value) -> Result<(), ControlError> {
    Ok(())
}

fn create_logged(_params: &toml::Value) -> Result<Box<dyn ActuatorDriver + Send>, ControlError> {
    Ok(Box::new(LoggedDriver))
}

fn create_recording(
    _params: &toml::Value,
) -> Result<Box<dyn ActuatorDriver + Send>, ControlError> {
    Ok(Box::new(RecordingDriver::new()))
}

fn validate_pwm(params: &toml::Value) -> Result<(), ControlError> {
    PwmServoDriver::validate_params(params)
}

fn create_pwm(params: &toml::Value) -> Result<Box<dyn ActuatorDriver + Send>, ControlError> {
    let driver = PwmServoDriver::from_params(params)?;
    Ok(Box::new(driver))
}

fn validate_remote(params: &toml::Value) -> Result<(), ControlError> {
    let _ = ControlClient::from_params(params)?;
    Ok(())
}

fn create_remote(params: &toml::Value) -> Result<Box<dyn ActuatorDriver + Send>, ControlError> {
    let client = ControlClient::from_params(params)?;
    Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> toml::Value {
        toml::Value::Table(toml::map::Map::new())
    }

    #[test]
    fn canonical_driver_names_are_sorted_unique() {
        let registry = DriverRegistry::default_registry();
        assert_eq!(
            registry.canonical_driver_names(),
            vec![
                "logged".to_string(),
                "pwm-sysfs".to_string(),
                "recording".to_string(),
                "remote".to_string(),
            ]
        );
    }

    #[test]
    fn alias_resolves_to_canonical_driver_name() {
        let registry = DriverRegistry::default_registry();
        let spec = registry.build(" Dummy ", &empty()).expect("build logged alias");
        assert_eq!(spec.name.as_str(), "logged");
        assert_eq!(
            registry.canonical_name("socket-client").as_deref(),
            Some("remote")
        );
    }

    #[test]
    fn unknown_driver_is_invalid_config() {
        let registry = DriverRegistry::default_registry();
        let err = registry.build("vendor-sdk", &empty()).unwrap_err();
        assert_eq!(
            err,
            ControlError::InvalidConfig("unsupported driver.kind 'vendor-sdk'".into())
        );
    }

    #[test]
    fn remote_params_are_validated() {
        let registry = DriverRegistry::default_registry();
        let params: toml::Value = toml::from_str("port = 0").unwrap();
        assert!(registry.validate("remote", &params).is_err());
        let params: toml::Value = toml::from_str("host = '10.0.0.7'\nport = 61234").unwrap();
        assert!(registry.validate("remote", &params).is_ok());
    }
}
