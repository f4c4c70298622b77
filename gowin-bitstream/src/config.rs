use prjcombine_gowin::{Database, Device};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming the target device.
pub const DEVICE_VAR: &str = "DEVICE";

/// What the router does with a pip the tile does not have.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RouteMode {
    /// Fail the whole pack.
    #[default]
    Strict,
    /// Log the pip, leave it out, and report it to the caller.
    Diagnostic,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub device: String,
    pub route_mode: RouteMode,
}

impl Config {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            route_mode: RouteMode::default(),
        }
    }

    pub fn diagnostic(self) -> Self {
        Self {
            route_mode: RouteMode::Diagnostic,
            ..self
        }
    }

    pub fn strict(self) -> Self {
        Self {
            route_mode: RouteMode::Strict,
            ..self
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_device_var(std::env::var(DEVICE_VAR).ok())
    }

    pub fn from_device_var(value: Option<String>) -> Result<Self> {
        match value {
            Some(device) if !device.trim().is_empty() => Ok(Self::new(device.trim())),
            _ => Err(Error::MissingDevice),
        }
    }

    pub fn select<'a>(&self, db: &'a Database) -> Result<&'a Device> {
        db.device(&self.device)
            .ok_or_else(|| Error::UnknownDevice(self.device.clone()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_device_var() {
        let cfg = Config::from_device_var(Some("GW1N-1".to_string())).unwrap();
        assert_eq!(cfg.device, "GW1N-1");
        assert_eq!(cfg.route_mode, RouteMode::Strict);
        assert_matches!(Config::from_device_var(None), Err(Error::MissingDevice));
        assert_matches!(
            Config::from_device_var(Some(" ".to_string())),
            Err(Error::MissingDevice)
        );
    }

    #[test]
    fn test_modes() {
        let cfg = Config::new("GW1N-1").diagnostic();
        assert_eq!(cfg.route_mode, RouteMode::Diagnostic);
        assert_eq!(cfg.strict().route_mode, RouteMode::Strict);
    }

    #[test]
    fn test_select_unknown() {
        let db = Database::new();
        assert_matches!(
            Config::new("GW1N-9").select(&db),
            Err(Error::UnknownDevice(name)) if name == "GW1N-9"
        );
    }
}
