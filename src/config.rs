//! Configuration management for keystick
//!
//! Every setting has a default, so running without a config file is normal.
//!
//! ## Lookup order
//!
//! | Source | Used when |
//! |--------|-----------|
//! | `$KEYSTICK_CONFIG` | the variable is set |
//! | `/etc/keystick.toml` | the file exists |
//! | built-in defaults | otherwise |
//!
//! ## Example
//!
//! ```toml
//! [gadget]
//! name = "keystick"
//! udc = "fe980000.usb"
//! max_devices = 2
//!
//! [input]
//! device_dir = "/dev/input"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "KEYSTICK_CONFIG";

/// System-wide config file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/keystick.toml";

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading the config file
    Io(PathBuf, io::Error),
    /// Failed to parse config file
    Parse(PathBuf, toml::de::Error),
    /// A value is out of range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "IO error reading {}: {}", path.display(), e),
            ConfigError::Parse(path, e) => write!(f, "Parse error in {}: {}", path.display(), e),
            ConfigError::Invalid(msg) => write!(f, "Invalid value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            ConfigError::Parse(_, e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<ConfigError> for crate::Error {
    fn from(e: ConfigError) -> Self {
        crate::Error::Config(e.to_string())
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// USB gadget settings
    pub gadget: GadgetConfig,
    /// Keyboard discovery settings
    pub input: InputConfig,
}

/// USB gadget configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GadgetConfig {
    /// Name of the gadget node under `usb_gadget/`
    pub name: String,
    /// Mount point of configfs
    pub configfs_root: PathBuf,
    /// Directory listing the USB device controllers
    pub udc_class_dir: PathBuf,
    /// Directory holding the `hidgN` device nodes
    pub dev_dir: PathBuf,
    /// Controller to bind to; the first available one when unset
    pub udc: Option<String>,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
    /// Most joysticks one gadget may expose
    pub max_devices: usize,
    /// How long to wait for the `hidgN` node after enabling (in milliseconds)
    pub endpoint_wait_ms: u64,
}

impl Default for GadgetConfig {
    fn default() -> Self {
        Self {
            name: "keystick".to_string(),
            configfs_root: PathBuf::from("/sys/kernel/config"),
            udc_class_dir: PathBuf::from("/sys/class/udc"),
            dev_dir: PathBuf::from("/dev"),
            udc: None,
            vendor_id: 0x1d6b,
            product_id: 0x0104,
            manufacturer: "Keystick".to_string(),
            product: "Keyboard Joysticks".to_string(),
            serial: "0123456789".to_string(),
            max_devices: 4,
            endpoint_wait_ms: 2000,
        }
    }
}

impl GadgetConfig {
    /// Time to wait for the report endpoint node to appear
    pub fn endpoint_wait(&self) -> Duration {
        Duration::from_millis(self.endpoint_wait_ms)
    }
}

/// Keyboard discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    /// Directory scanned for `event*` devices
    pub device_dir: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from("/dev/input"),
        }
    }
}

impl Config {
    /// Load configuration from the first available source.
    ///
    /// Returns the default configuration if no file is configured or present.
    /// A file named by `KEYSTICK_CONFIG` must exist.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::locate() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Path of the config file that [`load`](Self::load) would read
    pub fn locate() -> Option<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        let system = PathBuf::from(SYSTEM_CONFIG_PATH);
        system.exists().then_some(system)
    }

    /// Load and validate configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no gadget could be built with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.gadget.max_devices;
        if max == 0 || max > u8::MAX as usize {
            return Err(ConfigError::Invalid(format!(
                "gadget.max_devices must be within 1..=255, got {}",
                max
            )));
        }
        if self.gadget.name.is_empty() || self.gadget.name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "gadget.name '{}' is not a valid directory name",
                self.gadget.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(tag: &str) -> PathBuf {
        env::temp_dir().join(format!(
            "keystick-test-{}-{}.toml",
            std::process::id(),
            tag
        ))
    }

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.gadget.name, "keystick");
        assert_eq!(config.gadget.configfs_root, PathBuf::from("/sys/kernel/config"));
        assert_eq!(config.gadget.vendor_id, 0x1d6b);
        assert_eq!(config.gadget.product_id, 0x0104);
        assert_eq!(config.gadget.max_devices, 4);
        assert_eq!(config.gadget.udc, None);
        assert_eq!(config.input.device_dir, PathBuf::from("/dev/input"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_endpoint_wait() {
        let config = Config::default();
        assert_eq!(config.gadget.endpoint_wait(), Duration::from_secs(2));
    }

    #[test]
    fn config_partial_file_keeps_defaults() {
        let path = temp_config_path("partial");
        fs::write(
            &path,
            "[gadget]\nudc = \"dummy_udc.0\"\nvendor_id = 0x1209\nmax_devices = 2\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.gadget.udc.as_deref(), Some("dummy_udc.0"));
        assert_eq!(config.gadget.vendor_id, 0x1209);
        assert_eq!(config.gadget.max_devices, 2);
        assert_eq!(config.gadget.product_id, 0x0104);
        assert_eq!(config.input, InputConfig::default());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn config_empty_file_is_default() {
        let path = temp_config_path("empty");
        fs::write(&path, "").unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn config_load_missing_file_is_io_error() {
        let path = PathBuf::from("/nonexistent/path/keystick.toml");
        let result = Config::load_from(&path);
        assert!(matches!(result, Err(ConfigError::Io(..))));
    }

    #[test]
    fn config_load_invalid_toml() {
        let path = temp_config_path("invalid");
        fs::write(&path, "this is not [valid toml").unwrap();
        let result = Config::load_from(&path);
        assert!(matches!(result, Err(ConfigError::Parse(..))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn config_rejects_device_ceiling_out_of_range() {
        let mut config = Config::default();
        config.gadget.max_devices = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.gadget.max_devices = 256;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.gadget.max_devices = 255;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_gadget_name() {
        let mut config = Config::default();
        config.gadget.name = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_error_converts_to_crate_error() {
        let err: crate::Error = ConfigError::Invalid("bad".to_string()).into();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
