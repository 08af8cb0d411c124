//! This module contains the macros used in the project.

/// Read a value from the environment, falling back to the configuration file
macro_rules! config_value {
    ($config:ident, $setting_name:ident, $key_name:ident, $env:expr) => {
        match std::env::var($env) {
            Ok(value) if !value.trim().is_empty() => Some(value),
            _ => $config
                .config_data
                .$setting_name
                .as_ref()
                .and_then(|setting| setting.$key_name.clone())
                .filter(|value| !value.trim().is_empty()),
        }
    };
}

pub(crate) use config_value;
