// Environment variable utils

use std::{env, str::FromStr};

/// Reads a string variable.
/// Falls back to the default when the variable is absent.
pub fn get_env_string(var_name: &str, default_val: &str) -> String {
    env::var(var_name).unwrap_or_else(|_| default_val.to_string())
}

/// Reads a boolean variable.
/// Accepts YES / TRUE and NO / FALSE, case insensitive.
/// Anything else falls back to the default.
pub fn get_env_bool(var_name: &str, default_val: bool) -> bool {
    match env::var(var_name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => true,
            "no" | "false" => false,
            _ => default_val,
        },
        Err(_) => default_val,
    }
}

/// Reads and parses a variable.
/// Falls back to the default when the variable is absent or
/// does not parse as the expected type.
pub fn get_env_parsed<T: FromStr>(var_name: &str, default_val: T) -> T {
    env::var(var_name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default_val)
}

// Tests
