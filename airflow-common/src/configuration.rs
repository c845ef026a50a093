//! Airflow style configuration read from the environment.
//!
//! An option `key` in `section` is looked up as `AIRFLOW__{SECTION}__{KEY}`, which mirrors how
//! Airflow lets the environment override `airflow.cfg`.

use std::env;

/// Build the environment variable name for a config option.
pub fn env_key(section: &str, key: &str) -> String {
    format!(
        "AIRFLOW__{}__{}",
        section.to_ascii_uppercase(),
        key.to_ascii_uppercase()
    )
}

/// Get the raw value of a config option from the process environment.
pub fn get(section: &str, key: &str) -> Option<String> {
    get_from(section, key, |name| env::var(name).ok())
}

/// Get the raw value of a config option using the given lookup.
pub fn get_from<L>(section: &str, key: &str, lookup: L) -> Option<String>
where
    L: Fn(&str) -> Option<String>,
{
    lookup(&env_key(section, key))
}

/// Get a boolean config option from the process environment.
/// Missing or unparsable values give `fallback`.
pub fn getboolean(section: &str, key: &str, fallback: bool) -> bool {
    getboolean_from(section, key, fallback, |name| env::var(name).ok())
}

pub fn getboolean_from<L>(section: &str, key: &str, fallback: bool, lookup: L) -> bool
where
    L: Fn(&str) -> Option<String>,
{
    get_from(section, key, lookup)
        .and_then(|v| parse_bool(&v))
        .unwrap_or(fallback)
}

/// Parse a boolean the way Airflow does.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" => Some(true),
        "f" | "false" | "0" => Some(false),
        _ => None,
    }
}
