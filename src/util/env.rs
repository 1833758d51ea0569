//! Environment helpers: dotenv loading, flag parsing and redacted snapshots.
//!
//! Only `main` and [`crate::config::Config::from_env`] read the process
//! environment; everything below receives an explicit `Config`.
use std::sync::Once;

static INIT: Once = Once::new();

/// Load `.env` exactly once. Falls back to the crate root when the working
/// directory has none. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        if dotenv::dotenv().is_ok() {
            return;
        }
        let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
        let _ = dotenv::from_filename(candidate);
    });
}

/// Get optional env var (None if unset or blank).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Boolean flag parsing; accepts 1/true/on/yes (case-insensitive) as true.
pub fn parse_flag(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "on" | "yes")
}

/// Mask values whose key looks like a credential so snapshots are safe to log.
pub fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASS")
        || k.contains("SECRET")
        || k.contains("KEY")
        || k.contains("TOKEN")
        || k.contains("COOKIE")
    {
        if val.trim().is_empty() {
            return String::new();
        }
        return "***".to_string();
    }
    val.trim().to_string()
}

/// Redacted `(key, value)` pairs for a configuration log line.
pub fn snapshot<F>(keys: &[&str], lookup: F) -> Vec<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .map(|&k| {
            let v = lookup(k).unwrap_or_default();
            (k.to_string(), redact_value(k, &v))
        })
        .collect()
}
