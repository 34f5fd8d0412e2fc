//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in the binary (or rely on lazy Once).
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        // Values already present in the process environment win over .env.
        let _ = dotenv::dotenv();
    });
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Postgres DSN for the direct store backend (tries specific -> generic).
pub fn db_url() -> Option<String> {
    ["SUPABASE_DB_URL", "DATABASE_URL", "DB_URL"]
        .into_iter()
        .find_map(env_opt)
}

/// Mask a configuration value for logging. Keys that look like secrets are
/// fully hidden; postgres DSNs keep only their host part.
pub fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD")
        || k.contains("SECRET")
        || k.contains("KEY")
        || k.contains("TOKEN")
    {
        return if val.trim().is_empty() {
            String::new()
        } else {
            "***".to_string()
        };
    }

    let val_trim = val.trim();
    let lower = val_trim.to_ascii_lowercase();
    if !(lower.starts_with("postgres://") || lower.starts_with("postgresql://")) {
        return val_trim.to_string();
    }

    // A fragment means an unencoded `#` in the credentials; the parsed host is garbage.
    if let Ok(mut u) = url::Url::parse(val_trim) {
        if u.fragment().is_none() {
            let _ = u.set_username("***");
            let _ = u.set_password(Some("***"));
            return u.to_string();
        }
    }
    redact_dsn_text(val_trim)
}

/// String-level DSN masking for values `url` cannot parse. The host starts
/// after the last `@`, so `@`, `#` or `/` inside a password never leak.
fn redact_dsn_text(dsn: &str) -> String {
    let Some(proto) = dsn.find("://") else {
        return "***".to_string();
    };
    let scheme = &dsn[..proto];
    let rest = &dsn[proto + 3..];
    match rest.rfind('@') {
        Some(at) => format!("{scheme}://***:***@{}", &rest[at + 1..]),
        None if rest.to_ascii_lowercase().contains("password") => format!("{scheme}://***"),
        None => dsn.to_string(),
    }
}

/// Log a consolidated, redacted snapshot of configuration and fail when any
/// required entry is empty. `entries` are `(name, value)` pairs; `required`
/// names the entries that must be non-empty.
pub fn preflight_check(
    title: &str,
    entries: &[(&str, Option<&str>)],
    required: &[&str],
) -> anyhow::Result<()> {
    let mut missing: Vec<&str> = Vec::new();
    let mut snapshot: Vec<(String, String)> = Vec::with_capacity(entries.len());
    for &(name, value) in entries {
        let value = value.unwrap_or_default();
        if required.contains(&name) && value.trim().is_empty() {
            missing.push(name);
        }
        snapshot.push((name.to_string(), redact_value(name, value)));
    }
    for &name in required {
        if !entries.iter().any(|(k, _)| *k == name) {
            missing.push(name);
        }
    }
    info!(target: "preflight", title, snapshot = ?snapshot, "configuration snapshot");
    if !missing.is_empty() {
        anyhow::bail!("missing required configuration: {:?}", missing);
    }
    Ok(())
}
