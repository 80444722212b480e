use std::{env, path::PathBuf};

use anyhow::Context;
use tracing::info;

/// Settings the host would normally keep in its global context.
#[derive(Clone, Debug)]
pub struct TimetableConfig {
    /// Module data directory; exports land in `<data_root>/temp`.
    pub data_root: PathBuf,
    /// Base URL of the document download endpoint.
    pub document_url: String,
    pub table_prefix: String,
    pub database_url: String,
    pub bind_addr: String,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("documents/timetable"),
            document_url: "/document".to_string(),
            table_prefix: "llx_".to_string(),
            database_url: "sqlite:erp.db?mode=ro".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl TimetableConfig {
    /// Read the configuration from `TIMETABLE_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(root) = read_var("TIMETABLE_DATA_ROOT")? {
            config.data_root = PathBuf::from(root);
        }
        if let Some(url) = read_var("TIMETABLE_DOCUMENT_URL")? {
            config.document_url = url;
        }
        if let Some(prefix) = read_var("TIMETABLE_TABLE_PREFIX")? {
            if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                anyhow::bail!("TIMETABLE_TABLE_PREFIX may only contain letters, digits and '_'");
            }
            config.table_prefix = prefix;
        }
        if let Some(db) = read_var("TIMETABLE_DATABASE_URL")? {
            config.database_url = db;
        }
        if let Some(addr) = read_var("TIMETABLE_BIND_ADDR")? {
            config.bind_addr = addr;
        }

        info!(
            "Loaded timetable configuration, data root: {}",
            config.data_root.display()
        );
        Ok(config)
    }
}

fn read_var(name: &str) -> anyhow::Result<Option<String>> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("invalid value for {name}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TimetableConfig::default();
        assert_eq!(config.table_prefix, "llx_");
        assert_eq!(config.document_url, "/document");
        assert_eq!(config.data_root, PathBuf::from("documents/timetable"));
    }
}
