use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{fs, path::Path};

use crate::domain::{DEFAULT_TAX_RATE, RateTable, TenantId};

pub const DEFAULT_DATABASE: &str = "retainer.db";

/// Optional TOML configuration file.
///
/// ```toml
/// database = "billing.db"
/// tenant = "6f1c0c52-3a59-4d8e-9d55-0c6f3b0f6a10"
/// tax_rate = 21
/// rate_table = [25, 20, 13, 8.8, 4.2, 4.6, 4.0, 4.2, 3.5, 2.7, 2.4, 2.7]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database: Option<String>,
    pub tenant: Option<TenantId>,
    pub tax_rate: Option<Decimal>,
    /// Monthly rates, January first
    pub rate_table: Option<RateTable>,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading configuration from {:?}", path_ref);
    let contents = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML from config file {:?}", path_ref))
}

/// Effective settings: command-line flags override the file, the file
/// overrides built-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: String,
    pub tenant: Option<TenantId>,
    pub tax_rate: Decimal,
    pub rates: RateTable,
}

impl Settings {
    pub fn resolve(file: FileConfig, database: Option<String>, tenant: Option<TenantId>) -> Self {
        Self {
            database: database
                .or(file.database)
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            tenant: tenant.or(file.tenant),
            tax_rate: file.tax_rate.unwrap_or(DEFAULT_TAX_RATE),
            rates: file.rate_table.unwrap_or_default(),
        }
    }

    /// The tenant every command operates on.
    pub fn tenant(&self) -> Result<TenantId> {
        self.tenant.context(
            "No tenant configured: pass --tenant or set `tenant` in the config file (run `retainer init` to create one)",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            database = "billing.db"
            tenant = "6f1c0c52-3a59-4d8e-9d55-0c6f3b0f6a10"
            tax_rate = 10.5
            rate_table = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12.5]
        "#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database.as_deref(), Some("billing.db"));
        assert_eq!(
            config.tenant,
            Some(Uuid::parse_str("6f1c0c52-3a59-4d8e-9d55-0c6f3b0f6a10").unwrap())
        );
        assert_eq!(config.tax_rate, Some(Decimal::new(105, 1)));
        assert_eq!(config.rate_table.unwrap().rates()[11], Decimal::new(125, 1));
    }

    #[test]
    fn test_rate_table_needs_twelve_entries() {
        let result: std::result::Result<FileConfig, _> = toml::from_str("rate_table = [1, 2, 3]");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: std::result::Result<FileConfig, _> = toml::from_str("databse = \"x.db\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let file_tenant = Uuid::new_v4();
        let flag_tenant = Uuid::new_v4();
        let file = FileConfig {
            database: Some("file.db".to_string()),
            tenant: Some(file_tenant),
            tax_rate: None,
            rate_table: None,
        };

        let settings = Settings::resolve(file, Some("flag.db".to_string()), Some(flag_tenant));
        assert_eq!(settings.database, "flag.db");
        assert_eq!(settings.tenant().unwrap(), flag_tenant);
        assert_eq!(settings.tax_rate, DEFAULT_TAX_RATE);
        assert_eq!(settings.rates, RateTable::default());
    }

    #[test]
    fn test_defaults_without_tenant() {
        let settings = Settings::resolve(FileConfig::default(), None, None);
        assert_eq!(settings.database, DEFAULT_DATABASE);
        assert!(settings.tenant().is_err());
    }
}
