//! Environment-driven server configuration.

use std::ops::RangeInclusive;

use larder_recipes::query::MAX_PAGE_SIZE;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const DEFAULT_RECIPES_LIMIT: u32 = 2;
const DEV_JWT_SECRET: &str = "dev-secret";

/// Listing defaults shared by the handlers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Page size when a listing request has no `limit`.
    pub page_size: u32,
    /// Recipes embedded per author in subscription listings.
    pub recipes_limit: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            recipes_limit: DEFAULT_RECIPES_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    /// Postgres when set, in-memory store otherwise.
    pub database_url: Option<String>,
    pub settings: ApiSettings,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });
        Self {
            bind_addr: lookup("LARDER_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            settings: ApiSettings {
                page_size: parse_or(&lookup, "LARDER_PAGE_SIZE", 1..=MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE),
                recipes_limit: parse_or(
                    &lookup,
                    "LARDER_RECIPES_LIMIT",
                    0..=MAX_PAGE_SIZE,
                    DEFAULT_RECIPES_LIMIT,
                ),
            },
        }
    }
}

/// A number within `range`; anything else falls back to `default` with a warning.
fn parse_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    range: RangeInclusive<u32>,
    default: u32,
) -> u32 {
    let raw = match lookup(key) {
        None => return default,
        Some(raw) => raw,
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if range.contains(&value) => value,
        _ => {
            tracing::warn!(
                key,
                value = %raw,
                min = *range.start(),
                max = *range.end(),
                default,
                "invalid numeric setting; using default"
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ApiConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.settings, ApiSettings::default());
    }

    #[test]
    fn values_are_read_and_invalid_numbers_fall_back() {
        let cfg = config(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/larder"),
            ("LARDER_PAGE_SIZE", "10"),
            ("LARDER_RECIPES_LIMIT", "many"),
        ]);
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/larder"));
        assert_eq!(cfg.settings.page_size, 10);
        assert_eq!(cfg.settings.recipes_limit, DEFAULT_RECIPES_LIMIT);
    }

    #[test]
    fn out_of_range_listing_sizes_fall_back() {
        let cfg = config(&[("LARDER_PAGE_SIZE", "0"), ("LARDER_RECIPES_LIMIT", "500")]);
        assert_eq!(cfg.settings, ApiSettings::default());

        let cfg = config(&[("LARDER_PAGE_SIZE", "101"), ("LARDER_RECIPES_LIMIT", "0")]);
        assert_eq!(cfg.settings.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.settings.recipes_limit, 0);

        let cfg = config(&[("LARDER_PAGE_SIZE", "100")]);
        assert_eq!(cfg.settings.page_size, 100);
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        assert_eq!(config(&[("DATABASE_URL", "  ")]).database_url, None);
    }
}
