use std::{env, fmt, str::FromStr};

use actix_web::cookie::Key;

use crate::errors::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://pg_manager.db";
const DEFAULT_CUTOFF_DAY: u32 = 5;
const DEFAULT_RENT: i64 = 5000;

/// Runtime settings read from the environment (and `.env` via dotenvy).
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub session_key: Key,
    pub cookie_secure: bool,
    pub owner_email: String,
    pub owner_password: String,
    /// Last day of the month on which dues may be generated.
    pub due_cutoff_day: u32,
    pub default_rent: i64,
    pub room_numbers: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{name} environment variable not set")))
        };

        let session_key = required("SESSION_KEY")?;
        let session_key = Key::try_from(session_key.as_bytes()).map_err(|_| {
            AppError::Config("SESSION_KEY must be at least 64 bytes long".to_owned())
        })?;

        let due_cutoff_day = parse_or(&lookup, "DUE_CUTOFF_DAY", DEFAULT_CUTOFF_DAY)?;
        if !(1..=31).contains(&due_cutoff_day) {
            return Err(AppError::Config(
                "DUE_CUTOFF_DAY must be between 1 and 31".to_owned(),
            ));
        }

        let default_rent = parse_or(&lookup, "DEFAULT_RENT", DEFAULT_RENT)?;
        if default_rent <= 0 {
            return Err(AppError::Config("DEFAULT_RENT must be positive".to_owned()));
        }

        let room_numbers = lookup("ROOM_NUMBERS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&lookup, "PORT", 8080)?,
            session_key,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", true)?,
            owner_email: required("OWNER_EMAIL")?.trim().to_lowercase(),
            owner_password: required("OWNER_PASSWORD")?,
            due_cutoff_day,
            default_rent,
            room_numbers,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{name} has an invalid value: {raw}"))),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("cookie_secure", &self.cookie_secure)
            .field("owner_email", &self.owner_email)
            .field("due_cutoff_day", &self.due_cutoff_day)
            .field("default_rent", &self.default_rent)
            .field("room_numbers", &self.room_numbers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    const KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn applies_defaults() {
        let config = Config::from_vars(vars(&[
            ("SESSION_KEY", KEY),
            ("OWNER_EMAIL", "Owner@PG.test"),
            ("OWNER_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite://pg_manager.db");
        assert_eq!(config.port, 8080);
        assert!(config.cookie_secure);
        assert_eq!(config.owner_email, "owner@pg.test");
        assert_eq!(config.due_cutoff_day, 5);
        assert_eq!(config.default_rent, 5000);
        assert!(config.room_numbers.is_empty());
    }

    #[test]
    fn parses_overrides_and_room_list() {
        let config = Config::from_vars(vars(&[
            ("SESSION_KEY", KEY),
            ("OWNER_EMAIL", "owner@pg.test"),
            ("OWNER_PASSWORD", "secret"),
            ("PORT", "9000"),
            ("COOKIE_SECURE", "false"),
            ("DUE_CUTOFF_DAY", "10"),
            ("DEFAULT_RENT", "7500"),
            ("ROOM_NUMBERS", "101, 102,,103 "),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert!(!config.cookie_secure);
        assert_eq!(config.due_cutoff_day, 10);
        assert_eq!(config.default_rent, 7500);
        assert_eq!(config.room_numbers, vec!["101", "102", "103"]);
    }

    #[test]
    fn rejects_short_session_key() {
        let err = Config::from_vars(vars(&[
            ("SESSION_KEY", "too-short"),
            ("OWNER_EMAIL", "owner@pg.test"),
            ("OWNER_PASSWORD", "secret"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SESSION_KEY"));
    }

    #[test]
    fn requires_owner_credentials() {
        let err = Config::from_vars(vars(&[("SESSION_KEY", KEY)])).unwrap_err();
        assert!(err.to_string().contains("OWNER_EMAIL"));
    }

    #[test]
    fn rejects_out_of_range_cutoff() {
        let err = Config::from_vars(vars(&[
            ("SESSION_KEY", KEY),
            ("OWNER_EMAIL", "owner@pg.test"),
            ("OWNER_PASSWORD", "secret"),
            ("DUE_CUTOFF_DAY", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
