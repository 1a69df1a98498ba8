use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use dotenvy::dotenv;
use rust_decimal::Decimal;

use crate::leave::{CancelCutoff, LeavePolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    pub leave: LeavePolicy,
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    lookup(key).with_context(|| format!("{key} must be set"))
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
    }
}

impl Config {
    /// Reads `.env` then the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = LeavePolicy::default();

        let urgent_days: i64 = parsed(&lookup, "LEAVE_URGENT_DAYS", defaults.urgent_days)?;
        let auto_approve_days: i64 =
            parsed(&lookup, "LEAVE_AUTO_APPROVE_DAYS", defaults.auto_approve_days)?;
        if urgent_days < 0 || auto_approve_days <= urgent_days {
            bail!(
                "LEAVE_AUTO_APPROVE_DAYS ({auto_approve_days}) must be greater than LEAVE_URGENT_DAYS ({urgent_days})"
            );
        }

        let sweep_secs: u64 = parsed(
            &lookup,
            "LEAVE_SWEEP_INTERVAL_SECS",
            defaults.sweep_interval.as_secs(),
        )?;
        if sweep_secs == 0 {
            bail!("LEAVE_SWEEP_INTERVAL_SECS must be positive");
        }

        let cancel_cutoff: CancelCutoff = match lookup("LEAVE_CANCEL_CUTOFF") {
            None => defaults.cancel_cutoff,
            Some(raw) => raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("LEAVE_CANCEL_CUTOFF={raw:?} must be before_start or start_day")
            })?,
        };

        let carry_forward_cap: Decimal =
            parsed(&lookup, "LEAVE_CARRY_FORWARD_CAP", defaults.carry_forward_cap)?;
        if carry_forward_cap < Decimal::ZERO {
            bail!("LEAVE_CARRY_FORWARD_CAP cannot be negative");
        }

        let cache_ttl_secs: u64 = parsed(
            &lookup,
            "LEAVE_TYPE_CACHE_TTL_SECS",
            defaults.leave_type_cache_ttl.as_secs(),
        )?;

        Ok(Self {
            server_addr: required(&lookup, "SERVER_ADDR")?,
            database_url: required(&lookup, "DATABASE_URL")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            rate_protected_per_min: parsed(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,
            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            leave: LeavePolicy {
                urgent_days,
                auto_approve_days,
                sweep_interval: Duration::from_secs(sweep_secs),
                cancel_cutoff,
                carry_forward_cap,
                leave_type_cache_ttl: Duration::from_secs(cache_ttl_secs),
            },
        })
    }
}
