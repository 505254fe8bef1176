use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Wire protocol constants shared by the gateway and its clients
pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024; // 16 KB hard cap per client frame
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30; // WS ping cadence

/// Bounds for the capacity/energy update period.
pub const MIN_TICK_SECS: u64 = 1;
pub const MAX_TICK_SECS: u64 = 60;

/// Top-level config (moshunion.toml + MOSHUNION_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoshConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Timer periods for the update scheduler and the store sweeper.
///
/// The two periods are independent; changing one never affects the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between capacity/energy perturbation ticks (clamped to 1..=60).
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Seconds between TTL eviction sweeps of the venue store.
    #[serde(default = "default_sweep_secs")]
    pub sweep_secs: u64,
}

impl SchedulerConfig {
    /// Tick period after clamping to the supported range.
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_secs.clamp(MIN_TICK_SECS, MAX_TICK_SECS))
    }

    pub fn sweep_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_secs.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            sweep_secs: default_sweep_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Records untouched for this long are evicted by the sweeper.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Upper bound on tracked tours; the least recently touched is evicted first.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_records: default_max_records(),
        }
    }
}

/// How each tour's random generator is seeded.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// OS entropy: unknown bands/venues score differently on every run.
    #[default]
    Entropy,
    /// Derived from (tour id, band, venue): every draw is reproducible.
    Deterministic,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueConfig {
    #[serde(default)]
    pub seed_mode: SeedMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Outbound frames buffered per connection before updates are dropped.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
        }
    }
}

/// Client-side reconnect schedule used by `watch` subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
    /// `0` means retry forever.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fraction of each delay randomised in both directions (0.2 = ±20 %).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_ms: default_base_ms(),
            max_ms: default_max_ms(),
            max_attempts: default_max_attempts(),
            jitter: default_jitter(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_tick_secs() -> u64 {
    5
}
fn default_sweep_secs() -> u64 {
    60
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_max_records() -> usize {
    10_000
}
fn default_queue_depth() -> usize {
    32
}
fn default_base_ms() -> u64 {
    500
}
fn default_max_ms() -> u64 {
    30_000
}
fn default_max_attempts() -> u32 {
    10
}
fn default_jitter() -> f64 {
    0.2
}

impl MoshConfig {
    /// Load config from a TOML file with MOSHUNION_* env var overrides.
    ///
    /// Nested keys are separated by a double underscore so that field names
    /// keep their own underscores: `MOSHUNION_SCHEDULER__TICK_SECS=7`.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.moshunion/moshunion.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::MoshError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(MoshConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("MOSHUNION_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.moshunion/moshunion.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        figment::Jail::expect_with(|jail| {
            let path = jail.directory().join("missing.toml");
            let cfg = MoshConfig::load(path.to_str()).expect("defaults load");
            assert_eq!(cfg.gateway.port, DEFAULT_PORT);
            assert_eq!(cfg.scheduler.tick_secs, 5);
            assert_eq!(cfg.venue.seed_mode, SeedMode::Entropy);
            assert_eq!(cfg.store.max_records, 10_000);
            Ok(())
        });
    }

    #[test]
    fn toml_then_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "moshunion.toml",
                r#"
                [gateway]
                port = 9000

                [venue]
                seed_mode = "deterministic"

                [scheduler]
                tick_secs = 8
                "#,
            )?;
            jail.set_env("MOSHUNION_SCHEDULER__TICK_SECS", "6");

            let cfg = MoshConfig::load(Some("moshunion.toml")).expect("load");
            assert_eq!(cfg.gateway.port, 9000);
            assert_eq!(cfg.gateway.bind, DEFAULT_BIND);
            assert_eq!(cfg.venue.seed_mode, SeedMode::Deterministic);
            assert_eq!(cfg.scheduler.tick_secs, 6);
            Ok(())
        });
    }

    #[test]
    fn tick_period_is_clamped() {
        let cfg = SchedulerConfig {
            tick_secs: 0,
            sweep_secs: 60,
        };
        assert_eq!(cfg.tick_period().as_secs(), MIN_TICK_SECS);

        let cfg = SchedulerConfig {
            tick_secs: 600,
            sweep_secs: 60,
        };
        assert_eq!(cfg.tick_period().as_secs(), MAX_TICK_SECS);
    }
}
