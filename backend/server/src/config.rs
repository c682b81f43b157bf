use std::{env, fmt::Display, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::canvas::Palette;

pub const DEFAULT_COLORS: &str = "red,blue,green,yellow,purple,orange,pink,cyan,brown,white,black,gray";

pub struct Config {
    pub port: u16,
    pub canvas_size: u32,
    pub cooldown_ms: u64,
    pub backup_interval: Duration,
    pub backup_timeout: Duration,
    pub backup_file: PathBuf,
    pub palette: Palette,
    pub cors_origins: Vec<String>,
    pub cooldown_prune_at: usize,
}

impl Config {
    pub fn load() -> Self {
        let colors: String = try_load("CANVAS_COLORS", DEFAULT_COLORS);
        let base_color: String = try_load("CANVAS_BASE_COLOR", "white");
        let origins: String = try_load("CORS_ORIGIN", "*");

        Self {
            port: try_load("RUST_PORT", "3005"),
            canvas_size: try_load::<NonZeroU32>("CANVAS_SIZE", "50").get(),
            cooldown_ms: try_load("COOLDOWN_MS", "30000"),
            backup_interval: Duration::from_secs(try_load("BACKUP_INTERVAL_SECS", "900")),
            backup_timeout: Duration::from_secs(try_load("BACKUP_TIMEOUT_SECS", "10")),
            backup_file: PathBuf::from(try_load::<String>("BACKUP_FILE", "backup.json")),
            palette: Palette::new(split_list(&colors), &base_color)
                .map_err(|e| {
                    warn!("Invalid palette: {e}");
                })
                .expect("Environment misconfigured!"),
            cors_origins: split_list(&origins),
            cooldown_prune_at: try_load("COOLDOWN_PRUNE_AT", "10000"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3005,
            canvas_size: 50,
            cooldown_ms: 30_000,
            backup_interval: Duration::from_secs(15 * 60),
            backup_timeout: Duration::from_secs(10),
            backup_file: PathBuf::from("backup.json"),
            palette: Palette::default(),
            cors_origins: vec!["*".to_string()],
            cooldown_prune_at: 10_000,
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
