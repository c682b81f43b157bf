//! # Backups
//!
//! Keeps the in-memory canvas alive across restarts.
//!
//!
//!
//! ## Format
//! - One JSON file, an array of `{ "x", "y", "color" }` records
//! - Pretty printed with 2 space indentation, x-major order
//! - No version field, the whole file is read on startup and rewritten on every save
//!
//!
//!
//! ## Cron Job
//! - Every backup interval (15 minutes by default) the canvas is copied and written out
//! - Once more on graceful shutdown
//! - Writes go to a uniquely named sibling `.tmp` file first and are then renamed
//!   over the target, so a crash mid-write leaves the previous backup intact
//! - A write that takes longer than the backup timeout is abandoned and never
//!   renamed, its temp file is removed once the blocking write finishes. The next
//!   tick retries
//!
//!
//!
//! ## Failure Policy
//! Backups are best effort. A missing or unreadable file on startup means a fresh
//! canvas, and a failed save is only logged. The in-memory canvas stays the source
//! of truth either way.
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use thiserror::Error;
use tokio::{
    fs,
    task::{JoinHandle, spawn_blocking},
    time::{MissedTickBehavior, interval, timeout},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    canvas::{CanvasSnapshot, Pixel},
    state::State,
};

pub const MIN_BACKUP_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Backup io error: {0}")]
    Io(#[from] io::Error),

    #[error("Backup serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Backup timed out after {0:?}")]
    TimedOut(Duration),
}

pub struct Backup {
    path: PathBuf,
    timeout: Duration,
}

impl Backup {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the last backup. Any failure is treated as "no prior backup".
    pub async fn load(&self) -> Option<Vec<Pixel>> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) => {
                warn!("No backup loaded from {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str(&data) {
            Ok(pixels) => Some(pixels),
            Err(e) => {
                warn!("Malformed backup at {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Replaces the backup file with `snapshot`.
    pub async fn save(&self, snapshot: &CanvasSnapshot) -> Result<(), BackupError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.tmp_path();

        let mut write = spawn_blocking({
            let tmp = tmp.clone();
            move || std::fs::write(tmp, bytes)
        });

        let written = match timeout(self.timeout, &mut write).await {
            Ok(Ok(result)) => result.map_err(BackupError::from),
            Ok(Err(e)) => Err(BackupError::Io(io::Error::other(e))),
            Err(_) => {
                // the blocking write cannot be cancelled, drop its file once it lands
                tokio::spawn(async move {
                    let _ = write.await;
                    let _ = fs::remove_file(&tmp).await;
                });
                return Err(BackupError::TimedOut(self.timeout));
            }
        };

        let result = match written {
            Ok(()) => fs::rename(&tmp, &self.path).await.map_err(BackupError::from),
            Err(e) => Err(e),
        };

        if result.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }

        result
    }

    /// Unique per save, so an abandoned write never shares a file with a later one.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", Uuid::new_v4()));

        self.path.with_file_name(name)
    }
}

/// Snapshots the canvas and saves it, logging the outcome.
pub async fn backup_canvas(state: &State) -> Result<(), BackupError> {
    let snapshot = state.canvas.snapshot();

    match state.backup.save(&snapshot).await {
        Ok(()) => {
            info!(
                "Backup saved: {} pixels to {}",
                snapshot.pixel_count(),
                state.backup.path().display()
            );
            Ok(())
        }
        Err(e) => {
            warn!("Backup failed: {e}");
            Err(e)
        }
    }
}

pub fn spawn_backups(state: Arc<State>) -> JoinHandle<()> {
    let period = state.config.backup_interval.max(MIN_BACKUP_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let _ = backup_canvas(&state).await;
        }
    })
}
