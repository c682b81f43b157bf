use std::sync::Arc;

use tracing::info;

use super::{
    backup::Backup, canvas::Canvas, config::Config, cooldown::CooldownTracker,
    placement::Coordinator,
};

pub struct State {
    pub config: Config,
    pub canvas: Arc<Canvas>,
    pub placement: Coordinator,
    pub backup: Backup,
}

impl State {
    pub async fn new() -> Arc<Self> {
        Self::with_config(Config::load()).await
    }

    /// Restores the canvas from the last backup, or starts a fresh one.
    pub async fn with_config(config: Config) -> Arc<Self> {
        let backup = Backup::new(config.backup_file.clone(), config.backup_timeout);
        let canvas = Arc::new(Canvas::new(
            config.canvas_size,
            Arc::new(config.palette.clone()),
        ));

        match backup.load().await {
            Some(pixels) => {
                let applied = canvas.restore(pixels);
                info!("Backup loaded: {applied} pixels restored");
            }
            None => info!("Initializing new canvas"),
        }

        let placement = Coordinator::new(
            canvas.clone(),
            CooldownTracker::new(config.cooldown_prune_at),
            config.cooldown_ms,
        );

        Arc::new(Self {
            config,
            canvas,
            placement,
            backup,
        })
    }
}
