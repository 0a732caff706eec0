pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod nav;
pub mod utils;

pub use db::DbPool;

use arc_swap::ArcSwap;
use config::Config;
use std::sync::Arc;

use crate::engine::RosterSnapshot;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub roster: Arc<ArcSwap<RosterSnapshot>>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        Self {
            config,
            db,
            roster: Arc::new(ArcSwap::from_pointee(RosterSnapshot::default())),
        }
    }
}
