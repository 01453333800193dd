use std::sync::Arc;

use crate::config::AppConfig;
use crate::library::Library;

#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(library: Library, config: AppConfig) -> Self {
        Self {
            library: Arc::new(library),
            config: Arc::new(config),
        }
    }
}
