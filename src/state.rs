use std::sync::Arc;

use crate::{client::Client, config::AppConfig};

#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(client: Client, config: AppConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}
