use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::services::Roster;
use crate::store::AttendanceStore;

#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<dyn Roster>,
    pub store: Arc<dyn AttendanceStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new<S>(backend: Arc<S>, config: Config) -> Self
    where
        S: Roster + AttendanceStore + 'static,
    {
        Self {
            roster: backend.clone(),
            store: backend,
            config: Arc::new(config),
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
