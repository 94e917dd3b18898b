use crate::backend::Backend;
use crate::services::Services;
use crate::timer::TimerRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub timers: TimerRegistry,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let services = Services::new(backend);
        let timers = TimerRegistry::new(services.sessions.clone(), services.analytics.clone());
        Self { services, timers }
    }
}
