use std::sync::Arc;
use std::time::Instant;

use crate::auth::JwtValidator;
use crate::config::Settings;
use crate::hub::HubHandle;
use crate::notification::{NotificationPublisher, UnreadCounter};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub hub: HubHandle,
    pub publisher: NotificationPublisher,
    pub counter: Arc<dyn UnreadCounter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        hub: HubHandle,
        publisher: NotificationPublisher,
        counter: Arc<dyn UnreadCounter>,
    ) -> Self {
        let jwt_validator = Arc::new(JwtValidator::new(&settings.jwt));

        Self {
            settings: Arc::new(settings),
            jwt_validator,
            hub,
            publisher,
            counter,
            start_time: Instant::now(),
        }
    }
}
