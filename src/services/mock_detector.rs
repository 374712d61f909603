//! Mock-location setting check

use crate::io::settings::{SettingsReader, ALLOW_MOCK_LOCATION, SETTING_ENABLED};
use std::sync::Arc;

/// Reads the platform "allow mock locations" setting on every call
pub struct MockDetector {
    settings: Arc<dyn SettingsReader>,
}

impl MockDetector {
    pub fn new(settings: Arc<dyn SettingsReader>) -> Self {
        Self { settings }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.get_string(ALLOW_MOCK_LOCATION).as_deref() == Some(SETTING_ENABLED)
    }
}
