//! Secure system settings capability

/// Settings key for the "allow mock locations" developer option
pub const ALLOW_MOCK_LOCATION: &str = "mock_location";

/// Value the platform stores when mock locations are allowed
pub const SETTING_ENABLED: &str = "1";

/// Read access to platform settings. `None` when the key is unset.
pub trait SettingsReader: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
}
