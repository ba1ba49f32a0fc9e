//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use ndg_config::{AppConfig, ServiceStopConfig};

/// Fluent builder for [`AppConfig`] in tests.
///
/// Starts from defaults with every host command replaced by `true`, so a
/// test never stops services or powers off the machine it runs on.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .service("lnd", 1)
///     .service("bitcoind", 1)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
    services_set: bool,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.poweroff.stop_command = vec!["true".to_string()];
        config.poweroff.poweroff_command = vec!["true".to_string()];
        config.system.hostname_command = vec!["true".to_string()];
        Self {
            config,
            services_set: false,
        }
    }

    /// Add a service to the power-off plan. The first call replaces the
    /// default plan.
    pub fn service(mut self, name: &str, timeout_secs: u64) -> Self {
        if !self.services_set {
            self.config.poweroff.services.clear();
            self.services_set = true;
        }
        self.config
            .poweroff
            .services
            .push(ServiceStopConfig::new(name, timeout_secs));
        self
    }

    pub fn poll_secs(mut self, secs: u64) -> Self {
        self.config.reports.poll_secs = secs;
        self
    }

    pub fn standby_idle_secs(mut self, secs: u64) -> Self {
        self.config.ui.standby_idle_secs = secs;
        self
    }

    pub fn standby_poll_ms(mut self, ms: u64) -> Self {
        self.config.ui.standby_poll_ms = ms;
        self
    }

    pub fn hostname(mut self, name: &str) -> Self {
        self.config.settings.hostname = name.to_string();
        self
    }

    pub fn ui_path(mut self, path: &str) -> Self {
        self.config.daemon.ui_path = path.to_string();
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
