//! Log-backed stand-in for the lamp and display.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{info, warn};

use bigswitch_confirm::Notifier;
use bigswitch_core::config::DEFAULT_COLOR;
use bigswitch_core::Config;

/// Writes every feedback transition to the log with the colour the lamp
/// would show.
pub struct LogNotifier {
    colors: HashMap<String, u32>,
    current: Mutex<Option<String>>,
}

impl LogNotifier {
    pub fn new(colors: HashMap<String, u32>) -> Self {
        Self {
            colors,
            current: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let colors = config
            .services
            .iter()
            .map(|s| (s.name.clone(), config.color_for(&s.name)))
            .collect();
        Self::new(colors)
    }

    pub fn color_for(&self, service: &str) -> u32 {
        self.colors.get(service).copied().unwrap_or(DEFAULT_COLOR)
    }

    /// Service whose alert is currently showing.
    pub fn current(&self) -> Option<String> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    fn set_current(&self, service: Option<String>) {
        if let Ok(mut current) = self.current.lock() {
            *current = service;
        }
    }
}

impl Notifier for LogNotifier {
    fn alert(&self, service: &str) {
        info!(
            %service,
            color = %format!("#{:06x}", self.color_for(service)),
            "PROMOTION READY, press the button to deploy"
        );
        self.set_current(Some(service.to_string()));
    }

    fn success(&self) {
        info!(service = ?self.current(), "TRIGGERED");
    }

    fn failure(&self) {
        warn!(service = ?self.current(), "TRIGGER FAILED");
    }

    fn reset(&self) {
        if let Some(service) = self.current() {
            info!(%service, "alert cleared");
        }
        self.set_current(None);
    }
}
