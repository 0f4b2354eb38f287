use anyhow::Result;
use builder_core::dispatch::{ModalHost, Navigator, Notifier};
use shared::protocol::{ModalConfig, NotificationLevel};
use tracing::info;

/// Host handles that report side effects on stdout.
pub struct Console;

impl Notifier for Console {
    fn notify(&self, level: NotificationLevel, message: &str) {
        println!("[{level:?}] {message}");
    }
}

impl Navigator for Console {
    fn navigate(&self, route: &str) -> Result<()> {
        info!(route, "navigate");
        println!("navigate -> {route}");
        Ok(())
    }
}

impl ModalHost for Console {
    fn open_modal(&self, config: &ModalConfig) -> Result<()> {
        println!(
            "modal {} opened: {}",
            config.modal_id.as_deref().unwrap_or("(unnamed)"),
            config.title.as_deref().unwrap_or_default()
        );
        Ok(())
    }
}
