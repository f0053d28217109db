//! Config command - inspect and initialize configuration.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;

pub fn run_config(action: &ConfigAction, settings: Settings) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            // Don't echo secrets into terminals or logs.
            let mut display = settings.clone();
            if display.gemini.api_key.is_some() {
                display.gemini.api_key = Some("<redacted>".to_string());
            }
            let rendered = toml::to_string_pretty(&display)?;
            println!("{}", rendered);
        }

        ConfigAction::Path => {
            println!("{}", Settings::default_config_path().display());
        }

        ConfigAction::Init => {
            let path = Settings::default_config_path();
            if path.exists() {
                Output::warning(&format!(
                    "Config file already exists at {}",
                    path.display()
                ));
                return Ok(());
            }
            // Never write a key picked up from the environment to disk.
            let mut to_save = settings.clone();
            to_save.gemini.api_key = None;
            to_save.save_to(&path)?;
            Output::success(&format!("Wrote configuration to {}", path.display()));
        }
    }

    Ok(())
}
