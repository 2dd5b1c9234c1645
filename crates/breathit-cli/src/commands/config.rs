use breathit_core::format::format_clock;
use breathit_core::{Config, SessionConfig};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dotted config key (e.g. "practice.minutes", "cues.enabled")
        key: String,
    },
    /// Set a config value and save it
    Set {
        /// Dotted config key
        key: String,
        /// New value (empty clears an optional value)
        value: String,
    },
    /// List all config values as JSON
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            let stored = config.get(&key).unwrap_or_default();
            println!("{key} = {stored}");
            if key.starts_with("practice.") {
                println!("next session: {}", describe_session(&config.session_config()?));
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
            println!("next session: {}", describe_session(&config.session_config()?));
        }
    }
    Ok(())
}

/// "4-7-8-7 for 05:00": inhale, hold, exhale, hold seconds and length.
pub fn describe_session(session: &SessionConfig) -> String {
    format!(
        "{}-{}-{}-{} for {}",
        session.inhale_ms / 1000,
        session.hold_ms / 1000,
        session.exhale_ms / 1000,
        session.hold_ms / 1000,
        format_clock(session.total())
    )
}
