use crate::voices::Language;
use config::{Config, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub tts_binary: String,
    pub shell: String,
    pub audio_extension: String,
    pub default_language: Language,
    // Retry Settings
    pub max_retries: u32,      // process launches per request
    pub retry_backoff_ms: u64, // pause between attempts
    pub process_timeout_secs: u64, // 0 = wait for the tool indefinitely
    // Catalog Settings
    pub preview_length: usize,
    pub tick_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("TTS_Audio"),
            tts_binary: "edge-tts".to_string(),
            shell: crate::backends::edge_tts::default_shell().to_string(),
            audio_extension: "mp3".to_string(),
            default_language: Language::Chinese,
            max_retries: 3,
            retry_backoff_ms: 1000,
            process_timeout_secs: 0,
            preview_length: 15,
            tick_interval_ms: 50,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = Settings::default();
        let user_config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tts-studio/TtsStudio");

        let builder = Config::builder()
            .set_default("output_dir", defaults.output_dir.to_string_lossy().to_string())?
            .set_default("tts_binary", defaults.tts_binary)?
            .set_default("shell", defaults.shell)?
            .set_default("audio_extension", defaults.audio_extension)?
            .set_default("default_language", "chinese")?
            // Retry defaults
            .set_default("max_retries", defaults.max_retries)?
            .set_default("retry_backoff_ms", defaults.retry_backoff_ms)?
            .set_default("process_timeout_secs", defaults.process_timeout_secs)?
            // Catalog defaults
            .set_default("preview_length", defaults.preview_length as u64)?
            .set_default("tick_interval_ms", defaults.tick_interval_ms)?
            // Merge with local config file (if exists)
            .add_source(File::with_name("TtsStudio").required(false))
            .add_source(File::with_name(&user_config.to_string_lossy()).required(false))
            // Merge with environment variables (e.g. TTS_STUDIO_MAX_RETRIES)
            .add_source(
                config::Environment::with_prefix("TTS_STUDIO")
                    .prefix_separator("_")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.max_retries == 0 {
            return Err(config::ConfigError::Message(
                "max_retries must be greater than 0".to_string(),
            ));
        }
        if self.preview_length == 0 {
            return Err(config::ConfigError::Message(
                "preview_length must be greater than 0".to_string(),
            ));
        }
        if self.tts_binary.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "tts_binary must not be empty".to_string(),
            ));
        }
        if self.audio_extension.trim_start_matches('.').is_empty() {
            return Err(config::ConfigError::Message(
                "audio_extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Extension without the leading dot.
    pub fn extension(&self) -> &str {
        self.audio_extension.trim_start_matches('.')
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        match self.process_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
