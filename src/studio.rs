use crate::catalog::{self, CatalogEntry};
use crate::config_loader::Settings;
use crate::error::{CatalogError, SynthesisError};
use crate::generator::{Generator, SynthesisRequest};
use crate::voices::Language;

use chrono::Local;
use std::path::PathBuf;
use tracing::info;

/// Ties the generator to an output directory: names new files with the
/// catalog codec and reads the catalog back from disk.
#[derive(Clone)]
pub struct Studio {
    generator: Generator,
    output_dir: PathBuf,
    extension: String,
    preview_length: usize,
    max_attempts: u32,
}

impl Studio {
    pub fn new(settings: &Settings, generator: Generator) -> Self {
        Self {
            generator,
            output_dir: settings.output_dir.clone(),
            extension: settings.extension().to_string(),
            preview_length: settings.preview_length,
            max_attempts: settings.max_retries,
        }
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Start synthesizing `text`; `on_complete` runs during a later `tick`.
    pub fn generate<F>(&self, text: &str, language: Language, voice_index: usize, on_complete: F)
    where
        F: FnOnce(Result<CatalogEntry, SynthesisError>) + Send + 'static,
    {
        let text = text.trim();
        let voice = language
            .voice_name(voice_index)
            .unwrap_or(catalog::UNKNOWN_VOICE)
            .to_string();

        let stem = catalog::encode_stem(&voice, text, self.preview_length);
        let file_name = format!("{}.{}", stem, self.extension);
        let destination = self.output_dir.join(&file_name);
        let preview = catalog::preview(text, self.preview_length);

        info!(voice = %voice, file = %file_name, "submitting synthesis");

        let request = SynthesisRequest::new(destination, text, language, voice_index)
            .with_max_attempts(self.max_attempts);

        self.generator.submit(request, move |outcome| {
            let entry = outcome.result.map(|path| CatalogEntry {
                path,
                file_name,
                voice,
                preview,
                created_at: Local::now(),
            });
            on_complete(entry);
        });
    }

    pub fn catalog(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        catalog::load_catalog(&self.output_dir, &self.extension)
    }

    /// Run callbacks delivered since the last tick. Call from the owning loop.
    pub fn tick(&self) -> usize {
        self.generator.dispatcher().drain()
    }
}
