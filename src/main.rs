//! tts-studio - generate speech files with edge-tts and browse what was made
//!
//! The main thread is the owning context: it submits jobs and ticks the
//! dispatcher until the completion callback has run.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tts_studio::backends::edge_tts::EdgeTtsBackend;
use tts_studio::config_loader::Settings;
use tts_studio::dispatcher::Dispatcher;
use tts_studio::generator::Generator;
use tts_studio::studio::Studio;
use tts_studio::voices::{list_voices, Language};

/// Text-to-speech file generator with a browsable catalog
#[derive(Parser)]
#[command(name = "tts-studio")]
#[command(author = "StarTuz")]
#[command(version)]
#[command(about = "Generate speech audio files and list earlier ones", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize text into a new audio file
    Generate {
        /// Text to speak
        text: String,
        /// Language: chinese (zh) or english (en)
        #[arg(short, long)]
        language: Option<Language>,
        /// Voice index or name (see `voices`)
        #[arg(short, long, default_value = "0")]
        voice: String,
        /// Override the number of attempts
        #[arg(short, long)]
        retries: Option<u32>,
    },

    /// List generated audio files, newest first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available voices
    Voices {
        /// Only show one language
        #[arg(short, long)]
        language: Option<Language>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_voice(language: Language, voice: &str) -> Result<usize, String> {
    match voice.parse::<usize>() {
        Ok(index) => Ok(index),
        Err(_) => language.voice_index(voice).ok_or_else(|| {
            format!(
                "unknown {} voice '{}', expected one of: {}",
                language,
                voice,
                language.voices().join(", ")
            )
        }),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let mut settings = Settings::new()?;

    match cli.command {
        Commands::Generate {
            text,
            language,
            voice,
            retries,
        } => {
            if let Some(retries) = retries {
                settings.max_retries = retries;
                settings.validate()?;
            }
            let language = language.unwrap_or(settings.default_language);
            let voice_index = resolve_voice(language, &voice)?;

            std::fs::create_dir_all(&settings.output_dir)?;

            let backend = EdgeTtsBackend::new(&settings.tts_binary)
                .with_shell(&settings.shell)
                .with_timeout(settings.process_timeout());
            let generator = Generator::new(Arc::new(backend), Dispatcher::new())
                .with_backoff(settings.retry_backoff());
            let studio = Studio::new(&settings, generator);

            let result = Arc::new(Mutex::new(None));
            let slot = result.clone();
            studio.generate(&text, language, voice_index, move |entry| {
                if let Ok(mut slot) = slot.lock() {
                    *slot = Some(entry);
                }
            });

            let entry = loop {
                studio.tick();
                if let Some(entry) = result.lock().ok().and_then(|mut r| r.take()) {
                    break entry;
                }
                thread::sleep(settings.tick_interval());
            };

            match entry {
                Ok(entry) => {
                    println!("Generated: {}", entry.path.display());
                    println!("Voice:     {}", entry.voice);
                    println!("Preview:   {}", entry.preview);
                }
                Err(e) => {
                    eprintln!("Generation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::List { json } => {
            let output_dir = &settings.output_dir;
            let entries = if output_dir.exists() {
                tts_studio::catalog::load_catalog(output_dir, settings.extension())?
            } else {
                Vec::new()
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No audio generated yet");
            } else {
                println!("Generated Audio");
                println!("───────────────");
                for entry in entries {
                    println!(
                        "  {}  {:<12} {:<16} {}",
                        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                        entry.voice,
                        entry.preview,
                        entry.file_name
                    );
                }
            }
        }

        Commands::Voices { language } => {
            let languages = match language {
                Some(l) => vec![l],
                None => Language::ALL.to_vec(),
            };
            for language in languages {
                println!("{} Voices", language);
                println!("──────────────");
                for (index, voice) in list_voices(language).into_iter().enumerate() {
                    println!("  {}: {} ({})", index, voice.name, voice.id);
                }
            }
        }
    }

    Ok(())
}
