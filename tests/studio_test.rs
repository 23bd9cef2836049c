use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tts_studio::backends::{ProcessOutput, SynthesisBackend};
use tts_studio::catalog::CatalogEntry;
use tts_studio::command::{ShellKind, SynthesisCommand};
use tts_studio::config_loader::Settings;
use tts_studio::dispatcher::Dispatcher;
use tts_studio::error::SynthesisError;
use tts_studio::generator::Generator;
use tts_studio::studio::Studio;
use tts_studio::voices::Language;

mockall::mock! {
    pub Backend {}
    impl SynthesisBackend for Backend {
        fn id(&self) -> &'static str;
        fn run(&self, command: &SynthesisCommand) -> Result<ProcessOutput, SynthesisError>;
    }
}

/// Writes a placeholder audio file the way the real tool would.
struct WritingBackend {
    launches: AtomicUsize,
}

impl SynthesisBackend for WritingBackend {
    fn id(&self) -> &'static str {
        "writing"
    }

    fn run(&self, command: &SynthesisCommand) -> Result<ProcessOutput, SynthesisError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        fs::write(&command.destination, b"ID3")?;
        Ok(ProcessOutput::success())
    }
}

type Slot = Arc<Mutex<Vec<(&'static str, Result<CatalogEntry, SynthesisError>)>>>;

fn settings(dir: &std::path::Path) -> Settings {
    Settings {
        output_dir: dir.to_path_buf(),
        max_retries: 2,
        retry_backoff_ms: 1,
        ..Default::default()
    }
}

fn tick_until(studio: &Studio, results: &Slot, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while results.lock().unwrap().len() < count {
        studio.tick();
        assert!(Instant::now() < deadline, "callbacks never fired");
        thread::sleep(Duration::from_millis(2));
    }
}

fn generate(
    studio: &Studio,
    results: &Slot,
    label: &'static str,
    text: &str,
    language: Language,
    voice: usize,
) {
    let results = results.clone();
    studio.generate(text, language, voice, move |entry| {
        results.lock().unwrap().push((label, entry));
    });
}

#[test]
fn test_generated_files_appear_in_catalog() {
    let dir = tempdir().unwrap();
    let settings = settings(dir.path());
    let backend = Arc::new(WritingBackend {
        launches: AtomicUsize::new(0),
    });
    let generator = Generator::new(backend.clone(), Dispatcher::new());
    let studio = Studio::new(&settings, generator);
    let results: Slot = Arc::new(Mutex::new(Vec::new()));

    generate(&studio, &results, "A", "  Hello world  ", Language::Chinese, 0);
    tick_until(&studio, &results, 1);
    // Millisecond timestamps keep the two file names apart.
    thread::sleep(Duration::from_millis(5));
    generate(&studio, &results, "B", "Good morning: everyone", Language::English, 3);
    tick_until(&studio, &results, 2);

    let results = results.lock().unwrap();
    let labels: Vec<&str> = results.iter().map(|(l, _)| *l).collect();
    assert_eq!(labels, vec!["A", "B"]);

    let first = results[0].1.as_ref().unwrap();
    assert_eq!(first.voice, "Xiaoxiao");
    assert_eq!(first.preview, "Hello_world");
    assert!(first.path.starts_with(dir.path()));
    assert!(first.file_name.ends_with(".mp3"));

    let second = results[1].1.as_ref().unwrap();
    assert_eq!(second.voice, "Guy");
    assert_eq!(second.preview, "Good_morning_ev");

    let catalog = studio.catalog().unwrap();
    assert_eq!(catalog.len(), 2);
    // Newest first, fields recovered from the names alone.
    assert_eq!(catalog[0].file_name, second.file_name);
    assert_eq!(catalog[0].voice, "Guy");
    assert_eq!(catalog[0].preview, "Good_morning_ev");
    assert_eq!(catalog[1].voice, "Xiaoxiao");
    assert_eq!(catalog[1].preview, "Hello_world");
    assert!((catalog[1].created_at - first.created_at).num_seconds().abs() <= 1);

    assert_eq!(backend.launches.load(Ordering::SeqCst), 2);
}

#[test]
fn test_failing_tool_exhausts_budget_and_frees_gate() {
    let dir = tempdir().unwrap();
    let settings = settings(dir.path());

    let mut backend = MockBackend::new();
    backend.expect_id().return_const("mock");
    backend
        .expect_run()
        .withf(|cmd| {
            cmd.voice_id == "en-US-AriaNeural"
                && cmd.arguments(ShellKind::Posix).contains("--write-media")
        })
        .times(2)
        .returning(|_| Ok(ProcessOutput::failure(1, "403 Forbidden")));

    let generator = Generator::new(Arc::new(backend), Dispatcher::new())
        .with_backoff(Duration::from_millis(1));
    let studio = Studio::new(&settings, generator);
    let results: Slot = Arc::new(Mutex::new(Vec::new()));

    generate(&studio, &results, "A", "Hi", Language::English, 1);
    tick_until(&studio, &results, 1);

    match &results.lock().unwrap()[0].1 {
        Err(SynthesisError::RetriesExhausted { budget, last }) => {
            assert_eq!(*budget, 2);
            assert!(last.to_string().contains("403 Forbidden"));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert!(!studio.generator().is_busy());
    assert!(studio.catalog().unwrap().is_empty());
}

#[test]
fn test_empty_text_never_launches() {
    let dir = tempdir().unwrap();
    let settings = settings(dir.path());

    let mut backend = MockBackend::new();
    backend.expect_id().return_const("mock");
    backend.expect_run().times(0);

    let generator = Generator::new(Arc::new(backend), Dispatcher::new());
    let studio = Studio::new(&settings, generator);
    let results: Slot = Arc::new(Mutex::new(Vec::new()));

    generate(&studio, &results, "A", "   ", Language::Chinese, 0);
    // Rejections are queued before `generate` returns.
    assert_eq!(studio.tick(), 1);

    let results = results.lock().unwrap();
    assert!(matches!(results[0].1, Err(SynthesisError::Validation(_))));
    assert!(!studio.generator().is_busy());
}
