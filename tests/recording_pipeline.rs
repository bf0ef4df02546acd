//! End-to-end pipeline tests: key events in, delivered transcript out.
//!
//! The audio source, transcription gateway, and media control are replaced
//! by in-process fakes; the queue, writer, WAV buffer, and notes file are
//! real. Clipboard delivery is asserted through a recording router since CI
//! has no desktop clipboard.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use voicenote::app::{App, SourceFactory};
use voicenote::audio::source::{AudioSource, DeviceError};
use voicenote::audio::{BlockMsg, SampleBlock};
use voicenote::config::AudioConfig;
use voicenote::input::state_machine::{
    KeyInput::{Pressed, Released},
    KeySym::{ClipboardTrigger, NotesTrigger, PrimaryModifier, SecondaryModifier},
};
use voicenote::media::{MediaControl, MediaError};
use voicenote::output::{DesktopRouter, OutputError, OutputMode, OutputRouter};
use voicenote::transcription::{TranscriptionError, Transcriber};

struct ScriptedSource {
    blocks: Vec<Vec<f32>>,
}

impl AudioSource for ScriptedSource {
    fn run(&mut self, blocks: &Sender<BlockMsg>, stop: &AtomicBool) -> Result<(), DeviceError> {
        for samples in self.blocks.drain(..) {
            let _ = blocks.send(BlockMsg::Block(SampleBlock(samples)));
        }
        while !stop.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }
}

struct FixedTranscriber(&'static str);

impl Transcriber for FixedTranscriber {
    fn transcribe(&self, _: &std::path::Path) -> Result<String, TranscriptionError> {
        Ok(self.0.to_owned())
    }
}

struct FailingTranscriber;

impl Transcriber for FailingTranscriber {
    fn transcribe(&self, _: &std::path::Path) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::StateCreation)
    }
}

/// Fake player that counts toggles and flips its own playing state
struct FakeMedia {
    playing: AtomicBool,
    toggles: AtomicU32,
}

impl FakeMedia {
    fn new(playing: bool) -> Self {
        Self {
            playing: AtomicBool::new(playing),
            toggles: AtomicU32::new(0),
        }
    }
}

impl MediaControl for FakeMedia {
    fn is_playing(&self) -> Result<bool, MediaError> {
        Ok(self.playing.load(Ordering::SeqCst))
    }

    fn toggle_playback(&self) -> Result<(), MediaError> {
        self.toggles.fetch_add(1, Ordering::SeqCst);
        self.playing.fetch_xor(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Router that records every delivery instead of touching the desktop
#[derive(Default)]
struct RecordingRouter {
    delivered: Mutex<Vec<(String, OutputMode)>>,
}

impl OutputRouter for RecordingRouter {
    fn deliver(&self, text: &str, mode: OutputMode) -> Result<(), OutputError> {
        self.delivered.lock().unwrap().push((text.to_owned(), mode));
        Ok(())
    }
}

fn audio_config() -> AudioConfig {
    AudioConfig {
        sample_rate: 44100,
        channels: 1,
        poll_interval_ms: 1,
    }
}

fn temp_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!("voicenote_pipeline_{}_{name}", std::process::id()))
}

fn sources(blocks: Vec<Vec<f32>>) -> SourceFactory {
    Box::new(move || {
        Box::new(ScriptedSource {
            blocks: blocks.clone(),
        })
    })
}

async fn drive(app: App, inputs: Vec<voicenote::input::state_machine::KeyInput>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    for input in inputs {
        tx.send(input).unwrap();
    }
    drop(tx);
    app.run(rx).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn notes_chord_appends_transcript_and_seals_buffer() {
    let notes = temp_path("notes.txt");
    let buffer = temp_path("notes.wav");
    let _ = fs::remove_file(&notes);
    let _ = fs::remove_file(&buffer);

    let captured = vec![vec![0.1_f32, 0.2], vec![0.3, 0.4], vec![0.5]];
    let app = App::new(
        audio_config(),
        buffer.clone(),
        sources(captured.clone()),
        Arc::new(FixedTranscriber("hello world")),
        Arc::new(DesktopRouter::new(notes.clone())),
        Arc::new(FakeMedia::new(false)),
    );

    drive(
        app,
        vec![
            Pressed(SecondaryModifier),
            Pressed(PrimaryModifier),
            Pressed(NotesTrigger),
            Released(PrimaryModifier),
        ],
    )
    .await;

    // The transcript landed in the notes file with the entry separator.
    assert_eq!(fs::read_to_string(&notes).unwrap(), "\n\nhello world");

    // The buffer on disk is a sealed WAV holding every block in order.
    let mut reader = hound::WavReader::open(&buffer).unwrap();
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    let expected: Vec<f32> = captured.into_iter().flatten().collect();
    assert_eq!(samples, expected);

    let _ = fs::remove_file(notes);
    let _ = fs::remove_file(buffer);
}

#[tokio::test(flavor = "multi_thread")]
async fn clipboard_chord_routes_text_and_leaves_notes_alone() {
    let notes = temp_path("clip_notes.txt");
    let buffer = temp_path("clip.wav");
    let _ = fs::remove_file(&notes);

    let router = Arc::new(RecordingRouter::default());
    let app = App::new(
        audio_config(),
        buffer.clone(),
        sources(vec![vec![0.0; 16]]),
        Arc::new(FixedTranscriber("copied text")),
        Arc::clone(&router) as Arc<dyn OutputRouter>,
        Arc::new(FakeMedia::new(false)),
    );

    drive(
        app,
        vec![
            Pressed(PrimaryModifier),
            Pressed(SecondaryModifier),
            Pressed(ClipboardTrigger),
            Released(PrimaryModifier),
        ],
    )
    .await;

    let delivered = router.delivered.lock().unwrap();
    assert_eq!(
        *delivered,
        vec![("copied text".to_owned(), OutputMode::Clipboard)]
    );
    assert!(!notes.exists());

    let _ = fs::remove_file(buffer);
}

#[tokio::test(flavor = "multi_thread")]
async fn gateway_failure_leaves_sinks_untouched() {
    let notes = temp_path("fail_notes.txt");
    let buffer = temp_path("fail.wav");
    let _ = fs::remove_file(&notes);

    let router = Arc::new(RecordingRouter::default());
    let app = App::new(
        audio_config(),
        buffer.clone(),
        sources(vec![vec![0.0; 8]]),
        Arc::new(FailingTranscriber),
        Arc::clone(&router) as Arc<dyn OutputRouter>,
        Arc::new(FakeMedia::new(false)),
    );

    drive(
        app,
        vec![
            Pressed(SecondaryModifier),
            Pressed(PrimaryModifier),
            Pressed(NotesTrigger),
            Released(PrimaryModifier),
        ],
    )
    .await;

    assert!(router.delivered.lock().unwrap().is_empty());
    assert!(!notes.exists());

    let _ = fs::remove_file(buffer);
}

#[tokio::test(flavor = "multi_thread")]
async fn playing_media_is_paused_then_resumed() {
    let buffer = temp_path("media.wav");

    let media = Arc::new(FakeMedia::new(true));
    let app = App::new(
        audio_config(),
        buffer.clone(),
        sources(vec![]),
        Arc::new(FixedTranscriber("")),
        Arc::new(RecordingRouter::default()),
        Arc::clone(&media) as Arc<dyn MediaControl>,
    );

    drive(
        app,
        vec![
            Pressed(SecondaryModifier),
            Pressed(PrimaryModifier),
            Pressed(NotesTrigger),
            Released(PrimaryModifier),
        ],
    )
    .await;

    // Paused once at start, resumed once at stop, playing again afterwards.
    assert_eq!(media.toggles.load(Ordering::SeqCst), 2);
    assert!(media.is_playing().unwrap());

    let _ = fs::remove_file(buffer);
}

#[tokio::test(flavor = "multi_thread")]
async fn consecutive_sessions_reuse_the_buffer_target() {
    let notes = temp_path("two_notes.txt");
    let buffer = temp_path("two.wav");
    let _ = fs::remove_file(&notes);

    let app = App::new(
        audio_config(),
        buffer.clone(),
        sources(vec![vec![0.25; 4]]),
        Arc::new(FixedTranscriber("again")),
        Arc::new(DesktopRouter::new(notes.clone())),
        Arc::new(FakeMedia::new(false)),
    );

    let cycle = |trigger| {
        vec![
            Pressed(SecondaryModifier),
            Pressed(PrimaryModifier),
            Pressed(trigger),
            Released(PrimaryModifier),
            Released(SecondaryModifier),
        ]
    };
    let mut inputs = cycle(NotesTrigger);
    inputs.extend(cycle(NotesTrigger));
    drive(app, inputs).await;

    // Two full cycles, two entries, one buffer file.
    assert_eq!(fs::read_to_string(&notes).unwrap(), "\n\nagain\n\nagain");
    let reader = hound::WavReader::open(&buffer).unwrap();
    assert_eq!(reader.len(), 4);

    let _ = fs::remove_file(notes);
    let _ = fs::remove_file(buffer);
}
