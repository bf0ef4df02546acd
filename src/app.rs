use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::audio::source::AudioSource;
use crate::config::AudioConfig;
use crate::input::state_machine::{Action, HotkeyStateMachine, KeyInput};
use crate::media::MediaControl;
use crate::output::OutputRouter;
use crate::session::{CaptureSession, SessionError};
use crate::transcription::Transcriber;

/// Builds a fresh audio source for each capture session
pub type SourceFactory = Box<dyn Fn() -> Box<dyn AudioSource> + Send + Sync>;

/// Owns the state machine, the single active session, and the capability
/// interfaces. Consumes the key-event channel; every failure is caught and
/// logged here so the listener keeps running.
pub struct App {
    machine: HotkeyStateMachine,
    active: Option<CaptureSession>,
    sources: SourceFactory,
    transcriber: Arc<dyn Transcriber>,
    router: Arc<dyn OutputRouter>,
    media: Arc<dyn MediaControl>,
    audio: AudioConfig,
    buffer_path: PathBuf,
}

impl App {
    #[must_use]
    pub fn new(
        audio: AudioConfig,
        buffer_path: PathBuf,
        sources: SourceFactory,
        transcriber: Arc<dyn Transcriber>,
        router: Arc<dyn OutputRouter>,
        media: Arc<dyn MediaControl>,
    ) -> Self {
        Self {
            machine: HotkeyStateMachine::new(),
            active: None,
            sources,
            transcriber,
            router,
            media,
            audio,
            buffer_path,
        }
    }

    /// Main loop: drain key events until the listener channel closes
    pub async fn run(mut self, mut events: UnboundedReceiver<KeyInput>) {
        while let Some(input) = events.recv().await {
            if let Some(action) = self.machine.handle(input) {
                self.dispatch(action).await;
            }
        }
        info!("key event channel closed, exiting");
    }

    async fn dispatch(&mut self, action: Action) {
        match action {
            Action::StartSession(mode) => self.start_session(mode),
            Action::EndSession => self.end_session().await,
        }
    }

    fn start_session(&mut self, mode: crate::output::OutputMode) {
        if self.active.is_some() {
            warn!(error = %SessionError::AlreadyRecording, "start rejected");
            return;
        }

        let source = (self.sources)();
        match CaptureSession::start(
            mode,
            source,
            self.media.as_ref(),
            &self.audio,
            &self.buffer_path,
        ) {
            Ok(session) => self.active = Some(session),
            Err(e) => error!(error = %e, "failed to start capture session"),
        }
    }

    async fn end_session(&mut self) {
        let Some(session) = self.active.take() else {
            debug!("end requested with no active session");
            return;
        };

        let media = Arc::clone(&self.media);
        let transcriber = Arc::clone(&self.transcriber);
        let router = Arc::clone(&self.router);

        // The flush wait and whisper inference block for a while; keep them
        // off the runtime's core threads. Awaiting here intentionally holds
        // up the dispatch path (not the listener) until delivery completes.
        let finished = tokio::task::spawn_blocking(move || {
            finish_session(session, media.as_ref(), transcriber.as_ref(), router.as_ref());
        })
        .await;

        if finished.is_err() {
            error!("session pipeline task panicked");
        }
    }
}

/// Release-time pipeline: stop → wait for seal → transcribe → deliver.
/// All failures end the session in a failed state; none propagate.
fn finish_session(
    session: CaptureSession,
    media: &dyn MediaControl,
    transcriber: &dyn Transcriber,
    router: &dyn OutputRouter,
) {
    let mode = session.mode();

    let sealed = match session.stop(media) {
        Ok(sealed) => sealed,
        Err(e) => {
            error!(error = %e, "session failed before transcription");
            return;
        }
    };

    let text = match transcriber.transcribe(&sealed.path) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "transcription failed, no output delivered");
            return;
        }
    };
    info!(text_len = text.len(), "transcription succeeded");

    match router.deliver(&text, mode) {
        Ok(()) => info!(?mode, "transcript delivered"),
        Err(e) => error!(error = %e, "failed to deliver transcript"),
    }
}
