use anyhow::Result;
use std::sync::Arc;

use voicenote::app::App;
use voicenote::audio::source::CpalSource;
use voicenote::config::Config;
use voicenote::input::listener::{self, KeyMap};
use voicenote::media::SpotifyControl;
use voicenote::output::DesktopRouter;
use voicenote::telemetry;
use voicenote::transcription::WhisperTranscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("voicenote starting");

    let transcriber = Arc::new(WhisperTranscriber::new(&config.model)?);
    let router = Arc::new(DesktopRouter::new(Config::expand_path(
        &config.paths.notes_file,
    )?));
    let media = Arc::new(SpotifyControl);
    let buffer_path = Config::expand_path(&config.paths.buffer_file)?;

    let key_map = KeyMap::from_config(&config.hotkey)?;
    let events = listener::spawn(key_map);
    tracing::info!(
        primary = %config.hotkey.primary_modifier,
        secondary = %config.hotkey.secondary_modifier,
        notes = %config.hotkey.notes_key,
        clipboard = %config.hotkey.clipboard_key,
        "global key listener running"
    );

    let source_config = config.audio.clone();
    let app = App::new(
        config.audio,
        buffer_path,
        Box::new(move || Box::new(CpalSource::new(&source_config))),
        transcriber,
        router,
        media,
    );

    println!("voicenote is listening. Hold the chord to record; press Ctrl+C to exit.");

    tokio::select! {
        () = app.run(events) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
