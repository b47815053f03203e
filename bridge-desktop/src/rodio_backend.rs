//! Streaming playback backend using rodio
//!
//! The rodio output stream is not `Send`, so a dedicated audio thread owns it
//! together with the sink. The async handle talks to that thread over a
//! command channel and awaits replies on oneshot channels.

use crate::source::fetch_source_bytes;
use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{AudioSource, BackendKind, BackendStatus, PlaybackBackend},
};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

type Reply<T> = oneshot::Sender<Result<T>>;

enum AudioCmd {
    Load(Vec<u8>, Reply<()>),
    Play(Reply<()>),
    Pause(Reply<()>),
    Resume(Reply<()>),
    Stop(Reply<()>),
    Seek(Duration, Reply<()>),
    Position(Reply<Duration>),
    Duration(Reply<Option<Duration>>),
    Status(Reply<BackendStatus>),
    Shutdown,
}

/// rodio-backed [`PlaybackBackend`] for URLs, data URIs and local files.
pub struct RodioBackend {
    commands: mpsc::Sender<AudioCmd>,
    client: reqwest::Client,
}

impl RodioBackend {
    /// Spawn the audio thread. The output device is opened on the thread;
    /// a missing device surfaces as an error from [`load`](PlaybackBackend::load).
    pub fn new() -> Result<Self> {
        let (commands, receiver) = mpsc::channel();

        thread::Builder::new()
            .name("mixtape-audio".to_string())
            .spawn(move || run_audio_thread(receiver))
            .map_err(BridgeError::Io)?;

        Ok(Self {
            commands,
            client: reqwest::Client::new(),
        })
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> AudioCmd) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| audio_thread_gone())?;
        response.await.map_err(|_| audio_thread_gone())?
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        self.commands.send(AudioCmd::Shutdown).ok();
    }
}

fn audio_thread_gone() -> BridgeError {
    BridgeError::NotAvailable("audio thread stopped".to_string())
}

#[async_trait]
impl PlaybackBackend for RodioBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Streaming
    }

    async fn load(&self, source: AudioSource) -> Result<()> {
        let bytes = fetch_source_bytes(&self.client, &source).await?;
        debug!(source = %source, bytes = bytes.len(), "Loading into rodio");
        self.request(|reply| AudioCmd::Load(bytes, reply)).await
    }

    async fn play(&self) -> Result<()> {
        self.request(AudioCmd::Play).await
    }

    async fn pause(&self) -> Result<()> {
        self.request(AudioCmd::Pause).await
    }

    async fn resume(&self) -> Result<()> {
        self.request(AudioCmd::Resume).await
    }

    async fn stop(&self) -> Result<()> {
        self.request(AudioCmd::Stop).await
    }

    async fn position(&self) -> Result<Duration> {
        self.request(AudioCmd::Position).await
    }

    async fn duration(&self) -> Result<Option<Duration>> {
        self.request(AudioCmd::Duration).await
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        self.request(|reply| AudioCmd::Seek(position, reply)).await
    }

    async fn status(&self) -> Result<BackendStatus> {
        self.request(AudioCmd::Status).await
    }

    async fn release(&self) -> Result<()> {
        self.commands.send(AudioCmd::Shutdown).ok();
        Ok(())
    }
}

// ============================================================================
// Audio thread
// ============================================================================

struct Output {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

#[derive(Default)]
struct Loaded {
    sink: Option<Sink>,
    duration: Option<Duration>,
    started: bool,
}

fn not_loaded() -> BridgeError {
    BridgeError::OperationFailed("no source loaded".to_string())
}

fn run_audio_thread(receiver: mpsc::Receiver<AudioCmd>) {
    let output = match OutputStream::try_default() {
        Ok((stream, handle)) => Ok(Output {
            _stream: stream,
            handle,
        }),
        Err(e) => {
            warn!(error = %e, "No audio output device");
            Err(e.to_string())
        }
    };

    let mut loaded = Loaded::default();

    while let Ok(cmd) = receiver.recv() {
        match cmd {
            AudioCmd::Load(bytes, reply) => {
                let result = match &output {
                    Ok(output) => load_sink(output, bytes).map(|(sink, duration)| {
                        if let Some(old) = loaded.sink.take() {
                            old.stop();
                        }
                        loaded = Loaded {
                            sink: Some(sink),
                            duration,
                            started: false,
                        };
                    }),
                    Err(message) => Err(BridgeError::NotAvailable(format!(
                        "audio output unavailable: {}",
                        message
                    ))),
                };
                reply.send(result).ok();
            }
            AudioCmd::Play(reply) | AudioCmd::Resume(reply) => {
                let result = loaded.sink.as_ref().map(Sink::play).ok_or_else(not_loaded);
                if result.is_ok() {
                    loaded.started = true;
                }
                reply.send(result).ok();
            }
            AudioCmd::Pause(reply) => {
                let result = loaded.sink.as_ref().map(Sink::pause).ok_or_else(not_loaded);
                reply.send(result).ok();
            }
            AudioCmd::Stop(reply) => {
                if let Some(sink) = loaded.sink.take() {
                    sink.stop();
                }
                loaded = Loaded::default();
                reply.send(Ok(())).ok();
            }
            AudioCmd::Seek(position, reply) => {
                let result = match &loaded.sink {
                    Some(sink) => sink.try_seek(position).map_err(|e| {
                        BridgeError::OperationFailed(format!("Seek failed: {}", e))
                    }),
                    None => Err(not_loaded()),
                };
                reply.send(result).ok();
            }
            AudioCmd::Position(reply) => {
                let position = loaded
                    .sink
                    .as_ref()
                    .map(Sink::get_pos)
                    .unwrap_or_default();
                reply.send(Ok(position)).ok();
            }
            AudioCmd::Duration(reply) => {
                reply.send(Ok(loaded.duration)).ok();
            }
            AudioCmd::Status(reply) => {
                let ended = loaded.started
                    && loaded.sink.as_ref().is_some_and(|sink| sink.empty());
                let status = if ended {
                    BackendStatus::Ended
                } else {
                    BackendStatus::Active
                };
                reply.send(Ok(status)).ok();
            }
            AudioCmd::Shutdown => break,
        }
    }

    if let Some(sink) = loaded.sink.take() {
        sink.stop();
    }
    debug!("Audio thread exited");
}

fn load_sink(output: &Output, bytes: Vec<u8>) -> Result<(Sink, Option<Duration>)> {
    let decoder = Decoder::new(Cursor::new(bytes))
        .map_err(|e| BridgeError::UnsupportedSource(format!("Cannot decode audio: {}", e)))?;
    let duration = decoder.total_duration();

    let sink = Sink::try_new(&output.handle)
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to open sink: {}", e)))?;
    sink.pause();
    sink.append(decoder);

    Ok((sink, duration))
}
