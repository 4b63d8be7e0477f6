//! Studio sessions: the state behind the two panels of the app.
//!
//! - [`ScriptStudio`]: idea + options → one script request → parsed
//!   [`Screenplay`], or a blocking notice.
//! - [`VoiceStudio`]: text snippet → speech request → base64 PCM →
//!   [`SampleBuffer`] → WAV [`ArtifactHandle`] + playback.
//!
//! Both take `&mut self` for every request, so a session never has two
//! requests or two playback sessions in flight.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use base64::Engine as _;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    artifact::{ArtifactHandle, ArtifactStore, WAV_MIME},
    client::{GenerationClient, GenerationError},
    codec::{decode_pcm16, encode_wav, PcmFormat, SampleBuffer},
    config::StudioConfig,
    playback::{AudioOutput, PlaybackController, PlaybackEnded, PlaybackError, PlaybackState, SessionId, Toggle},
    prompt::ScriptOptions,
    script::{snippet, Screenplay},
    voice::VoiceConfig,
};

/// Shown when a script request fails. The flow stops; nothing partial is kept.
pub const SCRIPT_FAILURE_NOTICE: &str = "The service is overloaded or the connection failed. Please try again.";

/// Shown inline in the voice studio when speech generation fails.
pub const SPEECH_FAILURE_MESSAGE: &str = "Could not generate speech. Please try again.";

/// Shown inline when audio was generated but the device refused to play it.
pub const PLAYBACK_FAILURE_MESSAGE: &str = "Audio is ready to download but could not be played on this device.";

// ─────────────────────────────────────────────────────────────────────────────
// ScriptStudio
// ─────────────────────────────────────────────────────────────────────────────

pub struct ScriptStudio<C> {
    client: C,
    pub idea: String,
    pub options: ScriptOptions,
    loading: bool,
    script: Option<Screenplay>,
    notice: Option<String>,
}

impl<C: GenerationClient> ScriptStudio<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            idea: String::new(),
            options: ScriptOptions::default(),
            loading: false,
            script: None,
            notice: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn script(&self) -> Option<&Screenplay> {
        self.script.as_ref()
    }

    /// Blocking notice from the last failed request, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Request a new screenplay. The previous one is discarded up front.
    pub async fn generate(&mut self) -> Option<&Screenplay> {
        self.loading = true;
        self.script = None;
        self.notice = None;

        let result = self.client.generate_script(&self.idea, &self.options).await;
        self.loading = false;

        match result {
            Ok(text) => {
                let parsed = Screenplay::parse(&text);
                info!(sections = parsed.sections().len(), "screenplay ready");
                self.script = Some(parsed);
            }
            Err(e) => {
                warn!(error = %e, "script request failed");
                self.notice = Some(SCRIPT_FAILURE_NOTICE.to_string());
            }
        }
        self.script.as_ref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// VoiceStudio
// ─────────────────────────────────────────────────────────────────────────────

/// Why a speech generation produced no playable audio.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

pub struct VoiceStudio<C, O: AudioOutput> {
    client: C,
    player: PlaybackController<O>,
    store: ArtifactStore,
    format: PcmFormat,
    snippet_chars: usize,
    download_filename: String,
    text: String,
    voice: VoiceConfig,
    buffer: Option<Arc<SampleBuffer>>,
    artifact: Option<ArtifactHandle>,
    loading: bool,
    error: Option<String>,
}

impl<C: GenerationClient, O: AudioOutput> VoiceStudio<C, O> {
    pub fn new(client: C, output: O, config: &StudioConfig) -> Result<Self> {
        Ok(Self {
            client,
            player: PlaybackController::new(output),
            store: ArtifactStore::new(),
            format: config.pcm_format()?,
            snippet_chars: config.snippet_chars,
            download_filename: config.download_filename.clone(),
            text: String::new(),
            voice: VoiceConfig::default(),
            buffer: None,
            artifact: None,
            loading: false,
            error: None,
        })
    }

    /// Seed the text box from a freshly generated script.
    pub fn load_script(&mut self, script: &str) {
        if !script.is_empty() {
            self.text = snippet(script, self.snippet_chars);
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn voice(&self) -> VoiceConfig {
        self.voice
    }

    /// Takes effect on the next playback start.
    pub fn set_voice(&mut self, voice: VoiceConfig) {
        self.voice = voice;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Inline error from the last request, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn buffer(&self) -> Option<&Arc<SampleBuffer>> {
        self.buffer.as_ref()
    }

    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        self.artifact.as_ref()
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// URL of the current download, or `None` before the first success.
    pub fn download_url(&self) -> Option<&str> {
        self.artifact.as_ref().map(ArtifactHandle::url)
    }

    pub fn download_filename(&self) -> &str {
        &self.download_filename
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.player.state()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<PlaybackState> {
        self.player.subscribe()
    }

    pub fn player(&self) -> &PlaybackController<O> {
        &self.player
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    /// Forward natural-completion detection to the controller.
    pub fn poll(&mut self) -> Option<PlaybackEnded> {
        self.player.poll()
    }

    async fn synthesize(&self) -> Result<(Arc<SampleBuffer>, ArtifactHandle), GenerationError> {
        let encoded = self.client.generate_speech(&self.text, self.voice.speaker, self.voice.speed).await?;
        let pcm = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        let buffer = decode_pcm16(&pcm, self.format);
        // A payload shorter than one frame carries no audio at all.
        if buffer.is_empty() {
            return Err(GenerationError::NoAudioData);
        }
        let artifact = self.store.create(encode_wav(&buffer), WAV_MIME);
        info!(
            frames = buffer.frame_count(),
            secs = buffer.duration_secs(),
            url = artifact.url(),
            "speech decoded"
        );
        Ok((Arc::new(buffer), artifact))
    }

    /// Generate speech for the current text and play it.
    ///
    /// Blank text is ignored. On failure the inline error is set and the
    /// previous buffer and download stay as they were.
    pub async fn generate_audio(&mut self) -> Option<SessionId> {
        if self.text.trim().is_empty() {
            return None;
        }

        self.loading = true;
        self.error = None;
        self.player.stop();

        let result = self.synthesize().await;
        self.loading = false;

        let (buffer, artifact) = match result {
            Ok(done) => done,
            Err(e) => {
                warn!(error = %e, "speech request failed");
                self.error = Some(SPEECH_FAILURE_MESSAGE.to_string());
                return None;
            }
        };

        // Dropping the old handle revokes its URL.
        self.artifact = Some(artifact);
        self.buffer = Some(Arc::clone(&buffer));

        match self.player.play(buffer, self.voice.speed) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "playback failed");
                self.error = Some(PLAYBACK_FAILURE_MESSAGE.to_string());
                None
            }
        }
    }

    /// Play/stop button. With nothing to replay, generates first.
    ///
    /// A replay the device refuses sets the same inline error as
    /// [`generate_audio`](Self::generate_audio).
    pub async fn toggle(&mut self) -> Result<Toggle, VoiceError> {
        let outcome = match self.player.toggle(self.buffer.clone(), self.voice.speed) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "replay failed");
                self.error = Some(PLAYBACK_FAILURE_MESSAGE.to_string());
                return Err(e.into());
            }
        };
        if let Toggle::Started(_) = outcome {
            self.error = None;
        }
        if outcome == Toggle::NeedsGeneration {
            self.generate_audio().await;
        }
        Ok(outcome)
    }

    /// Write the current download into `dir` under the suggested filename.
    pub fn save_download(&self, dir: &Path) -> Result<PathBuf> {
        let artifact = self.artifact.as_ref().context("No audio has been generated yet")?;
        artifact.save_as(dir, &self.download_filename)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{codec::decode_wav, playback::fake::FakeOutput, voice::Speaker};

    /// Scripted client: `None` payloads answer with the matching error.
    #[derive(Default)]
    struct FakeClient {
        script: Option<String>,
        speech: Mutex<Vec<Option<String>>>,
        speech_calls: Mutex<Vec<(String, Speaker, f32)>>,
    }

    impl FakeClient {
        fn with_speech(payloads: Vec<Option<String>>) -> Self {
            Self { speech: Mutex::new(payloads), ..Self::default() }
        }
    }

    #[async_trait::async_trait]
    impl GenerationClient for FakeClient {
        async fn generate_script(&self, _text: &str, _options: &ScriptOptions) -> Result<String, GenerationError> {
            self.script.clone().ok_or(GenerationError::Api { status: 503, message: "overloaded".into() })
        }

        async fn generate_speech(&self, text: &str, speaker: Speaker, speed: f32) -> Result<String, GenerationError> {
            self.speech_calls.lock().unwrap().push((text.to_string(), speaker, speed));
            let mut queue = self.speech.lock().unwrap();
            if queue.is_empty() {
                return Err(GenerationError::NoAudioData);
            }
            queue.remove(0).ok_or(GenerationError::NoAudioData)
        }
    }

    fn b64(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn studio(client: FakeClient) -> (VoiceStudio<Arc<FakeClient>, FakeOutput>, Arc<FakeClient>, FakeOutput) {
        let client = Arc::new(client);
        let output = FakeOutput::default();
        let s = VoiceStudio::new(Arc::clone(&client), output.clone(), &StudioConfig::default()).unwrap();
        (s, client, output)
    }

    #[tokio::test]
    async fn test_script_success() {
        let client = FakeClient { script: Some("# LIBRARY ENTRY\n- ID: X1\n".into()), ..FakeClient::default() };
        let mut s = ScriptStudio::new(client);
        s.idea = "a lighthouse on Europa".into();
        assert!(s.generate().await.is_some());
        assert!(!s.is_loading());
        assert!(s.notice().is_none());
        assert!(s.script().unwrap().raw().contains("X1"));
    }

    #[tokio::test]
    async fn test_script_failure_shows_notice_and_no_result() {
        let mut s = ScriptStudio::new(FakeClient::default());
        assert!(s.generate().await.is_none());
        assert_eq!(s.notice(), Some(SCRIPT_FAILURE_NOTICE));
        assert!(s.script().is_none());
        s.dismiss_notice();
        assert!(s.notice().is_none());
    }

    #[tokio::test]
    async fn test_generate_audio_plays_and_publishes_download() {
        let (mut s, client, output) = studio(FakeClient::with_speech(vec![Some(b64(&[16384, -16384]))]));
        s.set_text("INT. BRIDGE - NIGHT");
        s.set_voice(VoiceConfig { speaker: Speaker::Male, speed: 1.25 });

        let id = s.generate_audio().await;
        assert!(id.is_some());
        assert!(s.error().is_none());
        assert_eq!(s.playback_state(), PlaybackState::Playing { session: id.unwrap(), rate: 1.25 });

        let calls = client.speech_calls.lock().unwrap();
        assert_eq!(calls[0], ("INT. BRIDGE - NIGHT".to_string(), Speaker::Male, 1.25));

        let buffer = s.buffer().unwrap();
        assert_eq!(buffer.channel(0).unwrap(), &[0.5, -0.5]);

        let artifact = s.artifact().unwrap();
        assert_eq!(artifact.len(), 48);
        assert_eq!(&artifact.bytes()[44..], &[0x00, 0x40, 0x00, 0xC0]);
        assert!(s.store().resolve(s.download_url().unwrap()).is_some());
        assert_eq!(output.log.borrow().started, vec![(2, 1.25)]);
    }

    #[tokio::test]
    async fn test_missing_audio_sets_inline_error_without_playback() {
        let (mut s, _client, output) = studio(FakeClient::with_speech(vec![None]));
        s.set_text("Hello");
        assert!(s.generate_audio().await.is_none());
        assert_eq!(s.error(), Some(SPEECH_FAILURE_MESSAGE));
        assert!(!s.is_playing());
        assert!(s.download_url().is_none());
        assert!(output.log.borrow().started.is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_download() {
        let (mut s, _client, _output) =
            studio(FakeClient::with_speech(vec![Some(b64(&[1, 2, 3])), Some("%%% not base64".into())]));
        s.set_text("Hello");
        s.generate_audio().await;
        let url = s.download_url().unwrap().to_string();

        assert!(s.generate_audio().await.is_none());
        assert_eq!(s.error(), Some(SPEECH_FAILURE_MESSAGE));
        assert_eq!(s.download_url(), Some(url.as_str()));
        assert!(s.store().resolve(&url).is_some());
    }

    #[tokio::test]
    async fn test_new_generation_revokes_old_download() {
        let (mut s, _client, output) = studio(FakeClient::with_speech(vec![Some(b64(&[7])), Some(b64(&[8, 9]))]));
        s.set_text("Hello");
        s.generate_audio().await;
        let old = s.download_url().unwrap().to_string();

        s.generate_audio().await;
        assert!(s.store().resolve(&old).is_none());
        assert_eq!(s.store().live_count(), 1);
        // The first session was stopped before the second started.
        assert_eq!(output.log.borrow().halted, 1);
    }

    #[tokio::test]
    async fn test_blank_text_is_ignored() {
        let (mut s, client, _output) = studio(FakeClient::default());
        s.set_text("   \n");
        assert!(s.generate_audio().await.is_none());
        assert!(s.error().is_none());
        assert!(client.speech_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_cycle() {
        let (mut s, client, _output) = studio(FakeClient::with_speech(vec![Some(b64(&[100, 200]))]));
        s.set_text("Hello");

        assert_eq!(s.toggle().await.unwrap(), Toggle::NeedsGeneration);
        assert!(s.is_playing());
        assert_eq!(s.toggle().await.unwrap(), Toggle::Stopped);
        // Replays the held buffer without a new request.
        assert!(matches!(s.toggle().await.unwrap(), Toggle::Started(_)));
        assert_eq!(client.speech_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sub_frame_payload_is_a_speech_failure() {
        // "AA==" decodes to a single byte: less than one 16-bit sample.
        let (mut s, _client, output) = studio(FakeClient::with_speech(vec![Some("AA==".into())]));
        s.set_text("Hello");
        assert!(s.generate_audio().await.is_none());
        assert_eq!(s.error(), Some(SPEECH_FAILURE_MESSAGE));
        assert!(s.download_url().is_none());
        assert_eq!(s.store().live_count(), 0);
        assert!(output.log.borrow().started.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_replay_failure_sets_inline_error() {
        let (mut s, _client, output) = studio(FakeClient::with_speech(vec![Some(b64(&[100, 200]))]));
        s.set_text("Hello");
        s.generate_audio().await;
        assert_eq!(s.toggle().await.unwrap(), Toggle::Stopped);

        output.log.borrow_mut().fail_next = true;
        let err = s.toggle().await.unwrap_err();
        assert!(matches!(err, VoiceError::Playback(PlaybackError::Device(_))));
        assert_eq!(s.error(), Some(PLAYBACK_FAILURE_MESSAGE));
        // The download survives a device failure.
        assert!(s.download_url().is_some());

        // A later successful replay clears the message.
        assert!(matches!(s.toggle().await.unwrap(), Toggle::Started(_)));
        assert!(s.error().is_none());
    }

    #[tokio::test]
    async fn test_toggle_replays_after_natural_end_without_poll() {
        let (mut s, client, output) = studio(FakeClient::with_speech(vec![Some(b64(&[3, 4]))]));
        s.set_text("Hello");
        s.generate_audio().await;
        output.log.borrow_mut().finish_current = true;

        assert!(!s.is_playing());
        assert!(matches!(s.toggle().await.unwrap(), Toggle::Started(_)));
        assert_eq!(client.speech_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_natural_end_via_poll() {
        let (mut s, _client, output) = studio(FakeClient::with_speech(vec![Some(b64(&[5; 4]))]));
        s.set_text("Hello");
        let id = s.generate_audio().await.unwrap();
        assert_eq!(s.poll(), None);
        output.log.borrow_mut().finish_current = true;
        assert_eq!(s.poll(), Some(PlaybackEnded { session: id }));
        assert!(!s.is_playing());
    }

    #[tokio::test]
    async fn test_save_download() {
        let (mut s, _client, _output) = studio(FakeClient::with_speech(vec![Some(b64(&[16384, -16384]))]));
        let dir = tempfile::tempdir().unwrap();
        assert!(s.save_download(dir.path()).is_err());

        s.set_text("Hello");
        s.generate_audio().await;
        let path = s.save_download(dir.path()).unwrap();
        assert!(path.ends_with("voice_studio_output.wav"));

        let back = decode_wav(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(back.channel(0).unwrap(), &[0.5, -0.5]);
    }

    #[test]
    fn test_load_script_snippet() {
        let (mut s, _client, _output) = studio(FakeClient::default());
        s.load_script(&"x".repeat(600));
        assert_eq!(s.text().chars().count(), 503);
        assert!(s.text().ends_with("..."));
        s.load_script("");
        assert_eq!(s.text().len(), 503);
    }
}
