//! Interactive studio: generates a screenplay, voices its opening and saves
//! the WAV.
//!
//! Usage:
//!   GEMINI_API_KEY=... cargo run --example studio --features demo -- \
//!       "A lighthouse keeper on Europa hears music under the ice"
//!   cargo run --example studio --features demo -- --genre "Cyberpunk" --speaker male --speed 1.25 "..."
//!
//! Requirements:
//!   - A Gemini API key in GEMINI_API_KEY (or API_KEY)
//!   - An audio output device (ALSA headers on Linux)

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use screenplay_studio::{
    output::RodioOutput, script::SectionKind, GeminiClient, ScriptStudio, Speaker, StudioConfig, VoiceConfig,
    VoiceStudio,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "studio")]
#[command(about = "Generate a screenplay with Gemini and preview its voice-over")]
struct Cli {
    /// Story idea, character or world description.
    idea: String,

    /// JSON config file (see `StudioConfig`).
    #[arg(long, env = "STUDIO_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    aesthetic: Option<String>,
    #[arg(long)]
    music: Option<String>,
    #[arg(long)]
    setting: Option<String>,

    /// Narrator voice: male or female.
    #[arg(long, default_value_t = Speaker::Female)]
    speaker: Speaker,

    /// Playback rate (0.5, 1.0, 1.25, 1.5 are the presets).
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Text to voice instead of the screenplay's opening.
    #[arg(long)]
    text: Option<String>,

    /// Directory for the downloaded WAV.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Only generate the screenplay.
    #[arg(long)]
    no_voice: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = StudioConfig::load_or_default(cli.config.as_deref())?;
    let client = Arc::new(GeminiClient::from_env(&config).context("Failed to build Gemini client")?);

    // ── Screenplay ───────────────────────────────────────────────────────────
    let mut scripts = ScriptStudio::new(Arc::clone(&client));
    scripts.idea = cli.idea.clone();
    if let Some(v) = cli.genre {
        scripts.options.genre = v;
    }
    if let Some(v) = cli.aesthetic {
        scripts.options.aesthetic = v;
    }
    if let Some(v) = cli.music {
        scripts.options.music = v;
    }
    if let Some(v) = cli.setting {
        scripts.options.setting = v;
    }

    println!("Idea   : {}", scripts.idea);
    println!("Genre  : {}", scripts.options.genre);
    println!("Style  : {}", scripts.options.aesthetic);
    println!("Music  : {}", scripts.options.music);
    println!();

    let Some(script) = scripts.generate().await else {
        bail!("{}", scripts.notice().unwrap_or_default());
    };
    println!("{}\n", script.raw());

    let entry = script.library_entry();
    if let Some(title) = &entry.title {
        println!("Title  : {}", title);
    }
    if script.section(SectionKind::SceneScript).is_some() {
        println!("Scenes : {}", script.scenes().len());
    }
    let raw = script.raw().to_string();

    if cli.no_voice {
        return Ok(());
    }

    // ── Voice preview ────────────────────────────────────────────────────────
    let output = RodioOutput::open_default().context("No audio output device")?;
    let mut voice = VoiceStudio::new(client, output, &config)?;
    voice.load_script(&raw);
    if let Some(text) = cli.text {
        voice.set_text(text);
    }
    voice.set_voice(VoiceConfig { speaker: cli.speaker, speed: cli.speed });

    println!("\nVoicing {} characters as {} at {}x ...", voice.text().chars().count(), cli.speaker, cli.speed);
    if voice.generate_audio().await.is_none() {
        if let Some(msg) = voice.error() {
            bail!("{}", msg);
        }
    }

    if let Some(url) = voice.download_url() {
        println!("Audio  : {}", url);
    }
    let path = voice.save_download(&cli.out_dir)?;
    println!("Saved  : {}", path.display());

    // Wait for the end of playback, or stop early on Ctrl-C.
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if voice.poll().is_some() {
                    println!("Playback finished");
                    break;
                }
                if !voice.is_playing() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                voice.stop();
                println!("Playback stopped");
                break;
            }
        }
    }

    Ok(())
}
