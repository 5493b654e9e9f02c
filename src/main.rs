use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atlas_studio::question::{InterviewSetup, Language, Level, Track};
use atlas_studio::speech::{
    AudioPlayer, MicStream, SAMPLE_RATE, SpeechSynthesizer, TtsConfig,
};
use atlas_studio::{Config, Daemon};

/// Atlas - voice-driven mock interview studio
#[derive(Parser)]
#[command(name = "atlas", version, about)]
struct Cli {
    /// Port for the HTTP API
    #[arg(long, env = "ATLAS_PORT")]
    port: Option<u16>,

    /// Data directory override (database, uploads)
    #[arg(long, env = "ATLAS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a live voice interview in the terminal
    Interview {
        /// Role being interviewed for (e.g. "Backend Engineer")
        #[arg(short, long)]
        role: String,

        /// Interview track
        #[arg(short, long, default_value = "System Design")]
        track: Track,

        /// Seniority level
        #[arg(short, long, default_value = "Mid")]
        level: Level,

        /// Assistant language (en, hi, hinglish)
        #[arg(long, default_value = "en")]
        language: Language,

        /// Session identifier; reuse one to keep question memory
        #[arg(long, default_value = "local")]
        session: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,

        /// Language to synthesize in
        #[arg(long, default_value = "en")]
        language: Language,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,atlas_studio=info",
        1 => "info,atlas_studio=debug",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.data_dir.clone(), cli.port)?;

    match cli.command {
        None => {
            tracing::info!(port = config.server.port, "starting atlas studio");
            let daemon = Daemon::new(config)?;
            daemon.run().await?;
        }
        Some(Command::Interview {
            role,
            track,
            level,
            language,
            session,
        }) => {
            let setup = InterviewSetup {
                role,
                track,
                level,
                language,
                session_id: session,
            };
            tracing::info!(
                role = %setup.role,
                track = %setup.track,
                level = %setup.level,
                language = %setup.language,
                "starting voice interview"
            );
            let daemon = Daemon::new(config)?;
            daemon.run_interview(setup).await?;
        }
        Some(Command::TestMic { duration }) => test_mic(duration)?,
        Some(Command::TestSpeaker) => test_speaker().await?,
        Some(Command::TestTts { text, language }) => test_tts(&config, &text, language).await?,
    }

    Ok(())
}

/// Test microphone input with a level meter
fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mic = MicStream::open()?;
    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for second in 1..=duration {
        let mut samples = Vec::with_capacity(SAMPLE_RATE as usize);
        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        while std::time::Instant::now() < deadline {
            if let Some(chunk) = mic.read_chunk(Duration::from_millis(100)) {
                samples.extend(chunk);
            }
        }

        let rms = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = ((rms * 100.0).min(50.0)) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{second:2}s] RMS: {rms:.4} | Peak: {peak:.4} | [{meter}]");
    }

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check your input device and permissions.");
    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let player = AudioPlayer::new()?;

    let sample_rate = 24_000u32;
    let frequency = 440.0f32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    player.play_samples(samples, sample_rate).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    Ok(())
}

/// Test TTS synthesis and playback
async fn test_tts(config: &Config, text: &str, language: Language) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let synthesizer = SpeechSynthesizer::new(TtsConfig {
        url: config.speech.tts_url.clone(),
        api_key: config.speech.api_key.clone(),
        model: config.speech.tts_model.clone(),
        speaker: config.speech.speaker.clone(),
        pace: config.speech.pace,
        sample_rate: config.speech.sample_rate,
        codec: config.speech.codec.clone(),
        enable_preprocessing: true,
    })?;

    println!("Synthesizing speech...");
    let audio = synthesizer.synthesize(text, language).await?;

    use base64::Engine as _;
    let bytes = base64::engine::general_purpose::STANDARD.decode(&audio.audio_base64)?;
    println!("Got {} bytes of {} audio", bytes.len(), audio.format);

    println!("Playing audio...");
    let player = Arc::new(AudioPlayer::new()?);
    player.play_encoded(&bytes, &audio.format).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");
    Ok(())
}
