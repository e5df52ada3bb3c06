use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use echobank_voice::{
    CaptureConfig, CaptureController, Config, HttpGateway, MicBackend, Orchestrator,
    OrchestratorConfig, PlaybackController, Role, VoiceSession,
};

#[derive(Parser, Debug)]
#[command(name = "echobank-voice", about = "Voice banking client for EchoBank")]
struct Args {
    /// Config file stem (TOML), without extension
    #[arg(long, default_value = "config/echobank-voice")]
    config: String,

    /// Account number to run the session as
    #[arg(long)]
    account: String,

    /// Run a single text command through the voice pipeline and print the
    /// conversation
    #[arg(long)]
    text: Option<String>,

    /// Record from the microphone for this many seconds, run the clip
    /// through the voice pipeline, and print the conversation
    #[arg(long)]
    record: Option<u64>,

    /// Synthesize a phrase through the TTS endpoint and play it
    #[arg(long)]
    say: Option<String>,

    /// Print the account balance and exit
    #[arg(long)]
    balance: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("API base URL: {}", cfg.api.base_url);
    info!(
        "Capture format: {} Hz, {} channel(s)",
        cfg.audio.sample_rate, cfg.audio.channels
    );

    let gateway = Arc::new(HttpGateway::new(&cfg.api)?);

    if args.balance {
        use echobank_voice::BankApi;
        let balance = gateway
            .fetch_balance(&args.account)
            .await
            .context("balance lookup failed")?;
        println!("Balance: {balance:.2} NGN");
        return Ok(());
    }

    if let Some(phrase) = &args.say {
        use echobank_voice::VoiceApi;
        let audio = gateway.synthesize(phrase).await.context("TTS failed")?;
        let playback = PlaybackController::new()?;
        playback.play(&audio);
        while playback.is_playing() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        return Ok(());
    }

    let session = VoiceSession::new(&args.account);
    info!("Session: {}", session.id());

    let mut orchestrator = Orchestrator::new(
        OrchestratorConfig {
            recipient_search_limit: cfg.api.recipient_search_limit,
        },
        gateway.clone(),
        gateway,
        session,
    );

    if let Some(text) = &args.text {
        orchestrator
            .process_text(text)
            .await
            .context("text command failed")?;
        print_conversation(&orchestrator);
        return Ok(());
    }

    if let Some(seconds) = args.record {
        let capture_config = CaptureConfig {
            sample_rate: cfg.audio.sample_rate,
            channels: cfg.audio.channels,
            ..CaptureConfig::default()
        };
        let backend = MicBackend::new(capture_config.clone());
        let mut orchestrator =
            orchestrator.with_capture(CaptureController::new(Box::new(backend), capture_config));

        match PlaybackController::new() {
            Ok(playback) => orchestrator = orchestrator.with_playback(playback),
            Err(e) => warn!("Playback unavailable, replies will be text-only: {}", e),
        }

        orchestrator.start_recording().await?;
        info!("Recording for {}s, speak now", seconds);
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        orchestrator
            .finish_recording()
            .await
            .context("voice turn failed")?;
        print_conversation(&orchestrator);
        return Ok(());
    }

    info!("Nothing to do; pass --text, --record, --say, or --balance");
    Ok(())
}

fn print_conversation(orchestrator: &Orchestrator) {
    for entry in orchestrator.conversation() {
        let speaker = match entry.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        println!("{speaker}: {}", entry.text);
    }
}
