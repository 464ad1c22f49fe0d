use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use murmur_gateway::api::ApiServer;
use murmur_gateway::api::turn::TurnOptionsBody;
use murmur_gateway::client::GatewayClient;
use murmur_gateway::providers::{AudioFormat, CompletionOptions, OpenAiBackend, Voice};
use murmur_gateway::voice::{AudioCapture, AudioPlayback, DeliveryBridge};
use murmur_gateway::{
    Config, ContextBuilder, ContextConfig, HistoryLedger, TurnOrchestrator, TurnQueue,
};

/// Murmur - voice assistant gateway
#[derive(Parser)]
#[command(name = "murmur", version, about)]
struct Cli {
    /// Port to listen on (serve) or connect to (talk)
    #[arg(long, env = "MURMUR_PORT", default_value = "3001")]
    port: u16,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gateway server
    Serve,
    /// Record from the microphone, run one turn, play the reply
    Talk {
        /// Gateway base URL (defaults to localhost on --port)
        #[arg(long)]
        server: Option<String>,
        /// Reply voice
        #[arg(long, default_value = "alloy")]
        voice: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,murmur_gateway=info",
        1 => "info,murmur_gateway=debug",
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

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        None | Some(Command::Serve) => serve(cli.port).await,
        Some(Command::Talk { server, voice }) => {
            let server = server.unwrap_or_else(|| format!("http://localhost:{}", cli.port));
            talk(&server, &voice).await
        }
        Some(Command::TestMic { duration }) => test_mic(duration).await,
    }
}

/// Run the gateway server
async fn serve(port: u16) -> anyhow::Result<()> {
    let config = Config::load()?;
    let api_key = config.require_openai_key()?.to_string();

    let backend = Arc::new(OpenAiBackend::new(
        api_key,
        config.llm.model.clone(),
        config.voice.stt_model.clone(),
        config.voice.tts_model.clone(),
    )?);

    let ledger = Arc::new(HistoryLedger::new(config.history.max_entries));
    let context = ContextBuilder::new(ContextConfig {
        max_history: config.history.context_window,
        ..ContextConfig::default()
    });

    let defaults = CompletionOptions {
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        ..CompletionOptions::default()
    };
    let voice = Voice::from_request(Some(config.voice.tts_voice.as_str()), Voice::Alloy);
    let format = AudioFormat::from_request(Some(config.voice.tts_format.as_str()), AudioFormat::Mp3);

    let orchestrator = Arc::new(
        TurnOrchestrator::new(
            backend.clone(),
            backend.clone(),
            backend,
            ledger,
            context,
        )
        .with_defaults(defaults, voice, format),
    );

    let queue = Arc::new(TurnQueue::new(orchestrator.clone()));

    ApiServer::new(orchestrator, queue, config.llm.model, port)
        .run()
        .await?;

    Ok(())
}

/// Record one utterance, submit it, play the reply
async fn talk(server: &str, voice: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let client = GatewayClient::new(server);
    client.health().await.map_err(|e| {
        anyhow::anyhow!("gateway not reachable at {server}: {e}")
    })?;

    let mut capture = AudioCapture::new()?;
    let settlement = capture.start()?;

    println!("Recording... press Enter to stop.");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    capture.stop()?;
    let bridge = DeliveryBridge::new(Duration::from_millis(config.voice.delivery_timeout_ms));
    let clip = bridge.deliver(settlement).await?;

    if clip.is_empty() {
        println!("No audio captured.");
        return Ok(());
    }

    println!("Processing...");
    let options = TurnOptionsBody {
        voice: Some(voice.to_string()),
        ..TurnOptionsBody::default()
    };
    let result = client.submit_clip(clip, options).await?;

    if result.response.status == "no_speech_detected" {
        println!("No speech detected.");
        return Ok(());
    }

    if let Some(transcript) = &result.response.transcript {
        println!("You said: {transcript}");
    }
    if let Some(message) = &result.response.message {
        println!("Assistant: {message}");
    }
    if let Some(err) = &result.response.synthesis_error {
        println!("(no audio: {err})");
    }

    if let Some(audio_b64) = &result.response.audio_data {
        use base64::Engine as _;
        let audio = base64::engine::general_purpose::STANDARD.decode(audio_b64)?;
        let format = result
            .response
            .format
            .as_deref()
            .and_then(AudioFormat::parse)
            .unwrap_or(AudioFormat::Mp3);
        let playback = AudioPlayback::new()?;
        playback.play(&audio, format)?;
    }

    Ok(())
}

/// Capture for `duration` seconds and report what arrived
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    let mut capture = AudioCapture::new()?;
    let settlement = capture.start()?;

    println!("Recording for {duration}s...");
    tokio::time::sleep(Duration::from_secs(duration)).await;

    capture.stop()?;
    let bridge = DeliveryBridge::default();
    let clip = bridge.deliver(settlement).await?;

    if clip.is_empty() {
        println!("No audio captured (is the microphone muted?)");
    } else {
        println!(
            "Captured {} bytes of {} audio",
            clip.bytes().len(),
            clip.format().tag()
        );
    }

    Ok(())
}
