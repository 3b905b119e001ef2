//! bridgegap binary: one-shot composition, interactive shell, HTTP API,
//! and WAV playback.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bridgegap::audio::{self, AudioBuffer, AudioOutput, PlaybackState};
use bridgegap::config::{schema, Config};
use bridgegap::gemini::GeminiClient;
use bridgegap::orchestrator::Orchestrator;
use bridgegap::session::Session;
use bridgegap::types::{GenerationRequest, LanguageOption, RecipientType, ToneType, VoiceOption};
use bridgegap::{server, share, shell};

#[derive(Debug, Parser)]
#[command(
    name = "bridgegap",
    version,
    about = "Draft, refine and listen to messages for difficult conversations"
)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, env = "BRIDGEGAP_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// API key for the generative-language service
    #[arg(
        long,
        global = true,
        env = "GEMINI_API_KEY",
        hide_env_values = true,
        value_name = "KEY"
    )]
    api_key: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Draft a message once and print it
    Compose(ComposeArgs),
    /// Interactive compose / refine / listen loop
    Shell,
    /// Serve the JSON API
    Serve {
        /// Listen address, overrides `server.bind`
        #[arg(long, value_name = "HOST:PORT")]
        bind: Option<String>,
    },
    /// Play an exported WAV file
    Play {
        file: PathBuf,
    },
    /// List recipients, tones, voices and languages
    Options,
}

#[derive(Debug, clap::Args)]
struct ComposeArgs {
    /// What you want to say, in your own words
    #[arg(required = true, num_args = 1..)]
    input: Vec<String>,

    #[arg(long, value_enum, default_value_t)]
    recipient: RecipientType,

    #[arg(long, value_enum, default_value_t)]
    tone: ToneType,

    #[arg(long, value_enum, default_value_t)]
    voice: VoiceOption,

    #[arg(long, value_enum, default_value_t)]
    language: LanguageOption,

    /// Refinement instruction, applied in order (repeatable)
    #[arg(long, value_name = "INSTRUCTION")]
    refine: Vec<String>,

    /// Speak the final message
    #[arg(long)]
    listen: bool,

    /// Write the spoken message as bridge_message.wav into DIR
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let api_key = cli.api_key.or_else(|| std::env::var("API_KEY").ok());
    let config = Config::load(cli.config.as_deref())?.with_api_key(api_key);

    init_logging(&config, cli.log_json);

    match cli.command {
        Commands::Compose(args) => compose(&config, args).await,
        Commands::Shell => run_shell(&config).await,
        Commands::Serve { bind } => serve(&config, bind).await,
        Commands::Play { file } => play(&file).await,
        Commands::Options => {
            print_options();
            Ok(())
        }
    }
}

fn init_logging(config: &Config, force_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.logging.json || force_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn backend(config: &Config) -> Result<GeminiClient> {
    schema::require_api_key(config)?;
    Ok(GeminiClient::new(config.gemini.clone()))
}

async fn compose(config: &Config, args: ComposeArgs) -> Result<()> {
    let orchestrator = Orchestrator::new(backend(config)?);
    let request = GenerationRequest::new(
        args.input.join(" "),
        args.recipient,
        args.tone,
        args.voice,
        args.language,
    )?;

    let mut content = orchestrator.generate(request).await?;
    for instruction in args.refine.iter().filter(|i| !i.trim().is_empty()) {
        content = orchestrator
            .refine(&content.message, instruction, &content.original_request)
            .await?;
    }

    if args.listen || args.export.is_some() {
        let audio = orchestrator
            .synthesize_speech(&content.message, content.original_request.voice)
            .await?;
        content = content.with_audio(audio);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&content)?);
    } else {
        shell::print_content(&content);
    }

    if let Some(dir) = &args.export {
        let path = share::export_audio(&content, dir)?;
        eprintln!("Saved {}", path.display());
    }

    if args.listen {
        if let Some(encoded) = content.audio_base64.as_deref() {
            play_to_end(audio::decode_base64(encoded)?).await?;
        }
    }
    Ok(())
}

async fn run_shell(config: &Config) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::new(backend(config)?));
    let mut session = Session::new(orchestrator, Box::new(AudioOutput::system_default));
    shell::run(&mut session, config.export.dir.clone()).await
}

async fn serve(config: &Config, bind: Option<String>) -> Result<()> {
    let addr = schema::parse_bind(bind.as_deref().unwrap_or(&config.server.bind))?;
    let app = server::router(Arc::new(Orchestrator::new(backend(config)?)));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "starting bridgegap server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("bridgegap server shut down");
    Ok(())
}

async fn play(file: &std::path::Path) -> Result<()> {
    let buffer = audio::wav::read_wav_file(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    eprintln!(
        "Playing {} ({:.1}s)",
        file.display(),
        buffer.duration_ms() / 1000.0
    );
    play_to_end(buffer).await
}

async fn play_to_end(buffer: AudioBuffer) -> Result<()> {
    let mut output = AudioOutput::system_default();
    output.play(buffer)?;
    while output.poll() == PlaybackState::Playing {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    output.close();
    Ok(())
}

fn print_options() {
    fn section<T: ValueEnum + std::fmt::Display>(title: &str) {
        println!("{title}:");
        for value in T::value_variants() {
            if let Some(possible) = value.to_possible_value() {
                println!("  {:<18} {}", possible.get_name(), value);
            }
        }
    }
    section::<RecipientType>("Recipients (--recipient)");
    section::<ToneType>("Tones (--tone)");
    section::<VoiceOption>("Voices (--voice)");
    section::<LanguageOption>("Languages (--language)");
}

/// Waits for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
