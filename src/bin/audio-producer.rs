//! CLI binary for audio-producer.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ControllerConfig` and a `FormState`, submits once, and reports the
//! final status.

use anyhow::{Context, Result};
use audio_producer::{
    load_attachment, CancellationToken, ControllerConfig, ConversionController,
    ConversionStatus, Deployment, FormState, NamingRule, StatusObserver, StatusState,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI status observer using indicatif ──────────────────────────────────────

/// Terminal status observer: a spinner while the request is outstanding,
/// then one coloured line with the final message.
struct CliStatusObserver {
    spinner: ProgressBar,
}

impl CliStatusObserver {
    fn new() -> Arc<Self> {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        spinner.set_style(style);
        Arc::new(Self { spinner })
    }
}

impl StatusObserver for CliStatusObserver {
    fn on_status(&self, status: &ConversionStatus) {
        if status.is_loading() {
            self.spinner.set_message(status.message.clone());
            self.spinner.enable_steady_tick(Duration::from_millis(80));
        }
    }

    fn on_submit_complete(&self, status: &ConversionStatus) {
        self.spinner.finish_and_clear();
        match status.state {
            StatusState::Success => eprintln!("{}", green(&status.message)),
            _ => eprintln!("{} {}", red("✘"), red(&status.message)),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Tag a recording with cover art, title and album
  audio-producer --audio take1.wav --cover cover.jpg --title "Song" --album "Demo"

  # All optional tags
  audio-producer --audio take1.wav --cover cover.jpg --title "Song" --album "Demo" \
      --artist "Test Artist" --year 2026 --track 5 --genre Electronic

  # Topic/speaker deployment, saved into ./converted
  audio-producer --variant topic --audio talk.m4a --topic "My Talk! #1" \
      --speaker "Grace" --output-dir converted

  # Name the download the way the server names its attachment
  audio-producer --naming safe --audio a.wav --cover c.png --title "AC/DC: Live?"

  # Machine-readable final state
  audio-producer --json --audio a.wav --cover c.png --title x --album y

DEPLOYMENTS:
  Variant   Parts sent                                           Download name
  ───────   ───────────────────────────────────────────────────  ─────────────────────
  tagging   audio, cover, title, album [artist year track genre] <title>.mp3
  topic     audioFile, topic [speaker]                            <topic w/o symbols>.mp3

  Bracketed parts are sent only when non-empty.

ENVIRONMENT VARIABLES:
  AUDIO_PRODUCER_SERVER      Base URL of the conversion service
  AUDIO_PRODUCER_ENDPOINT    Endpoint path (default /api/convert)
  AUDIO_PRODUCER_OUTPUT_DIR  Where downloads are saved
  AUDIO_PRODUCER_ALBUM       Default album
  AUDIO_PRODUCER_GENRE       Default genre
  AUDIO_PRODUCER_ARTIST      Default artist
  RUST_LOG                   Log filter, overrides -v / -q
"#;

/// Send audio to an audio-producer conversion service and save the MP3.
#[derive(Parser, Debug)]
#[command(
    name = "audio-producer",
    version,
    about = "Send audio (plus cover art and tags) to an audio-producer service and save the MP3",
    long_about = "Submit an audio file, optional cover art and metadata to an audio-producer \
conversion service. The service transcodes to MP3 and embeds the tags; the result is saved \
into the output directory under a name derived from the metadata.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Audio file to convert.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Cover art image (required by the tagging deployment).
    #[arg(long)]
    cover: Option<PathBuf>,

    /// Field contract of the service.
    #[arg(long, env = "AUDIO_PRODUCER_VARIANT", value_enum, default_value = "tagging")]
    variant: VariantArg,

    /// Override the deployment's download naming rule.
    #[arg(long, env = "AUDIO_PRODUCER_NAMING", value_enum)]
    naming: Option<NamingArg>,

    /// Track title (tagging).
    #[arg(long)]
    title: Option<String>,

    /// Album name (tagging).
    #[arg(long, env = "AUDIO_PRODUCER_ALBUM")]
    album: Option<String>,

    /// Artist (tagging, optional).
    #[arg(long, env = "AUDIO_PRODUCER_ARTIST")]
    artist: Option<String>,

    /// Release year (tagging, optional).
    #[arg(long)]
    year: Option<String>,

    /// Track number (tagging, optional).
    #[arg(long)]
    track: Option<String>,

    /// Genre (tagging, optional).
    #[arg(long, env = "AUDIO_PRODUCER_GENRE")]
    genre: Option<String>,

    /// Talk topic (topic).
    #[arg(long)]
    topic: Option<String>,

    /// Speaker name (topic, optional).
    #[arg(long)]
    speaker: Option<String>,

    /// Base URL of the conversion service.
    #[arg(long, env = "AUDIO_PRODUCER_SERVER", default_value = audio_producer::config::DEFAULT_BASE_URL)]
    server: String,

    /// Endpoint path on the service.
    #[arg(long, env = "AUDIO_PRODUCER_ENDPOINT", default_value = audio_producer::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Directory downloads are saved into.
    #[arg(short, long, env = "AUDIO_PRODUCER_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Give up on the request after this many seconds (default: wait forever).
    #[arg(long, env = "AUDIO_PRODUCER_TIMEOUT")]
    timeout: Option<u64>,

    /// Print the final session snapshot as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "AUDIO_PRODUCER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "AUDIO_PRODUCER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "AUDIO_PRODUCER_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum VariantArg {
    /// audio + cover + ID3 tags
    Tagging,
    /// audioFile + topic + speaker
    Topic,
}

impl From<VariantArg> for Deployment {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Tagging => Deployment::metadata_tagging(),
            VariantArg::Topic => Deployment::topic_speaker(),
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum NamingArg {
    /// field value as typed
    Verbatim,
    /// alphanumerics and whitespace only
    Strip,
    /// the server's own filename rule
    Safe,
}

impl NamingArg {
    fn rule(self, field: &str) -> NamingRule {
        let field = field.to_string();
        match self {
            NamingArg::Verbatim => NamingRule::Verbatim { field },
            NamingArg::Strip => NamingRule::StripSymbols { field },
            NamingArg::Safe => NamingRule::SafeFilename { field },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep library INFO
    // logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let controller = ConversionController::new(config).context("Invalid configuration")?;

    // ── Build form ───────────────────────────────────────────────────────
    let form = build_form(&cli).await?;

    // ── Submit, cancelling on Ctrl+C ─────────────────────────────────────
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let result = controller.submit_with_cancel(&form, cancel).await;
    let snapshot = controller.snapshot();

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("Failed to serialise status")?
        );
    } else if !cli.quiet && !show_progress {
        // The observer already printed the outcome when the spinner is on.
        eprintln!("{}", snapshot.status.message);
    }

    match result {
        Ok(receipt) => {
            if !cli.quiet && !cli.json {
                if let Some(ref path) = receipt.location {
                    eprintln!(
                        "   {}  {}",
                        path.display(),
                        dim(&format!("{} bytes", receipt.bytes))
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            // Shown once: by the observer or the line above, else here.
            if cli.quiet || cli.json {
                eprintln!("{} {}", red("✘"), red(&e.to_string()));
            }
            debug!("Conversion failed: {:?}", e);
            std::process::exit(1);
        }
    }
}

/// Map CLI args to `ControllerConfig`.
fn build_config(cli: &Cli) -> Result<ControllerConfig> {
    let mut deployment: Deployment = cli.variant.into();
    if let Some(naming) = cli.naming {
        let field = deployment.naming.field().to_string();
        deployment = deployment.with_naming(naming.rule(&field));
    }

    let mut builder = ControllerConfig::builder()
        .base_url(cli.server.clone())
        .endpoint(cli.endpoint.clone())
        .deployment(deployment)
        .output_dir(cli.output_dir.clone());

    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }

    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    if show_progress {
        builder = builder.status_observer(CliStatusObserver::new());
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI args to the `FormState` of this single submission.
///
/// A missing `--audio`/`--cover` is not an argument error: the controller's
/// validator reports it through the status channel like any other form.
async fn build_form(cli: &Cli) -> Result<FormState> {
    let mut form = FormState::new();

    if let Some(ref path) = cli.audio {
        form.set_audio(load(path).await?);
    }
    if let Some(ref path) = cli.cover {
        form.set_cover(load(path).await?);
    }

    let fields = [
        ("title", &cli.title),
        ("album", &cli.album),
        ("artist", &cli.artist),
        ("year", &cli.year),
        ("track", &cli.track),
        ("genre", &cli.genre),
        ("topic", &cli.topic),
        ("speaker", &cli.speaker),
    ];
    for (name, value) in fields {
        if let Some(v) = value {
            form.set_field(name, v.clone());
        }
    }

    Ok(form)
}

async fn load(path: &Path) -> Result<audio_producer::Attachment> {
    load_attachment(path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))
}
