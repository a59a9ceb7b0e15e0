mod command;
mod display;
mod pattern;
mod still;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use frame_filter_common::config::Config;
use frame_filter_common::frame::TimestampedFrame;
use frame_filter_common::kernel::KernelError;
use frame_filter_pipeline::{
    CaptureError, CaptureSource, EditorError, FilterStage, FrameCallback, FrameExchange,
    KernelEditor, Pipeline, SharedKernel, SourceState,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use command::{parse_command, Command};
use display::Display;
use pattern::TestPattern;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("config error: {0}")]
    Config(#[from] frame_filter_common::config::ConfigError),
    #[error("invalid kernel config: {0}")]
    Kernel(#[from] KernelError),
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    #[error("still image error: {0}")]
    Still(#[from] still::StillError),
    #[error("failed to read stdin: {0}")]
    Stdin(std::io::Error),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        width = config.capture.width,
        height = config.capture.height,
        fps = config.capture.fps,
        kernel_size = config.kernel.size,
        "starting frame-filter viewer"
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "viewer failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), ViewerError> {
    let kernel = SharedKernel::new(config.kernel.build()?);
    let live = Pipeline::from_config(&config.live.stages, &kernel);
    let still_pipeline = Pipeline::from_config(&config.still.stages, &kernel);
    let exchange = Arc::new(FrameExchange::new());
    let mut editor = KernelEditor::new(kernel);

    info!(
        live = ?stage_names(&live),
        still = ?stage_names(&still_pipeline),
        "pipelines built"
    );

    let on_frame: FrameCallback = {
        let exchange = Arc::clone(&exchange);
        Arc::new(move |tagged: TimestampedFrame| match live.apply(&tagged.frame) {
            Ok(filtered) => {
                exchange.publish(tagged.with_frame(filtered));
            }
            Err(e) => warn!(seq = tagged.seq, error = %e, "live frame dropped"),
        })
    };

    let device = TestPattern::new(config.capture.width, config.capture.height, config.capture.fps);
    let source = CaptureSource::new(device, on_frame);
    info!(device = source.device_name(), "capture source ready");

    let host = Arc::new(Host {
        source: Mutex::new(source),
        still_pipeline,
        exchange: Arc::clone(&exchange),
    });

    match config.still.path.clone() {
        Some(path) => blocking(&host, move |h| h.load(&path)).await??,
        None => blocking(&host, Host::start).await??,
    }

    let mut screen = Display::new();
    let mut refresh = tokio::time::interval(Duration::from_millis(config.display.refresh_ms.max(1)));
    let mut report = tokio::time::interval(Duration::from_secs(1));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            _ = refresh.tick() => {
                if let Some(frame) = exchange.take_latest() {
                    screen.show(&frame);
                }
            }
            _ = report.tick() => {
                let stats = exchange.stats();
                info!(
                    state = ?host.state(),
                    shown = screen.shown,
                    skipped = screen.skipped,
                    published = stats.published,
                    overwritten = stats.overwritten,
                    stale = stats.stale,
                    "display stats"
                );
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.map_err(ViewerError::Stdin)? else {
                    debug!("stdin closed, commands disabled");
                    stdin_open = false;
                    continue;
                };
                let command = match parse_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(error = %e, "ignoring command");
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                handle_command(command, &host, &mut editor).await?;
            }
        }
    }

    blocking(&host, Host::stop).await?;
    let stats = exchange.stats();
    info!(
        shown = screen.shown,
        published = stats.published,
        overwritten = stats.overwritten,
        "viewer stopped"
    );
    Ok(())
}

fn stage_names(pipeline: &Pipeline) -> Vec<&'static str> {
    pipeline.stages().iter().map(FilterStage::name).collect()
}

async fn handle_command(
    command: Command,
    host: &Arc<Host>,
    editor: &mut KernelEditor,
) -> Result<(), ViewerError> {
    match command {
        Command::Start => {
            if let Err(e) = blocking(host, Host::start).await? {
                error!(error = %e, "failed to start capture");
            }
        }
        Command::Stop => blocking(host, Host::stop).await?,
        Command::Apply => {
            if let Err(e) = blocking(host, Host::apply).await? {
                warn!(error = %e, "still image not filtered");
            }
        }
        Command::Set { row, col, text } => match editor.set_weight(row, col, &text) {
            Ok(weight) => debug!(row, col, weight, "kernel weight set"),
            Err(EditorError::InvalidWeightInput { input, .. }) => {
                warn!(
                    row,
                    col,
                    input = %input,
                    field = ?editor.field(row, col),
                    "rejected kernel weight, field cleared"
                );
            }
            Err(e) => warn!(error = %e, "rejected kernel edit"),
        },
        Command::Load(path) => {
            let shown = path.display().to_string();
            if let Err(e) = blocking(host, move |h| h.load(&path)).await? {
                warn!(path = %shown, error = %e, "failed to load still image");
            }
        }
        Command::Quit => {}
    }
    Ok(())
}

/// Run `f` against the host on the blocking pool. Joining the capture worker,
/// decoding images and still convolution all stay off the async workers.
async fn blocking<T, F>(host: &Arc<Host>, f: F) -> Result<T, ViewerError>
where
    F: FnOnce(&Host) -> T + Send + 'static,
    T: Send + 'static,
{
    let host = Arc::clone(host);
    Ok(tokio::task::spawn_blocking(move || f(&host)).await?)
}

/// Capture source plus what is needed to filter still images.
struct Host {
    source: Mutex<CaptureSource>,
    still_pipeline: Pipeline,
    exchange: Arc<FrameExchange>,
}

impl Host {
    fn source(&self) -> MutexGuard<'_, CaptureSource> {
        self.source.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn state(&self) -> SourceState {
        self.source().state()
    }

    fn start(&self) -> Result<(), ViewerError> {
        Ok(self.source().start()?)
    }

    fn stop(&self) {
        self.source().stop();
    }

    fn apply(&self) -> Result<(), ViewerError> {
        let state = self.state();
        if state != SourceState::Static {
            warn!(?state, "apply needs a loaded still image");
            return Ok(());
        }
        self.filter_still()
    }

    fn load(&self, path: &Path) -> Result<(), ViewerError> {
        let frame = still::load_still(path)?;
        self.source().load_still(frame);
        self.filter_still()
    }

    /// Run the still pipeline over the static frame and hand the result to the display.
    fn filter_still(&self) -> Result<(), ViewerError> {
        let tagged = self.source().pull()?;
        match self.still_pipeline.apply(&tagged.frame) {
            Ok(filtered) => {
                self.exchange.publish(tagged.with_frame(filtered));
            }
            Err(e) => warn!(seq = tagged.seq, error = %e, "still image filter failed"),
        }
        Ok(())
    }
}
