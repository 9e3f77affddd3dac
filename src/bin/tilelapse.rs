use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tilelapse::events::source::DEFAULT_PAGE_SIZE;
use tilelapse::{
    AssetLayout, CanvasSize, PlacementEvent, RenderSettings, SqlDumpSource, SystemProbe,
    collect_events, plan_video_output, render_planned_video, render_still_file,
};

#[derive(Parser, Debug)]
#[command(name = "tilelapse", version, about = "Render tile placement logs into timelapses")]
#[cfg_attr(not(feature = "clickhouse"), allow(dead_code))]
struct Cli {
    /// Width of the canvas in pixels.
    #[arg(long, default_value_t = 1080)]
    width: u32,

    /// Height of the canvas in pixels.
    #[arg(long, default_value_t = 1920)]
    height: u32,

    /// Number of placements per frame.
    #[arg(long, default_value_t = 16)]
    iterations: usize,

    /// Pixel size of one tile.
    #[arg(long, default_value_t = 16)]
    texture_size: u32,

    /// Output file, including its extension (.mp4 for videos, .png for photos).
    #[arg(long)]
    filename: PathBuf,

    /// Output frame rate.
    #[arg(long, default_value_t = 24)]
    framerate: u32,

    /// Load placements from a local .sql dump instead of the database.
    #[arg(long, value_name = "FILE")]
    local_mode: Option<PathBuf>,

    /// Render a single photo of the final state instead of a video.
    #[arg(long, default_value_t = false)]
    photo: bool,

    /// Verbose logging and encoder output passthrough.
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Database address with port.
    #[arg(long)]
    database_ip: Option<String>,

    /// Database user.
    #[arg(long, default_value = "default")]
    database_user: String,

    /// Database password.
    #[arg(long, default_value = "")]
    database_password: String,

    /// Database name.
    #[arg(long, default_value = "default")]
    database_name: String,

    /// Directory holding <texture>.png files.
    #[arg(long, default_value = "assets")]
    assets_dir: PathBuf,

    /// Maximum number of decoded textures kept in memory (unbounded when unset).
    #[arg(long)]
    texture_cache_limit: Option<NonZeroUsize>,

    /// Skip the ffprobe check of the encoded video.
    #[arg(long, default_value_t = false)]
    no_verify: bool,
}

impl Cli {
    fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            canvas: CanvasSize::new(self.width, self.height),
            batch_size: self.iterations,
            tile_size: self.texture_size,
            fps: self.framerate,
            assets: AssetLayout::new(&self.assets_dir),
            texture_cache_limit: self.texture_cache_limit,
            show_encoder_output: self.debug,
            verify_output: !self.no_verify,
            ..RenderSettings::new(&self.filename)
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let started = Instant::now();

    let settings = cli.render_settings();
    settings.validate()?;
    tracing::info!(
        size = %settings.canvas,
        iterations = settings.batch_size,
        texture_size = settings.tile_size,
        framerate = settings.fps,
        "current configuration"
    );

    let video = if cli.photo {
        None
    } else {
        let probe = SystemProbe::new(&settings.ffmpeg);
        Some(plan_video_output(&settings, &probe)?)
    };

    let events = load_events(&cli)?;
    let textures = settings.texture_store();
    match video {
        Some(opts) => {
            render_planned_video(&events, &settings, opts, textures)?;
        }
        None => {
            render_still_file(&events, &settings, textures)?;
        }
    }

    eprintln!("wrote {}", settings.output.display());
    tracing::info!("finished in {:.2?}", started.elapsed());
    Ok(())
}

fn load_events(cli: &Cli) -> anyhow::Result<Vec<PlacementEvent>> {
    match &cli.local_mode {
        Some(path) => {
            tracing::info!("running local mode");
            let mut source = SqlDumpSource::open(path)?;
            Ok(collect_events(&mut source, DEFAULT_PAGE_SIZE)?)
        }
        None => load_database_events(cli),
    }
}

#[cfg(feature = "clickhouse")]
fn load_database_events(cli: &Cli) -> anyhow::Result<Vec<PlacementEvent>> {
    use anyhow::Context as _;
    use tilelapse::events::clickhouse::{ClickHouseConfig, ClickHouseSource};

    let address = cli
        .database_ip
        .clone()
        .filter(|s| !s.trim().is_empty())
        .context("--database-ip is required unless --local-mode is given")?;
    let mut source = ClickHouseSource::connect(ClickHouseConfig {
        address,
        user: cli.database_user.clone(),
        password: cli.database_password.clone(),
        database: cli.database_name.clone(),
        timeout: std::time::Duration::from_secs(60),
    })?;
    Ok(collect_events(&mut source, DEFAULT_PAGE_SIZE)?)
}

#[cfg(not(feature = "clickhouse"))]
fn load_database_events(_cli: &Cli) -> anyhow::Result<Vec<PlacementEvent>> {
    anyhow::bail!(
        "reading from a database requires the `clickhouse` feature; use --local-mode <dump.sql>"
    )
}
