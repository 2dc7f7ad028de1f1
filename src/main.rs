//! Headless metro-live runner: polls a feed and logs vehicle changes.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::Parser;
use metro_live::engine::{LiveMap, SnapshotDisposition};
use metro_live::error::LiveMapError;
use metro_live::feed::{HttpFeed, SimulatedFeed, TransitFeed};
use metro_live::options::{FeedSource, Options};
use metro_live::poll::FetchWorker;
use metro_live::surface::MemorySurface;
use metro_live::util::frame_timing::FrameTiming;
use web_time::{Duration, Instant};

/// How often the running summary is logged.
const REPORT_EVERY: Duration = Duration::from_secs(10);

/// Headless live map: polls a transit feed and animates vehicles on an
/// in-memory surface, logging what changes.
#[derive(Parser, Debug)]
#[command(name = "metro-live", version)]
struct Args {
    /// Options TOML file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preset name to load from the preset directory.
    #[arg(short, long, conflicts_with = "config")]
    preset: Option<String>,

    /// Directory holding `*.toml` presets.
    #[arg(long, default_value = "presets")]
    preset_dir: PathBuf,

    /// Use the built-in simulated network instead of the backend.
    #[arg(long)]
    simulate: bool,

    /// Backend base URL (overrides the options file).
    #[arg(long)]
    base_url: Option<String>,

    /// Stop after this many seconds (runs until killed otherwise).
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Print the options JSON schema and exit.
    #[arg(long)]
    dump_schema: bool,

    /// List available presets and exit.
    #[arg(long)]
    list_presets: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    match run(&Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), LiveMapError> {
    if args.dump_schema {
        let schema = serde_json::to_string_pretty(&Options::json_schema())
            .map_err(|e| LiveMapError::OptionsParse(e.to_string()))?;
        writeln!(std::io::stdout().lock(), "{schema}")?;
        return Ok(());
    }
    if args.list_presets {
        let mut out = std::io::stdout().lock();
        for name in Options::list_presets(&args.preset_dir) {
            writeln!(out, "{name}")?;
        }
        return Ok(());
    }

    let options = resolve_options(args)?;
    let feed = open_feed(&options);
    log::info!("feed: {}", feed.name());

    let worker = FetchWorker::spawn(feed)?;
    let frame_rate = options.animation.frame_rate;
    let mut map =
        LiveMap::new(options, MemorySurface::without_event_log(), worker)?;

    let started = Instant::now();
    let deadline = args.duration_secs.map(|s| started + Duration::from_secs(s));
    let mut timing = FrameTiming::new(frame_rate);
    let mut last_report = started;

    loop {
        if !timing.should_tick() {
            thread::sleep(timing.until_next_frame());
            continue;
        }
        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            break;
        }

        let summary = map.tick(now);
        timing.end_frame();

        if let Some(SnapshotDisposition::Applied(report)) = &summary.snapshot {
            if report.has_changes() {
                log::info!(
                    "+{} ~{} -{} vehicles ({} dropped, {} retargeted)",
                    report.created,
                    report.moved,
                    report.removed,
                    report.dropped,
                    report.superseded
                );
            }
        }

        if now.duration_since(last_report) >= REPORT_EVERY {
            log::info!(
                "{} vehicles, {} moving, {} routes, {} stations, {:.0} fps",
                map.vehicle_count(),
                map.animating_count(),
                map.statics().route_count(),
                map.statics().marker_count(),
                timing.fps()
            );
            last_report = now;
        }
    }

    let stats = map.stats();
    log::info!(
        "done after {} frames: {} cycles, {} applied, {} failed, {} stale",
        stats.frames,
        stats.cycles_requested,
        stats.snapshots_applied,
        stats.snapshots_failed,
        stats.snapshots_stale
    );
    Ok(())
}

/// Options from `--config` or `--preset`, with command line overrides.
fn resolve_options(args: &Args) -> Result<Options, LiveMapError> {
    let mut options = match (&args.config, &args.preset) {
        (Some(path), _) => Options::load(path)?,
        (None, Some(name)) => {
            Options::load(&args.preset_dir.join(format!("{name}.toml")))?
        }
        (None, None) => Options::default(),
    };
    if args.simulate {
        options.feed.source = FeedSource::Simulated;
    }
    if let Some(url) = &args.base_url {
        options.feed.base_url.clone_from(url);
    }
    options.validate()?;
    Ok(options)
}

fn open_feed(options: &Options) -> Box<dyn TransitFeed + Send> {
    match options.feed.source {
        FeedSource::Http => Box::new(HttpFeed::new(
            &options.feed.base_url,
            options.polling.fetch_timeout(),
        )),
        FeedSource::Simulated => {
            Box::new(SimulatedFeed::new(options.feed.simulation()))
        }
    }
}
