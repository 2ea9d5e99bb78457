use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use phototracks::{run, OrderPolicy, RunConfig, ScanOptions, TimezonePolicy};

#[derive(Parser)]
#[command(name = "phototracks")]
#[command(about = "Geolocate photos by matching their capture times against GPX tracks")]
#[command(version)]
struct Cli {
    /// Folder with the photos to place
    #[arg(short = 'i', long, visible_alias = "images-folder")]
    photos: PathBuf,

    /// Folder with the GPX tracks
    #[arg(short = 't', long, visible_alias = "tracks-folder")]
    tracks: PathBuf,

    /// Where the annotated `<track>_with_imgs.gpx` files are written
    #[arg(short = 'o', long, default_value = "output")]
    output: PathBuf,

    /// IANA timezone of the camera clock, applied to timestamps without offset
    #[arg(long, env = "PHOTOTRACKS_TIMEZONE", default_value = "UTC", value_parser = parse_timezone)]
    timezone: Tz,

    /// Fail photos whose timestamp carries no UTC offset instead of assuming --timezone
    #[arg(long)]
    strict_timezone: bool,

    /// Sort out-of-order track points instead of skipping the track
    #[arg(long)]
    sort_unordered: bool,

    /// Descend into subfolders
    #[arg(short, long)]
    recursive: bool,

    /// Follow symbolic links while scanning
    #[arg(long)]
    follow_links: bool,

    /// Worker threads for photo processing
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Match and report, but write no GPX files
    #[arg(long)]
    dry_run: bool,

    /// Write a per-photo CSV report
    #[arg(long, value_name = "FILE")]
    report_csv: Option<PathBuf>,

    /// Write matched photo locations as GeoJSON
    #[arg(long, value_name = "FILE")]
    geojson: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_timezone(value: &str) -> std::result::Result<Tz, String> {
    value
        .parse::<Tz>()
        .map_err(|_| format!("unknown timezone '{value}' (expected an IANA name such as Europe/Madrid)"))
}

impl Cli {
    fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    }

    fn to_config(&self) -> RunConfig {
        RunConfig {
            photos_dir: self.photos.clone(),
            tracks_dir: self.tracks.clone(),
            output_dir: self.output.clone(),
            timezone: if self.strict_timezone {
                TimezonePolicy::Strict
            } else {
                TimezonePolicy::Assume(self.timezone)
            },
            order: if self.sort_unordered {
                OrderPolicy::Sort
            } else {
                OrderPolicy::Reject
            },
            scan: ScanOptions {
                recursive: self.recursive,
                follow_links: self.follow_links,
            },
            jobs: self.jobs.max(1),
            dry_run: self.dry_run,
            report_csv: self.report_csv.clone(),
            geojson: self.geojson.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (RUST_LOG overrides -v/-q)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().as_str().to_ascii_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let config = cli.to_config();

    println!("📷 Phototracks - placing photos on GPX tracks");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Photos:   {}", config.photos_dir.display());
    println!("🗺️  Tracks:   {}", config.tracks_dir.display());
    println!("🕐 Timezone: {}", config.timezone);
    if config.dry_run {
        println!("🔍 Dry run: no GPX files will be written");
    }

    let report = run(&config).context("run failed")?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    report
        .write_text(&mut io::stdout().lock())
        .context("failed to print report")?;

    let summary = report.summarize();
    if summary.matched == summary.total_photos {
        println!("\n✅ Every photo placed");
    } else {
        println!(
            "\n⚠️  {} of {} photo(s) placed",
            summary.matched, summary.total_photos
        );
    }

    Ok(())
}
