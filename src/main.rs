use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fdv_converter::config::Config;
use fdv_converter::credentials::{prompt_for_credentials, Credentials};
use fdv_converter::download::{repair_file, DownloadService, SiteDownload};
use fdv_converter::fdv::{FdvFlowWriter, FdvRainfallWriter};
use fdv_converter::fetcher::Fetcher;
use fdv_converter::geometry::{build_geometry, solve_r3, EggForm, PipeShape};
use fdv_converter::reports::{self, MonitorType};
use fdv_converter::timeseries::{loader, parse_timestamp, TimeSeries};

#[derive(Parser)]
#[command(name = "fdv-converter")]
#[command(version)]
#[command(
    about = "Flow survey toolkit: download logger data, build FDV files, and produce interim reports",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save telemetry API login details
    Login {
        /// Username (prompted for if omitted)
        #[arg(long)]
        username: Option<String>,
    },

    /// Clear stored login details
    Logout,

    /// Show a site's name and channel table
    SiteInfo {
        /// Site identifier, e.g. DM1234
        site_id: String,
    },

    /// Download a site's channels into a repaired CSV
    Download {
        /// Site identifier, e.g. DM1234
        site_id: String,

        /// Range start (YYYY-MM-DD or 'YYYY-MM-DD HH:MM:SS'); defaults to
        /// each channel's first sample
        #[arg(long, value_parser = parse_datetime_arg)]
        start: Option<NaiveDateTime>,

        /// Range end; defaults to each channel's last sample
        #[arg(long, value_parser = parse_datetime_arg)]
        end: Option<NaiveDateTime>,

        /// Directory for the output CSV (default: FDV_OUTPUT_DIR or .)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Repair a local CSV/XLSX export: sort, detect interval, fill gaps
    Fill {
        /// Input file (.csv or .xlsx)
        file: PathBuf,
    },

    /// Convert a series to an FDV flow file
    Fdv {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Output FDV path
        #[arg(long)]
        output: PathBuf,

        /// Site name for the FDV identifier (max 15 chars used)
        #[arg(long)]
        site_name: String,

        /// Pipe shape: circular, rectangular, egg1, egg2, egg2a, circle-rect
        #[arg(long)]
        shape: PipeShape,

        /// Shape dimensions in mm (comma-separated where several are
        /// needed, e.g. "450" or "450,675,675" for width,height,r3)
        #[arg(long)]
        size: String,

        /// Depth column header (omit to write zero depths)
        #[arg(long)]
        depth_column: Option<String>,

        /// Velocity column header (omit to write zero velocities)
        #[arg(long)]
        velocity_column: Option<String>,

        /// Constants range start (defaults to the first sample)
        #[arg(long, value_parser = parse_datetime_arg)]
        start: Option<NaiveDateTime>,

        /// Constants range end (defaults to the last sample)
        #[arg(long, value_parser = parse_datetime_arg)]
        end: Option<NaiveDateTime>,

        /// Sample interval in minutes (detected from the series if omitted)
        #[arg(long)]
        interval: Option<i64>,
    },

    /// Convert a series to an FDV rainfall file
    Rainfall {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Output FDV path
        #[arg(long)]
        output: PathBuf,

        /// Site name for the FDV identifier (max 15 chars used)
        #[arg(long)]
        site_name: String,

        /// Rainfall column header
        #[arg(long)]
        rain_column: String,

        /// Constants range start (defaults to the first sample)
        #[arg(long, value_parser = parse_datetime_arg)]
        start: Option<NaiveDateTime>,

        /// Constants range end (defaults to the last sample)
        #[arg(long, value_parser = parse_datetime_arg)]
        end: Option<NaiveDateTime>,

        /// Sample interval in minutes (detected from the series if omitted)
        #[arg(long)]
        interval: Option<i64>,
    },

    /// Build the interim report workbook (weekly/daily summaries)
    Report {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Monitor type: flow or depth
        #[arg(long)]
        monitor_type: MonitorType,

        /// Monitored column header (located by keyword if omitted)
        #[arg(long)]
        column: Option<String>,

        /// Directory for the report workbook (default: FDV_OUTPUT_DIR or .)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Also write one workbook per interim period
        #[arg(long)]
        split: bool,

        /// Sample interval in minutes (detected from the series if omitted)
        #[arg(long)]
        interval: Option<i64>,

        /// Summary range start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Summary range end date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },

    /// Daily and weekly rainfall totals workbook
    RainfallTotals {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Rainfall column header (located by keyword if omitted)
        #[arg(long)]
        rain_column: Option<String>,

        /// Directory for the workbook (default: FDV_OUTPUT_DIR or .)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Solve the egg-section side radius r3 from width and height
    R3 {
        /// Egg form: 1 or 2
        #[arg(long, value_parser = parse_egg_form)]
        egg_type: EggForm,

        /// Pipe width in mm
        #[arg(long)]
        width: f64,

        /// Pipe height in mm
        #[arg(long)]
        height: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fdv_converter=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Login { username } => login(username),
        Command::Logout => {
            Credentials::clear()?;
            println!("Login details cleared.");
            Ok(())
        }
        Command::SiteInfo { site_id } => site_info(&site_id).await,
        Command::Download {
            site_id,
            start,
            end,
            output_dir,
        } => download(&site_id, start, end, output_dir).await,
        Command::Fill { file } => {
            let summary = repair_file(&file)?;
            print_download_summary(&summary);
            Ok(())
        }
        Command::Fdv {
            input,
            output,
            site_name,
            shape,
            size,
            depth_column,
            velocity_column,
            start,
            end,
            interval,
        } => convert_fdv(
            &input,
            &output,
            &site_name,
            shape,
            &size,
            depth_column.as_deref(),
            velocity_column.as_deref(),
            start,
            end,
            interval,
        ),
        Command::Rainfall {
            input,
            output,
            site_name,
            rain_column,
            start,
            end,
            interval,
        } => convert_rainfall(&input, &output, &site_name, &rain_column, start, end, interval),
        Command::Report {
            input,
            monitor_type,
            column,
            output_dir,
            split,
            interval,
            start_date,
            end_date,
        } => report(
            &input,
            monitor_type,
            column.as_deref(),
            output_dir,
            split,
            interval,
            start_date,
            end_date,
        ),
        Command::RainfallTotals {
            input,
            rain_column,
            output_dir,
        } => rainfall_totals(&input, rain_column.as_deref(), output_dir),
        Command::R3 {
            egg_type,
            width,
            height,
        } => {
            let r3 = solve_r3(width, height, egg_type)?;
            println!("{r3:.2}");
            Ok(())
        }
    }
}

fn login(username: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let creds = prompt_for_credentials(username)?;
    creds.save()?;
    println!("Credentials saved successfully.");
    Ok(())
}

/// Build the API client from env config and stored credentials.
fn api_client() -> Result<(Config, Fetcher), Box<dyn std::error::Error>> {
    let config = Config::from_env()
        .map_err(|_| "FDV_API_BASE_URL is not set (put it in the environment or a .env file)")?;
    let creds = Credentials::load()?
        .ok_or("No stored credentials; run `fdv-converter login` first")?;
    let fetcher = Fetcher::new(
        config.api_base_url.clone(),
        creds.username,
        creds.password,
        config.request_timeout_secs,
        config.max_retries,
    );
    Ok((config, fetcher))
}

async fn site_info(site_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (_, fetcher) = api_client()?;
    let site = fetcher.get_site(site_id).await?;

    println!("Site:     {} ({})", site.site_name, site.site_id);
    println!("Channels: {}", site.channels.len());
    println!("{:<8} {:<30} {}", "Number", "Name", "Units");
    for channel in &site.channels {
        println!(
            "{:<8} {:<30} {}",
            channel.number,
            channel.name.trim(),
            channel.units
        );
    }
    Ok(())
}

async fn download(
    site_id: &str,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    output_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, fetcher) = api_client()?;
    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.output_dir));

    let service = DownloadService::new(fetcher, output_dir);
    let summary = service.download_site(site_id, start, end).await?;
    print_download_summary(&summary);
    Ok(())
}

fn print_download_summary(summary: &SiteDownload) {
    println!("Site:     {} ({})", summary.site_name, summary.site_id);
    println!("Range:    {} to {}", summary.start, summary.end);
    println!("Interval: {} min", summary.interval.num_seconds() / 60);
    println!("Gaps:     {} filled", summary.gaps_filled);
    println!("Saved:    {}", summary.csv_path.display());
}

/// Load a series and resolve the FDV constants range and interval from the
/// arguments, falling back to what the series itself shows.
fn load_for_conversion(
    input: &std::path::Path,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    interval: Option<i64>,
) -> Result<(TimeSeries, NaiveDateTime, NaiveDateTime, Duration), Box<dyn std::error::Error>> {
    let mut series = loader::load(input)?;
    series.sort_by_timestamp();

    let first = *series.timestamps.first().ok_or("series has no samples")?;
    let last = *series.timestamps.last().ok_or("series has no samples")?;
    let interval = match interval {
        Some(minutes) => Duration::minutes(minutes),
        None => series
            .detect_interval()
            .ok_or("could not detect the sample interval; pass --interval")?,
    };

    Ok((series, start.unwrap_or(first), end.unwrap_or(last), interval))
}

#[allow(clippy::too_many_arguments)]
fn convert_fdv(
    input: &std::path::Path,
    output: &std::path::Path,
    site_name: &str,
    shape: PipeShape,
    size: &str,
    depth_column: Option<&str>,
    velocity_column: Option<&str>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    interval: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (series, start, end, interval) = load_for_conversion(input, start, end, interval)?;
    let built = build_geometry(shape, size)?;

    let mut writer = FdvFlowWriter::new(site_name, start, end, interval);
    if let Some(size_m) = built.pipe_size_m {
        writer.set_pipe_size(size_m);
    }

    let mut out = BufWriter::new(File::create(output)?);
    let nulls = writer.write(
        &mut out,
        &series,
        depth_column,
        velocity_column,
        built.geometry.as_ref(),
    )?;

    info!("FDV file created successfully: {}", output.display());
    println!("FDV file created: {}", output.display());
    println!("Null readings: {nulls}");
    Ok(())
}

fn convert_rainfall(
    input: &std::path::Path,
    output: &std::path::Path,
    site_name: &str,
    rain_column: &str,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    interval: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (series, start, end, interval) = load_for_conversion(input, start, end, interval)?;

    let mut writer = FdvRainfallWriter::new(site_name, start, end, interval);
    let mut out = BufWriter::new(File::create(output)?);
    let nulls = writer.write(&mut out, &series, rain_column)?;

    info!("Rainfall file created successfully: {}", output.display());
    println!("Rainfall file created: {}", output.display());
    println!("Null readings: {nulls}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn report(
    input: &std::path::Path,
    monitor_type: MonitorType,
    column: Option<&str>,
    output_dir: Option<PathBuf>,
    split: bool,
    interval: Option<i64>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut series = loader::load(input)?;
    series.sort_by_timestamp();

    let report = reports::build_report(
        &series,
        monitor_type,
        column,
        interval.map(Duration::minutes),
        start_date,
        end_date,
    )?;

    let output_dir = output_dir.unwrap_or_else(default_output_dir);
    std::fs::create_dir_all(&output_dir)?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("series");
    let report_path = output_dir.join(format!("{stem}_final_report.xlsx"));
    reports::write_final_report(&report_path, &series, &report)?;
    println!("Final report saved to {}", report_path.display());

    if split {
        let files = reports::write_interim_files(&output_dir, &report)?;
        println!("Wrote {} interim period files", files.len());
    }
    Ok(())
}

fn rainfall_totals(
    input: &std::path::Path,
    rain_column: Option<&str>,
    output_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut series = loader::load(input)?;
    series.sort_by_timestamp();

    let totals = reports::build_totals(&series, rain_column)?;

    let output_dir = output_dir.unwrap_or_else(default_output_dir);
    std::fs::create_dir_all(&output_dir)?;
    let path = output_dir.join("rainfall_totals.xlsx");
    reports::write_rainfall_totals(&path, &totals)?;
    println!("Rainfall totals saved to {}", path.display());
    Ok(())
}

fn default_output_dir() -> PathBuf {
    std::env::var("FDV_OUTPUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Accept either a bare date (midnight) or a full timestamp in any of the
/// supported formats.
fn parse_datetime_arg(value: &str) -> Result<NaiveDateTime, String> {
    if let Some(dt) = parse_timestamp(value) {
        return Ok(dt);
    }
    if let Ok(date) = value.trim().parse::<NaiveDate>() {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(format!("'{value}' is not a recognized date or timestamp"))
}

fn parse_egg_form(value: &str) -> Result<EggForm, String> {
    match value.trim() {
        "1" => Ok(EggForm::Type1),
        "2" => Ok(EggForm::Type2),
        other => Err(format!("egg type must be 1 or 2, got '{other}'")),
    }
}
