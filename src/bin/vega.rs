//! VEGA CLI - Command-line interface for the VEGA monitor
//!
//! Commands:
//! - replay: Process a scripted frame file into output records (batch mode)
//! - run: Process frames streamed on stdin (streaming mode)
//! - validate: Validate replay frames
//! - calibrate: Train and persist a personal calibration model
//! - forget: Delete a personal calibration model
//! - doctor: Diagnose configuration and calibration health
//! - schema: Print input, output or config schema

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use vega_monitor::calibration::{CalibrationSample, CalibrationStore, PersonalCalibration};
use vega_monitor::config::MonitorConfig;
use vega_monitor::pipeline::{MonitorPipeline, DEFAULT_USER};
use vega_monitor::record::OutputRecord;
use vega_monitor::replay::{self, ReplayFrame, ScriptedEmotion, ScriptedLocator};
use vega_monitor::session_log::{SessionLog, DEFAULT_MEMORY_SIZE};
use vega_monitor::{MonitorError, MONITOR_VERSION, PRODUCER_NAME};

/// VEGA - behavioral state engine for head movement and facial emotion
#[derive(Parser)]
#[command(name = "vega")]
#[command(version = MONITOR_VERSION)]
#[command(about = "Infer behavioral state and stress from face signals", long_about = None)]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a scripted frame file into output records (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Process frames streamed on stdin (streaming mode)
    Run {
        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Validate replay frames
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Train and persist a personal calibration model
    Calibrate {
        /// Labeled samples, one {"probabilities": {...}, "label": "..."} per line
        #[arg(short, long)]
        samples: PathBuf,

        /// Calibration store directory
        #[arg(long)]
        store_dir: PathBuf,

        /// User identity
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Delete a personal calibration model
    Forget {
        /// Calibration store directory
        #[arg(long)]
        store_dir: PathBuf,

        /// User identity
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
    },

    /// Diagnose configuration and calibration health
    Doctor {
        /// Configuration file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Calibration store directory to check
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// User identity
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

/// Options shared by the frame-processing commands
#[derive(Args)]
struct SessionArgs {
    /// Configuration file (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emotion inference stride in frames
    #[arg(long)]
    stride: Option<usize>,

    /// Emotion window size
    #[arg(long)]
    emotion_window: Option<usize>,

    /// Calibration store directory; enables the personal override
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// User identity for calibration
    #[arg(long, default_value = DEFAULT_USER)]
    user: String,

    /// Directory for session JSONL logs
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Replay frame input
    Input,
    /// Output record
    Output,
    /// Monitor configuration
    Config,
}

type ReplayPipeline = MonitorPipeline<ScriptedLocator, ScriptedEmotion>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays a clean record stream
fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = fmt::layer().with_target(false).with_writer(io::stderr);
    let _ = Registry::default().with(env_filter).with(stderr_layer).try_init();
}

fn run(cli: Cli) -> Result<(), VegaCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            session,
        } => cmd_replay(&input, &output, input_format, output_format, &session),

        Commands::Run { flush, session } => cmd_run(&session, flush),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Calibrate {
            samples,
            store_dir,
            user,
            config,
        } => cmd_calibrate(&samples, &store_dir, &user, config.as_deref()),

        Commands::Forget { store_dir, user } => cmd_forget(&store_dir, &user),

        Commands::Doctor {
            config,
            store_dir,
            user,
            json,
        } => cmd_doctor(config.as_deref(), store_dir.as_deref(), &user, json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig, VegaCliError> {
    match path {
        Some(path) => Ok(MonitorConfig::load(path)?),
        None => Ok(MonitorConfig::default()),
    }
}

fn build_pipeline(args: &SessionArgs) -> Result<ReplayPipeline, VegaCliError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(stride) = args.stride {
        config.emotion_stride = stride;
    }
    if let Some(window) = args.emotion_window {
        config.emotion_window = window;
    }
    let log_every = config.log_every;

    let mut pipeline = MonitorPipeline::new(config, ScriptedLocator, ScriptedEmotion::default())?;
    if let Some(dir) = &args.store_dir {
        pipeline = pipeline.with_calibration(CalibrationStore::new(dir), &args.user);
    }
    if let Some(dir) = &args.log_dir {
        pipeline = pipeline.with_sink(SessionLog::create(dir, log_every, DEFAULT_MEMORY_SIZE)?);
    }
    Ok(pipeline)
}

fn read_input(input: &Path) -> Result<String, VegaCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_input(data: &str, format: &InputFormat) -> Result<Vec<ReplayFrame>, VegaCliError> {
    Ok(match format {
        InputFormat::Ndjson => replay::parse_ndjson(data)?,
        InputFormat::Json => replay::parse_array(data)?,
    })
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    session: &SessionArgs,
) -> Result<(), VegaCliError> {
    let frames = parse_input(&read_input(input)?, &input_format)?;
    if frames.is_empty() {
        return Err(VegaCliError::NoFrames);
    }

    let mut pipeline = build_pipeline(session)?;
    let records: Vec<OutputRecord> = frames
        .iter()
        .map(|frame| pipeline.process_frame(frame))
        .collect();
    info!(frames = records.len(), "replay complete");

    let output_data = format_output(&records, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }
    Ok(())
}

fn cmd_run(session: &SessionArgs, flush: bool) -> Result<(), VegaCliError> {
    let mut pipeline = build_pipeline(session)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let frame = replay::parse_line(trimmed, line_num + 1)?;
        let record = pipeline.process_frame(&frame);
        writeln!(stdout, "{}", record.to_json()?)?;
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    info!(frames = pipeline.frame_count(), "stream closed");
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), VegaCliError> {
    let frames = parse_input(&read_input(input)?, &input_format)?;
    let issues = replay::validate_frames(&frames);

    let report = ValidationReport {
        total_frames: frames.len(),
        valid_frames: frames.len() - issues.len(),
        invalid_frames: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                error: issue.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames:   {}", report.total_frames);
        println!("Valid frames:   {}", report.valid_frames);
        println!("Invalid frames: {}", report.invalid_frames);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Frame {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(VegaCliError::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

fn cmd_calibrate(
    samples: &Path,
    store_dir: &Path,
    user: &str,
    config: Option<&Path>,
) -> Result<(), VegaCliError> {
    let config = load_config(config)?;
    config.validate()?;

    let content = fs::read_to_string(samples)?;
    let mut calibration =
        PersonalCalibration::open(config.calibration, user, CalibrationStore::new(store_dir));

    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let sample: CalibrationSample = serde_json::from_str(trimmed).map_err(|e| {
            VegaCliError::ParseError(format!("Failed to parse sample line {}: {}", line_num + 1, e))
        })?;
        calibration.collect(sample.probabilities, sample.label);
    }

    let readiness = calibration.ready_to_train();
    if !readiness.is_ready() {
        return Err(VegaCliError::NotReady(readiness.to_string()));
    }
    if !calibration.train_and_persist() {
        return Err(VegaCliError::TrainingFailed);
    }

    let report = CalibrationReport {
        user: user.to_string(),
        samples: calibration.total_samples(),
        path: calibration
            .store()
            .map(|store| store.path_for(user).display().to_string()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_forget(store_dir: &Path, user: &str) -> Result<(), VegaCliError> {
    let removed = CalibrationStore::new(store_dir).delete(user)?;
    if !removed {
        warn!(user, "no calibration to forget");
    }
    println!(
        "{}",
        serde_json::json!({ "user": user, "removed": removed })
    );
    Ok(())
}

fn cmd_doctor(
    config: Option<&Path>,
    store_dir: Option<&Path>,
    user: &str,
    json: bool,
) -> Result<(), VegaCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("VEGA monitor version {}", MONITOR_VERSION),
    });

    let config_check = match load_config(config) {
        Ok(loaded) => match loaded.validate() {
            Ok(()) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Configuration valid (stride {}, window {})",
                    loaded.emotion_stride, loaded.emotion_window
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot load configuration: {}", CliError::from(e).message),
        },
    };
    checks.push(config_check);

    if let Some(dir) = store_dir {
        let store = CalibrationStore::new(dir);
        let check = match store.load(user) {
            Ok(Some(model)) => DoctorCheck {
                name: "calibration".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Personal model for '{}' ({} samples, trained {})",
                    user, model.sample_count, model.trained_at
                ),
            },
            Ok(None) => DoctorCheck {
                name: "calibration".to_string(),
                status: CheckStatus::Warning,
                message: format!("No personal model for '{}'", user),
            },
            Err(e) => DoctorCheck {
                name: "calibration".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        };
        checks.push(check);
    }

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: MONITOR_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("VEGA Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(VegaCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), VegaCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", input_json_schema());
            } else {
                println!("Input: replay frame (one JSON object per line)");
                println!();
                println!("- frame_width, frame_height: frame size in pixels");
                println!("- bbox: {{ x, y, width, height }} of the dominant face; omit when no face");
                println!("- eyes_detected: eye features in the upper half of the box (default 2)");
                println!("- head_pose: frontal | down | away | unknown; overrides geometry");
                println!("- probabilities: {{ stressed, focused, confused, calm }}");
                println!("- logits: 8 raw FER+ outputs, used when probabilities are absent");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", output_json_schema());
            } else {
                println!("Output: one record per processed frame");
                println!();
                println!("- timestamp: ISO-8601 UTC, second precision");
                println!("- state: calm | focused | confused | stressed | working | face_not_visible");
                println!("- stress_score: smoothed score in [0, 1], 4 decimals");
                println!("- probabilities: {{ stressed, focused, confused, calm }}, 4 decimals");
                println!("- face_detected, valid_for_emotion, is_stable: booleans");
                println!("- head_pose: frontal | down | away | unknown");
                println!("- movement_score, stability_score: [0, 1], 3 decimals");
                println!("- direction_changes: left-right reversals in the movement window");
            }
        }
        SchemaType::Config => {
            println!("{}", MonitorConfig::default().to_json()?);
        }
    }
    Ok(())
}

// Helper functions

fn format_output(records: &[OutputRecord], format: &OutputFormat) -> Result<String, VegaCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(record.to_json()?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

fn probability_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "stressed": { "type": "number", "minimum": 0, "maximum": 1 },
            "focused": { "type": "number", "minimum": 0, "maximum": 1 },
            "confused": { "type": "number", "minimum": 0, "maximum": 1 },
            "calm": { "type": "number", "minimum": 0, "maximum": 1 }
        }
    })
}

fn input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "vega.replay_frame",
        "type": "object",
        "required": ["frame_width", "frame_height"],
        "properties": {
            "frame_width": { "type": "integer", "minimum": 1 },
            "frame_height": { "type": "integer", "minimum": 1 },
            "bbox": {
                "type": "object",
                "required": ["x", "y", "width", "height"],
                "properties": {
                    "x": { "type": "integer", "minimum": 0 },
                    "y": { "type": "integer", "minimum": 0 },
                    "width": { "type": "integer", "minimum": 1 },
                    "height": { "type": "integer", "minimum": 1 }
                }
            },
            "eyes_detected": { "type": "integer", "minimum": 0 },
            "head_pose": { "type": "string", "enum": ["frontal", "down", "away", "unknown"] },
            "probabilities": probability_schema(),
            "logits": { "type": "array", "items": { "type": "number" }, "minItems": 8, "maxItems": 8 }
        }
    })
    .to_string()
}

fn output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "vega.output_record",
        "type": "object",
        "required": [
            "timestamp", "state", "stress_score", "probabilities", "face_detected",
            "head_pose", "valid_for_emotion", "movement_score", "stability_score",
            "direction_changes", "is_stable"
        ],
        "properties": {
            "timestamp": { "type": "string", "format": "date-time" },
            "state": {
                "type": "string",
                "enum": ["calm", "focused", "confused", "stressed", "working", "face_not_visible"]
            },
            "stress_score": { "type": "number", "minimum": 0, "maximum": 1 },
            "probabilities": probability_schema(),
            "face_detected": { "type": "boolean" },
            "head_pose": { "type": "string", "enum": ["frontal", "down", "away", "unknown"] },
            "valid_for_emotion": { "type": "boolean" },
            "movement_score": { "type": "number", "minimum": 0, "maximum": 1 },
            "stability_score": { "type": "number", "minimum": 0, "maximum": 1 },
            "direction_changes": { "type": "integer", "minimum": 0 },
            "is_stable": { "type": "boolean" }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum VegaCliError {
    Io(io::Error),
    Monitor(MonitorError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
    NotReady(String),
    TrainingFailed,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for VegaCliError {
    fn from(e: io::Error) -> Self {
        VegaCliError::Io(e)
    }
}

impl From<MonitorError> for VegaCliError {
    fn from(e: MonitorError) -> Self {
        VegaCliError::Monitor(e)
    }
}

impl From<serde_json::Error> for VegaCliError {
    fn from(e: serde_json::Error) -> Self {
        VegaCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VegaCliError> for CliError {
    fn from(e: VegaCliError) -> Self {
        match e {
            VegaCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VegaCliError::Monitor(e) => {
                let (code, hint) = match &e {
                    MonitorError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'vega schema config' for defaults")
                    }
                    MonitorError::ParseError(_) | MonitorError::JsonError(_) => {
                        ("PARSE_ERROR", "Run 'vega validate' for details")
                    }
                    MonitorError::CorruptModel(_) => {
                        ("CORRUPT_MODEL", "Run 'vega forget' and recalibrate")
                    }
                    MonitorError::InsufficientSamples(_) | MonitorError::TrainingError(_) => {
                        ("CALIBRATION_ERROR", "Collect more labeled samples")
                    }
                    MonitorError::IoError(_) => ("IO_ERROR", "Check file paths and permissions"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            VegaCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            VegaCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            VegaCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} frames failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            VegaCliError::NotReady(reason) => CliError {
                code: "NOT_READY".to_string(),
                message: reason,
                hint: Some("Collect at least the minimum calm and stressed samples".to_string()),
            },
            VegaCliError::TrainingFailed => CliError {
                code: "TRAINING_FAILED".to_string(),
                message: "Calibration model was not trained or saved".to_string(),
                hint: Some("Re-run with --log-level debug for details".to_string()),
            },
            VegaCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            VegaCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_frames: usize,
    valid_frames: usize,
    invalid_frames: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct CalibrationReport {
    user: String,
    samples: usize,
    path: Option<String>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
