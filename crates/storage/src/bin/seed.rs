use std::fmt;

use chrono::{DateTime, Utc};
use practice_core::curriculum::Curriculum;
use practice_core::model::{
    AttemptOutcome, ModuleId, Run, RunToggle, SaveId, SubtopicId, Topic, TopicId,
};
use practice_core::progression::ProgressionEngine;
use storage::repository::{AttemptLogRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    save_id: SaveId,
    attempts: u32,
    aggressive: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSaveId { raw: String },
    InvalidAttempts { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSaveId { raw } => write!(f, "invalid --save-id value: {raw}"),
            ArgsError::InvalidAttempts { raw } => write!(f, "invalid --attempts value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PRACTICE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut save_id = std::env::var("PRACTICE_SAVE_ID")
            .ok()
            .and_then(|value| SaveId::new(value).ok())
            .unwrap_or_else(|| SaveId::new("slot-1").expect("default save id is valid"));
        let mut attempts = std::env::var("PRACTICE_ATTEMPTS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(12);
        let mut aggressive = false;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--save-id" => {
                    let value = require_value(&mut args, "--save-id")?;
                    save_id = SaveId::new(value.clone())
                        .map_err(|_| ArgsError::InvalidSaveId { raw: value })?;
                }
                "--attempts" => {
                    let value = require_value(&mut args, "--attempts")?;
                    attempts = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidAttempts { raw: value.clone() })?;
                }
                "--aggressive" => {
                    aggressive = true;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            save_id,
            attempts,
            aggressive,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --save-id <name>          Save slot to seed (default: slot-1)");
    eprintln!("  --attempts <n>            Number of attempts to simulate (default: 12)");
    eprintln!("  --aggressive              Enable aggressive progression for the run");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PRACTICE_DB_URL, PRACTICE_SAVE_ID, PRACTICE_ATTEMPTS");
}

fn sample_curriculum() -> Result<Curriculum, Box<dyn std::error::Error>> {
    let archetypes = [
        (1_u64, 1_u64, "Arrays"),
        (1, 1, "Strings"),
        (1, 2, "Hash Maps"),
        (1, 2, "Two Pointers"),
        (2, 3, "Stacks"),
        (2, 3, "Queues"),
        (2, 4, "Binary Trees"),
        (3, 5, "Graphs"),
        (3, 5, "Dynamic Programming"),
    ];

    let mut topics = Vec::with_capacity(archetypes.len());
    for (position, (module, subtopic, name)) in archetypes.into_iter().enumerate() {
        topics.push(Topic::new(
            TopicId::new(position as u64 + 1),
            name,
            ModuleId::new(module),
            SubtopicId::new(subtopic),
            position,
        )?);
    }

    Ok(Curriculum::new(topics)?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let curriculum = sample_curriculum()?;
    let engine = ProgressionEngine::new();
    let now = args.now.unwrap_or_else(Utc::now);

    let mut run = match storage.runs.load_run(&args.save_id).await {
        Ok(existing) => existing,
        Err(storage::repository::StorageError::NotFound) => Run::new(args.save_id.clone(), now),
        Err(err) => return Err(err.into()),
    };

    if args.aggressive {
        run = engine.set_toggle(&run, RunToggle::AggressiveProgression, true, now);
    }

    // Deterministic rhythm: a mistake every fourth attempt.
    for i in 0..args.attempts {
        let outcome = if (i + 1) % 4 == 0 {
            AttemptOutcome::Incorrect
        } else {
            AttemptOutcome::Correct
        };
        let answered_at = now + chrono::Duration::seconds(i64::from(i) * 30);

        let applied = engine.advance(&run, outcome, curriculum.len(), answered_at);
        let record = AttemptLogRecord::from_log(&applied.log, applied.promoted);
        run = applied.run.stamped(answered_at);
        storage.attempts.apply_attempt(&run, &record).await?;
    }

    println!(
        "Seeded run '{}' at topic {}/{} with {} attempts recorded into {}",
        run.save_id(),
        run.topic_pointer(),
        curriculum.len(),
        args.attempts,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
