//! scheda - Workout programming and logging engine

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use scheda::metrics::{self, volume_by_week_and_muscle, MuscleVolume};
use scheda::progression::{apply_to_all_weeks, expand_progression_with, validate_progression};
use scheda::reconcile::{compare_to_plan, find_original_block, group_sessions_by_block};
use scheda::schema::{generate_schema, parse_schema, schema_total};
use scheda::technique::TechniqueParams;
use scheda::{
    default_library, Analytics, CustomTechniques, ExerciseLibrary, LoggedSession,
    PercentageProgression, Program, RoundingPolicy, Technique, WeekRemap,
};

#[derive(Parser)]
#[command(name = "scheda")]
#[command(author, version, about = "Workout programming and logging engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a schema such as "10+8+6"
    Schema {
        text: String,

        /// Sets, to compute the block's target reps
        #[arg(short, long)]
        sets: Option<u32>,
    },

    /// Generate a schema from technique parameters
    Generate {
        /// Technique name (e.g. "Drop Set", "Cluster", or a custom name)
        technique: String,

        /// Parameter override, key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// JSON file with custom techniques
        #[arg(long)]
        customs: Option<PathBuf>,
    },

    /// Validate and expand a percentage progression
    Progression {
        /// JSON file with the progression
        file: PathBuf,

        /// Load rounding increment in kg
        #[arg(long, env = "SCHEDA_LOAD_INCREMENT", default_value = "1")]
        increment: f64,
    },

    /// Write a progression into every week of a program (prints the new program)
    Apply {
        /// Program JSON
        program: PathBuf,

        /// Progression JSON
        progression: PathBuf,

        #[arg(long)]
        day: usize,

        #[arg(long)]
        exercise: usize,

        #[arg(long, env = "SCHEDA_LOAD_INCREMENT", default_value = "1")]
        increment: f64,

        /// Confirm overwriting existing blocks
        #[arg(long)]
        yes: bool,
    },

    /// Volume per muscle from logged sessions
    Volume {
        /// Sessions JSON
        sessions: PathBuf,

        /// Exercise library JSON (built-in library if omitted)
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Break down by chronological week
        #[arg(long)]
        by_week: bool,
    },

    /// Logged history against the plan
    History {
        /// Program JSON
        program: PathBuf,

        /// Sessions JSON
        sessions: PathBuf,

        /// Week remap offset for duplicated programs
        #[arg(long, env = "SCHEDA_WEEK_OFFSET", requires = "cycle")]
        offset: Option<u32>,

        /// Week remap cycle length for duplicated programs
        #[arg(long, env = "SCHEDA_CYCLE_LENGTH", requires = "offset")]
        cycle: Option<u32>,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected key=value, got: {}", s))?;
    Ok((key.trim().to_string(), value.to_string()))
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn load_sessions(path: &Path) -> Result<Vec<LoggedSession>> {
    let sessions: Vec<LoggedSession> = load_json(path)?;
    Ok(sessions.iter().map(LoggedSession::recomputed).collect())
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // stdout carries command output
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schema { text, sets } => {
            let clusters = parse_schema(&text);
            if clusters.is_empty() && !text.trim().is_empty() {
                bail!("Invalid schema: {}", text);
            }
            println!("Clusters: {} {:?}", clusters.len().max(1), clusters);
            println!("Reps per set: {}", schema_total(&text));
            if let Some(sets) = sets {
                println!("Target reps: {}", sets.saturating_mul(schema_total(&text)));
            }
        }

        Commands::Generate { technique, params, customs } => {
            let customs: CustomTechniques = match customs {
                Some(path) => load_json(&path)?,
                None => CustomTechniques::default(),
            };
            let technique = Technique::from_name(&technique, &customs)?;
            let params: TechniqueParams = params.into_iter().collect();
            let schema = generate_schema(&technique, &params, &customs)?;
            println!("{}: {}", technique, if schema.is_empty() { "-" } else { schema.as_str() });
        }

        Commands::Progression { file, increment } => {
            let progression: PercentageProgression = load_json(&file)?;
            let report = validate_progression(&progression);
            if !report.valid {
                for error in &report.errors {
                    eprintln!("  - {}", error);
                }
                bail!("Progression has {} problem(s)", report.errors.len());
            }

            let rounding = RoundingPolicy::new(increment);
            println!("1RM: {} kg", progression.one_rep_max);
            println!("{:-<40}", "");
            for (week, blocks) in expand_progression_with(&progression, &rounding) {
                for block in blocks {
                    println!(
                        "Week {:>2} | {}x{} @ {:>5.1}% | {} kg",
                        week, block.sets, block.reps, block.percentage, block.load_kg
                    );
                }
            }
        }

        Commands::Apply { program, progression, day, exercise, increment, yes } => {
            let program: Program = load_json(&program)?;
            let progression: PercentageProgression = load_json(&progression)?;

            let report = validate_progression(&progression);
            if !report.valid {
                bail!("Invalid progression: {}", report.errors.join("; "));
            }
            if !yes {
                bail!(
                    "Applying a progression overwrites blocks in every listed week; \
                     pass --yes to confirm"
                );
            }

            let weeks = apply_to_all_weeks(
                &progression,
                &program.weeks,
                day,
                exercise,
                &RoundingPolicy::new(increment),
            );
            let updated = Program { weeks, ..program };
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }

        Commands::Volume { sessions, library, by_week } => {
            let sessions = load_sessions(&sessions)?;
            let library: ExerciseLibrary = match library {
                Some(path) => load_json(&path)?,
                None => default_library(),
            };
            library.validate()?;

            if by_week {
                for week in volume_by_week_and_muscle(&sessions, &library) {
                    println!(
                        "Week {} ({} w{}, from {})",
                        week.chrono_week,
                        week.program_id,
                        week.week_num,
                        week.started.format("%Y-%m-%d")
                    );
                    for (muscle, volume) in &week.volumes {
                        println!("  {:20} {:.1}", muscle, volume);
                    }
                }
            } else {
                let volume = MuscleVolume::from_sessions(&sessions, &library);
                println!("Volume per muscle");
                println!("{:-<40}", "");
                for (muscle, value) in volume.volumes() {
                    println!("{:20} {:.1}", muscle, value);
                }
                println!("Balance: {:.0}%", volume.get_balance_score());
            }

            let analytics = Analytics::new(sessions);
            if let Some(avg) = analytics.average_completion() {
                println!("Average completion: {:.0}%", avg);
            }
            for point in metrics::rpe_trend(analytics.sessions()) {
                println!("RPE week {}: {:.1}", point.chrono_week, point.avg_rpe);
            }
        }

        Commands::History { program, sessions, offset, cycle } => {
            let program: Program = load_json(&program)?;
            let sessions = load_sessions(&sessions)?;
            let remap = match (offset, cycle) {
                (Some(offset), Some(cycle)) => Some(WeekRemap::new(offset, cycle)?),
                _ => None,
            };

            let own: Vec<LoggedSession> = sessions
                .into_iter()
                .filter(|s| s.program_id() == program.id)
                .collect();

            for group in group_sessions_by_block(&own) {
                println!(
                    "Week {} | day {} | {}",
                    group.week_num,
                    group.day_index + 1,
                    group.exercise
                );
                for session in group.sessions {
                    let original = find_original_block(session, &program.weeks, remap.as_ref());
                    println!(
                        "  block {} | {} | {}/{} reps ({:.0}%)",
                        session.block_index() + 1,
                        session.date.format("%Y-%m-%d"),
                        session.total_reps(),
                        session.target_reps(),
                        session.completion()
                    );
                    for comparison in compare_to_plan(session, original) {
                        println!("    {}", comparison.format());
                    }
                }
            }
        }
    }

    Ok(())
}
