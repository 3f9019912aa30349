//! Habit management commands for CLI.

use clap::Subcommand;
use lifeline_core::clock::to_datetime;
use lifeline_core::{
    record_relapse, reload_owner, Clock, CoreError, Database, Difficulty, EpochMs, HabitRecord,
    HabitStore, NewHabit, StoreError, SystemClock, Vitality,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::Context;

#[derive(Subcommand)]
pub enum HabitAction {
    /// Start tracking a habit
    Add {
        /// Habit name
        name: String,
        /// Why you want to quit
        #[arg(long, default_value = "")]
        motivation: String,
        /// Difficulty: easy, medium or hard (default: easy)
        #[arg(long, default_value = "easy")]
        difficulty: Difficulty,
        /// Life pool size (default: 3)
        #[arg(long)]
        max_lives: Option<i32>,
    },
    /// List your habits, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one habit in detail
    Show {
        /// Habit ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a relapse
    Relapse {
        /// Habit ID
        id: String,
    },
    /// Stop tracking a habit
    Delete {
        /// Habit ID
        id: String,
    },
}

#[derive(Serialize)]
struct HabitView<'a> {
    #[serde(flatten)]
    record: &'a HabitRecord,
    vitality: Vitality,
}

/// The caller's habit, or `NotFound` when it belongs to someone else.
fn owned(db: &Database, id: &str, user_id: &str) -> Result<HabitRecord, CoreError> {
    match db.get(id)? {
        Some(record) if record.owner_id == user_id => Ok(record),
        _ => Err(StoreError::NotFound(id.to_string()).into()),
    }
}

/// The user's habits after the reload sweep.
fn reload(db: &Database, user_id: &str, now: EpochMs) -> Result<Vec<HabitRecord>, CoreError> {
    let (records, sweep) = reload_owner(db, user_id, now)?;
    if !sweep.regenerated.is_empty() {
        info!(user_id, regenerated = sweep.regenerated.len(), "lives regenerated on reload");
    }
    Ok(records)
}

fn summary_line(record: &HabitRecord, v: &Vitality) -> String {
    format!(
        "{}  {}  lives {}/{}  {} {}  {} XP  {} {}",
        record.id,
        record.name,
        record.current_lives,
        record.max_lives,
        v.rank.icon,
        v.rank.name,
        v.experience_points,
        v.display_value,
        v.display_unit.label(),
    )
}

fn print_detail(record: &HabitRecord, v: &Vitality) {
    println!("{} ({})", record.name, record.id);
    if !record.motivation.is_empty() {
        println!("Motivation: {}", record.motivation);
    }
    println!("Difficulty: {}", record.difficulty);
    if let Some(started) = to_datetime(record.start_time) {
        println!("Started: {}", started.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("Lives: {}/{}  {}", record.current_lives, record.max_lives, v.mood.message());
    println!("Clean: {} {}", v.display_value, v.display_unit.label());
    println!("Rank: {} {} ({} XP)", v.rank.icon, v.rank.name, v.experience_points);
    match v.xp_to_next_rank {
        Some(xp) => println!("Next rank in: {xp} XP"),
        None => println!("Next rank in: top rank reached"),
    }
    if v.defeated {
        println!("Status: defeated");
    } else if v.regenerating {
        println!(
            "Regeneration: day {}/{}, {}h to go",
            v.regeneration_days_passed,
            v.regeneration_days_total,
            v.hours_until_regeneration()
        );
    }
    println!("Relapses: {}", record.relapse_history.len());
}

pub fn run(action: HabitAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let user_id = ctx.user_id()?;
    let now = SystemClock.now_ms();

    match action {
        HabitAction::Add {
            name,
            motivation,
            difficulty,
            max_lives,
        } => {
            let mut draft = NewHabit::new(&user_id, &name, &motivation, difficulty)?;
            if let Some(max_lives) = max_lives {
                draft = draft.with_max_lives(max_lives)?;
            }
            let record = draft.into_record(Uuid::new_v4().to_string(), now);
            db.create(&record)?;
            println!("Habit created: {}", record.id);
        }
        HabitAction::List { json } => {
            let records = reload(&db, &user_id, now)?;
            if json {
                let views: Vec<_> = records
                    .iter()
                    .map(|record| HabitView {
                        record,
                        vitality: Vitality::evaluate(record, now),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else if records.is_empty() {
                println!("No habits yet.");
            } else {
                for record in &records {
                    println!("{}", summary_line(record, &Vitality::evaluate(record, now)));
                }
            }
        }
        HabitAction::Show { id, json } => {
            let record = reload(&db, &user_id, now)?
                .into_iter()
                .find(|record| record.id == id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let vitality = Vitality::evaluate(&record, now);
            if json {
                let view = HabitView {
                    record: &record,
                    vitality,
                };
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_detail(&record, &vitality);
            }
        }
        HabitAction::Relapse { id } => {
            owned(&db, &id, &user_id)?;
            let record = record_relapse(&db, &id, now)?;
            println!(
                "Relapse recorded: {} lives left of {}",
                record.current_lives, record.max_lives
            );
            if record.is_defeated() {
                println!("This habit is defeated.");
            }
        }
        HabitAction::Delete { id } => {
            owned(&db, &id, &user_id)?;
            db.delete(&id)?;
            println!("Habit deleted: {id}");
        }
    }
    Ok(())
}
