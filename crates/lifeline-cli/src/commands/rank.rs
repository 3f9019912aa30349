use clap::Subcommand;
use lifeline_core::habit::best_rank;
use lifeline_core::{check_rank_up, Clock, Database, HabitStore, Rank, RankChange, SystemClock};

use super::Context;

#[derive(Subcommand)]
pub enum RankAction {
    /// Show the rank ladder
    Table,
    /// Compare your best rank with the last one seen
    Check,
}

pub fn run(action: RankAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RankAction::Table => {
            for rank in Rank::LADDER {
                let info = rank.info();
                println!("{:>2}  {} {:<10} {:>6} XP", info.level, info.icon, info.name, info.min_xp);
            }
        }
        RankAction::Check => {
            let db = Database::open()?;
            let user_id = ctx.user_id()?;
            let now = SystemClock.now_ms();
            let records = db.list_for_owner(&user_id)?;

            match check_rank_up(&records, now, &db)? {
                RankChange::Promoted(info) => println!("Rank up! {} {}", info.icon, info.name),
                RankChange::Lowered { from, to } => {
                    let name = |level| Rank::from_level(level).map_or("?", Rank::name);
                    println!("Rank lowered: {} -> {}", name(from), name(to));
                }
                RankChange::Unchanged => match best_rank(&records, now) {
                    Some(info) => println!("Still {} {}", info.icon, info.name),
                    None => println!("No habits yet."),
                },
            }
        }
    }
    Ok(())
}
