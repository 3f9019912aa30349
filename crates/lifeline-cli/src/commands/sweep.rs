use lifeline_core::{sweep_owner, Clock, Database, SystemClock};

use super::Context;

pub fn run(json: bool, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let user_id = ctx.user_id()?;
    let report = sweep_owner(&db, &user_id, SystemClock.now_ms())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!(
        "regenerated: {}, skipped: {}, failed: {}",
        report.regenerated.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for id in &report.regenerated {
        println!("  +1 life: {id}");
    }
    Ok(())
}
