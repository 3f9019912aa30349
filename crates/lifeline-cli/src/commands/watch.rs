//! Foreground regeneration loop.

use std::sync::Arc;
use std::time::Duration;

use lifeline_core::{Config, Database, Identity, RegenerationWorker, SystemClock};

use super::Context;

pub fn run(interval: Option<u64>, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = ctx.user_id()?;
    let secs = match interval {
        Some(secs) => secs,
        None => Config::load()?.regeneration.sweep_interval_secs,
    };
    let db = Arc::new(Database::open()?);
    let identity = Identity::signed_in(&user_id)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let worker = RegenerationWorker::spawn(
            db,
            identity,
            Arc::new(SystemClock),
            Duration::from_secs(secs.max(1)),
        );
        let mut reports = worker.subscribe_reports();
        println!("watching habits for {user_id} every {}s, Ctrl-C to stop", secs.max(1));

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        eprintln!("error: {e}");
                    }
                    break;
                }
                changed = reports.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = reports.borrow_and_update().clone();
                    if let Some(report) = latest.filter(|r| !r.regenerated.is_empty()) {
                        for id in &report.regenerated {
                            println!("+1 life: {id}");
                        }
                    }
                }
            }
        }

        worker.stop().await;
        println!("stopped");
    });
    Ok(())
}
