use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "lifeline", version, about = "Lifeline habit tracker CLI")]
struct Cli {
    /// Act as this user instead of `account.user_id`
    #[arg(long, global = true)]
    user: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Run one regeneration pass
    Sweep {
        /// Print the sweep report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep regenerating in the background until Ctrl-C
    Watch {
        /// Seconds between sweeps (default: regeneration.sweep_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Rank ladder and rank-up detection
    Rank {
        #[command(subcommand)]
        action: commands::rank::RankAction,
    },
    /// Daily check-in reminder
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LIFELINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let ctx = commands::Context::new(cli.user);
    let result = match cli.command {
        Commands::Habit { action } => commands::habit::run(action, &ctx),
        Commands::Sweep { json } => commands::sweep::run(json, &ctx),
        Commands::Watch { interval } => commands::watch::run(interval, &ctx),
        Commands::Rank { action } => commands::rank::run(action, &ctx),
        Commands::Reminder { action } => commands::reminder::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
