use chrono::Local;
use clap::Subcommand;
use lifeline_core::reminder::MOTIVATIONAL_MESSAGES;
use lifeline_core::Config;

#[derive(Subcommand)]
pub enum ReminderAction {
    /// When the next check-in reminder fires
    Next,
    /// List the built-in reminder messages
    Messages,
}

pub fn run(action: ReminderAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ReminderAction::Next => {
            let config = Config::load()?;
            if !config.reminder.enabled {
                println!("Reminders are disabled.");
                return Ok(());
            }
            let settings = config.reminder_settings();
            let due = settings.next_due(&Local::now())?;
            println!("{}", due.format("%Y-%m-%d %H:%M"));
            println!("{}", settings.message);
        }
        ReminderAction::Messages => {
            for (i, message) in MOTIVATIONAL_MESSAGES.iter().enumerate() {
                println!("{}. {message}", i + 1);
            }
        }
    }
    Ok(())
}
