use std::error::Error;

use chrono::Utc;
use clap::Subcommand;
use multitimer_core::storage::Config;
use multitimer_core::time_fmt::{format_hms, parse_hms};
use multitimer_core::{ConfigError, Event, TimerRecord};

use super::open_service;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Create a new countdown timer
    Create {
        /// Display name
        name: String,
        /// Duration as HH:MM:SS, MM:SS, or plain seconds
        /// (configuration default when omitted)
        duration: Option<String>,
    },
    /// List all timers
    List {
        /// Print raw records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one timer
    Show {
        id: i64,
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start or resume a timer
    Start { id: i64 },
    /// Pause a running timer
    Pause { id: i64 },
    /// Stop a timer and wind it back to its full duration
    Reset { id: i64 },
    /// Delete a timer
    Delete { id: i64 },
    /// Enable or disable the expiry notification for a timer
    Notify {
        id: i64,
        /// "on" or "off"
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
    /// Rename a timer and/or change its duration
    Update {
        id: i64,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New duration as HH:MM:SS, MM:SS, or plain seconds
        #[arg(long)]
        duration: Option<String>,
    },
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    let config = Config::load_or_default();
    let mut service = open_service(&config)?;

    match action {
        TimerAction::Create { name, duration } => {
            let duration_ms = match duration {
                Some(raw) => parse_duration(&raw)?,
                None => default_duration_ms(&config)?,
            };
            if let Event::TimerCreated { id, name, duration_ms, .. } =
                service.create(&name, duration_ms)?
            {
                println!("Created timer {id} '{name}' ({})", format_hms(duration_ms));
            }
        }
        TimerAction::List { json } => {
            let timers = service.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&timers)?);
            } else if timers.is_empty() {
                println!("No timers. Create one with: multitimer timer create <name> <duration>");
            } else {
                print_table(&timers);
            }
        }
        TimerAction::Show { id, json } => {
            let timer = service.get(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&timer)?);
            } else {
                print_detail(&timer);
            }
        }
        TimerAction::Start { id } => {
            if let Event::TimerStarted { name, remaining_ms, .. } = service.start(id)? {
                println!("Started '{name}', {} remaining", format_hms(remaining_ms));
            }
        }
        TimerAction::Pause { id } => {
            if let Event::TimerPaused { name, remaining_ms, .. } = service.pause(id)? {
                println!("Paused '{name}' at {}", format_hms(remaining_ms));
            }
        }
        TimerAction::Reset { id } => {
            if let Event::TimerReset { name, .. } = service.reset(id)? {
                let full = service.get(id)?.duration_ms;
                println!("Reset '{name}' to {}", format_hms(full));
            }
        }
        TimerAction::Delete { id } => {
            service.delete(id)?;
            println!("Deleted timer {id}");
        }
        TimerAction::Notify { id, state } => {
            let enabled = state == "on";
            if let Event::NotifyChanged { id, enabled, .. } = service.set_notify(id, enabled)? {
                let name = service.get(id)?.name;
                println!(
                    "Notifications {} for '{name}'",
                    if enabled { "on" } else { "off" }
                );
            }
        }
        TimerAction::Update { id, name, duration } => {
            let current = service.get(id)?;
            let name = name.unwrap_or(current.name);
            let duration_ms = match duration {
                Some(raw) => parse_duration(&raw)?,
                None => current.duration_ms,
            };
            if let Event::DefinitionUpdated { id, name, duration_ms, .. } =
                service.update_definition(id, &name, duration_ms)?
            {
                println!("Updated timer {id}: '{name}' ({})", format_hms(duration_ms));
            }
        }
    }

    Ok(())
}

fn parse_duration(raw: &str) -> Result<i64, Box<dyn Error>> {
    parse_hms(raw)
        .ok_or_else(|| format!("invalid duration '{raw}' (expected HH:MM:SS, MM:SS, or seconds)").into())
}

/// Configured default duration in milliseconds, rejecting values whose
/// conversion would overflow.
fn default_duration_ms(config: &Config) -> Result<i64, Box<dyn Error>> {
    let minutes = config.timers.default_duration_min;
    minutes
        .checked_mul(60_000)
        .and_then(|ms| i64::try_from(ms).ok())
        .ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "timers.default_duration_min".to_string(),
                value: minutes.to_string(),
                message: "out of range for a timer duration".to_string(),
            }
            .into()
        })
}

fn print_table(timers: &[TimerRecord]) {
    let now = Utc::now();
    println!("{:>4}  {:<20} {:>9}  {:<8} {}", "ID", "NAME", "REMAINING", "STATE", "NOTIFY");
    for t in timers {
        println!(
            "{:>4}  {:<20} {:>9}  {:<8} {}",
            t.id,
            t.name,
            format_hms(t.remaining_at(now)),
            state_of(t),
            if t.notify_enabled { "on" } else { "off" },
        );
    }
}

fn print_detail(t: &TimerRecord) {
    println!("Timer {} '{}'", t.id, t.name);
    println!("  duration:  {}", format_hms(t.duration_ms));
    println!("  remaining: {}", format_hms(t.remaining_at(Utc::now())));
    println!("  state:     {}", state_of(t));
    println!("  notify:    {}", if t.notify_enabled { "on" } else { "off" });
}

fn state_of(t: &TimerRecord) -> &'static str {
    if t.is_running {
        "running"
    } else if t.remaining_ms < t.duration_ms {
        "paused"
    } else {
        "ready"
    }
}
