//! lotkeeper - parking slot allocation and session-lifecycle engine
//!
//! Thin CLI over the core API; every subcommand maps to one core operation.
//!
//! Module structure:
//! - `domain/` - Core business types (ids, records, error taxonomy)
//! - `store/` - SQLite persistence gateway
//! - `services/` - Business logic (SessionLedger, SlotInventory, AllocationPolicy)
//! - `infra/` - Infrastructure (Config)

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use lotkeeper::domain::{Category, VehicleId, VehicleType, Zone};
use lotkeeper::infra::Config;
use lotkeeper::services::{AllocationPolicy, Role, SessionLedger, UserDirectory};
use lotkeeper::store::Store;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// lotkeeper - parking slot and session management
#[derive(Parser, Debug)]
#[command(
    name = "lotkeeper",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"),
    about
)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then
    /// config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the slot pool from the configured zone counts (idempotent)
    Seed,
    /// Park a vehicle
    Park {
        /// Vehicle identifier (e.g. MH01AB1234)
        vehicle: String,
        /// Vehicle type (Car, Bike, ...)
        #[arg(long, default_value = "Car")]
        vehicle_type: String,
        /// Owner category (Student, Faculty, VIP, ...)
        #[arg(long, default_value = "Student")]
        category: String,
    },
    /// Exit a parked vehicle
    Exit {
        /// Vehicle identifier
        vehicle: String,
    },
    /// Show occupancy counts, for one zone or all zones
    Stats {
        #[arg(long)]
        zone: Option<String>,
    },
    /// List currently parked vehicles
    Active,
    /// Show history records as JSON
    History {
        #[arg(long)]
        vehicle: Option<String>,
        /// Entry date filter (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete closed history rows older than the retention window
    Purge {
        /// Override the configured retention window (days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Report rows referencing entities that no longer exist
    Orphans,
    /// Clear all sessions, history and vehicle records and free every slot
    Reset {
        /// Required confirmation flag
        #[arg(long)]
        force: bool,
    },
    /// Erase all stored data for one vehicle
    Forget {
        /// Vehicle identifier
        vehicle: String,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create a user account
    Add {
        username: String,
        password: String,
        /// Account role (admin or staff)
        #[arg(long, default_value = "staff")]
        role: String,
    },
    /// Change a password (requires the current one)
    Passwd {
        username: String,
        old_password: String,
        new_password: String,
    },
    /// Delete a user account (the built-in admin cannot be deleted)
    Rm { username: String },
}

fn main() -> anyhow::Result<()> {
    // Structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| std::env::var("CONFIG_FILE").ok())
        .unwrap_or_else(|| "config/dev.toml".to_string());
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        db_path = %config.db_path().display(),
        tie_break = %config.tie_break().as_str(),
        history_days = %config.history_days(),
        "config_loaded"
    );

    let store = Store::open(config.db_path(), config.busy_timeout())?;
    let users = UserDirectory::new(store.clone());
    users.ensure_default_admin()?;

    let ledger = SessionLedger::new(store, AllocationPolicy::new(config.tie_break()));

    match args.command {
        Command::Seed => {
            let created = ledger.seed_slots(config.zone_counts())?;
            println!("seeded {created} slot(s)");
        }
        Command::Park {
            vehicle,
            vehicle_type,
            category,
        } => {
            let vehicle: VehicleId = vehicle.parse()?;
            let vehicle_type: VehicleType = vehicle_type.parse().expect("infallible");
            let category: Category = category.parse().expect("infallible");
            let receipt = ledger.park(&vehicle, &vehicle_type, &category, Utc::now())?;
            println!(
                "vehicle {vehicle} parked in slot {} (zone {})",
                receipt.slot_id, receipt.zone
            );
        }
        Command::Exit { vehicle } => {
            let vehicle: VehicleId = vehicle.parse()?;
            let receipt = ledger.exit(&vehicle, Utc::now())?;
            println!(
                "vehicle {vehicle} exited, duration {} min",
                receipt.duration_min
            );
        }
        Command::Stats { zone } => match zone {
            Some(zone) => {
                for stats in ledger.stats(Some(&Zone::new(zone)))? {
                    println!(
                        "zone {}: total {} occupied {} available {}",
                        stats.zone, stats.total, stats.occupied, stats.available
                    );
                }
            }
            None => {
                let dash = ledger.dashboard()?;
                for stats in &dash.zones {
                    println!(
                        "zone {}: total {} occupied {} available {}",
                        stats.zone, stats.total, stats.occupied, stats.available
                    );
                }
                println!("distinct vehicles seen: {}", dash.distinct_vehicles);
            }
        },
        Command::Active => {
            for session in ledger.active_sessions()? {
                println!(
                    "{} in slot {} (zone {}) since {}",
                    session.vehicle, session.slot_id, session.zone, session.entry_time
                );
            }
        }
        Command::History { vehicle, date } => {
            let vehicle = vehicle.map(|v| v.parse::<VehicleId>()).transpose()?;
            let records = ledger.history(vehicle.as_ref(), date)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Purge { days } => {
            let days = days.unwrap_or_else(|| config.history_days());
            let deleted = ledger.purge_history(days, Utc::now())?;
            println!("purged {deleted} closed history record(s) older than {days} day(s)");
        }
        Command::Orphans => {
            let report = ledger.find_orphans()?;
            if report.is_empty() {
                println!("no orphans found");
            } else {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Reset { force } => {
            if !force {
                anyhow::bail!("reset clears all data; re-run with --force to confirm");
            }
            ledger.reset_all()?;
            println!("system reset complete");
        }
        Command::Forget { vehicle } => {
            let vehicle: VehicleId = vehicle.parse()?;
            ledger.delete_vehicle_data(&vehicle)?;
            println!("all data for vehicle {vehicle} deleted");
        }
        Command::User { action } => match action {
            UserCommand::Add {
                username,
                password,
                role,
            } => {
                let role: Role = role.parse().expect("infallible");
                if users.create_user(&username, &password, role)? {
                    println!("user {username} created with role {}", role.as_str());
                } else {
                    anyhow::bail!("user {username} already exists");
                }
            }
            UserCommand::Passwd {
                username,
                old_password,
                new_password,
            } => {
                if users.change_password(&username, &old_password, &new_password)? {
                    println!("password updated for {username}");
                } else {
                    anyhow::bail!("current password rejected for {username}");
                }
            }
            UserCommand::Rm { username } => {
                if users.delete_user(&username)? {
                    println!("user {username} deleted");
                } else {
                    anyhow::bail!("user {username} cannot be deleted");
                }
            }
        },
    }

    Ok(())
}
