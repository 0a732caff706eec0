//! CLI module for the frontdesk command-line interface.
//!
//! Provides subcommands for talking to a running frontdesk server:
//! - `status` - Show server health and the doctor roster
//! - `doctors list` - List all doctors
//! - `slots <doctor> <date>` - Show bookable start times
//! - `config check` - Validate configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "frontdesk")]
#[command(author, version, about = "Hospital front-desk booking service", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "frontdesk.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to (default: http://localhost:8080)
    #[arg(long, env = "FRONTDESK_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show server status and who is on duty
    Status,

    /// Doctor commands
    #[command(subcommand)]
    Doctors(DoctorsCommands),

    /// Show bookable slots of a doctor on a date
    Slots {
        /// Doctor name or ID
        doctor: String,
        /// Date as YYYY-MM-DD
        date: String,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum DoctorsCommands {
    /// List all doctors
    List,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

// ============================================================================
// API Response Types
// ============================================================================

/// Doctor from /api/doctors
#[derive(Debug, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialization: String,
    pub is_on_duty: bool,
}

/// Roster snapshot from /api/doctors/status
#[derive(Debug, Deserialize)]
pub struct Roster {
    pub doctors: Vec<RosterEntry>,
    pub refreshed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub specialization: String,
    pub on_duty: bool,
    pub login_state: String,
    pub last_activity: Option<String>,
}

/// Slots from /api/doctors/:id/slots
#[derive(Debug, Deserialize)]
pub struct Slots {
    pub date: String,
    pub day_of_week: String,
    pub slots: Vec<String>,
}

/// API error response
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

// ============================================================================
// CLI Command Handlers
// ============================================================================

fn create_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

/// Turn a non-success response into an error with the server's message
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(err) => anyhow::bail!("Server returned {} ({}): {}", status, err.error.code, err.error.message),
        Err(_) => anyhow::bail!("Server returned error {}: {}", status, body),
    }
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Status) => cmd_status(cli).await,
        Some(Commands::Doctors(DoctorsCommands::List)) => cmd_doctors_list(cli).await,
        Some(Commands::Slots { doctor, date }) => cmd_slots(cli, doctor, date).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli).await,
        None => {
            // No subcommand means start the server - this is handled in main.rs
            Ok(())
        }
    }
}

/// Display server health and the roster
async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = create_client()?;
    let base_url = &cli.api_url;

    println!("Connecting to {}...", base_url);

    let health = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .context("Failed to connect to server. Is frontdesk running?")?;
    let healthy = health.status().is_success();

    let roster: Roster = check_response(
        client
            .get(format!("{}/api/doctors/status", base_url))
            .send()
            .await
            .context("Failed to fetch doctor roster")?,
    )
    .await?
    .json()
    .await
    .context("Failed to parse roster response")?;

    println!();
    println!("=== Frontdesk Server Status ===");
    println!();
    println!(
        "Status:     {} {}",
        if healthy { "[OK]" } else { "[!!]" },
        if healthy { "Healthy" } else { "Unhealthy" }
    );
    if let Some(refreshed_at) = &roster.refreshed_at {
        println!("Roster at:  {}", refreshed_at);
    }

    println!();
    if roster.doctors.is_empty() {
        println!("No doctors registered.");
        return Ok(());
    }

    println!(
        "{:<24}  {:<18}  {:<8}  {:<10}  {}",
        "DOCTOR", "SPECIALIZATION", "DUTY", "LOGIN", "LAST ACTIVITY"
    );
    println!("{}", "-".repeat(84));
    for entry in roster.doctors {
        println!(
            "{:<24}  {:<18}  {:<8}  {:<10}  {}",
            truncate(&entry.name, 24),
            truncate(&entry.specialization, 18),
            if entry.on_duty { "on" } else { "off" },
            entry.login_state,
            entry.last_activity.as_deref().unwrap_or("-")
        );
    }
    println!();
    Ok(())
}

async fn fetch_doctors(client: &Client, base_url: &str) -> Result<Vec<Doctor>> {
    check_response(
        client
            .get(format!("{}/api/doctors", base_url))
            .send()
            .await
            .context("Failed to connect to server")?,
    )
    .await?
    .json()
    .await
    .context("Failed to parse doctors response")
}

/// List all doctors
async fn cmd_doctors_list(cli: &Cli) -> Result<()> {
    let client = create_client()?;
    let doctors = fetch_doctors(&client, &cli.api_url).await?;

    if doctors.is_empty() {
        println!("No doctors found.");
        return Ok(());
    }

    println!();
    println!("{:<36}  {:<24}  {:<18}  {:<6}", "ID", "NAME", "SPECIALIZATION", "DUTY");
    println!("{}", "-".repeat(90));
    for doctor in doctors {
        println!(
            "{:<36}  {:<24}  {:<18}  {:<6}",
            doctor.id,
            truncate(&doctor.name, 24),
            truncate(&doctor.specialization, 18),
            if doctor.is_on_duty { "on" } else { "off" }
        );
    }
    println!();
    Ok(())
}

/// Resolve a doctor by ID or by case-insensitive name
async fn find_doctor(client: &Client, base_url: &str, identifier: &str) -> Result<Doctor> {
    let doctors = fetch_doctors(client, base_url).await?;
    doctors
        .into_iter()
        .find(|d| d.id == identifier || d.name.eq_ignore_ascii_case(identifier))
        .with_context(|| format!("Doctor not found: {}", identifier))
}

/// Show bookable slots
async fn cmd_slots(cli: &Cli, doctor: &str, date: &str) -> Result<()> {
    let client = create_client()?;
    let doctor = find_doctor(&client, &cli.api_url, doctor).await?;

    let slots: Slots = check_response(
        client
            .get(format!("{}/api/doctors/{}/slots", cli.api_url, doctor.id))
            .query(&[("date", date)])
            .send()
            .await
            .context("Failed to connect to server")?,
    )
    .await?
    .json()
    .await
    .context("Failed to parse slots response")?;

    println!();
    println!("Dr. {} ({}) on {} {}", doctor.name, doctor.specialization, slots.day_of_week, slots.date);
    println!();
    if slots.slots.is_empty() {
        println!("No free slots.");
    } else {
        for chunk in slots.slots.chunks(8) {
            println!("  {}", chunk.join("  "));
        }
    }
    println!();
    Ok(())
}

/// Validate the configuration file
async fn cmd_config_check(cli: &Cli) -> Result<()> {
    use crate::config::Config;

    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("[!!] Configuration file not found: {}", config_path.display());
        println!();
        println!("A default configuration will be used when starting the server.");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("=== Configuration Summary ===");
            println!();
            println!("Server:");
            println!("  Host:         {}", config.server.host);
            println!("  API Port:     {}", config.server.api_port);
            println!("  Data Dir:     {}", config.server.data_dir.display());
            println!("  Database:     {}", config.database_path().display());
            println!();
            println!("Auth:");
            println!("  Admin:        {}", config.auth.admin_username);
            println!("  Session TTL:  {}h", config.auth.session_ttl_hours);
            println!();
            println!("Booking:");
            println!("  Roster every: {}s", config.booking.roster_refresh_secs);
            println!(
                "  Sample data:  {}",
                if config.booking.seed_sample_data {
                    "Enabled"
                } else {
                    "Disabled"
                }
            );
            println!();
            println!("Logging:");
            println!("  Level:        {}", config.logging.level);

            if config.auth.admin_password == "admin123" {
                println!();
                println!("[!!] The admin password is the default one. Change it before going live.");
            }
            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            Err(e)
        }
    }
}

/// Truncate a string for table display
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Alice Smith", 24), "Alice Smith");
        assert_eq!(truncate("General Medicine Department", 18), "General Medicin...");
    }

    #[test]
    fn test_no_subcommand_runs_server() {
        let cli = Cli::try_parse_from(["frontdesk"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("frontdesk.toml"));
    }

    #[test]
    fn test_slots_subcommand() {
        let cli = Cli::try_parse_from(["frontdesk", "slots", "Alice Smith", "2025-03-03"]).unwrap();
        match cli.command {
            Some(Commands::Slots { doctor, date }) => {
                assert_eq!(doctor, "Alice Smith");
                assert_eq!(date, "2025-03-03");
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["frontdesk", "doctors", "list"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Doctors(DoctorsCommands::List))));
    }
}
