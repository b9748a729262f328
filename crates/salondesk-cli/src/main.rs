//! SalonDesk CLI - manage a business's locations from the terminal.
//!
//! Reads go through the location cache, mutations go straight to the
//! backend and invalidate the cached list.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use salondesk_core::{
    ApiClient, Config, FetchOptions, Location, LocationCache, LocationRequest, Session,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "salondesk", version, about = "Manage SalonDesk business locations")]
struct Cli {
    /// Backend URL (overrides config and SALONDESK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the access token
    Login {
        #[arg(long, env = "SALONDESK_EMAIL")]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(long, env = "SALONDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored access token
    Logout,
    /// Show session and configuration
    Status,
    /// Location management
    #[command(subcommand)]
    Locations(LocationsCommand),
}

#[derive(Debug, Subcommand)]
enum LocationsCommand {
    /// List the locations of a business
    List {
        #[arg(long)]
        business: Option<String>,
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
        #[arg(long)]
        json: bool,
        /// Print cache statistics afterwards
        #[arg(long)]
        stats: bool,
    },
    /// Show one location
    Get {
        #[arg(long)]
        business: Option<String>,
        location_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Create a location
    Create {
        #[arg(long)]
        business: Option<String>,
        #[command(flatten)]
        fields: LocationFields,
    },
    /// Update a location; omitted fields keep their current value
    Update {
        #[arg(long)]
        business: Option<String>,
        location_id: String,
        #[command(flatten)]
        fields: LocationChanges,
    },
    /// Delete a location
    Delete {
        #[arg(long)]
        business: Option<String>,
        location_id: String,
    },
}

#[derive(Debug, Args)]
struct LocationFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long = "contact")]
    contact_info: String,
    #[arg(long)]
    timezone: String,
}

impl From<LocationFields> for LocationRequest {
    fn from(fields: LocationFields) -> Self {
        Self {
            name: fields.name,
            address: fields.address,
            city: fields.city,
            contact_info: fields.contact_info,
            timezone: fields.timezone,
        }
    }
}

#[derive(Debug, Args)]
struct LocationChanges {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long = "contact")]
    contact_info: Option<String>,
    #[arg(long)]
    timezone: Option<String>,
}

impl LocationChanges {
    fn apply(self, current: &Location) -> LocationRequest {
        let mut request = LocationRequest::from(current);
        if let Some(name) = self.name {
            request.name = name;
        }
        if let Some(address) = self.address {
            request.address = address;
        }
        if let Some(city) = self.city {
            request.city = city;
        }
        if let Some(contact_info) = self.contact_info {
            request.contact_info = contact_info;
        }
        if let Some(timezone) = self.timezone {
            request.timezone = timezone;
        }
        request
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    let mut session = Session::new(cache_dir);
    if let Err(e) = session.load() {
        warn!(error = %e, "Failed to load session");
    }

    let base_url = cli.api_url.clone().unwrap_or_else(|| config.api_base_url());
    let mut api = ApiClient::new(&base_url)?;
    debug!(base_url = %base_url, "API client configured");

    match cli.command {
        Command::Login { email, password } => {
            login(&api, &mut config, &mut session, email, password).await
        }
        Command::Logout => {
            session.clear()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Status => {
            print_status(&config, &session, &base_url);
            Ok(())
        }
        Command::Locations(command) => {
            match session.token() {
                Some(token) => api.set_token(token.to_string()),
                None => warn!("No valid session, sending requests without a token"),
            }
            let cache = LocationCache::with_settings(api, config.cache.clone());
            run_locations(&cache, &mut config, command).await
        }
    }
}

async fn login(
    api: &ApiClient,
    config: &mut Config,
    session: &mut Session,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = email
        .or_else(|| config.last_email.clone())
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("No email given; pass --email"))?;

    let password = match password {
        Some(p) => p,
        None => rpassword::prompt_password("Password: ")?,
    };

    let data = api
        .authenticate(&email, &password)
        .await
        .context("Login failed")?;
    info!(email = %email, "Logged in");

    session.update(data);
    session.save().context("Failed to save session")?;

    config.last_email = Some(email.clone());
    save_config(config);

    println!("Logged in as {}.", email);
    Ok(())
}

fn print_status(config: &Config, session: &Session, base_url: &str) {
    println!("Backend:  {}", base_url);
    match session.data.as_ref().filter(|_| session.is_valid()) {
        Some(data) => println!(
            "Session:  {} (expires in {} min)",
            data.email,
            data.minutes_until_expiry()
        ),
        None => println!("Session:  not logged in"),
    }
    println!(
        "Business: {}",
        config.last_business_id.as_deref().unwrap_or("none")
    );
}

/// Business to operate on: the flag, else the last one used.
fn resolve_business(flag: Option<String>, config: &mut Config) -> Result<String> {
    let business = flag
        .clone()
        .or_else(|| config.last_business_id.clone())
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("No business ID given; pass --business"))?;

    if flag.is_some() && config.last_business_id.as_deref() != Some(business.as_str()) {
        config.last_business_id = Some(business.clone());
        save_config(config);
    }
    Ok(business)
}

fn save_config(config: &Config) {
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

async fn run_locations(
    cache: &LocationCache<ApiClient>,
    config: &mut Config,
    command: LocationsCommand,
) -> Result<()> {
    match command {
        LocationsCommand::List {
            business,
            refresh,
            json,
            stats,
        } => {
            let business = resolve_business(business, config)?;
            if stats {
                cache.monitor().enable();
            }
            let options = if refresh {
                FetchOptions::refresh()
            } else {
                FetchOptions::default()
            };
            let locations = cache.get_locations(&business, options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&*locations)?);
            } else if locations.is_empty() {
                println!("No locations for business {}.", business);
            } else {
                for location in locations.iter() {
                    println!(
                        "{}  {}  {}  ({})",
                        location.id,
                        location.name,
                        location.display_address(),
                        location.timezone
                    );
                }
            }

            if stats {
                let cache_stats = cache.stats();
                let monitor = cache.monitor().stats();
                eprintln!(
                    "cache: {} entries, {} pending; requests: {}, hits: {}, hit rate: {:.1}%",
                    cache_stats.total_entries,
                    cache_stats.pending_requests,
                    monitor.total_requests,
                    monitor.cache_hits,
                    monitor.cache_hit_rate
                );
            }
            Ok(())
        }
        LocationsCommand::Get {
            business,
            location_id,
            json,
        } => {
            let business = resolve_business(business, config)?;
            let location = cache.get_location(&business, &location_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&location)?);
            } else {
                print_location(&location);
            }
            Ok(())
        }
        LocationsCommand::Create { business, fields } => {
            let business = resolve_business(business, config)?;
            let created = cache
                .create_location(&business, &LocationRequest::from(fields))
                .await?;
            println!("Created location {}.", created.id);
            Ok(())
        }
        LocationsCommand::Update {
            business,
            location_id,
            fields,
        } => {
            let business = resolve_business(business, config)?;
            let current = cache.get_location(&business, &location_id).await?;
            let request = fields.apply(&current);
            let updated = cache
                .update_location(&business, &location_id, &request)
                .await?;
            println!("Updated location {}.", updated.id);
            Ok(())
        }
        LocationsCommand::Delete {
            business,
            location_id,
        } => {
            let business = resolve_business(business, config)?;
            cache.delete_location(&business, &location_id).await?;
            println!("Deleted location {}.", location_id);
            Ok(())
        }
    }
}

fn print_location(location: &Location) {
    println!("{} ({})", location.name, location.id);
    println!("  Address:  {}", location.display_address());
    println!("  Contact:  {}", location.contact_info);
    println!("  Timezone: {}", location.timezone);
    println!(
        "  Updated:  {}",
        location.updated_at.format("%Y-%m-%d %H:%M UTC")
    );
}
