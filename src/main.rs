use anyhow::{Context, Result};
use bakery_client::api::{ApiClient, ApiError, Endpoint};
use bakery_client::config::{Config, Environment};
use bakery_client::local_state::LocalState;
use bakery_client::services::{
    auth, custom_order, end_of_day, freezer, holiday, production, report, stock, users, DateRange,
};
use bakery_client::session::SessionStore;
use bakery_client::storage::{FileStore, KeyValueStore, MemoryStore};
use bakery_client::utils::app_paths::AppPaths;
use bakery_client::utils::logging;
use chrono::{Duration, Local, NaiveDate};
use clap::{ArgAction, Parser, Subcommand};
use crossterm::style::Stylize;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

mod table_display;

use table_display::{display_payload, OutputFormat};

/// Weather older than this is not sent along with production guesses
const WEATHER_MAX_AGE_MINUTES: i64 = 60;

#[derive(Parser)]
#[command(
    name = "bakery",
    version,
    about = "Stock, end-of-day, freezer and order management for the bakery backend"
)]
struct Cli {
    /// Backend to talk to (overrides config and BAKERY_ENV)
    #[arg(long, global = true)]
    env: Option<Environment>,

    /// Explicit backend base URL (overrides everything else)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Keep the session in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Output format for results
    #[arg(short = 'f', long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// More log output (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect or write the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
    #[command(flatten)]
    App(AppCommand),
}

/// Commands that need the state store and the API client
#[derive(Subcommand)]
enum AppCommand {
    /// Sign in and store the session token
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long, env = "BAKERY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        username: String,
        #[arg(long, env = "BAKERY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the current session and user
    Whoami,
    /// Continue as another user (administrators)
    SwitchUser { user_id: i64 },
    /// Change your password
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// List users
    Users,
    /// Delete a user
    DeleteUser { id: i64 },
    #[command(subcommand)]
    Stock(StockCommand),
    /// End-of-day counts
    #[command(subcommand)]
    Eod(EodCommand),
    #[command(subcommand)]
    Freezer(FreezerCommand),
    #[command(subcommand)]
    Holiday(HolidayCommand),
    /// Custom orders
    #[command(subcommand)]
    Order(OrderCommand),
    /// Production guessing
    #[command(subcommand)]
    Guess(GuessCommand),
    #[command(subcommand)]
    Report(ReportCommand),
    /// Call any endpoint with a raw JSON body
    Call {
        endpoint: Endpoint,
        /// JSON body, `{}` when omitted
        body: Option<String>,
    },
    /// Show or change the stored UI language
    Language { code: Option<String> },
}

#[derive(Subcommand)]
enum StockCommand {
    /// Products available for counting
    Params,
    /// Recorded stock
    Data(RangeArgs),
    /// Record stock counts as PRODUCT_ID=QTY pairs
    Add {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(required = true, value_parser = parse_pair)]
        items: Vec<(i64, f64)>,
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Subcommand)]
enum EodCommand {
    List(RangeArgs),
    /// Submit closing counts as PRODUCT_ID=REMAINING[:WASTED]
    Add {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(required = true, value_parser = parse_eod_line)]
        items: Vec<end_of_day::EndOfDayLine>,
    },
}

#[derive(Subcommand)]
enum FreezerCommand {
    List,
    Add {
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        min: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        max: Option<f64>,
    },
    Delete { id: i64 },
    /// Temperature log for one freezer
    Temps {
        freezer_id: i64,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Record a temperature reading
    LogTemp {
        freezer_id: i64,
        #[arg(allow_hyphen_values = true)]
        temperature: f64,
    },
}

#[derive(Subcommand)]
enum HolidayCommand {
    List,
    Add {
        date: NaiveDate,
        #[arg(long)]
        name: Option<String>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum OrderCommand {
    List(RangeArgs),
    /// Order details as JSON (or @file.json)
    Add { details: String },
    Update { id: i64, details: String },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum GuessCommand {
    /// Suggested quantities for a day (default tomorrow)
    Data { date: Option<NaiveDate> },
    Plan { date: Option<NaiveDate> },
}

#[derive(Subcommand)]
enum ReportCommand {
    Data {
        kind: report::ReportKind,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Render the report on the server and save the PDF
    Pdf {
        kind: report::ReportKind,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write a commented default config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print config, state and log locations
    Path,
}

#[derive(clap::Args, Clone, Copy)]
struct RangeArgs {
    /// First day (default: 7 days ago)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day (default: today)
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    fn resolve(self) -> Result<DateRange> {
        let today = Local::now().date_naive();
        let to = self.to.unwrap_or(today);
        let from = self.from.unwrap_or(to - Duration::days(7));
        DateRange::new(from, to).ok_or_else(|| anyhow::anyhow!("--from {} is after --to {}", from, to))
    }
}

fn parse_pair(s: &str) -> Result<(i64, f64), String> {
    let (id, qty) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PRODUCT_ID=QTY, got '{}'", s))?;
    let id = id.trim().parse().map_err(|_| format!("bad product id in '{}'", s))?;
    let qty = qty.trim().parse().map_err(|_| format!("bad quantity in '{}'", s))?;
    Ok((id, qty))
}

fn parse_eod_line(s: &str) -> Result<end_of_day::EndOfDayLine, String> {
    let (id, counts) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PRODUCT_ID=REMAINING[:WASTED], got '{}'", s))?;
    let (remaining, wasted) = counts.split_once(':').unwrap_or((counts, "0"));
    Ok(end_of_day::EndOfDayLine {
        product_id: id.trim().parse().map_err(|_| format!("bad product id in '{}'", s))?,
        remaining: remaining.trim().parse().map_err(|_| format!("bad remaining count in '{}'", s))?,
        wasted: wasted.trim().parse().map_err(|_| format!("bad wasted count in '{}'", s))?,
    })
}

/// Inline JSON or `@path` to a JSON file
fn read_json_arg(arg: &str) -> Result<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("Body is not valid JSON")
}

fn read_password(provided: Option<String>) -> Result<String> {
    if let Some(password) = provided {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    if config.storage.ephemeral {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = match &config.storage.state_file {
        Some(path) => path.clone(),
        None => AppPaths::state_file().context("Cannot locate data directory")?,
    };
    let store = FileStore::open(&path).with_context(|| format!("Cannot open {}", path.display()))?;
    Ok(Arc::new(store))
}

struct App {
    config: Config,
    client: ApiClient,
    local: LocalState,
    format: OutputFormat,
}

impl App {
    fn show(&self, payload: &Value) -> Result<()> {
        display_payload(payload, self.format, self.config.display.show_row_count)
    }

    fn show_typed<T: serde::Serialize>(&self, payload: &T) -> Result<()> {
        self.show(&serde_json::to_value(payload)?)
    }

    fn done(&self, what: &str) {
        if self.format != OutputFormat::Json {
            println!("{}", what.green());
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(env) = cli.env {
        config.api.environment = env;
        // An explicit environment on the command line beats a configured URL
        config.api.base_url = None;
    }
    if let Some(url) = cli.base_url {
        config.api.base_url = Some(url);
    }
    if cli.ephemeral {
        config.storage.ephemeral = true;
    }

    if let Some(path) = logging::init_tracing(&config.logging, cli.verbose) {
        eprintln!("Logging to {}", path.display());
    }

    let command = match cli.command {
        Command::Config(cmd) => return run_config(cmd, &config),
        Command::App(command) => command,
    };

    let store = open_store(&config)?;
    let session = SessionStore::new(Arc::clone(&store));
    let client = ApiClient::from_config(&config, session)?;
    let format = cli
        .format
        .or_else(|| config.display.default_format.parse().ok())
        .unwrap_or(OutputFormat::Table);
    let app = App {
        local: LocalState::new(store),
        config,
        client,
        format,
    };

    let client = &app.client;
    let today = Local::now().date_naive();

    match command {
        AppCommand::Login { username, password } => {
            let credentials = auth::Credentials::new(username, read_password(password)?);
            let signed_in = auth::login(client, &credentials).await?;
            app.done(if signed_in.admin { "Logged in (administrator)" } else { "Logged in" });
        }
        AppCommand::Register { username, password, name, email } => {
            let registration = auth::Registration {
                username,
                password: read_password(password)?,
                name,
                email,
            };
            match auth::register(client, &registration).await? {
                Some(_) => app.done("Account created, you are logged in"),
                None => app.done("Account created, log in to continue"),
            }
        }
        AppCommand::Logout => {
            auth::logout(client)?;
            app.done("Logged out");
        }
        AppCommand::Whoami => {
            let session = client.session();
            if !session.is_authenticated()? {
                println!("{}", "Not logged in".yellow());
                return Ok(());
            }
            println!("Backend: {}", client.endpoints().base_url());
            println!("Administrator: {}", if session.is_admin()? { "yes" } else { "no" });
            app.show_typed(&users::current_user(client).await?)?;
        }
        AppCommand::SwitchUser { user_id } => {
            auth::switch_user(client, user_id).await?;
            app.done(&format!("Now acting as user {}", user_id));
        }
        AppCommand::ChangePassword { current, new } => {
            let change = auth::PasswordChange {
                current_password: current,
                new_password: new,
            };
            auth::change_password(client, &change).await?;
            app.done("Password changed");
        }
        AppCommand::Users => app.show_typed(&users::list_users(client).await?)?,
        AppCommand::DeleteUser { id } => {
            users::delete_user(client, id).await?;
            app.done("User deleted");
        }
        AppCommand::Stock(cmd) => match cmd {
            StockCommand::Params => app.show_typed(&stock::stock_params(client).await?.products)?,
            StockCommand::Data(range) => {
                app.show_typed(&stock::stock_data(client, &range.resolve()?).await?)?
            }
            StockCommand::Add { date, items, note } => {
                let lines = items
                    .into_iter()
                    .map(|(product_id, quantity)| stock::StockLine { product_id, quantity })
                    .collect();
                let mut entry =
                    stock::StockEntry::new(date.unwrap_or(today), lines).map_err(anyhow::Error::msg)?;
                entry.note = note;
                stock::add_stock(client, &entry).await?;
                app.done(&format!("Recorded {} stock lines", entry.items.len()));
            }
        },
        AppCommand::Eod(cmd) => match cmd {
            EodCommand::List(range) => {
                app.show_typed(&end_of_day::end_of_day_list(client, &range.resolve()?).await?)?
            }
            EodCommand::Add { date, items } => {
                let entry = end_of_day::EndOfDayEntry {
                    date: date.unwrap_or(today),
                    items,
                };
                end_of_day::submit_end_of_day(client, &entry).await?;
                app.done("End of day submitted");
            }
        },
        AppCommand::Freezer(cmd) => match cmd {
            FreezerCommand::List => app.show_typed(&freezer::list_freezers(client).await?)?,
            FreezerCommand::Add { name, min, max } => {
                let new = freezer::NewFreezer {
                    name,
                    min_temperature: min,
                    max_temperature: max,
                };
                freezer::add_freezer(client, &new).await?;
                app.done("Freezer added");
            }
            FreezerCommand::Delete { id } => {
                freezer::delete_freezer(client, id).await?;
                app.done("Freezer deleted");
            }
            FreezerCommand::Temps { freezer_id, range } => {
                let query = freezer::TemperatureQuery {
                    freezer_id,
                    range: range.resolve()?,
                };
                app.show_typed(&freezer::temperature_log(client, &query).await?)?;
            }
            FreezerCommand::LogTemp { freezer_id, temperature } => {
                let reading =
                    freezer::TemperatureReading::new(freezer_id, temperature).at(app.local.location()?.as_ref());
                freezer::log_temperature(client, &reading).await?;

                let limits = freezer::list_freezers(client)
                    .await
                    .ok()
                    .and_then(|all| all.into_iter().find(|f| f.id == freezer_id));
                match limits {
                    Some(f) if f.is_out_of_range(temperature) => println!(
                        "{}",
                        format!("Warning: {:.1}° is outside the limits for {}", temperature, f.name).red()
                    ),
                    _ => app.done("Temperature logged"),
                }
            }
        },
        AppCommand::Holiday(cmd) => match cmd {
            HolidayCommand::List => app.show_typed(&holiday::list_holidays(client).await?)?,
            HolidayCommand::Add { date, name } => {
                holiday::add_holiday(client, &holiday::NewHoliday { date, name }).await?;
                app.done("Holiday added");
            }
            HolidayCommand::Delete { id } => {
                holiday::delete_holiday(client, id).await?;
                app.done("Holiday deleted");
            }
        },
        AppCommand::Order(cmd) => match cmd {
            OrderCommand::List(range) => {
                app.show_typed(&custom_order::list_orders(client, &range.resolve()?).await?)?
            }
            OrderCommand::Add { details } => {
                let details: custom_order::OrderDetails = serde_json::from_value(read_json_arg(&details)?)
                    .context("Order details do not match the expected shape")?;
                details.validate().map_err(anyhow::Error::msg)?;
                custom_order::add_order(client, &details).await?;
                app.done("Order added");
            }
            OrderCommand::Update { id, details } => {
                let details: custom_order::OrderDetails = serde_json::from_value(read_json_arg(&details)?)
                    .context("Order details do not match the expected shape")?;
                details.validate().map_err(anyhow::Error::msg)?;
                custom_order::update_order(client, id, &details).await?;
                app.done("Order updated");
            }
            OrderCommand::Delete { id } => {
                custom_order::delete_order(client, id).await?;
                app.done("Order deleted");
            }
        },
        AppCommand::Guess(cmd) => {
            let weather = app
                .local
                .fresh_weather(Duration::minutes(WEATHER_MAX_AGE_MINUTES))?
                .map(|snapshot| snapshot.data);
            match cmd {
                GuessCommand::Data { date } => {
                    let query = production::GuessQuery::for_date(date.unwrap_or(today + Duration::days(1)))
                        .with_weather(weather);
                    app.show(&production::guessing_data(client, &query).await?)?;
                }
                GuessCommand::Plan { date } => {
                    let query = production::GuessQuery::for_date(date.unwrap_or(today + Duration::days(1)))
                        .with_weather(weather);
                    app.show(&production::production_plan(client, &query).await?)?;
                }
            }
        }
        AppCommand::Report(cmd) => match cmd {
            ReportCommand::Data { kind, range } => {
                let query = report::ReportQuery {
                    report_type: kind,
                    range: range.resolve()?,
                };
                app.show(&report::report_data(client, &query).await?)?;
            }
            ReportCommand::Pdf { kind, range, output } => {
                let query = report::ReportQuery {
                    report_type: kind,
                    range: range.resolve()?,
                };
                let bytes = report::download_report_pdf(client, &query).await?;
                let output = output.unwrap_or_else(|| {
                    PathBuf::from(format!(
                        "{}_{}_{}.pdf",
                        serde_json::to_value(kind)
                            .ok()
                            .and_then(|v| v.as_str().map(str::to_string))
                            .unwrap_or_else(|| "report".to_string()),
                        query.range.start_date,
                        query.range.end_date
                    ))
                });
                std::fs::write(&output, &bytes).with_context(|| format!("Cannot write {}", output.display()))?;
                app.done(&format!("Saved {} ({} bytes)", output.display(), bytes.len()));
            }
        },
        AppCommand::Call { endpoint, body } => {
            let body = match body {
                Some(raw) => read_json_arg(&raw)?,
                None => Value::Object(Default::default()),
            };
            app.show(&client.call_value(endpoint, &body).await?)?;
        }
        AppCommand::Language { code } => match code {
            Some(code) => {
                app.local.set_language(&code)?;
                app.done(&format!("Language set to {}", code.trim()));
            }
            None => println!("{}", app.local.language()?),
        },
    }

    Ok(())
}

fn run_config(cmd: ConfigCommand, config: &Config) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            println!("# effective base URL: {}", config.api.resolved_base_url());
        }
        ConfigCommand::Init { force } => {
            let path = Config::get_config_path()?;
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, Config::create_default_with_comments())?;
            println!("{}", format!("Wrote {}", path.display()).green());
        }
        ConfigCommand::Path => {
            println!("config: {}", Config::get_config_path()?.display());
            match &config.storage.state_file {
                Some(path) => println!("state:  {}", path.display()),
                None => println!("state:  {}", AppPaths::state_file()?.display()),
            }
            println!("logs:   {}", AppPaths::log_dir()?.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<ApiError>() {
            Some(api_err) => {
                eprintln!("{}", api_err.user_message().red());
                tracing::debug!(target: "api", "{:#}", err);
            }
            None => eprintln!("{}", format!("Error: {:#}", err).red()),
        }
        std::process::exit(1);
    }
}
