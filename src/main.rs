use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use nutrilife::app::App;
use nutrilife::commands::{self, history::HistoryKind, keychain::KeyService, render};
use nutrilife::config::{default_config_path, Settings};
use nutrilife::keychain::{KeychainStore, SecretStore};

#[derive(Parser)]
#[command(name = "nutrilife")]
#[command(about = "AI health scores for food and cosmetic products")]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: <config dir>/nutrilife/config.toml)
    #[arg(long, global = true, env = "NUTRILIFE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a product from its name, ingredient list, or a photo
    Analyze {
        /// Product name or ingredients
        text: Option<String>,

        /// Photo of the product or its label
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Get a lifestyle overhaul plan for the products you use every day
    Overhaul {
        /// Comma- or newline-separated product list
        #[arg(conflicts_with = "file")]
        products: Option<String>,

        /// Read the product list from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Personalized product suggestions based on your history
    Recommend,

    /// Show or clear your history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Sign in, sign up, or sign out
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Manage API keys stored in the OS keychain
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Read or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List past analyses and plans, newest first
    List {
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Show at most this many entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Delete all history
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long, env = "NUTRILIFE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        email: String,
        #[arg(long, env = "NUTRILIFE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Sign in with a Google ID token
    Google {
        #[arg(env = "NUTRILIFE_GOOGLE_ID_TOKEN", hide_env_values = true)]
        id_token: String,
    },
    /// Sign out of this device
    Logout,
    /// Show who is signed in
    Status,
}

#[derive(Subcommand)]
enum KeyAction {
    Set {
        #[arg(value_enum)]
        service: ServiceArg,
        key: String,
    },
    Get {
        #[arg(value_enum)]
        service: ServiceArg,
        /// Print the full key instead of a masked one
        #[arg(long)]
        show: bool,
    },
    Delete {
        #[arg(value_enum)]
        service: ServiceArg,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print one setting, or all of them
    Get { key: Option<String> },
    Set { key: String, value: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Products,
    Overhauls,
}

impl From<KindArg> for HistoryKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Products => HistoryKind::Products,
            KindArg::Overhauls => HistoryKind::Overhauls,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ServiceArg {
    Gemini,
    Firebase,
}

impl From<ServiceArg> for KeyService {
    fn from(service: ServiceArg) -> Self {
        match service {
            ServiceArg::Gemini => KeyService::Gemini,
            ServiceArg::Firebase => KeyService::Firebase,
        }
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

fn notice(note: &Option<String>) {
    if let Some(note) = note {
        eprintln!("\n{}", note);
    }
}

fn prompt_line(label: &str) -> Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn secret_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => prompt_line(label),
    }
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt_line(&format!("{} [y/N] ", question))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    nutrilife::init_logging();
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut settings = Settings::load(&config_path)?;
    let secrets: Arc<dyn SecretStore> = Arc::new(KeychainStore);

    // Key and config commands work without the network stack.
    match &cli.command {
        Commands::Key { action } => return run_key(secrets.as_ref(), action, cli.json),
        Commands::Config { action } => {
            return run_config(&mut settings, &config_path, action, cli.json)
        }
        _ => {}
    }

    let mut app = App::open(settings, config_path, secrets).await?;
    let result = run(&mut app, cli.command, cli.json).await;
    app.shutdown().await;
    result
}

async fn run(app: &mut App, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Analyze { text, image } => {
            let text = text.unwrap_or_default();
            let outcome = commands::analyzer::analyze(app, &text, image.as_deref())
                .await
                .map_err(|e| anyhow!(e))?;
            emit(json, &outcome, |o| render::render_analysis(&o.analysis))?;
            notice(&outcome.notice);
        }
        Commands::Overhaul { products, file } => {
            let products = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read product list {:?}", path))?,
                None => products.unwrap_or_default(),
            };
            let outcome = commands::overhaul::overhaul(app, &products)
                .await
                .map_err(|e| anyhow!(e))?;
            emit(json, &outcome, |o| render::render_overhaul(&o.plan))?;
            notice(&outcome.notice);
        }
        Commands::Recommend => {
            let outcome = commands::recommend::recommend(app)
                .await
                .map_err(|e| anyhow!(e))?;
            emit(json, &outcome, |o| {
                render::render_recommendations(&o.recommendations)
            })?;
            notice(&outcome.notice);
        }
        Commands::History { action } => match action {
            HistoryAction::List { kind, limit } => {
                let items = commands::history::list(app, kind.map(Into::into), limit)
                    .await
                    .map_err(|e| anyhow!(e))?;
                emit(json, &items, |items| render::render_activity(items))?;
            }
            HistoryAction::Clear { yes } => {
                if !yes && !confirm("Delete all of your history?")? {
                    eprintln!("Cancelled.");
                    return Ok(());
                }
                commands::history::clear(app).await.map_err(|e| anyhow!(e))?;
                eprintln!("History cleared.");
            }
        },
        Commands::Auth { action } => match action {
            AuthAction::Login { email, password } => {
                let password = secret_or_prompt(password, "Password: ")?;
                let user = commands::auth::login(app, &email, &password)
                    .await
                    .map_err(|e| anyhow!(e))?;
                emit(json, &user, |u| format!("Signed in as {}\n", u.email))?;
            }
            AuthAction::Signup {
                email,
                password,
                confirm,
            } => {
                let password = secret_or_prompt(password, "Password: ")?;
                let confirm = secret_or_prompt(confirm, "Confirm password: ")?;
                let user = commands::auth::signup(app, &email, &password, &confirm)
                    .await
                    .map_err(|e| anyhow!(e))?;
                emit(json, &user, |u| format!("Account created for {}\n", u.email))?;
            }
            AuthAction::Google { id_token } => {
                let user = commands::auth::google(app, &id_token)
                    .await
                    .map_err(|e| anyhow!(e))?;
                emit(json, &user, |u| format!("Signed in as {}\n", u.email))?;
            }
            AuthAction::Logout => {
                commands::auth::logout(app).await.map_err(|e| anyhow!(e))?;
                eprintln!("Signed out.");
            }
            AuthAction::Status => {
                let status = commands::auth::status(app);
                emit(json, &status, render::render_auth_status)?;
            }
        },
        Commands::Key { .. } | Commands::Config { .. } => {}
    }
    Ok(())
}

fn run_key(secrets: &dyn SecretStore, action: &KeyAction, json: bool) -> Result<()> {
    use commands::keychain::{delete_api_key, get_api_key, mask_secret, set_api_key};

    match action {
        KeyAction::Set { service, key } => {
            set_api_key(secrets, (*service).into(), key).map_err(|e| anyhow!(e))?;
            eprintln!("Saved {} API key.", KeyService::from(*service));
        }
        KeyAction::Get { service, show } => {
            let service = KeyService::from(*service);
            let key = get_api_key(secrets, service).map_err(|e| anyhow!(e))?;
            let shown = key.map(|k| if *show { k } else { mask_secret(&k) });
            emit(json, &shown, |k| match k {
                Some(k) => format!("{}\n", k),
                None => format!("No {} API key stored.\n", service),
            })?;
        }
        KeyAction::Delete { service } => {
            delete_api_key(secrets, (*service).into()).map_err(|e| anyhow!(e))?;
            eprintln!("Deleted {} API key.", KeyService::from(*service));
        }
    }
    Ok(())
}

fn run_config(
    settings: &mut Settings,
    path: &std::path::Path,
    action: &ConfigAction,
    json: bool,
) -> Result<()> {
    use commands::config::{get_setting, list_settings, set_setting};

    match action {
        ConfigAction::Get { key: Some(key) } => {
            let value = get_setting(settings, key).map_err(|e| anyhow!(e))?;
            emit(json, &value, |v| format!("{}\n", v))?;
        }
        ConfigAction::Get { key: None } => {
            let all: serde_json::Map<String, serde_json::Value> = list_settings(settings)
                .into_iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
                .collect();
            emit(json, &all, |all| {
                all.iter()
                    .map(|(k, v)| format!("{} = {}\n", k, v.as_str().unwrap_or_default()))
                    .collect()
            })?;
        }
        ConfigAction::Set { key, value } => {
            set_setting(settings, path, key, value).map_err(|e| anyhow!(e))?;
            eprintln!("Set {} = {}", key, value);
        }
    }
    Ok(())
}
