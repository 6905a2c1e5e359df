use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mid::config;
use mid::dialogue::{DialogueEngine, DialogueOptions};
use mid::gateway;
use mid::repl;
use mid::secrets;
use mid::store::rest::RestStore;

#[derive(Parser)]
#[command(name = "mid")]
#[command(about = "A terminal-style personal diary with a natural-language command interpreter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive diary session in this terminal
    Repl {
        /// Diary backend base URL (defaults to the configured backend,
        /// or an in-memory store)
        #[arg(long)]
        backend: Option<String>,
    },

    /// Start the WebSocket gateway
    Gateway {
        /// Port to bind to
        #[arg(short, long, default_value = "7300")]
        port: u16,

        /// Bind address
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,

        /// Auth token (required for non-loopback)
        #[arg(long, env = "MID_TOKEN")]
        token: Option<String>,
    },

    /// Log in to a diary backend and store the auth token
    Login {
        /// Backend base URL (defaults to the configured backend)
        #[arg(long)]
        backend: Option<String>,

        /// Username (prompted when omitted)
        #[arg(long)]
        username: Option<String>,
    },

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Repl { backend } => {
            let mut config = config::load()?;
            if let Some(base) = backend {
                config.backend.mode = "rest".into();
                config.backend.base_url = Some(base);
                config::validate(&config)?;
            }
            let (memories, media) = gateway::build_stores(&config)?;
            let mut engine = DialogueEngine::with_options(
                memories,
                media,
                DialogueOptions {
                    listing_limit: config.diary.listing_limit,
                },
            );
            repl::run(&mut engine).await
        }

        Commands::Gateway { port, bind, token } => {
            let mut config = config::load()?;
            config.gateway.port = port;
            config.gateway.bind = bind;
            gateway::run(config, token).await
        }

        Commands::Login { backend, username } => login(backend, username).await,

        Commands::Status => {
            let config = config::load()?;
            println!("mid v{}", env!("CARGO_PKG_VERSION"));
            println!("backend: {}", config.backend.mode);
            if let Some(base) = &config.backend.base_url {
                println!("base_url: {base}");
            }
            println!(
                "token: {}",
                if config.backend.token.is_some() {
                    "stored"
                } else {
                    "none"
                }
            );
            Ok(())
        }
    }
}

async fn login(backend: Option<String>, username: Option<String>) -> anyhow::Result<()> {
    let config = config::load()?;
    let base = backend.or(config.backend.base_url).ok_or_else(|| {
        anyhow::anyhow!("no backend URL: pass --backend or set backend.base_url in config")
    })?;

    let username = match username {
        Some(u) => u,
        None => prompt_line("Username: ")?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    let token = RestStore::login(&base, &username, &password)
        .await
        .map_err(|e| anyhow::anyhow!("login failed: {e}"))?;

    let path = secrets::store_token(&token)?;
    println!("Logged in. Token stored at {}", path.display());
    Ok(())
}

fn prompt_line(label: &str) -> anyhow::Result<String> {
    use std::io::Write as _;
    print!("{label}");
    std::io::stdout().flush()?;
    let mut value = String::new();
    std::io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}
