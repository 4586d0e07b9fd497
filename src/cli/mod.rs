//! Command-line interface parsing and dispatch.

use std::error::Error;
use std::io::Write;

use clap::{Parser, Subcommand};

use crate::auth::{authorization_url, fetch_profile, random_state, verify_token, SessionManager};
use crate::core::config::Config;
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "surcor")]
#[command(about = "A terminal chat interface with streaming AI conversations and Drive context")]
#[command(
    long_about = "Surcor is a full-screen terminal chat interface for streaming AI \
conversations. Typing @ in the composer mentions one of your Google Drive files or \
workspace tabs and attaches it as context for the request.\n\n\
Authentication:\n\
  Use 'surcor auth' to store a Google access token in your system keyring.\n\
  The chat endpoint itself is configured through environment variables.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    API key for the chat endpoint (required for chat)\n\
  OPENAI_BASE_URL   Custom API base URL (optional)\n\
  GOOGLE_CLIENT_ID  OAuth client id used when printing the consent URL\n\n\
Controls:\n\
  Type              Enter your message; @ mentions a file as context\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a line break\n\
  Esc               Close the mention menu, or stop a streaming response\n\
  F2 / F3           Choose model / task\n\
  Up/Down/Mouse     Scroll through chat history\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Enable transcript logging to the specified file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,

    /// Override the chat completions base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Store a Google access token for Drive context
    Auth,
    /// Clear the stored Google session
    Deauth,
    /// Show session status and profile
    Status,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(args.model, args.log, args.base_url).await,
        Commands::Auth => interactive_auth().await,
        Commands::Deauth => {
            let manager = SessionManager::new();
            if manager.clear_token()? {
                println!("Google session cleared.");
            } else {
                println!("No stored Google session.");
            }
            Ok(())
        }
        Commands::Status => print_status().await,
    }
}

async fn interactive_auth() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let client_id = config
        .google_client_id
        .clone()
        .or_else(|| std::env::var("GOOGLE_CLIENT_ID").ok());

    match client_id {
        Some(client_id) => {
            let state = random_state()?;
            let url = authorization_url(&client_id, &state)?;
            println!("Open this URL in a browser and complete the consent flow:");
            println!("  {url}");
        }
        None => {
            println!(
                "No OAuth client id configured (set GOOGLE_CLIENT_ID or \
                 google_client_id in the config file) — skipping consent URL."
            );
        }
    }

    print!("Paste a Google OAuth access token: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let token = line.trim();
    if token.is_empty() {
        return Err("no token provided".into());
    }

    let client = reqwest::Client::new();
    let info = verify_token(&client, token).await?;
    if !info.is_live() {
        return Err("the token is expired or invalid".into());
    }

    let manager = SessionManager::new();
    manager.store_token(token)?;
    match info.expires_in_seconds() {
        Some(seconds) => println!("Token stored. It expires in about {} minutes.", seconds / 60),
        None => println!("Token stored."),
    }
    Ok(())
}

async fn print_status() -> Result<(), Box<dyn Error>> {
    let client = reqwest::Client::new();
    let manager = SessionManager::new();
    let status = manager.check_status(&client).await;

    if !status.authenticated {
        println!("Not authenticated. Run `surcor auth` to sign in.");
        return Ok(());
    }

    println!("Authenticated.");
    if let Some(token) = &status.access_token {
        match fetch_profile(&client, token).await {
            Ok(profile) => {
                println!("  Name:  {}", profile.display_name());
                if let Some(email) = &profile.email {
                    println!("  Email: {email}");
                }
            }
            Err(err) if err.is_unauthorized() => {
                println!("  Profile unavailable — session expired, run `surcor auth` again.");
            }
            Err(err) => println!("  Profile unavailable: {err}"),
        }
    }
    Ok(())
}
