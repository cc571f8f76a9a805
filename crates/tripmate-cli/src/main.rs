//! Tripmate CLI - chat with the trip assistant and inspect the local store.
//!
//! This is the entry point for the `tripmate` binary.

mod chat;
mod doc;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tripmate_auth::{AuthProvider, TokenAuthProvider, User};
use tripmate_chat::{ChatClient, ChatConfig};
use tripmate_core::SessionId;
use tripmate_store::{RocksStore, StoreConfig};

use doc::DocCommand;

/// Tripmate CLI - chat with the trip assistant and inspect the local store.
#[derive(Parser, Debug)]
#[command(name = "tripmate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ID token of the signed-in user.
    #[arg(long, env = "TRIPMATE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Chat backend URL.
    #[arg(long, env = "TRIPMATE_CHAT_URL", default_value = "http://localhost:8000")]
    chat_url: String,

    /// Directory of the local document store.
    #[arg(long, env = "TRIPMATE_DATA_DIR", default_value = "./tripmate-data")]
    data_dir: PathBuf,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with the trip assistant.
    Chat {
        /// Continue an existing chat session.
        #[arg(long)]
        session: Option<SessionId>,

        /// Use the single-shot endpoint instead of streaming.
        #[arg(long, default_value = "false")]
        single_shot: bool,
    },

    /// List your chat sessions.
    Sessions,

    /// Read and write documents in the local store.
    Doc {
        #[command(subcommand)]
        command: DocCommand,
    },
}

/// The signed-in user and a bearer token for them.
struct Credentials {
    provider: TokenAuthProvider,
    user: User,
}

impl Credentials {
    fn sign_in(token: Option<String>) -> anyhow::Result<Self> {
        let token = token.context("no ID token; pass --token or set TRIPMATE_TOKEN")?;
        let provider = TokenAuthProvider::from_token(token)?;
        let user = provider
            .current_user()
            .context("token did not sign anyone in")?;
        tracing::debug!(uid = %user.uid, "Signed in");
        Ok(Self { provider, user })
    }

    /// A fresh bearer token, failing once the token has expired.
    async fn bearer(&self) -> anyhow::Result<String> {
        Ok(self.provider.id_token(&self.user).await?)
    }

    /// The signed-in user.
    const fn user(&self) -> &User {
        &self.user
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.debug {
        "warn,tripmate=debug"
    } else {
        "warn,tripmate=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Chat {
            session,
            single_shot,
        } => {
            let credentials = Credentials::sign_in(args.token)?;
            let mut config = ChatConfig::new(args.chat_url);
            if single_shot {
                config = config.single_shot();
            }
            chat::run(ChatClient::new(config)?, &credentials, session).await
        }
        Command::Sessions => {
            let credentials = Credentials::sign_in(args.token)?;
            let client = ChatClient::new(ChatConfig::new(args.chat_url))?;
            list_sessions(&client, &credentials).await
        }
        Command::Doc { command } => {
            let config = StoreConfig::new(args.data_dir);
            let store = RocksStore::from_config(&config)
                .with_context(|| format!("opening {}", config.data_dir().display()))?;
            doc::run(&store, command)
        }
    }
}

async fn list_sessions(client: &ChatClient, credentials: &Credentials) -> anyhow::Result<()> {
    let token = credentials.bearer().await?;
    let sessions = client
        .list_user_sessions(&token, &credentials.user().uid)
        .await?;

    if sessions.is_empty() {
        println!("No chat sessions.");
    }
    for session in sessions {
        println!(
            "{}  {}  {}",
            session.session_id,
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.title
        );
    }
    Ok(())
}
