//! Community CLI - operator tools for device routing and WebView sessions.
//!
//! # Usage
//!
//! ```bash
//! # What would the edge do for an iPhone on the desktop host?
//! community-cli redirect --host www.community.com/posts?page=2 \
//!     --user-agent "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"
//!
//! # Script the native shell injects to seed a WebView session
//! community-cli inject-script --token abc --user-id 5
//! ```
//!
//! # Commands
//!
//! - `redirect` - Evaluate the edge redirect policy
//! - `inject-script` - Print the WebView session seeding script

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "community-cli")]
#[command(author, version, about = "Community session and routing tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the device redirect policy for a request
    Redirect {
        /// Host header, optionally followed by a path and query
        #[arg(long)]
        host: String,

        /// User agent of the visitor
        #[arg(short, long)]
        user_agent: Option<String>,

        /// Request comes from the native shell's WebView
        #[arg(long)]
        in_app: bool,

        /// Scheme for the redirect target
        #[arg(long, default_value = "https")]
        scheme: String,
    },
    /// Print the script that seeds a WebView with a session
    InjectScript {
        /// Access token to replicate
        #[arg(short, long)]
        token: String,

        /// Numeric user ID
        #[arg(short, long)]
        user_id: Option<i64>,

        /// Cookie domain (default: `COMMUNITY_COOKIE_DOMAIN`)
        #[arg(long)]
        cookie_domain: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "community_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Redirect {
            host,
            user_agent,
            in_app,
            scheme,
        } => commands::redirect::evaluate(&host, user_agent.as_deref(), in_app, &scheme),
        Commands::InjectScript {
            token,
            user_id,
            cookie_domain,
        } => commands::inject::print_script(&token, user_id, cookie_domain),
    }
}
