use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "platform-cli")]
#[command(about = "Command-line client for the tenant platform API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Access token for authenticated commands.
    #[arg(short, long, env = "PLATFORM_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Service health
    Health,
    /// Register a new organization and its admin user
    Register {
        #[arg(long)]
        organization: String,
        #[arg(long)]
        slug: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and print a token pair
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show the authenticated user
    Whoami,
    /// List users in the organization (admin)
    Users,
    /// Show the organization's subscription
    Subscription,
    /// List audit log entries (admin)
    AuditLogs {
        #[arg(long)]
        action: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = format!("{}/api/v1", cli.url.trim_end_matches('/'));

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    }

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Register {
            organization,
            slug,
            email,
            password,
        } => {
            client
                .post(format!("{api}/auth/register"))
                .json(&json!({
                    "organization_name": organization,
                    "organization_slug": slug,
                    "email": email,
                    "password": password,
                }))
                .send()
                .await?
        }
        Commands::Login { email, password } => {
            client
                .post(format!("{api}/auth/login"))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?
        }
        Commands::Whoami => client.get(format!("{api}/users/me")).headers(headers).send().await?,
        Commands::Users => client.get(format!("{api}/users")).headers(headers).send().await?,
        Commands::Subscription => {
            client
                .get(format!("{api}/subscriptions/current"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::AuditLogs { action, limit } => {
            let mut query = vec![("limit", limit.to_string())];
            if let Some(action) = action {
                query.push(("action", action));
            }
            client
                .get(format!("{api}/audit-logs"))
                .query(&query)
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
