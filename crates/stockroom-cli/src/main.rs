//! stockroom - command-line admin client for the product catalog.
//!
//! A thin frontend over `stockroom-core`: signs in against the catalog
//! server, then lists and edits product records. Session handling - token
//! persistence, transparent refresh, forced-logout notification - lives
//! entirely in the core crate.

use std::io::{self, Read as _, Write as _};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use stockroom_core::api::DEFAULT_PAGE_SIZE;
use stockroom_core::auth::{jwt, CredentialStore, SavedLogin};
use stockroom_core::models::{NewProduct, ProductPatch};
use stockroom_core::{ApiClient, Config, SessionEvent};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

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

    let args: Vec<String> = std::env::args().collect();

    let mut config = Config::load()?;
    if let Ok(url) = std::env::var("STOCKROOM_API_URL") {
        config.api_base_url = Some(url);
    }

    let client = ApiClient::new(&config)?;

    // React to a forced logout the way the web frontend redirects to its
    // login page: tell the operator where to go.
    let mut events = client.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::Invalidated => {
                    eprintln!("Session is no longer valid - run `stockroom login` to sign in again.");
                }
            }
        }
    });

    match args.get(1).map(String::as_str) {
        Some("login") => cmd_login(&client, &mut config, &args[2..]).await,
        Some("logout") => cmd_logout(&client),
        Some("whoami") => cmd_whoami(&client),
        Some("token") => cmd_token(&client),
        Some("products") => cmd_products(&client, &args[2..]).await,
        _ => {
            print_usage();
            Ok(())
        }
    }
}

async fn cmd_login(client: &ApiClient, config: &mut Config, args: &[String]) -> Result<()> {
    let remember = args.iter().any(|arg| arg == "--remember");
    let email_arg = args.iter().find(|arg| !arg.starts_with("--")).cloned();

    // A remembered login makes a bare `stockroom login` prompt-free
    let saved = if email_arg.is_none() {
        CredentialStore::load().unwrap_or_else(|error| {
            warn!(%error, "Could not read saved login");
            None
        })
    } else {
        None
    };

    let (email, password) = match saved {
        Some(SavedLogin { email, password }) => (email, password),
        None => {
            let email = match email_arg {
                Some(email) => email,
                None => prompt("Email", config.last_email.as_deref())?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            (email, password)
        }
    };

    let user = client.session().login(&email, &password).await?;

    config.last_email = Some(email.clone());
    config.save()?;
    if remember {
        CredentialStore::store(&SavedLogin { email, password })?;
        println!("Login saved to the OS keychain.");
    }

    println!("Signed in as {} ({})", user.display_name(), user.role.as_str());
    Ok(())
}

fn cmd_logout(client: &ApiClient) -> Result<()> {
    client.session().logout()?;
    println!("Signed out.");
    Ok(())
}

fn cmd_whoami(client: &ApiClient) -> Result<()> {
    match client.session().current_user() {
        Some(user) => println!("{} <{}> ({})", user.username, user.email, user.role.as_str()),
        None => println!("Not signed in."),
    }
    Ok(())
}

fn cmd_token(client: &ApiClient) -> Result<()> {
    let Some(token) = client.session().token() else {
        println!("Not signed in.");
        return Ok(());
    };

    println!(
        "Obtained: {}",
        token.obtained_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Expires:  {} ({} min left)",
        token.expires_at().format("%Y-%m-%d %H:%M:%S UTC"),
        token.minutes_until_expiry()
    );

    // Advisory decode only - nothing below is verified
    match jwt::decode_claims(&token.access_token) {
        Some(claims) => {
            println!("Unverified payload:");
            if let Some(ref email) = claims.email {
                println!("  email: {}", email);
            }
            if let Some(ref username) = claims.username {
                println!("  user:  {}", username);
            }
            if let Some(ref role) = claims.role {
                println!("  role:  {}", role);
            }
            if let Some(expires) = claims.expires_at() {
                println!("  exp:   {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        None => println!("Access token payload is not decodable."),
    }
    Ok(())
}

async fn cmd_products(client: &ApiClient, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("list") => {
            let page = match flag_value(args, "--page") {
                Some(value) => value.parse().context("Invalid --page value")?,
                None => 1,
            };
            let limit = match flag_value(args, "--limit") {
                Some(value) => value.parse().context("Invalid --limit value")?,
                None => DEFAULT_PAGE_SIZE,
            };
            let query = flag_value(args, "--query");

            let listing = client.list_products(page, limit, query).await?;
            for product in &listing.products {
                println!(
                    "{:>5}  {:<12} {:<28} {:>9.2}  {:>5}  {}",
                    product.id,
                    product.sku,
                    product.name,
                    product.price,
                    product.inventory,
                    product.status.label()
                );
            }
            println!(
                "{} of {} products (page {})",
                listing.products.len(),
                listing.total,
                page
            );
            Ok(())
        }
        Some("show") => {
            let id = parse_id(args.get(1))?;
            let product = client.get_product(id).await?;
            println!("{}", serde_json::to_string_pretty(&product)?);
            Ok(())
        }
        Some("create") => {
            let product: NewProduct = read_stdin_json()?;
            let created = client.create_product(&product).await?;
            println!("Created product {} ({})", created.id, created.name);
            Ok(())
        }
        Some("update") => {
            let id = parse_id(args.get(1))?;
            let patch: ProductPatch = read_stdin_json()?;
            let updated = client.update_product(id, &patch).await?;
            println!("Updated product {} ({})", updated.id, updated.name);
            Ok(())
        }
        Some("delete") => {
            let id = parse_id(args.get(1))?;
            client.delete_product(id).await?;
            println!("Deleted product {}", id);
            Ok(())
        }
        _ => {
            print_products_usage();
            Ok(())
        }
    }
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => print!("{} [{}]: ", label, default),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let value = line.trim();

    if value.is_empty() {
        match default {
            Some(default) => Ok(default.to_string()),
            None => bail!("{} is required", label),
        }
    } else {
        Ok(value.to_string())
    }
}

fn parse_id(arg: Option<&String>) -> Result<i64> {
    arg.context("Missing product id")?
        .parse()
        .context("Invalid product id")
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == name)
        .and_then(|index| args.get(index + 1))
        .map(String::as_str)
}

/// Create/update payloads are read as JSON from stdin, e.g.
/// `stockroom products create < lantern.json`
fn read_stdin_json<T: DeserializeOwned>() -> Result<T> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read JSON from stdin")?;
    serde_json::from_str(&buffer).context("Failed to parse JSON payload")
}

fn print_usage() {
    eprintln!("stockroom - product catalog admin client");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  stockroom login [email] [--remember]   Sign in (prompts for the password)");
    eprintln!("  stockroom logout                       Sign out and clear the local session");
    eprintln!("  stockroom whoami                       Show the signed-in user");
    eprintln!("  stockroom token                        Show token expiry and unverified payload");
    eprintln!("  stockroom products ...                 Manage the catalog (see `stockroom products`)");
    eprintln!();
    eprintln!("RUST_LOG controls log verbosity; STOCKROOM_API_URL overrides the server URL.");
}

fn print_products_usage() {
    eprintln!("Usage:");
    eprintln!("  stockroom products list [--page N] [--limit N] [--query TEXT]");
    eprintln!("  stockroom products show <id>");
    eprintln!("  stockroom products create        (reads product JSON from stdin)");
    eprintln!("  stockroom products update <id>   (reads patch JSON from stdin)");
    eprintln!("  stockroom products delete <id>");
}
