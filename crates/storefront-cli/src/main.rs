//! Storefront CLI - a terminal client for the storefront API.
//!
//! Signs in, keeps the account balance in sync with the server, places
//! orders and drives the admin back office from the command line.

mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_core::models::{DepositStatus, OrderStatus, PaymentOption};
use storefront_core::Config;

// ============================================================================
// Command line
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "storefront", author, version, about)]
struct Cli {
    /// API base URL (overrides config and STOREFRONT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Remember the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },
    /// Create a customer account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    /// Sign out and clear the stored session
    Logout {
        /// Also forget the remembered password
        #[arg(long)]
        forget: bool,
    },
    /// Show the signed-in account
    Whoami,
    /// Update profile fields
    Profile(ProfileArgs),
    /// Refresh the balance from the server
    Sync,
    /// Keep the session open and print balance changes until Ctrl-C
    Watch,
    /// List the catalog
    Products {
        #[arg(long)]
        search: Option<String>,
    },
    /// Place an order
    Checkout(CheckoutArgs),
    /// List your orders (all orders for admins)
    Orders,
    /// Balance top-ups
    #[command(subcommand)]
    Deposit(DepositCommand),
    /// List active payment gateways
    PaymentMethods,
    /// Back-office commands (admin accounts only)
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Args, Debug, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub picture: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    /// Prompt for a new password
    #[arg(long)]
    pub password: bool,
}

#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// Product to buy as `<id>` or `<id>:<quantity>`; repeatable
    #[arg(long = "item", required = true)]
    pub items: Vec<String>,
    #[arg(long, value_parser = parse_payment, default_value = "balance")]
    pub payment: PaymentOption,
    #[arg(long)]
    pub full_name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long, default_value = "")]
    pub city: String,
    #[arg(long, default_value = "")]
    pub zip_code: String,
}

#[derive(Subcommand, Debug)]
pub enum DepositCommand {
    /// Ask an admin to credit a payment you sent
    Request {
        /// Payment gateway name the money was sent through
        #[arg(long)]
        method: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        transaction_id: String,
        #[arg(long)]
        sender_number: String,
    },
    /// List your deposit requests
    List,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Headline figures across products, users, orders and deposits
    Dashboard,
    Users,
    SetBalance {
        user_id: String,
        balance: f64,
    },
    DeleteUser {
        user_id: String,
    },
    Orders,
    OrderStatus {
        order_id: String,
        #[arg(value_parser = parse_order_status)]
        status: OrderStatus,
        /// Reason shown to the customer when cancelling
        #[arg(long)]
        reason: Option<String>,
    },
    Deposits,
    DepositStatus {
        deposit_id: String,
        #[arg(value_parser = parse_deposit_status)]
        status: DepositStatus,
    },
    PaymentMethods,
    AddPaymentMethod {
        name: String,
        number: String,
        #[arg(long)]
        instructions: Option<String>,
    },
    DeletePaymentMethod {
        id: String,
    },
    AddProduct {
        name: String,
        price: f64,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        stock: Option<i64>,
    },
    /// Change fields of an existing product; omitted flags keep their value
    EditProduct {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        stock: Option<i64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    DeleteProduct {
        id: String,
    },
    /// Show settings, optionally changing the COD charge
    Settings {
        #[arg(long)]
        cod_charge: Option<f64>,
    },
}

fn parse_payment(s: &str) -> Result<PaymentOption, String> {
    match s.trim().to_lowercase().as_str() {
        "balance" => Ok(PaymentOption::Balance),
        "cod" => Ok(PaymentOption::Cod),
        other => Err(format!("unknown payment option '{}' (expected balance or cod)", other)),
    }
}

fn parse_order_status(s: &str) -> Result<OrderStatus, String> {
    OrderStatus::parse(s).ok_or_else(|| format!("unknown order status '{}'", s))
}

fn parse_deposit_status(s: &str) -> Result<DepositStatus, String> {
    DepositStatus::parse(s).ok_or_else(|| format!("unknown deposit status '{}'", s))
}

// ============================================================================
// Logging
// ============================================================================

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` controls the level (default `warn`). When `log_to_file` is set,
/// a daily rolling log is also written under the cache directory; the
/// returned guard must live until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "storefront.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    let log_dir = if config.log_to_file { config.cache_dir().ok() } else { None };
    let _guard = init_tracing(log_dir.as_deref());

    let api_url = cli.api_url.unwrap_or_else(|| config.api_base_url());
    info!(api = %api_url, "Storefront CLI starting");

    let result = commands::run(cli.command, config, api_url).await;
    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
