//! Command handlers. Each command opens the session store, restores any
//! persisted session, and talks to the API through it.

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

use storefront_core::auth::CredentialStore;
use storefront_core::models::{
    CustomerDetails, Deposit, DepositRequest, Order, PaymentMethod, Product, StoreSettings,
};
use storefront_core::utils::{format_date, format_money, truncate};
use storefront_core::{
    ApiClient, Cart, Checkout, CheckoutRequest, Config, FileStore, ProfileUpdate, Session,
    SessionStore, SignupRequest, StoreOptions,
};

use crate::{AdminCommand, CheckoutArgs, Command, DepositCommand, ProfileArgs};

/// Width of the name column in listings
const NAME_WIDTH: usize = 32;

pub async fn run(command: Command, mut config: Config, api_url: String) -> Result<()> {
    let store = open_store(&config, &api_url)?;
    store.initialize().await;

    match command {
        Command::Login { email, remember } => login(&store, &mut config, email, remember).await,
        Command::Signup { name, email, phone } => signup(&store, &mut config, name, email, phone).await,
        Command::Logout { forget } => logout(&store, &config, forget),
        Command::Whoami => whoami(&store),
        Command::Profile(args) => profile(&store, args).await,
        Command::Sync => sync(&store).await,
        Command::Watch => watch(&store).await,
        Command::Products { search } => products(&store, search.as_deref()).await,
        Command::Checkout(args) => checkout(&store, args).await,
        Command::Orders => orders(&store).await,
        Command::Deposit(cmd) => deposit(&store, cmd).await,
        Command::PaymentMethods => payment_methods(&store).await,
        Command::Admin(cmd) => admin(&store, cmd).await,
    }
}

fn open_store(config: &Config, api_url: &str) -> Result<SessionStore> {
    if api_url == config.api_base_url() {
        return SessionStore::from_config(config);
    }
    let api = ApiClient::with_timeout(api_url, config.request_timeout())?;
    let storage = FileStore::new(config.cache_dir()?)?;
    let options = StoreOptions {
        sync_interval: config.sync_interval(),
        ..Default::default()
    };
    Ok(SessionStore::new(api, storage, options))
}

fn require_session(store: &SessionStore) -> Result<std::sync::Arc<Session>> {
    store
        .current()
        .ok_or_else(|| anyhow!("Not signed in. Run `storefront login` first."))
}

fn require_client(store: &SessionStore) -> Result<ApiClient> {
    store
        .authorized_client()
        .ok_or_else(|| anyhow!("Not signed in. Run `storefront login` first."))
}

fn require_admin(store: &SessionStore) -> Result<ApiClient> {
    let session = require_session(store)?;
    if !session.is_admin() {
        bail!("This command needs an admin account");
    }
    require_client(store)
}

fn prompt(label: &str) -> Result<String> {
    rpassword::prompt_password(label).context("Failed to read password")
}

// ============================================================================
// Account
// ============================================================================

async fn login(store: &SessionStore, config: &mut Config, email: Option<String>, remember: bool) -> Result<()> {
    let email = email
        .or_else(|| config.last_email.clone())
        .ok_or_else(|| anyhow!("No email given. Use --email."))?;

    let password = if remember && CredentialStore::has_credentials(&email) {
        debug!("Using remembered password");
        CredentialStore::get_password(&email)?
    } else {
        prompt("Password: ")?
    };

    let session = store.login(&email, &password).await?;

    if remember {
        if let Err(e) = CredentialStore::store(&email, &password) {
            warn!(error = %e, "Could not remember password");
        }
    }
    config.last_email = Some(email);
    config.save()?;

    println!("Signed in as {} ({})", display_name(&session), session.role);
    println!("Balance: {}", format_money(session.balance));
    Ok(())
}

async fn signup(store: &SessionStore, config: &mut Config, name: String, email: String, phone: String) -> Result<()> {
    let password = prompt("Choose a password: ")?;
    let confirm = prompt("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    let session = store
        .signup(SignupRequest {
            name,
            email: email.clone(),
            password,
            phone,
        })
        .await?;

    config.last_email = Some(email);
    config.save()?;
    println!("Welcome, {}! Your account is ready.", display_name(&session));
    Ok(())
}

fn logout(store: &SessionStore, config: &Config, forget: bool) -> Result<()> {
    let was_signed_in = store.current().is_some();
    store.logout();

    if forget {
        if let Some(email) = config.last_email.as_deref() {
            CredentialStore::delete(email)?;
        }
    }

    if was_signed_in {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

fn whoami(store: &SessionStore) -> Result<()> {
    let session = require_session(store)?;
    println!("{}", display_name(&session));
    println!("  id:      {}", session.user_id);
    println!("  email:   {}", session.email);
    println!("  role:    {}", session.role);
    println!("  balance: {}", format_money(session.balance));
    if let Some(phone) = &session.phone {
        println!("  phone:   {}", phone);
    }
    let location: Vec<&str> = [&session.address, &session.city, &session.country]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .filter(|v| !v.is_empty())
        .collect();
    if !location.is_empty() {
        println!("  address: {}", location.join(", "));
    }
    Ok(())
}

async fn profile(store: &SessionStore, args: ProfileArgs) -> Result<()> {
    let password = if args.password {
        Some(prompt("New password: ")?)
    } else {
        None
    };
    let update = ProfileUpdate {
        name: args.name,
        email: args.email,
        phone: args.phone,
        profile_picture: args.picture,
        address: args.address,
        city: args.city,
        country: args.country,
        password,
    };
    if update.is_empty() {
        bail!("Nothing to update. Pass at least one field.");
    }

    let session = store.update_profile(update).await?;
    println!("Profile updated for {}", display_name(&session));
    Ok(())
}

async fn sync(store: &SessionStore) -> Result<()> {
    require_session(store)?;
    store.sync_balance().await;
    match store.balance() {
        Some(balance) => println!("Balance: {}", format_money(balance)),
        None => println!("Session ended by the server. Sign in again."),
    }
    Ok(())
}

async fn watch(store: &SessionStore) -> Result<()> {
    let session = require_session(store)?;
    println!("Watching {} (Ctrl-C to stop)", display_name(&session));
    println!("Balance: {}", format_money(session.balance));

    let mut rx = store.subscribe();
    let mut last_balance = session.balance;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = rx.borrow_and_update().clone();
                match current {
                    Some(session) if session.balance != last_balance => {
                        println!("Balance: {}", format_money(session.balance));
                        last_balance = session.balance;
                    }
                    Some(_) => {}
                    None => {
                        println!("Signed out");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn display_name(session: &Session) -> &str {
    if session.name.trim().is_empty() {
        &session.email
    } else {
        &session.name
    }
}

// ============================================================================
// Shop
// ============================================================================

async fn products(store: &SessionStore, search: Option<&str>) -> Result<()> {
    let products = store.public_client().fetch_products().await?;
    let query = search.unwrap_or("");
    let matching: Vec<&Product> = products.iter().filter(|p| p.matches(query)).collect();

    if matching.is_empty() {
        println!("No products found");
        return Ok(());
    }
    for product in matching {
        println!(
            "{:<26} {:<width$} {:>12}  {}{}",
            product.id,
            truncate(&product.name, NAME_WIDTH),
            format_money(product.price),
            product.category_display(),
            if product.in_stock() { "" } else { " (out of stock)" },
            width = NAME_WIDTH,
        );
    }
    Ok(())
}

fn parse_item(spec: &str) -> Result<(&str, u32)> {
    match spec.split_once(':') {
        Some((id, qty)) => {
            let qty: u32 = qty
                .trim()
                .parse()
                .with_context(|| format!("Invalid quantity in '{}'", spec))?;
            if qty == 0 {
                bail!("Quantity must be at least 1 in '{}'", spec);
            }
            Ok((id.trim(), qty))
        }
        None => Ok((spec.trim(), 1)),
    }
}

async fn checkout(store: &SessionStore, args: CheckoutArgs) -> Result<()> {
    let session = require_session(store)?;
    let public = store.public_client();

    let (catalog, settings) = futures::join!(public.fetch_products(), public.fetch_settings());
    let catalog = catalog?;
    let settings = settings.unwrap_or_else(|e| {
        warn!(error = %e, "Could not load store settings, using defaults");
        StoreSettings::default()
    });

    let mut cart = Cart::new();
    for spec in &args.items {
        let (id, qty) = parse_item(spec)?;
        let product = catalog
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("Unknown product '{}'", id))?;
        cart.add(product);
        cart.update_quantity(id, i64::from(qty) - 1);
    }

    let customer = CustomerDetails {
        full_name: args.full_name.unwrap_or_else(|| session.name.clone()),
        email: session.email.clone(),
        phone: args.phone.or_else(|| session.phone.clone()).unwrap_or_default(),
        address: args.address.or_else(|| session.address.clone()).unwrap_or_default(),
        city: if args.city.is_empty() {
            session.city.clone().unwrap_or_default()
        } else {
            args.city
        },
        zip_code: args.zip_code,
        contact_platform: None,
        contact_id: None,
    };

    let order = Checkout::new(store.clone())
        .submit(
            &mut cart,
            CheckoutRequest {
                customer,
                payment: args.payment,
            },
            &settings,
        )
        .await?;

    println!("Order {} placed: {}", order.id, format_money(order.total_amount));
    if let Some(balance) = store.balance() {
        println!("Balance: {}", format_money(balance));
    }
    Ok(())
}

async fn orders(store: &SessionStore) -> Result<()> {
    let session = require_session(store)?;
    let orders = require_client(store)?.fetch_orders_for(session.role).await?;
    print_orders(&orders);
    Ok(())
}

fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet");
        return;
    }
    for order in orders {
        println!(
            "{:<26} {:<10} {:>3} items {:>12}  {}",
            order.id,
            order.status,
            order.item_count(),
            format_money(order.total_amount),
            format_date(order.created_at.as_ref()),
        );
        if let Some(reason) = order.cancellation_reason.as_deref().filter(|r| !r.is_empty()) {
            println!("    cancelled: {}", reason);
        }
    }
}

async fn deposit(store: &SessionStore, command: DepositCommand) -> Result<()> {
    let client = require_client(store)?;
    match command {
        DepositCommand::Request {
            method,
            amount,
            transaction_id,
            sender_number,
        } => {
            let request = DepositRequest {
                method,
                amount,
                transaction_id,
                sender_number,
            };
            request.validate().map_err(|msg| anyhow!(msg))?;
            let deposit = client.request_deposit(&request).await?;
            println!(
                "Deposit {} of {} submitted, waiting for approval",
                deposit.id,
                format_money(deposit.amount)
            );
        }
        DepositCommand::List => print_deposits(&client.fetch_my_deposits().await?, false),
    }
    Ok(())
}

fn print_deposits(deposits: &[Deposit], with_user: bool) {
    if deposits.is_empty() {
        println!("No deposits");
        return;
    }
    for deposit in deposits {
        let user = if with_user { deposit.user_display() } else { String::new() };
        println!(
            "{:<26} {:<9} {:>12}  {:<10} {}  {}",
            deposit.id,
            deposit.status,
            format_money(deposit.amount),
            deposit.method,
            format_date(deposit.created_at.as_ref()),
            user,
        );
    }
}

async fn payment_methods(store: &SessionStore) -> Result<()> {
    let methods = store.public_client().fetch_payment_methods().await?;
    print_payment_methods(&methods);
    Ok(())
}

fn print_payment_methods(methods: &[PaymentMethod]) {
    if methods.is_empty() {
        println!("No payment methods configured");
        return;
    }
    for method in methods {
        let state = if method.is_active { "" } else { " (inactive)" };
        println!("{:<26} {:<16} {}{}", method.id, method.name, method.number, state);
        if let Some(instructions) = method.instructions.as_deref().filter(|i| !i.is_empty()) {
            println!("    {}", instructions);
        }
    }
}

// ============================================================================
// Admin
// ============================================================================

async fn admin(store: &SessionStore, command: AdminCommand) -> Result<()> {
    let client = require_admin(store)?;

    match command {
        AdminCommand::Dashboard => {
            let dashboard = client.fetch_dashboard().await?;
            println!("Revenue:          {}", format_money(dashboard.revenue));
            println!("Fulfilled orders: {}", dashboard.fulfilled_orders);
            println!("Pending orders:   {}", dashboard.pending_orders);
            println!(
                "Deposits:         {} approved ({}), {} pending",
                dashboard.approved_deposits,
                format_money(dashboard.approved_deposit_total),
                dashboard.pending_deposits
            );
            println!("Products:         {}", dashboard.product_count);
            println!("Users:            {}", dashboard.user_count);
        }
        AdminCommand::Users => {
            for user in client.fetch_users().await? {
                println!(
                    "{:<26} {:<24} {:<30} {:<8} {:>12}",
                    user.id,
                    truncate(&user.name, 24),
                    user.email,
                    user.role,
                    format_money(user.balance)
                );
            }
        }
        AdminCommand::SetBalance { user_id, balance } => {
            if !balance.is_finite() || balance < 0.0 {
                bail!("Balance must be a non-negative amount");
            }
            let user = client.update_user_balance(&user_id, balance).await?;
            println!("{} now has {}", user.email, format_money(user.balance));
            if store.current().map(|s| s.user_id == user.id).unwrap_or(false) {
                store.sync_balance().await;
            }
        }
        AdminCommand::DeleteUser { user_id } => {
            client.delete_user(&user_id).await?;
            println!("Deleted user {}", user_id);
        }
        AdminCommand::Orders => print_orders(&client.fetch_all_orders().await?),
        AdminCommand::OrderStatus {
            order_id,
            status,
            reason,
        } => {
            let order = client
                .update_order_status(&order_id, status, reason.as_deref())
                .await?;
            println!("Order {} is now {}", order.id, order.status);
        }
        AdminCommand::Deposits => print_deposits(&client.fetch_all_deposits().await?, true),
        AdminCommand::DepositStatus { deposit_id, status } => {
            client.update_deposit_status(&deposit_id, status).await?;
            println!("Deposit {} marked {}", deposit_id, status);
            // Approving a deposit may credit the signed-in admin's own balance
            store.sync_balance().await;
        }
        AdminCommand::PaymentMethods => print_payment_methods(&client.fetch_all_payment_methods().await?),
        AdminCommand::AddPaymentMethod {
            name,
            number,
            instructions,
        } => {
            let mut method = PaymentMethod::new(name, number);
            method.instructions = instructions;
            client.save_payment_method(&method).await?;
            println!("Saved payment method {}", method.name);
        }
        AdminCommand::DeletePaymentMethod { id } => {
            client.delete_payment_method(&id).await?;
            println!("Deleted payment method {}", id);
        }
        AdminCommand::AddProduct {
            name,
            price,
            category,
            stock,
        } => {
            let product = Product {
                id: String::new(),
                name,
                price,
                category,
                image: None,
                description: None,
                stock,
            };
            let created = client.create_product(&product).await?;
            println!("Created product {} ({})", created.id, created.name);
        }
        AdminCommand::EditProduct {
            id,
            name,
            price,
            category,
            stock,
            description,
            image,
        } => {
            let mut product = client
                .fetch_products()
                .await?
                .into_iter()
                .find(|p| p.id == id)
                .ok_or_else(|| anyhow!("No product with id {}", id))?;
            if let Some(name) = name {
                product.name = name;
            }
            if let Some(price) = price {
                if !price.is_finite() || price < 0.0 {
                    bail!("Price must be a non-negative amount");
                }
                product.price = price;
            }
            if category.is_some() {
                product.category = category;
            }
            if stock.is_some() {
                product.stock = stock;
            }
            if description.is_some() {
                product.description = description;
            }
            if image.is_some() {
                product.image = image;
            }
            let updated = client.update_product(&id, &product).await?;
            println!(
                "Updated product {} ({}, {})",
                updated.id,
                updated.name,
                format_money(updated.price)
            );
        }
        AdminCommand::DeleteProduct { id } => {
            client.delete_product(&id).await?;
            println!("Deleted product {}", id);
        }
        AdminCommand::Settings { cod_charge } => {
            let mut settings = client.fetch_settings().await?;
            if let Some(charge) = cod_charge {
                if !charge.is_finite() || charge < 0.0 {
                    bail!("COD charge must be a non-negative amount");
                }
                settings.cod_charge = Some(charge);
                settings = client.update_settings(&settings).await?;
            }
            println!("COD charge:    {}", format_money(settings.cod_charge()));
            println!(
                "Support email: {}",
                settings.support_email.as_deref().unwrap_or("-")
            );
            println!(
                "Support phone: {}",
                settings.support_phone.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item() {
        assert_eq!(parse_item("p1").unwrap(), ("p1", 1));
        assert_eq!(parse_item("p1:3").unwrap(), ("p1", 3));
        assert!(parse_item("p1:0").is_err());
        assert!(parse_item("p1:many").is_err());
    }
}
