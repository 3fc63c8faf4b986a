use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::adapters::{HttpAnalyticsSink, SqlInventory};
use crate::application::Services;
use crate::domain::{format_minor_units, parse_minor_units, AnalyticsSink, EntryReason, Inventory};

/// Saldo - Ledger & Settlement Service
#[derive(Parser)]
#[command(name = "saldo")]
#[command(about = "A transactional account ledger with order settlement")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "saldo.db", env = "SALDO_DB")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Analytics collector base URL (purchase events are POSTed best-effort)
    #[arg(long, env = "SALDO_ANALYTICS", global = true)]
    pub analytics: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account inspection commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Credit an account from the treasury
    Deposit {
        /// Account to credit
        account: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,
    },

    /// Move funds from an account back into the treasury
    Withdraw {
        /// Account to debit
        account: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,
    },

    /// Transfer funds between two accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Source account
        #[arg(long)]
        from: String,

        /// Destination account
        #[arg(long)]
        to: String,
    },

    /// Show balance for an account or all accounts
    Balance {
        /// Account identifier (omit for all accounts)
        account: Option<String>,
    },

    /// List ledger entries for an account, newest first
    Entries {
        /// Account identifier
        account: String,

        /// Maximum number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },

    /// Product catalog commands
    #[command(subcommand)]
    Product(ProductCommands),

    /// Order settlement commands
    #[command(subcommand)]
    Order(OrderCommands),

    /// Verify ledger integrity
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: entries, balances, orders, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// List all accounts
    List,

    /// Show detailed account information
    Show {
        /// Account identifier
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Add a product to the catalog
    Add {
        /// Product name
        name: String,

        /// Seller account that receives payments
        #[arg(long)]
        seller: String,

        /// Unit price (e.g., "3.00" or "3")
        #[arg(long)]
        price: String,

        /// Initial stock count
        #[arg(long)]
        stock: i64,
    },

    /// List the catalog
    List,

    /// Show detailed product information
    Show {
        /// Product ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Create and settle an order
    Create {
        /// Buying account
        #[arg(long)]
        buyer: String,

        /// Product ID
        #[arg(long)]
        product: String,

        /// Number of units
        #[arg(short, long, default_value = "1")]
        quantity: i64,
    },

    /// Cancel a pending order (refund + stock restore)
    Cancel {
        /// Order ID
        id: String,

        /// Buying account (must match the order)
        #[arg(long)]
        buyer: String,
    },

    /// Show detailed order information
    Show {
        /// Order ID
        id: String,

        /// Buying account (must match the order)
        #[arg(long)]
        buyer: String,
    },

    /// List orders for a buyer, newest first
    List {
        /// Buying account
        buyer: String,
    },
}

impl Cli {
    /// Connect the services, wiring the HTTP analytics sink when a collector
    /// is configured.
    async fn connect(&self) -> Result<Services> {
        let services = Services::connect(&self.database).await?;
        if let Some(url) = &self.analytics {
            let repo = services.repo.clone();
            let inventory: Arc<dyn Inventory> = Arc::new(SqlInventory::new(repo.clone()));
            let sink: Arc<dyn AnalyticsSink> = Arc::new(HttpAnalyticsSink::new(url)?);
            return Ok(Services::with_collaborators(repo, inventory, sink));
        }
        Ok(services)
    }

    pub async fn run(self) -> Result<()> {
        if matches!(self.command, Commands::Init) {
            Services::init(&self.database).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let services = self.connect().await?;

        match self.command {
            Commands::Init => unreachable!(),

            Commands::Account(account_cmd) => {
                run_account_command(&services, account_cmd).await?;
            }

            Commands::Deposit { account, amount } => {
                let amount = parse_amount(&amount)?;

                let record = services.transfers.deposit(&account, amount).await?;
                println!(
                    "Deposited {} into {} ({})",
                    format_minor_units(amount),
                    account,
                    record.transfer_id
                );
            }

            Commands::Withdraw { account, amount } => {
                let amount = parse_amount(&amount)?;

                let record = services.transfers.withdraw(&account, amount).await?;
                println!(
                    "Withdrew {} from {} ({})",
                    format_minor_units(amount),
                    account,
                    record.transfer_id
                );
            }

            Commands::Transfer { amount, from, to } => {
                let amount = parse_amount(&amount)?;

                let record = services
                    .transfers
                    .transfer(&from, &to, amount, EntryReason::Transfer)
                    .await?;
                println!(
                    "Transferred {} {} -> {} ({})",
                    format_minor_units(amount),
                    from,
                    to,
                    record.transfer_id
                );
            }

            Commands::Balance { account } => {
                run_balance_command(&services, account).await?;
            }

            Commands::Entries { account, limit } => {
                run_entries_command(&services, &account, limit).await?;
            }

            Commands::Product(product_cmd) => {
                run_product_command(&services, product_cmd).await?;
            }

            Commands::Order(order_cmd) => {
                run_order_command(&services, order_cmd).await?;
            }

            Commands::Check => {
                run_check_command(&services).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                run_export_command(&services, &export_type, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(services: &Services, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::List => {
            let accounts = services.ledger.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<20} {:<8} {:>14} {:>8}", "ACCOUNT", "KIND", "BALANCE", "VERSION");
                println!("{}", "-".repeat(54));
                for account in accounts {
                    println!(
                        "{:<20} {:<8} {:>14} {:>8}",
                        truncate(&account.id, 20),
                        account.kind,
                        format_minor_units(account.balance),
                        account.version
                    );
                }
            }
        }

        AccountCommands::Show { id } => {
            let account = services.ledger.account(&id).await?;
            println!("Account: {}", account.id);
            println!("  Kind:     {}", account.kind);
            println!("  Balance:  {}", format_minor_units(account.balance));
            println!("  Version:  {}", account.version);
            println!(
                "  Created:  {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    Ok(())
}

async fn run_balance_command(services: &Services, account: Option<String>) -> Result<()> {
    match account {
        Some(id) => {
            let balance = services.ledger.balance(&id).await?;
            println!("{}: {}", id, format_minor_units(balance));
        }
        None => {
            let accounts = services.ledger.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<20} {:>14}", "ACCOUNT", "BALANCE");
                println!("{}", "-".repeat(35));
                for account in accounts {
                    println!(
                        "{:<20} {:>14}",
                        truncate(&account.id, 20),
                        format_minor_units(account.balance)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_entries_command(services: &Services, account: &str, limit: i64) -> Result<()> {
    let entries = services.ledger.entries_for(account, limit).await?;

    if entries.is_empty() {
        println!("No entries found for {}.", account);
        return Ok(());
    }

    println!(
        "{:<6} {:<12} {:>12} {:<8} {:<12} TRANSFER",
        "SEQ", "DATE", "AMOUNT", "SIDE", "REASON"
    );
    println!("{}", "-".repeat(80));

    for entry in entries {
        println!(
            "{:<6} {:<12} {:>12} {:<8} {:<12} {}",
            entry.seq,
            entry.created_at.format("%Y-%m-%d"),
            format_minor_units(entry.amount),
            entry.direction,
            entry.reason,
            entry.transfer_id
        );
    }
    Ok(())
}

async fn run_product_command(services: &Services, cmd: ProductCommands) -> Result<()> {
    let catalog = SqlInventory::new(services.repo.clone());

    match cmd {
        ProductCommands::Add {
            name,
            seller,
            price,
            stock,
        } => {
            let unit_price = parse_amount(&price)?;
            let product = catalog.create_product(&seller, &name, unit_price, stock).await?;
            println!("Added product: {} ({})", product.name, product.id);
            println!("  Seller: {}", product.seller_id);
            println!("  Price:  {}", format_minor_units(product.unit_price));
            println!("  Stock:  {}", product.stock);
        }

        ProductCommands::List => {
            let products = catalog.list_products().await?;
            if products.is_empty() {
                println!("No products found.");
            } else {
                println!(
                    "{:<36} {:<20} {:<15} {:>10} {:>7}",
                    "ID", "NAME", "SELLER", "PRICE", "STOCK"
                );
                println!("{}", "-".repeat(92));
                for product in products {
                    println!(
                        "{:<36} {:<20} {:<15} {:>10} {:>7}",
                        product.id,
                        truncate(&product.name, 20),
                        truncate(&product.seller_id, 15),
                        format_minor_units(product.unit_price),
                        product.stock
                    );
                }
            }
        }

        ProductCommands::Show { id } => {
            let product = catalog
                .get_product(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Product not found: {}", id))?;
            println!("Product: {}", product.name);
            println!("  ID:      {}", product.id);
            println!("  Seller:  {}", product.seller_id);
            println!("  Price:   {}", format_minor_units(product.unit_price));
            println!("  Stock:   {}", product.stock);
            println!(
                "  Created: {}",
                product.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    Ok(())
}

async fn run_order_command(services: &Services, cmd: OrderCommands) -> Result<()> {
    match cmd {
        OrderCommands::Create {
            buyer,
            product,
            quantity,
        } => {
            let order = services.orders.create_order(&buyer, &product, quantity).await?;
            println!("Order {}: {}", order.status, order.id);
            println!("  Buyer:    {}", order.buyer_id);
            println!("  Product:  {}", order.product_id);
            println!(
                "  Quantity: {} x {}",
                order.quantity,
                format_minor_units(order.unit_price)
            );
            println!("  Total:    {}", format_minor_units(order.total));
        }

        OrderCommands::Cancel { id, buyer } => {
            let order_id = parse_order_id(&id)?;
            let order = services.orders.cancel_order(order_id, &buyer).await?;
            println!(
                "Cancelled order {}: refunded {} to {}",
                order.id,
                format_minor_units(order.total),
                order.buyer_id
            );
        }

        OrderCommands::Show { id, buyer } => {
            let order_id = parse_order_id(&id)?;
            let order = services.orders.get_order(order_id, &buyer).await?;
            println!("Order: {}", order.id);
            println!("  Status:   {}", order.status);
            println!("  Buyer:    {}", order.buyer_id);
            println!("  Product:  {}", order.product_id);
            println!(
                "  Quantity: {} x {}",
                order.quantity,
                format_minor_units(order.unit_price)
            );
            println!("  Total:    {}", format_minor_units(order.total));
            println!(
                "  Created:  {}",
                order.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!(
                "  Updated:  {}",
                order.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        OrderCommands::List { buyer } => {
            let orders = services.orders.orders_for(&buyer).await?;
            if orders.is_empty() {
                println!("No orders found for {}.", buyer);
            } else {
                println!(
                    "{:<36} {:<12} {:>5} {:>12} {:<10}",
                    "ID", "DATE", "QTY", "TOTAL", "STATUS"
                );
                println!("{}", "-".repeat(80));
                for order in orders {
                    println!(
                        "{:<36} {:<12} {:>5} {:>12} {:<10}",
                        order.id,
                        order.created_at.format("%Y-%m-%d"),
                        order.quantity,
                        format_minor_units(order.total),
                        order.status
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_check_command(services: &Services) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = services.ledger.audit().await?;

    println!("Accounts:  {}", report.account_count);
    println!("Entries:   {}", report.entry_count);
    println!("Transfers: {}", report.transfer_count);
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    services: &Services,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(services);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "entries" => {
            let count = exporter.export_entries_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} entries", count);
            }
        }
        "balances" => {
            let count = exporter.export_balances_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "orders" => {
            let count = exporter.export_orders_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} orders", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full database: {} accounts, {} entries, {} orders, {} products",
                    snapshot.accounts.len(),
                    snapshot.entries.len(),
                    snapshot.orders.len(),
                    snapshot.products.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: entries, balances, orders, full",
                export_type
            );
        }
    }

    Ok(())
}

fn parse_amount(input: &str) -> Result<i64> {
    parse_minor_units(input).context("Invalid amount format. Use '50.00' or '50'")
}

fn parse_order_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input).context("Invalid order ID format (expected UUID)")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
