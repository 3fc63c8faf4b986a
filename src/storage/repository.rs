use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountKind, Direction, EntryReason, LedgerEntry, MinorUnits, Order,
    OrderId, OrderStatus, Product, TransferId, TransferRecord, TREASURY_ACCOUNT,
};

use super::{MIGRATION_001_LEDGER, MIGRATION_002_ORDERS, MIGRATION_003_PRODUCTS};

/// Failures the application layer gives meaning to. Mechanical database
/// failures travel as `Other` with their context chain intact.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: MinorUnits,
        requested: MinorUnits,
    },

    #[error("order {order} is already {status}")]
    OrderStatusConflict { order: OrderId, status: OrderStatus },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Repository for persisting and querying accounts, ledger entries,
/// orders and products.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Connect to a SQLite database at the given URL.
    /// Creates the database file if the URL says so (`mode=rwc`).
    pub async fn connect(database_url: &str) -> Result<Self> {
        // WAL keeps readers unblocked while a writer holds the database,
        // and the busy timeout makes concurrent writers queue instead of
        // failing with SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations and seed the treasury account.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_LEDGER)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_ORDERS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        sqlx::query(MIGRATION_003_PRODUCTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 003")?;

        self.ensure_treasury().await?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Create the treasury row if this database does not have one yet.
    async fn ensure_treasury(&self) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO accounts (id, kind, balance, version, created_at)
            VALUES (?, ?, 0, 0, ?)
            "#,
        )
        .bind(TREASURY_ACCOUNT)
        .bind(AccountKind::System.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to seed treasury account")?;
        Ok(())
    }

    // ========================
    // Account operations
    // ========================

    /// Get an account by ID.
    pub async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, balance, version, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List all accounts, ordered by ID.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, balance, version, created_at
            FROM accounts
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Stored balance of an account. `None` when no row exists.
    pub async fn account_balance(&self, id: &str) -> Result<Option<MinorUnits>> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch balance")?;

        Ok(row.map(|r| r.get("balance")))
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let kind_str: String = row.get("kind");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: row.get("id"),
            kind: AccountKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account kind: {}", kind_str))?,
            balance: row.get("balance"),
            version: row.get("version"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Ledger operations
    // ========================

    /// Apply a standalone posting: one balance mutation plus one appended
    /// entry, committed as a single transaction.
    pub async fn apply_entry(&self, entry: &mut LedgerEntry) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        Self::apply_delta(&mut tx, &entry.account_id.clone(), entry.amount).await?;
        Self::insert_entry(&mut tx, entry).await?;

        tx.commit().await.context("Failed to commit posting")?;
        Ok(())
    }

    /// Apply both legs of a transfer as one atomic unit: two balance
    /// mutations plus two appended entries, all or nothing.
    pub async fn apply_transfer(&self, record: &mut TransferRecord) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        Self::apply_transfer_legs(&mut tx, record).await?;

        tx.commit().await.context("Failed to commit transfer")?;
        Ok(())
    }

    /// Apply a transfer and move an order out of `Pending` in the same
    /// transaction. If the order already left `Pending`, nothing at all is
    /// applied and the caller gets the status that beat them to it.
    pub async fn apply_transfer_settling_order(
        &self,
        record: &mut TransferRecord,
        order_id: OrderId,
        to_status: OrderStatus,
    ) -> Result<(), StorageError> {
        debug_assert!(OrderStatus::Pending.can_transition_to(to_status));

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let claimed = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = 'PENDING'
            "#,
        )
        .bind(to_status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(order_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to transition order")?;

        if claimed.rows_affected() == 0 {
            let status = sqlx::query("SELECT status FROM orders WHERE id = ?")
                .bind(order_id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to read order status")?
                .and_then(|row| OrderStatus::from_str(&row.get::<String, _>("status")));
            let Some(status) = status else {
                return Err(StorageError::Other(anyhow::anyhow!(
                    "Order {} not found",
                    order_id
                )));
            };
            return Err(StorageError::OrderStatusConflict {
                order: order_id,
                status,
            });
        }

        Self::apply_transfer_legs(&mut tx, record).await?;

        tx.commit().await.context("Failed to commit settlement")?;
        Ok(())
    }

    /// List entries for an account, newest first.
    pub async fn entries_for_account(
        &self,
        account_id: &str,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT seq, id, account_id, amount, direction, reason, transfer_id, related_id, created_at
            FROM ledger_entries
            WHERE account_id = ?
            ORDER BY seq DESC
            LIMIT ?
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list entries for account")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// List all entries, ordered by sequence number.
    pub async fn list_entries(&self) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT seq, id, account_id, amount, direction, reason, transfer_id, related_id, created_at
            FROM ledger_entries
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// Both legs of a transfer, debit first.
    pub async fn entries_for_transfer(&self, transfer_id: TransferId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT seq, id, account_id, amount, direction, reason, transfer_id, related_id, created_at
            FROM ledger_entries
            WHERE transfer_id = ?
            ORDER BY seq
            "#,
        )
        .bind(transfer_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list entries for transfer")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// Mutate one stored balance inside an open transaction, enforcing the
    /// non-negative floor for user accounts. Credits to unknown accounts
    /// create the account row.
    async fn apply_delta(
        tx: &mut Transaction<'_, Sqlite>,
        account_id: &str,
        delta: MinorUnits,
    ) -> Result<(), StorageError> {
        if delta >= 0 {
            sqlx::query(
                r#"
                INSERT INTO accounts (id, kind, balance, version, created_at)
                VALUES (?, 'user', ?, 1, ?)
                ON CONFLICT(id) DO UPDATE SET
                    balance = balance + excluded.balance,
                    version = version + 1
                "#,
            )
            .bind(account_id)
            .bind(delta)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut **tx)
            .await
            .context("Failed to credit account")?;
            return Ok(());
        }

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + ?1, version = version + 1
            WHERE id = ?2 AND (kind = 'system' OR balance + ?1 >= 0)
            "#,
        )
        .bind(delta)
        .bind(account_id)
        .execute(&mut **tx)
        .await
        .context("Failed to debit account")?;

        if updated.rows_affected() == 0 {
            // Either the account is missing or the debit would cross zero.
            let balance = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
                .bind(account_id)
                .fetch_optional(&mut **tx)
                .await
                .context("Failed to read balance after rejected debit")?
                .map(|row| row.get::<MinorUnits, _>("balance"))
                .unwrap_or(0);
            return Err(StorageError::InsufficientFunds {
                account: account_id.to_string(),
                balance,
                requested: -delta,
            });
        }

        Ok(())
    }

    /// Apply both legs of a transfer inside an open transaction.
    /// Balance updates run in ascending account-id order.
    async fn apply_transfer_legs(
        tx: &mut Transaction<'_, Sqlite>,
        record: &mut TransferRecord,
    ) -> Result<(), StorageError> {
        let mut legs = [
            (record.debit.account_id.clone(), record.debit.amount),
            (record.credit.account_id.clone(), record.credit.amount),
        ];
        legs.sort();
        for (account_id, delta) in &legs {
            Self::apply_delta(tx, account_id, *delta).await?;
        }

        Self::insert_entry(tx, &mut record.debit).await?;
        Self::insert_entry(tx, &mut record.credit).await?;
        Ok(())
    }

    /// Append one entry inside an open transaction.
    /// Assigns the next sequence number into the entry.
    async fn insert_entry(
        tx: &mut Transaction<'_, Sqlite>,
        entry: &mut LedgerEntry,
    ) -> Result<(), StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, account_id, amount, direction, reason, transfer_id, related_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING seq
            "#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.account_id)
        .bind(entry.amount)
        .bind(entry.direction.as_str())
        .bind(entry.reason.as_str())
        .bind(entry.transfer_id.to_string())
        .bind(entry.related_id.map(|id| id.to_string()))
        .bind(entry.created_at.to_rfc3339())
        .fetch_one(&mut **tx)
        .await
        .context("Failed to append ledger entry")?;

        entry.seq = row.get("seq");
        Ok(())
    }

    fn row_to_entry(row: &SqliteRow) -> Result<LedgerEntry> {
        let id_str: String = row.get("id");
        let direction_str: String = row.get("direction");
        let reason_str: String = row.get("reason");
        let transfer_id_str: String = row.get("transfer_id");
        let related_id_str: Option<String> = row.get("related_id");
        let created_at_str: String = row.get("created_at");

        Ok(LedgerEntry {
            id: Uuid::parse_str(&id_str).context("Invalid entry ID")?,
            seq: row.get("seq"),
            account_id: row.get("account_id"),
            amount: row.get("amount"),
            direction: Direction::from_str(&direction_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid direction: {}", direction_str))?,
            reason: EntryReason::from_str(&reason_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid entry reason: {}", reason_str))?,
            transfer_id: Uuid::parse_str(&transfer_id_str).context("Invalid transfer ID")?,
            related_id: related_id_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid related entry ID")?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Order operations
    // ========================

    /// Save a new order to the database.
    pub async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, buyer_id, seller_id, product_id, quantity, unit_price, total, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id.to_string())
        .bind(&order.buyer_id)
        .bind(&order.seller_id)
        .bind(&order.product_id)
        .bind(order.quantity)
        .bind(order.unit_price)
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save order")?;
        Ok(())
    }

    /// Get an order by ID.
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, buyer_id, seller_id, product_id, quantity, unit_price, total, status, created_at, updated_at
            FROM orders
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch order")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_order(&row)?)),
            None => Ok(None),
        }
    }

    /// List orders for a buyer, newest first.
    pub async fn list_orders_for_buyer(&self, buyer_id: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, buyer_id, seller_id, product_id, quantity, unit_price, total, status, created_at, updated_at
            FROM orders
            WHERE buyer_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders for buyer")?;

        rows.iter().map(Self::row_to_order).collect()
    }

    /// List all orders, oldest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, buyer_id, seller_id, product_id, quantity, unit_price, total, status, created_at, updated_at
            FROM orders
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders")?;

        rows.iter().map(Self::row_to_order).collect()
    }

    /// Conditionally transition an order. Returns whether this call won the
    /// transition; `false` means the order was not in `from` anymore.
    pub async fn transition_order(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(order_id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to transition order")?;

        Ok(result.rows_affected() == 1)
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order> {
        let id_str: String = row.get("id");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Order {
            id: Uuid::parse_str(&id_str).context("Invalid order ID")?,
            buyer_id: row.get("buyer_id"),
            seller_id: row.get("seller_id"),
            product_id: row.get("product_id"),
            quantity: row.get("quantity"),
            unit_price: row.get("unit_price"),
            total: row.get("total"),
            status: OrderStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid order status: {}", status_str))?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Product operations
    // ========================

    /// Save a new product to the database.
    pub async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, name, unit_price, stock, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.seller_id)
        .bind(&product.name)
        .bind(product.unit_price)
        .bind(product.stock)
        .bind(product.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save product")?;
        Ok(())
    }

    /// Get a product by ID.
    pub async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, seller_id, name, unit_price, stock, created_at
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch product")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_product(&row)?)),
            None => Ok(None),
        }
    }

    /// List all products, ordered by name.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, seller_id, name, unit_price, stock, created_at
            FROM products
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list products")?;

        rows.iter().map(Self::row_to_product).collect()
    }

    /// Take `quantity` units off a product's stock if enough are available.
    /// Returns whether the decrement happened.
    pub async fn decrement_stock(&self, id: &str, quantity: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?1
            WHERE id = ?2 AND stock >= ?1
            "#,
        )
        .bind(quantity)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to decrement stock")?;

        Ok(result.rows_affected() == 1)
    }

    /// Put `quantity` units back on a product's stock.
    pub async fn increment_stock(&self, id: &str, quantity: i64) -> Result<()> {
        sqlx::query("UPDATE products SET stock = stock + ? WHERE id = ?")
            .bind(quantity)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to increment stock")?;
        Ok(())
    }

    fn row_to_product(row: &SqliteRow) -> Result<Product> {
        let created_at_str: String = row.get("created_at");

        Ok(Product {
            id: row.get("id"),
            seller_id: row.get("seller_id"),
            name: row.get("name"),
            unit_price: row.get("unit_price"),
            stock: row.get("stock"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
