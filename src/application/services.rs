use std::sync::Arc;

use crate::adapters::{NullAnalyticsSink, SqlInventory};
use crate::domain::{AnalyticsSink, Inventory};
use crate::storage::Repository;

use super::{AccountLedger, AppError, OrderSettlement, TransferCoordinator};

/// The assembled application: every use case wired over one repository.
/// This is the primary interface for any client (CLI, API, tests).
pub struct Services {
    pub ledger: AccountLedger,
    pub transfers: TransferCoordinator,
    pub orders: OrderSettlement,
    pub repo: Repository,
}

impl Services {
    /// Wire the services with the default collaborators: catalog-backed
    /// inventory and no analytics.
    pub fn new(repo: Repository) -> Self {
        let inventory = Arc::new(SqlInventory::new(repo.clone()));
        Self::with_collaborators(repo, inventory, Arc::new(NullAnalyticsSink))
    }

    /// Wire the services over explicit collaborators.
    pub fn with_collaborators(
        repo: Repository,
        inventory: Arc<dyn Inventory>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let ledger = AccountLedger::new(repo.clone());
        let transfers = TransferCoordinator::new(repo.clone());
        let orders = OrderSettlement::new(repo.clone(), transfers.clone(), inventory, analytics);
        Self {
            ledger,
            transfers,
            orders,
            repo,
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }
}
