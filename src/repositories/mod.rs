use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod work_order_repository;

pub use work_order_repository::{
    NewWorkOrder, SeaOrmWorkOrderRepository, WorkOrderChanges, WorkOrderDetails,
    WorkOrderFilter, WorkOrderRepository,
};

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
