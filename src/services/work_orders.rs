use crate::{
    commands::workorders::{
        CompleteWorkOrderCommand, CreateWorkOrderCommand, DeleteWorkOrderCommand,
        GetWorkOrderCommand, ListWorkOrdersCommand, UpdateWorkOrderCommand, WorkOrderPatch,
        WorkOrderStatusCounts, WorkOrderStatusCountsCommand,
    },
    commands::{Command, CommandContext},
    config::WorkOrderConfig,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{work_order, WorkOrderKind},
    repositories::{SeaOrmWorkOrderRepository, WorkOrderDetails, WorkOrderRepository},
};
use std::sync::Arc;
use tracing::instrument;

/// Service for managing work orders
#[derive(Clone)]
pub struct WorkOrderService {
    ctx: CommandContext,
}

impl WorkOrderService {
    /// Creates a new work order service instance
    pub fn new(
        repository: Arc<dyn WorkOrderRepository>,
        event_sender: Arc<EventSender>,
        settings: WorkOrderConfig,
    ) -> Self {
        Self {
            ctx: CommandContext::new(repository, event_sender, settings),
        }
    }

    /// Service backed by the relational repository
    pub fn with_database(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        settings: WorkOrderConfig,
    ) -> Self {
        Self::new(
            Arc::new(SeaOrmWorkOrderRepository::new(db_pool)),
            event_sender,
            settings,
        )
    }

    pub fn settings(&self) -> &WorkOrderConfig {
        &self.ctx.settings
    }

    /// Creates a new work order
    #[instrument(skip(self, command), err)]
    pub async fn create(
        &self,
        command: CreateWorkOrderCommand,
    ) -> Result<WorkOrderDetails, ServiceError> {
        command.execute(&self.ctx).await
    }

    /// Applies a partial update
    #[instrument(skip(self, patch), err)]
    pub async fn update(
        &self,
        id: i32,
        patch: WorkOrderPatch,
    ) -> Result<WorkOrderDetails, ServiceError> {
        UpdateWorkOrderCommand { id, patch }.execute(&self.ctx).await
    }

    /// Completes a work order
    #[instrument(skip(self), err)]
    pub async fn complete(&self, id: i32) -> Result<WorkOrderDetails, ServiceError> {
        CompleteWorkOrderCommand { work_order_id: id }
            .execute(&self.ctx)
            .await
    }

    /// Deletes an open work order
    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        DeleteWorkOrderCommand { work_order_id: id }
            .execute(&self.ctx)
            .await
    }

    /// Retrieves a work order with its classification entities
    #[instrument(skip(self), err)]
    pub async fn get(&self, id: i32) -> Result<WorkOrderDetails, ServiceError> {
        GetWorkOrderCommand { work_order_id: id }
            .execute(&self.ctx)
            .await
    }

    /// Lists work orders newest first, with the total number of matches
    #[instrument(skip(self), err)]
    pub async fn list(
        &self,
        query: ListWorkOrdersCommand,
    ) -> Result<(Vec<work_order::Model>, u64), ServiceError> {
        query.execute(&self.ctx).await
    }

    #[instrument(skip(self), err)]
    pub async fn status_counts(
        &self,
        kind: WorkOrderKind,
    ) -> Result<WorkOrderStatusCounts, ServiceError> {
        WorkOrderStatusCountsCommand { kind }
            .execute(&self.ctx)
            .await
    }
}
