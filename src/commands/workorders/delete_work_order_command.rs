use crate::commands::{workorders::load_existing, Command, CommandContext};
use crate::errors::ServiceError;
use crate::events::Event;
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteWorkOrderCommand {
    pub work_order_id: i32,
}

#[async_trait]
impl Command for DeleteWorkOrderCommand {
    type Result = ();

    #[instrument(skip(self, ctx), fields(id = self.work_order_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let existing = load_existing(ctx, self.work_order_id).await?;

        if !existing.work_order.can_delete() {
            warn!(
                "Refusing to delete completed work order {} ({})",
                self.work_order_id, existing.work_order.display_id
            );
            return Err(ServiceError::PreconditionFailed(format!(
                "Work order {} is completed and cannot be deleted",
                existing.work_order.display_id
            )));
        }

        ctx.repository.delete(self.work_order_id).await?;

        counter!("workorders.deleted", 1);
        info!("Work order ID: {} deleted", self.work_order_id);
        ctx.event_sender
            .publish(Event::WorkOrderDeleted {
                id: self.work_order_id,
                display_id: existing.work_order.display_id,
            })
            .await;

        Ok(())
    }
}
