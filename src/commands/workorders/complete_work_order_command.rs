use crate::commands::{workorders::load_existing, Command, CommandContext};
use crate::events::Event;
use crate::{
    errors::ServiceError,
    repositories::{WorkOrderChanges, WorkOrderDetails},
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteWorkOrderCommand {
    pub work_order_id: i32,
}

#[async_trait]
impl Command for CompleteWorkOrderCommand {
    type Result = WorkOrderDetails;

    #[instrument(skip(self, ctx), fields(id = self.work_order_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let existing = load_existing(ctx, self.work_order_id).await?;
        if existing.work_order.completed {
            info!(
                "Work order {} is already completed; closing time will be re-stamped",
                self.work_order_id
            );
        }

        let closed_at = Utc::now();
        let changes = WorkOrderChanges {
            completed: Some(true),
            closed_at: Some(Some(closed_at)),
            ..Default::default()
        };
        let completed = ctx.repository.update(self.work_order_id, changes).await?;

        counter!("workorders.completed", 1);
        info!(
            "Work order ID: {} marked as completed at {}",
            self.work_order_id, closed_at
        );
        ctx.event_sender
            .publish(Event::WorkOrderCompleted {
                id: self.work_order_id,
                closed_at,
            })
            .await;

        Ok(completed)
    }
}
