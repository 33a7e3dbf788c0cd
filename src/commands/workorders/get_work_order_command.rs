use crate::commands::{workorders::load_existing, Command, CommandContext};
use crate::{errors::ServiceError, repositories::WorkOrderDetails};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetWorkOrderCommand {
    pub work_order_id: i32,
}

#[async_trait]
impl Command for GetWorkOrderCommand {
    type Result = WorkOrderDetails;

    #[instrument(skip(self, ctx), fields(id = self.work_order_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        load_existing(ctx, self.work_order_id).await
    }
}
