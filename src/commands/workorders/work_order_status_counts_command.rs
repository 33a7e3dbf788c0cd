use crate::commands::{Command, CommandContext};
use crate::{errors::ServiceError, models::WorkOrderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderStatusCountsCommand {
    pub kind: WorkOrderKind,
}

/// Open and completed work orders of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderStatusCounts {
    pub kind: WorkOrderKind,
    pub open: u64,
    pub completed: u64,
}

impl WorkOrderStatusCounts {
    pub fn total(&self) -> u64 {
        self.open + self.completed
    }
}

#[async_trait]
impl Command for WorkOrderStatusCountsCommand {
    type Result = WorkOrderStatusCounts;

    #[instrument(skip(self, ctx), fields(kind = %self.kind))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let open = ctx.repository.count(self.kind, false).await?;
        let completed = ctx.repository.count(self.kind, true).await?;
        Ok(WorkOrderStatusCounts {
            kind: self.kind,
            open,
            completed,
        })
    }
}
