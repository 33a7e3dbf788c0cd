use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    commands::{Command, CommandContext},
    config::WorkOrderConfig,
    errors::ServiceError,
    models::{work_order, WorkOrderKind},
    repositories::WorkOrderFilter,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListWorkOrdersCommand {
    pub kind: Option<WorkOrderKind>,
    pub completed: Option<bool>,
    /// 1-based; defaults to the first page
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ListWorkOrdersCommand {
    /// Page numbers start at 1, page sizes are kept within `1..=max_page_size`.
    pub fn to_filter(&self, settings: &WorkOrderConfig) -> WorkOrderFilter {
        let max_page_size = settings.max_page_size.max(1);
        WorkOrderFilter {
            kind: self.kind,
            completed: self.completed,
            page: self.page.unwrap_or(1).max(1),
            per_page: self
                .per_page
                .unwrap_or(settings.default_page_size)
                .clamp(1, max_page_size),
        }
    }
}

#[async_trait]
impl Command for ListWorkOrdersCommand {
    type Result = (Vec<work_order::Model>, u64);

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let filter = self.to_filter(&ctx.settings);
        let (work_orders, total) = ctx.repository.list(filter).await?;
        info!("Listed {} of {} work orders", work_orders.len(), total);
        Ok((work_orders, total))
    }
}
