//! Work Order Commands Module
//!
//! One command per lifecycle operation. Commands hold the payload, the
//! [`CommandContext`](crate::commands::CommandContext) supplies persistence,
//! the event channel and the configured policies.

pub mod complete_work_order_command;
pub mod create_work_order_command;
pub mod delete_work_order_command;
pub mod get_work_order_command;
pub mod list_work_orders;
pub mod update_work_order_command;
pub mod work_order_status_counts_command;

pub use complete_work_order_command::CompleteWorkOrderCommand;
pub use create_work_order_command::CreateWorkOrderCommand;
pub use delete_work_order_command::DeleteWorkOrderCommand;
pub use get_work_order_command::GetWorkOrderCommand;
pub use list_work_orders::ListWorkOrdersCommand;
pub use update_work_order_command::{UpdateWorkOrderCommand, WorkOrderPatch};
pub use work_order_status_counts_command::{WorkOrderStatusCounts, WorkOrderStatusCountsCommand};

use crate::errors::ServiceError;
use crate::repositories::WorkOrderDetails;

/// Loads a work order or fails with `NotFound`.
pub(crate) async fn load_existing(
    ctx: &crate::commands::CommandContext,
    id: i32,
) -> Result<WorkOrderDetails, ServiceError> {
    ctx.repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Work order with ID {} not found", id)))
}
