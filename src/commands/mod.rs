use crate::{
    config::WorkOrderConfig, errors::ServiceError, events::EventSender,
    repositories::WorkOrderRepository, services::display_id::DisplayIdGenerator,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Dependencies shared by every command.
#[derive(Clone)]
pub struct CommandContext {
    pub repository: Arc<dyn WorkOrderRepository>,
    pub event_sender: Arc<EventSender>,
    pub settings: WorkOrderConfig,
}

impl CommandContext {
    pub fn new(
        repository: Arc<dyn WorkOrderRepository>,
        event_sender: Arc<EventSender>,
        settings: WorkOrderConfig,
    ) -> Self {
        Self {
            repository,
            event_sender,
            settings,
        }
    }

    pub fn display_ids(&self) -> DisplayIdGenerator {
        DisplayIdGenerator::new(self.settings.display_id_width)
    }
}

/// Command trait for implementing the Command Pattern
///
/// This trait allows for encapsulating all the logic needed to execute a business operation
/// into a single object that can be validated, executed, and produce events.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `ctx` - Repository, event channel and work order settings
    ///
    /// # Returns
    /// * `Result<Self::Result, ServiceError>` - The result of command execution or an error
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError>;
}

pub mod workorders;
