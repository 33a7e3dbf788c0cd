use crate::commands::{Command, CommandContext};
use crate::events::Event;
use crate::{
    errors::ServiceError,
    models::WorkOrderKind,
    repositories::{NewWorkOrder, WorkOrderDetails},
    retry::{with_retry, ConflictRetryPolicy, RetryConfig},
    services::quantities::{aggregate, Quantities, QuantityPatch},
};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateWorkOrderCommand {
    #[serde(default)]
    pub kind: WorkOrderKind,
    /// Generated from the latest work order of the same kind when absent.
    #[validate(length(min = 1, max = 32))]
    pub display_id: Option<String>,
    pub laboratory_id: Option<i32>,
    pub department_id: Option<i32>,
    pub line_id: Option<i32>,
    pub size_template_id: Option<i32>,
    pub article: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub quantities: QuantityPatch,
}

#[async_trait]
impl Command for CreateWorkOrderCommand {
    type Result = WorkOrderDetails;

    #[instrument(skip(self, ctx), fields(kind = %self.kind))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let created = match &self.display_id {
            Some(display_id) => ctx
                .repository
                .insert(self.new_work_order(display_id.clone()))
                .await
                .map_err(|e| {
                    if e.is_conflict() {
                        counter!("workorders.display_id.conflicts", 1);
                        warn!("Display id {} is already taken for {}", display_id, self.kind);
                    }
                    e
                })?,
            None => self.insert_with_generated_id(ctx).await?,
        };

        counter!("workorders.created", 1);
        info!(
            "Work order created with ID: {}. Display ID: {}, total quantity: {}",
            created.work_order.id, created.work_order.display_id, created.work_order.total_quantity
        );
        ctx.event_sender
            .publish(Event::WorkOrderCreated {
                id: created.work_order.id,
                kind: created.work_order.kind,
                display_id: created.work_order.display_id.clone(),
            })
            .await;

        Ok(created)
    }
}

impl CreateWorkOrderCommand {
    /// Reads the latest display id, steps it and inserts. A concurrent writer
    /// taking the same id surfaces as `Conflict`; after a randomized pause the
    /// read is repeated, up to `create_max_attempts` times.
    async fn insert_with_generated_id(
        &self,
        ctx: &CommandContext,
    ) -> Result<WorkOrderDetails, ServiceError> {
        let retry = RetryConfig::from(&ctx.settings);

        with_retry(&retry, ConflictRetryPolicy, || self.try_generated_id(ctx))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    error!(
                        "Giving up on display id for {} after {} attempts",
                        self.kind, retry.max_attempts
                    );
                }
                e
            })
    }

    async fn try_generated_id(&self, ctx: &CommandContext) -> Result<WorkOrderDetails, ServiceError> {
        let latest = ctx.repository.latest_display_id(self.kind).await?;
        let display_id = ctx.display_ids().next_after(latest.as_deref()).map_err(|e| {
            error!(
                "Cannot derive the next display id for {} from {:?}: {}",
                self.kind, latest, e
            );
            e
        })?;

        ctx.repository
            .insert(self.new_work_order(display_id.clone()))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    counter!("workorders.display_id.conflicts", 1);
                    debug!("Display id {} for {} was taken concurrently", display_id, self.kind);
                }
                e
            })
    }

    fn new_work_order(&self, display_id: String) -> NewWorkOrder {
        NewWorkOrder {
            kind: self.kind,
            display_id,
            laboratory_id: self.laboratory_id,
            department_id: self.department_id,
            line_id: self.line_id,
            size_template_id: self.size_template_id,
            article: self.article.clone(),
            reason: self.reason.clone(),
            notes: self.notes.clone(),
            quantities: Quantities::default().overlay(&self.quantities),
            total_quantity: aggregate(&self.quantities).unwrap_or(0),
        }
    }
}
