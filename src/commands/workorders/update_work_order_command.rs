use crate::commands::{workorders::load_existing, Command, CommandContext};
use crate::events::Event;
use crate::{
    errors::ServiceError,
    repositories::{WorkOrderChanges, WorkOrderDetails},
    services::quantities::{recompute_total, QuantityPatch},
};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument};

/// Partial update payload. Absent fields stay untouched, `null` clears a
/// nullable field. `kind`, `display_id`, `total_quantity` and the completion
/// fields are not patchable and are ignored if sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderPatch {
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub laboratory_id: Option<Option<i32>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub department_id: Option<Option<i32>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_id: Option<Option<i32>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub size_template_id: Option<Option<i32>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub article: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
    #[serde(flatten)]
    pub quantities: QuantityPatch,
}

// A present key, even `null`, becomes `Some(..)`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateWorkOrderCommand {
    pub id: i32,
    #[serde(flatten)]
    pub patch: WorkOrderPatch,
}

#[async_trait]
impl Command for UpdateWorkOrderCommand {
    type Result = WorkOrderDetails;

    #[instrument(skip(self, ctx), fields(id = self.id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let existing = load_existing(ctx, self.id).await?;

        let total_quantity = recompute_total(
            ctx.settings.total_policy,
            &self.patch.quantities,
            &existing.work_order.quantities(),
        );

        let changes = WorkOrderChanges {
            laboratory_id: self.patch.laboratory_id,
            department_id: self.patch.department_id,
            line_id: self.patch.line_id,
            size_template_id: self.patch.size_template_id,
            article: self.patch.article.clone(),
            reason: self.patch.reason.clone(),
            notes: self.patch.notes.clone(),
            buckets: self.patch.quantities.clone(),
            total_quantity,
            ..Default::default()
        };

        let updated = ctx.repository.update(self.id, changes).await?;

        info!(
            "Work order {} updated. Buckets patched: {}, total quantity: {}",
            self.id,
            self.patch.quantities.len(),
            updated.work_order.total_quantity
        );
        ctx.event_sender
            .publish(Event::WorkOrderUpdated(self.id))
            .await;

        Ok(updated)
    }
}
