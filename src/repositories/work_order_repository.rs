use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use crate::errors::ServiceError;
use crate::models::work_order::{self, ActiveModel, Column, Entity as WorkOrder};
use crate::models::{department, laboratory, production_line, size_template, WorkOrderKind};
use crate::repositories::{BaseRepository, Repository};
use crate::services::quantities::{Quantities, QuantityPatch};

/// Fields of a work order about to be inserted. Derived values are already computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkOrder {
    pub kind: WorkOrderKind,
    pub display_id: String,
    pub laboratory_id: Option<i32>,
    pub department_id: Option<i32>,
    pub line_id: Option<i32>,
    pub size_template_id: Option<i32>,
    pub article: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub quantities: Quantities,
    pub total_quantity: i64,
}

/// Partial update. `None` leaves a column alone; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkOrderChanges {
    pub laboratory_id: Option<Option<i32>>,
    pub department_id: Option<Option<i32>>,
    pub line_id: Option<Option<i32>>,
    pub size_template_id: Option<Option<i32>>,
    pub article: Option<Option<String>>,
    pub reason: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub buckets: QuantityPatch,
    pub total_quantity: Option<i64>,
    pub completed: Option<bool>,
    pub closed_at: Option<Option<DateTime<Utc>>>,
}

impl WorkOrderChanges {
    fn apply(self, active: &mut ActiveModel) {
        if let Some(value) = self.laboratory_id {
            active.laboratory_id = Set(value);
        }
        if let Some(value) = self.department_id {
            active.department_id = Set(value);
        }
        if let Some(value) = self.line_id {
            active.line_id = Set(value);
        }
        if let Some(value) = self.size_template_id {
            active.size_template_id = Set(value);
        }
        if let Some(value) = self.article {
            active.article = Set(value);
        }
        if let Some(value) = self.reason {
            active.reason = Set(value);
        }
        if let Some(value) = self.notes {
            active.notes = Set(value);
        }
        for (bucket, count) in self.buckets.iter() {
            active.set_bucket(bucket, count);
        }
        if let Some(total) = self.total_quantity {
            active.total_quantity = Set(total);
        }
        if let Some(completed) = self.completed {
            active.completed = Set(completed);
        }
        if let Some(closed_at) = self.closed_at {
            active.closed_at = Set(closed_at);
        }
    }
}

/// A work order with its classification entities resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkOrderDetails {
    #[serde(flatten)]
    pub work_order: work_order::Model,
    pub laboratory: Option<laboratory::Model>,
    pub department: Option<department::Model>,
    pub line: Option<production_line::Model>,
    pub size_template: Option<size_template::Model>,
}

impl WorkOrderDetails {
    /// Details without any joined entity, for callers that only hold the row.
    pub fn bare(work_order: work_order::Model) -> Self {
        Self {
            work_order,
            laboratory: None,
            department: None,
            line: None,
            size_template: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrderFilter {
    pub kind: Option<WorkOrderKind>,
    pub completed: Option<bool>,
    /// 1-based
    pub page: u64,
    pub per_page: u64,
}

/// Persistence collaborator for work orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkOrderRepository: Send + Sync {
    /// Display id of the most recently created work order of `kind` (highest surrogate id).
    async fn latest_display_id(&self, kind: WorkOrderKind)
        -> Result<Option<String>, ServiceError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<WorkOrderDetails>, ServiceError>;

    /// Fails with `ServiceError::Conflict` when `(kind, display_id)` is taken.
    async fn insert(&self, new: NewWorkOrder) -> Result<WorkOrderDetails, ServiceError>;

    async fn update(
        &self,
        id: i32,
        changes: WorkOrderChanges,
    ) -> Result<WorkOrderDetails, ServiceError>;

    /// Removes an open work order. A completed one is left in place and
    /// reported as `ServiceError::PreconditionFailed`.
    async fn delete(&self, id: i32) -> Result<(), ServiceError>;

    async fn list(
        &self,
        filter: WorkOrderFilter,
    ) -> Result<(Vec<work_order::Model>, u64), ServiceError>;

    async fn count(&self, kind: WorkOrderKind, completed: bool) -> Result<u64, ServiceError>;
}

/// Relational implementation backed by sea-orm
#[derive(Debug, Clone)]
pub struct SeaOrmWorkOrderRepository {
    base: BaseRepository,
}

impl SeaOrmWorkOrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn load_details(
        &self,
        model: work_order::Model,
    ) -> Result<WorkOrderDetails, ServiceError> {
        let db = self.base.get_db();

        let laboratory = match model.laboratory_id {
            Some(_) => model
                .find_related(laboratory::Entity)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?,
            None => None,
        };
        let department = match model.department_id {
            Some(_) => model
                .find_related(department::Entity)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?,
            None => None,
        };
        let line = match model.line_id {
            Some(_) => model
                .find_related(production_line::Entity)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?,
            None => None,
        };
        let size_template = match model.size_template_id {
            Some(_) => model
                .find_related(size_template::Entity)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?,
            None => None,
        };

        Ok(WorkOrderDetails {
            work_order: model,
            laboratory,
            department,
            line,
            size_template,
        })
    }
}

#[async_trait]
impl WorkOrderRepository for SeaOrmWorkOrderRepository {
    #[instrument(skip(self))]
    async fn latest_display_id(
        &self,
        kind: WorkOrderKind,
    ) -> Result<Option<String>, ServiceError> {
        WorkOrder::find()
            .select_only()
            .column(Column::DisplayId)
            .filter(Column::Kind.eq(kind))
            .order_by_desc(Column::Id)
            .into_tuple::<String>()
            .one(self.base.get_db())
            .await
            .map_err(|e| {
                error!("Database error when reading latest display id for {}: {}", kind, e);
                ServiceError::db_error(e)
            })
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> Result<Option<WorkOrderDetails>, ServiceError> {
        let model = WorkOrder::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(|e| {
                error!("Database error when fetching work order {}: {}", id, e);
                ServiceError::db_error(e)
            })?;

        match model {
            Some(model) => Ok(Some(self.load_details(model).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, new), fields(kind = %new.kind, display_id = %new.display_id))]
    async fn insert(&self, new: NewWorkOrder) -> Result<WorkOrderDetails, ServiceError> {
        let mut active = ActiveModel {
            kind: Set(new.kind),
            display_id: Set(new.display_id),
            laboratory_id: Set(new.laboratory_id),
            department_id: Set(new.department_id),
            line_id: Set(new.line_id),
            size_template_id: Set(new.size_template_id),
            article: Set(new.article),
            reason: Set(new.reason),
            notes: Set(new.notes),
            total_quantity: Set(new.total_quantity),
            completed: Set(false),
            closed_at: Set(None),
            ..Default::default()
        };
        active.set_quantities(&new.quantities);

        let model = active
            .insert(self.base.get_db())
            .await
            .map_err(ServiceError::db_error)?;
        debug!(id = model.id, "inserted work order");

        self.load_details(model).await
    }

    #[instrument(skip(self, changes))]
    async fn update(
        &self,
        id: i32,
        changes: WorkOrderChanges,
    ) -> Result<WorkOrderDetails, ServiceError> {
        let db = self.base.get_db();
        let existing = WorkOrder::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order with ID {} not found", id)))?;

        let mut active: ActiveModel = existing.into();
        changes.apply(&mut active);

        let saved = active.update(db).await.map_err(|e| {
            error!("Failed to update work order {}: {}", id, e);
            ServiceError::db_error(e)
        })?;

        self.load_details(saved).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.base.get_db();
        let result = WorkOrder::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::Completed.eq(false))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected > 0 {
            return Ok(());
        }

        match WorkOrder::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
        {
            Some(existing) => Err(ServiceError::PreconditionFailed(format!(
                "Work order {} is completed and cannot be deleted",
                existing.display_id
            ))),
            None => Err(ServiceError::NotFound(format!(
                "Work order with ID {} not found",
                id
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: WorkOrderFilter,
    ) -> Result<(Vec<work_order::Model>, u64), ServiceError> {
        let mut query = WorkOrder::find();
        if let Some(kind) = filter.kind {
            query = query.filter(Column::Kind.eq(kind));
        }
        if let Some(completed) = filter.completed {
            query = query.filter(Column::Completed.eq(completed));
        }

        let paginator = query
            .order_by_desc(Column::Id)
            .paginate(self.base.get_db(), filter.per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;

        let work_orders = paginator
            .fetch_page(filter.page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((work_orders, total))
    }

    #[instrument(skip(self))]
    async fn count(&self, kind: WorkOrderKind, completed: bool) -> Result<u64, ServiceError> {
        WorkOrder::find()
            .filter(Column::Kind.eq(kind))
            .filter(Column::Completed.eq(completed))
            .count(self.base.get_db())
            .await
            .map_err(ServiceError::db_error)
    }
}
