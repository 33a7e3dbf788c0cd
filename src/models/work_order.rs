use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::services::quantities::{Quantities, QuantityBucket};

/// Work order family. Each kind owns its own display id sequence.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WorkOrderKind {
    #[default]
    #[sea_orm(string_value = "repair")]
    Repair,
    #[sea_orm(string_value = "internal_repair")]
    InternalRepair,
    #[sea_orm(string_value = "production_launch")]
    #[strum(to_string = "production_launch", serialize = "launch")]
    ProductionLaunch,
}

impl WorkOrderKind {
    pub const ALL: [WorkOrderKind; 3] = [
        WorkOrderKind::Repair,
        WorkOrderKind::InternalRepair,
        WorkOrderKind::ProductionLaunch,
    ];
}

/// Lifecycle state derived from the `completed` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkOrderState {
    Open,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub kind: WorkOrderKind,
    pub display_id: String,
    pub laboratory_id: Option<i32>,
    pub department_id: Option<i32>,
    pub line_id: Option<i32>,
    pub size_template_id: Option<i32>,
    pub article: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub p01: i32,
    pub p02: i32,
    pub p03: i32,
    pub p04: i32,
    pub p05: i32,
    pub p06: i32,
    pub p07: i32,
    pub p08: i32,
    pub p09: i32,
    pub p10: i32,
    pub p11: i32,
    pub p12: i32,
    pub p13: i32,
    pub p14: i32,
    pub p15: i32,
    pub p16: i32,
    pub p17: i32,
    pub p18: i32,
    pub p19: i32,
    pub p20: i32,
    pub total_quantity: i64,
    pub completed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::laboratory::Entity",
        from = "Column::LaboratoryId",
        to = "super::laboratory::Column::Id"
    )]
    Laboratory,
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
    #[sea_orm(
        belongs_to = "super::production_line::Entity",
        from = "Column::LineId",
        to = "super::production_line::Column::Id"
    )]
    ProductionLine,
    #[sea_orm(
        belongs_to = "super::size_template::Entity",
        from = "Column::SizeTemplateId",
        to = "super::size_template::Column::Id"
    )]
    SizeTemplate,
}

impl Related<super::laboratory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Laboratory.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::production_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionLine.def()
    }
}

impl Related<super::size_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SizeTemplate.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
            if let ActiveValue::NotSet = self.completed {
                self.completed = ActiveValue::Set(false);
            }
        }

        self.updated_at = ActiveValue::Set(now);

        Ok(self)
    }
}

impl Column {
    /// Column holding the given size bucket.
    pub fn for_bucket(bucket: QuantityBucket) -> Self {
        match bucket {
            QuantityBucket::P01 => Column::P01,
            QuantityBucket::P02 => Column::P02,
            QuantityBucket::P03 => Column::P03,
            QuantityBucket::P04 => Column::P04,
            QuantityBucket::P05 => Column::P05,
            QuantityBucket::P06 => Column::P06,
            QuantityBucket::P07 => Column::P07,
            QuantityBucket::P08 => Column::P08,
            QuantityBucket::P09 => Column::P09,
            QuantityBucket::P10 => Column::P10,
            QuantityBucket::P11 => Column::P11,
            QuantityBucket::P12 => Column::P12,
            QuantityBucket::P13 => Column::P13,
            QuantityBucket::P14 => Column::P14,
            QuantityBucket::P15 => Column::P15,
            QuantityBucket::P16 => Column::P16,
            QuantityBucket::P17 => Column::P17,
            QuantityBucket::P18 => Column::P18,
            QuantityBucket::P19 => Column::P19,
            QuantityBucket::P20 => Column::P20,
        }
    }
}

impl ActiveModel {
    pub fn set_bucket(&mut self, bucket: QuantityBucket, count: i32) {
        self.set(Column::for_bucket(bucket), count.into());
    }

    /// Writes all twenty buckets.
    pub fn set_quantities(&mut self, quantities: &Quantities) {
        for (index, count) in quantities.as_array().iter().enumerate() {
            if let Some(bucket) = QuantityBucket::from_index(index) {
                self.set_bucket(bucket, *count);
            }
        }
    }
}

impl Model {
    pub fn quantities(&self) -> Quantities {
        Quantities::new([
            self.p01, self.p02, self.p03, self.p04, self.p05, self.p06, self.p07, self.p08,
            self.p09, self.p10, self.p11, self.p12, self.p13, self.p14, self.p15, self.p16,
            self.p17, self.p18, self.p19, self.p20,
        ])
    }

    pub fn state(&self) -> WorkOrderState {
        if self.completed {
            WorkOrderState::Completed
        } else {
            WorkOrderState::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == WorkOrderState::Open
    }

    /// Only open work orders may be deleted.
    pub fn can_delete(&self) -> bool {
        self.is_open()
    }
}
