use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::services::quantities::QuantityBucket;

/// Size grid ("numerata") naming the twenty quantity buckets of a work order.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "size_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// JSON array of up to twenty labels, one per bucket in order.
    #[sea_orm(column_type = "Json")]
    pub labels: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::work_order::Entity")]
    WorkOrders,
}

impl Related<super::work_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Label printed for `bucket`, if the template names it.
    pub fn label_for(&self, bucket: QuantityBucket) -> Option<&str> {
        self.labels
            .as_array()?
            .get(bucket.index())?
            .as_str()
            .filter(|label| !label.trim().is_empty())
    }
}
