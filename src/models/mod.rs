pub mod department;
pub mod laboratory;
pub mod production_line;
pub mod size_template;
pub mod work_order;

pub use work_order::{
    ActiveModel as WorkOrderActiveModel, Entity as WorkOrderEntity, Model as WorkOrderModel,
    WorkOrderKind, WorkOrderState,
};
