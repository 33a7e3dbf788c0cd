// Work order core
pub mod display_id;
pub mod quantities;
pub mod work_orders;

pub use work_orders::WorkOrderService;
