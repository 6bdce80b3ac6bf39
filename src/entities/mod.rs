pub mod institution;
pub mod institution_stock;
pub mod logistic;
pub mod medicine;
pub mod receipt_log;
pub mod requirement;
pub mod usage_log;
pub mod warehouse;
pub mod warehouse_stock;
