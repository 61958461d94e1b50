//! Business logic services for the Hospital Supply Tracking Platform

pub mod catalog;
pub mod departments;
pub mod distribution;
pub mod history;
pub mod items;
pub mod stock;

pub use catalog::CatalogService;
pub use departments::DepartmentService;
pub use distribution::DistributionService;
pub use history::HistoryService;
