pub mod core;
pub mod files;
pub mod forms;
pub mod records;
pub mod views;
