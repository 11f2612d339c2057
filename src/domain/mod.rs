pub mod calculation;
pub mod catalog;
pub mod models;
pub mod validation;
