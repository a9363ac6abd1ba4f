pub mod data;
pub mod dataset;
pub mod model;
pub mod report;
pub mod train;
