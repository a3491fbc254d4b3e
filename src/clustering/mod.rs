pub mod create_clusters;
pub mod db;
pub mod queries;
pub mod report;
