pub mod clustering;
pub mod community;
pub mod graph_store;
pub mod utils;
