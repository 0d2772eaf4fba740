pub mod get_more_executor;
pub mod kill_cursors_executor;
pub mod query_executor;
pub mod shared;
