pub mod mongo;
pub mod tcp;
pub mod utils;
