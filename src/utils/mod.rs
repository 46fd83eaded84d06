pub mod signal;
pub mod sweeper;
pub mod ttl_cache;
