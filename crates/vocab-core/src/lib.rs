#[cfg(not(target_endian = "little"))]
compile_error!("vocab-core requires a little-endian platform");

pub mod capabilities;
pub mod clock;
pub mod config;
pub mod contacts;
pub mod dictionary;
pub mod gc;
pub mod ngram_context;
pub mod policy;
pub mod registry;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod user_history;
