pub mod initdb;
pub mod serve;
pub mod sweep;

pub use initdb::init_database;
pub use serve::serve;
pub use sweep::run_sweep;
