pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, validate_bucket_name};
pub use schema::{BucketConfig, ClusterConfig, DevSyncConfig, LoggingConfig, ResourceNames};
