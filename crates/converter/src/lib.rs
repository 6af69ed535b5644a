//! Schema-evolving record transformation.
//!
//! Records flow through [`RecordService::transform`]: the value shape picks
//! the branch, change events are described against the [`TypeRegistry`],
//! the destination table is checked (and altered if allowed) by the
//! [`SchemaCoordinator`], and the resulting row is serialized with the
//! delete sign appended.

pub mod descriptor;
pub mod record_service;
pub mod schema_evolution;
pub mod table_cache;
pub mod types;

pub use descriptor::{FieldDescriptor, RecordDescriptor};
pub use record_service::RecordService;
pub use schema_evolution::SchemaCoordinator;
pub use table_cache::{CachedTable, TableCache};
pub use types::{ConnectType, TypeError, TypeHandle, TypeRegistry};
