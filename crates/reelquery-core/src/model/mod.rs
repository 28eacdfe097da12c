//! Schema Registry: static, immutable entity descriptions shared by every
//! request for the process lifetime.

mod entity;
mod field;
mod registry;
mod relation;

// re-exports
pub use entity::{EntityDescriptor, UniqueKey};
pub use field::{FieldDescriptor, ScalarKind};
pub use registry::{SchemaBuildError, SchemaError, SchemaRegistry, SchemaRegistryBuilder};
pub use relation::{Cardinality, Ownership, RelationDescriptor};
