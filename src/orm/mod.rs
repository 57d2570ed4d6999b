pub mod definition;
pub mod entry;
pub mod format;
pub mod manager;
pub mod memory;
pub mod meta;
pub mod model;
pub mod query;

pub use entry::{Entry, FieldAccess, FieldValue};
pub use format::EntryFormatter;
pub use manager::OrmManager;
pub use memory::{MemoryModel, MemoryStore};
pub use meta::{FieldKind, ModelField, ModelIndex, ModelMeta, Options, PRIMARY_KEY, PropertyType, Relation, RelationKind};
pub use model::Model;
pub use query::ModelQuery;
