// ============================================================================
// ORM Scaffold
// ============================================================================

//! Metadata-driven scaffolding for ORM models.
//!
//! Models are described by [`ModelMeta`] definitions. From those the crate
//! derives paginated listing tables, recursive entry forms following the
//! relations of a model, CSV and JSON exports and a read-only browser of the
//! definitions, all served over HTTP by [`build_router`].
//!
//! ```
//! use orm_scaffold::{FieldAccess, Model, ModelField, ModelMeta, OrmManager, PropertyType, Value};
//!
//! # fn main() -> orm_scaffold::Result<()> {
//! let tag = ModelMeta::new("Tag")
//!     .with_field(ModelField::property("name", PropertyType::String))
//!     .with_format("title", "{name}");
//!
//! let orm = OrmManager::in_memory(vec![tag])?;
//! let model = orm.get_model("Tag")?;
//!
//! let mut entry = model.create_entry();
//! entry.set_field("name", Value::from("rust").into());
//! model.save(&mut entry)?;
//!
//! assert_eq!(model.count(&model.create_query(None))?, 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod export;
pub mod expression;
pub mod form;
pub mod orm;
pub mod services;
pub mod table;
pub mod web;

pub use core::{FieldError, OrmError, Result, ValidationError, Value};
pub use orm::{Entry, FieldAccess, FieldValue, Model, ModelField, ModelMeta, ModelQuery, OrmManager, PropertyType, RelationKind};
pub use web::{ScaffoldState, build_router};
