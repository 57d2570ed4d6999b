pub mod binding;
pub mod component;
pub mod config;
pub mod data;
pub mod row;

pub use binding::FormErrors;
pub use component::{FieldClass, FormContext, ScaffoldForm, classify_field};
pub use config::ScaffoldFormConfig;
pub use data::{FormData, FormValue};
pub use row::{Choice, FormRow, FormTab, RowKind};
