pub mod error;
pub mod validation;
pub mod value;

pub use error::{OrmError, Result};
pub use validation::{FieldError, ValidationError};
pub use value::Value;
