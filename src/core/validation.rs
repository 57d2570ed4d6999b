use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single failed validation rule for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Translation key of the message, eg `error.validation.required`
    pub code: String,
    /// Fallback message, used when no translation exists for `code`
    pub message: String,
    pub parameters: BTreeMap<String, String>,
}

impl FieldError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn required(field: &str) -> Self {
        Self::new("error.validation.required", format!("{field} is required"))
            .with_parameter("field", field)
    }
}

/// Collected validation failures keyed by field path.
///
/// Nested paths are joined with a dot, so an error on the `name` field of the
/// entry behind the `author` relation is stored under `author.name`. Errors
/// which do not belong to a field use an empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    errors: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, error: FieldError) {
        self.errors.entry(path.into()).or_default().push(error);
    }

    pub fn add_general(&mut self, error: FieldError) {
        self.add(String::new(), error);
    }

    /// Moves every error of `other` below `prefix`.
    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationError) {
        for (path, errors) in other.errors {
            let path = if path.is_empty() {
                prefix.to_string()
            } else {
                format!("{prefix}.{path}")
            };

            self.errors.entry(path).or_default().extend(errors);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &BTreeMap<String, Vec<FieldError>> {
        &self.errors
    }

    pub fn field_errors(&self, path: &str) -> &[FieldError] {
        self.errors.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed")?;

        let mut first = true;
        for (path, errors) in &self.errors {
            for error in errors {
                f.write_str(if first { ": " } else { "; " })?;
                first = false;

                if path.is_empty() {
                    write!(f, "{}", error.message)?;
                } else {
                    write!(f, "{path}: {}", error.message)?;
                }
            }
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}
