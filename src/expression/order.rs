use crate::core::{OrmError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Lowercase form used in query strings.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for Direction {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(OrmError::ParseError(format!("Invalid order direction '{}'", other))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        })
    }
}

/// One `{field} ASC|DESC` term of an order fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parses a comma separated fragment such as `{weight} ASC, {name}`.
    pub fn parse_fragment(fragment: &str) -> Result<Vec<OrderBy>> {
        let mut terms = Vec::new();

        for term in fragment.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (field, rest) = match term.strip_prefix('{') {
                Some(stripped) => {
                    let end = stripped.find('}').ok_or_else(|| {
                        OrmError::ParseError(format!("Unterminated field reference in order '{}'", term))
                    })?;
                    (&stripped[..end], stripped[end + 1..].trim())
                }
                None => match term.split_once(char::is_whitespace) {
                    Some((field, rest)) => (field, rest.trim()),
                    None => (term, ""),
                },
            };

            let direction = if rest.is_empty() {
                Direction::Asc
            } else {
                rest.parse()?
            };

            terms.push(OrderBy::new(field.trim(), direction));
        }

        Ok(terms)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}} {}", self.field, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fragments_with_default_direction() {
        let order = OrderBy::parse_fragment("{weight} DESC, {name}").unwrap();

        assert_eq!(
            order,
            vec![
                OrderBy::new("weight", Direction::Desc),
                OrderBy::new("name", Direction::Asc),
            ]
        );
        assert_eq!(order[0].to_string(), "{weight} DESC");
    }

    #[test]
    fn rejects_unknown_direction() {
        assert!(OrderBy::parse_fragment("{name} SIDEWAYS").is_err());
    }
}
