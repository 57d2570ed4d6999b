use crate::core::{OrmError, Result};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use regex::Regex;

const REGEX_CACHE_SIZE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(199);

lazy_static::lazy_static! {
    static ref REGEX_LRU_CACHE: Arc<Mutex<LruCache<String, Arc<Regex>>>> =
        Arc::new(Mutex::new(LruCache::new(REGEX_CACHE_SIZE)));
}

/// Converts a LIKE pattern into an anchored regex
#[inline]
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                regex.push_str(&regex::escape(&chars[i].to_string()));
            }
            c if ".*+?^${}()|[]\\".contains(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
        i += 1;
    }

    regex.push('$');
    regex
}

/// Matches the common pattern shapes without compiling a regex
#[inline]
fn fast_path_like(text: &str, pattern: &str, case_sensitive: bool) -> Option<bool> {
    if pattern.contains('_') || pattern.contains('\\') {
        return None;
    }

    let (text, pattern) = if case_sensitive {
        (text.to_string(), pattern.to_string())
    } else {
        (text.to_lowercase(), pattern.to_lowercase())
    };

    let wildcards = pattern.matches('%').count();

    // exact match
    if wildcards == 0 {
        return Some(text == pattern);
    }

    // "prefix%"
    if wildcards == 1 && pattern.ends_with('%') {
        return Some(text.starts_with(&pattern[..pattern.len() - 1]));
    }

    // "%suffix"
    if wildcards == 1 && pattern.starts_with('%') {
        return Some(text.ends_with(&pattern[1..]));
    }

    // "%substring%", the shape every table search produces
    if wildcards == 2 && pattern.len() >= 2 && pattern.starts_with('%') && pattern.ends_with('%') {
        return Some(text.contains(&pattern[1..pattern.len() - 1]));
    }

    None
}

fn get_or_compile_regex(pattern: &str, case_sensitive: bool) -> Result<Arc<Regex>> {
    let cache_key = if case_sensitive {
        format!("s:{}", pattern)
    } else {
        format!("i:{}", pattern)
    };

    {
        let mut cache = REGEX_LRU_CACHE.lock()?;
        if let Some(regex) = cache.get(&cache_key) {
            return Ok(Arc::clone(regex));
        }
    }

    let regex_pattern = like_to_regex(pattern);
    let compiled = regex::RegexBuilder::new(&regex_pattern)
        .case_insensitive(!case_sensitive)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| OrmError::ExecutionError(format!("Invalid LIKE pattern: {}", e)))?;

    let compiled_arc = Arc::new(compiled);

    {
        let mut cache = REGEX_LRU_CACHE.lock()?;
        cache.put(cache_key, Arc::clone(&compiled_arc));
    }

    Ok(compiled_arc)
}

/// Evaluates `text LIKE pattern` with `%` and `_` wildcards
#[inline]
pub fn eval_like(text: &str, pattern: &str, case_sensitive: bool) -> Result<bool> {
    if let Some(result) = fast_path_like(text, pattern, case_sensitive) {
        return Ok(result);
    }

    let regex = get_or_compile_regex(pattern, case_sensitive)?;
    Ok(regex.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_search_ignores_case() {
        assert!(eval_like("Hello World", "%world%", false).unwrap());
        assert!(!eval_like("Hello World", "%planet%", false).unwrap());
    }

    #[test]
    fn regex_path_handles_single_char_wildcards() {
        assert!(eval_like("cat", "c_t", true).unwrap());
        assert!(!eval_like("cart", "c_t", true).unwrap());
        assert!(eval_like("a.b", "a.%", true).unwrap());
        assert!(!eval_like("axb", "a.b", true).unwrap());
    }
}
