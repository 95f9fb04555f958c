//! Test utilities for Gantry unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::{fixtures, memory_units};
//!
//! let source = memory_units(&[("lib.toml", fixtures::library_unit("lib", &["FOO=1"]))]);
//! ```

pub mod fixtures;

use std::path::Path;

use crate::sources::MemorySource;

/// Build an in-memory source from `(path, text)` pairs.
pub fn memory_units<P: AsRef<Path>, T: AsRef<str>>(units: &[(P, T)]) -> MemorySource {
    units.iter().fold(MemorySource::new(), |source, (path, text)| {
        source.with_unit(path, text.as_ref())
    })
}

/// Assertion helpers for testing.
pub mod assertions {
    use crate::error::Error;

    /// Assert that a result is Err and return the error.
    pub fn assert_err<T: std::fmt::Debug, E>(result: Result<T, E>) -> E {
        match result {
            Ok(v) => panic!("expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    }

    /// Assert that a result failed with the named error kind.
    pub fn assert_error_kind<T: std::fmt::Debug>(result: Result<T, Error>, kind: &str) {
        let err = assert_err(result);
        assert_eq!(err.kind_name(), kind, "unexpected error: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::UnitSource;

    #[test]
    fn test_memory_units() {
        let source = memory_units(&[("a.toml", "x = 1"), ("dir/b.toml", "y = 2")]);
        assert!(source.exists(Path::new("a.toml")));
        assert_eq!(source.read(Path::new("dir/b.toml")).unwrap(), "y = 2");
    }

    #[test]
    fn test_assertions() {
        use assertions::*;

        let err_result: Result<i32, &str> = Err("error");
        assert_eq!(assert_err(err_result), "error");
    }
}
