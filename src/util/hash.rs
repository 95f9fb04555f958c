//! Fingerprinting of generated output.

use sha2::{Digest, Sha256};

use crate::core::Value;

/// A hasher for building fingerprints from multiple components.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component to the fingerprint.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0"); // Separator
        self
    }

    /// Add multiple strings, prefixed by their count.
    pub fn update_strs<'a>(&mut self, items: impl IntoIterator<Item = &'a str>) -> &mut Self {
        let items: Vec<&str> = items.into_iter().collect();
        self.hasher.update((items.len() as u64).to_le_bytes());
        for s in items {
            self.update_str(s);
        }
        self
    }

    /// Add an optional string component.
    pub fn update_opt(&mut self, opt: Option<&str>) -> &mut Self {
        match opt {
            Some(s) => {
                self.hasher.update(b"\x01"); // Present marker
                self.update_str(s);
            }
            None => {
                self.hasher.update(b"\x00"); // Absent marker
            }
        }
        self
    }

    /// Add a boolean component.
    pub fn update_bool(&mut self, b: bool) -> &mut Self {
        self.hasher.update([b as u8]);
        self
    }

    /// Add a value, tagged with its shape so `"a"` and `["a"]` differ.
    pub fn update_value(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::Bool(b) => {
                self.hasher.update(b"b");
                self.update_bool(*b);
            }
            Value::Scalar(s) => {
                self.hasher.update(b"s");
                self.update_str(s);
            }
            Value::List(items) => {
                self.hasher.update(b"l");
                self.hasher.update((items.len() as u64).to_le_bytes());
                for item in items {
                    self.update_value(item);
                }
            }
        }
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint() {
        let fp1 = {
            let mut fp = Fingerprint::new();
            fp.update_str("hello").update_str("world");
            fp.finish()
        };

        let fp2 = {
            let mut fp = Fingerprint::new();
            fp.update_str("hello").update_str("world");
            fp.finish()
        };

        let fp3 = {
            let mut fp = Fingerprint::new();
            fp.update_str("hello").update_str("different");
            fp.finish()
        };

        assert_eq!(fp1, fp2);
        assert_ne!(fp1, fp3);
    }

    #[test]
    fn test_empty_fingerprint_is_sha256_of_nothing() {
        assert_eq!(
            Fingerprint::new().finish(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_value_shape_matters() {
        let scalar = {
            let mut fp = Fingerprint::new();
            fp.update_value(&Value::scalar("a"));
            fp.finish()
        };
        let list = {
            let mut fp = Fingerprint::new();
            fp.update_value(&Value::list(["a"]));
            fp.finish()
        };
        assert_ne!(scalar, list);
    }
}
