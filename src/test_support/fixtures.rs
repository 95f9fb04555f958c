//! Description unit fixtures for common test scenarios.

/// A static library exporting the given defines.
pub fn library_unit(name: &str, defines: &[&str]) -> String {
    format!(
        r#"[[targets]]
name = "{name}"
type = "static_library"
sources = ["{name}.c"]

[targets.export]
defines = [{defines}]
"#,
        defines = quoted(defines)
    )
}

/// An executable depending on the given references.
pub fn executable_unit(name: &str, dependencies: &[&str]) -> String {
    format!(
        r#"[[targets]]
name = "{name}"
type = "executable"
sources = ["main.c"]
dependencies = [{deps}]
"#,
        deps = quoted(dependencies)
    )
}

/// Three units whose targets form the cycle `A -> B -> C -> A`.
pub fn cycle_units() -> Vec<(&'static str, String)> {
    vec![
        ("a.toml", single_target_unit("A", "b.toml:B")),
        ("b.toml", single_target_unit("B", "c.toml:C")),
        ("c.toml", single_target_unit("C", "a.toml:A")),
    ]
}

fn single_target_unit(name: &str, dependency: &str) -> String {
    format!(
        r#"[[targets]]
name = "{name}"
type = "static_library"
dependencies = ["{dependency}"]
"#
    )
}

fn quoted(items: &[&str]) -> String {
    items
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_unit() {
        let unit = library_unit("base", &["FOO=1", "BAR"]);
        assert!(unit.contains("name = \"base\""));
        assert!(unit.contains("defines = [\"FOO=1\", \"BAR\"]"));
    }
}
