//! # Schema Loader
//!
//! Reads `.yaml`/`.yml` content-type definitions from a directory
//! (spec.md §4.1). Parsing is strict: any unknown key fails the load.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::errors::{MithrilError, Result};
use crate::schema::model::ContentType;

/// Load every `.yaml`/`.yml` file at the top level of `dir` (no recursion)
/// as a [`ContentType`], sorted ascending by name for deterministic
/// downstream processing. An empty or absent directory is not an error
/// if it exists; a missing directory surfaces as an I/O error.
pub fn load_schemas(dir: impl AsRef<Path>) -> Result<Vec<ContentType>> {
    let dir = dir.as_ref();
    let mut entries = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);
        if !is_yaml {
            continue;
        }

        let raw = std::fs::read(&path)?;
        let hash = hex::encode(Sha256::digest(&raw));

        let mut content_type: ContentType = serde_yaml::from_slice(&raw).map_err(|e| {
            MithrilError::Config(format!(
                "parsing YAML: {} ({})",
                e,
                path.display()
            ))
        })?;
        content_type.schema_hash = hash;

        entries.push(content_type);
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;

    use super::*;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn empty_directory_returns_empty_sequence() {
        let dir = tempdir().unwrap();
        let schemas = load_schemas(dir.path()).unwrap();
        assert!(schemas.is_empty());
    }

    #[test]
    fn loads_and_sorts_by_name() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "zeta.yaml",
            "name: zeta\ndisplay_name: Zeta\npublic_read: true\nfields: []\n",
        );
        write_file(
            dir.path(),
            "alpha.yaml",
            "name: alpha\ndisplay_name: Alpha\npublic_read: false\nfields: []\n",
        );

        let schemas = load_schemas(dir.path()).unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].name, "alpha");
        assert_eq!(schemas[1].name, "zeta");
    }

    #[test]
    fn non_yaml_files_are_ignored() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "README.md", "not a schema");
        let schemas = load_schemas(dir.path()).unwrap();
        assert!(schemas.is_empty());
    }

    #[test]
    fn unknown_key_is_a_fatal_parse_error() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "posts.yaml",
            "name: posts\ndisplay_name: Posts\npublic_read: true\nfields:\n  - name: title\n    type: string\n    requred: true\n",
        );
        let err = load_schemas(dir.path()).unwrap_err();
        assert!(err.to_string().contains("parsing YAML"));
    }

    #[test]
    fn schema_hash_is_hex_sha256_of_raw_bytes() {
        let dir = tempdir().unwrap();
        let contents = "name: posts\ndisplay_name: Posts\npublic_read: true\nfields: []\n";
        write_file(dir.path(), "posts.yaml", contents);

        let schemas = load_schemas(dir.path()).unwrap();
        let expected = hex::encode(Sha256::digest(contents.as_bytes()));
        assert_eq!(schemas[0].schema_hash, expected);
    }
}
