//! Mod manifests: the `mod.toml` files that describe installed mods.
//!
//! Every installed mod lives in its own subdirectory of the mods directory,
//! holding a `mod.toml` next to the compiled library it describes:
//!
//! ```toml
//! id = "template"
//! name = "Template Mod"
//! version = "1.0.0"
//! library = "template_mod"
//! ```
//!
//! The `library` field is the base name of the cdylib; the platform-specific
//! file name (`libtemplate_mod.so`, `template_mod.dll`, ...) is resolved at
//! discovery time.

use mod_api::ModError;
use serde::Deserialize;
use std::path::Path;

/// File name the loader looks for inside each mod directory.
pub const MANIFEST_FILE_NAME: &str = "mod.toml";

/// Parsed contents of a `mod.toml` manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ModManifest {
    /// Stable identifier, must match what the entry point reports
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Declared version string
    pub version: String,
    /// Base name of the compiled library, without platform prefix/suffix
    pub library: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Optional list of authors
    #[serde(default)]
    pub authors: Vec<String>,
}

impl ModManifest {
    /// Parses and validates manifest text.
    pub fn parse(content: &str) -> Result<Self, ModError> {
        let manifest: ModManifest = toml::from_str(content)
            .map_err(|e| ModError::Manifest(format!("Failed to parse manifest: {}", e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reads, parses, and validates a manifest file.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ModError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ModError::Manifest(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Checks the structural rules that every manifest must satisfy.
    ///
    /// Ids follow the usual mod-id convention: lowercase, starting with a
    /// letter, with digits, `-`, and `_` allowed after that.
    pub fn validate(&self) -> Result<(), ModError> {
        if self.id.is_empty() {
            return Err(ModError::Manifest("id must not be empty".to_string()));
        }
        if !self.id.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
            return Err(ModError::Manifest(format!(
                "id '{}' must start with a lowercase letter",
                self.id
            )));
        }
        if !self
            .id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(ModError::Manifest(format!(
                "id '{}' may only contain lowercase letters, digits, '-' and '_'",
                self.id
            )));
        }
        if self.name.is_empty() {
            return Err(ModError::Manifest("name must not be empty".to_string()));
        }
        if self.version.is_empty() {
            return Err(ModError::Manifest("version must not be empty".to_string()));
        }
        if self.library.is_empty() {
            return Err(ModError::Manifest("library must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Returns the platform-specific file name for a mod library.
///
/// `template_mod` becomes `libtemplate_mod.so` on Linux, `template_mod.dll`
/// on Windows, and `libtemplate_mod.dylib` on macOS.
pub fn platform_library_filename(library: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.dll", library)
    } else if cfg!(target_os = "macos") {
        format!("lib{}.dylib", library)
    } else {
        format!("lib{}.so", library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = ModManifest::parse(
            r#"
            id = "template"
            name = "Template Mod"
            version = "1.0.0"
            library = "template_mod"
            description = "A scaffold mod that greets the world"
            authors = ["lilydev"]
            "#,
        )
        .expect("manifest should parse");

        assert_eq!(manifest.id, "template");
        assert_eq!(manifest.name, "Template Mod");
        assert_eq!(manifest.version, "1.0.0");
        assert_eq!(manifest.library, "template_mod");
        assert_eq!(
            manifest.description.as_deref(),
            Some("A scaffold mod that greets the world")
        );
        assert_eq!(manifest.authors, vec!["lilydev".to_string()]);
    }

    #[test]
    fn test_parse_minimal_manifest() {
        let manifest = ModManifest::parse(
            r#"
            id = "tiny"
            name = "Tiny"
            version = "0.1.0"
            library = "tiny_mod"
            "#,
        )
        .expect("manifest without optional fields should parse");

        assert!(manifest.description.is_none());
        assert!(manifest.authors.is_empty());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let result = ModManifest::parse(
            r#"
            id = "broken"
            name = "Broken"
            version = "0.1.0"
            "#,
        );

        assert!(matches!(result, Err(ModError::Manifest(_))));
    }

    #[test]
    fn test_invalid_ids_are_rejected() {
        for id in ["", "Template", "1template", "temp late", "temp.late"] {
            let manifest = ModManifest {
                id: id.to_string(),
                name: "Some Mod".to_string(),
                version: "1.0.0".to_string(),
                library: "some_mod".to_string(),
                description: None,
                authors: Vec::new(),
            };

            assert!(
                manifest.validate().is_err(),
                "id '{}' should have been rejected",
                id
            );
        }
    }

    #[test]
    fn test_valid_ids_are_accepted() {
        for id in ["template", "my-mod", "my_mod2"] {
            let manifest = ModManifest {
                id: id.to_string(),
                name: "Some Mod".to_string(),
                version: "1.0.0".to_string(),
                library: "some_mod".to_string(),
                description: None,
                authors: Vec::new(),
            };

            assert!(manifest.validate().is_ok(), "id '{}' should be valid", id);
        }
    }

    #[test]
    fn test_platform_library_filename() {
        let filename = platform_library_filename("template_mod");

        if cfg!(target_os = "windows") {
            assert_eq!(filename, "template_mod.dll");
        } else if cfg!(target_os = "macos") {
            assert_eq!(filename, "libtemplate_mod.dylib");
        } else {
            assert_eq!(filename, "libtemplate_mod.so");
        }
    }
}
