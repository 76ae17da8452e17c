use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the JSON manifest flavor inside a mod package.
pub const MANIFEST_JSON: &str = "mod.manifest.json";

/// File name of the TOML manifest flavor inside a mod package.
pub const MANIFEST_TOML: &str = "mod.manifest.toml";

/// Errors produced while parsing or validating a mod manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The `name` field is empty or contains characters outside
    /// `[a-z0-9_-]`.
    #[error("invalid mod name: '{0}'")]
    InvalidName(String),

    /// The `version` field is not a valid semantic version.
    #[error("invalid mod version '{version}': {source}")]
    InvalidVersion {
        version: String,
        source: semver::Error,
    },
}

/// Describes a mod manifest file (`mod.manifest.json` / `mod.manifest.toml`).
///
/// The manifest carries the minimal metadata the launcher needs to identify a
/// mod, decide whether it participates in a rebuild, and place it in the
/// merge order. Everything else about a mod lives in its `content/` tree.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ModManifest {
    /// The unique name of the mod within a mods directory.
    /// Must contain only lowercase alphanumerics, underscores and hyphens.
    ///
    /// Example: `crimson_armory`
    pub name: String,

    /// The human-readable display name of the mod.
    ///
    /// Example: `Crimson Armory`
    pub display_name: String,

    /// The version of the mod, in semantic versioning form.
    ///
    /// Example: `1.2.0`
    pub version: String,

    /// A short description of what the mod changes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// The authors of the mod.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<ModAuthor>,

    /// Whether this mod participates in bundle rebuilds.
    /// Disabled mods are still listed in the inventory so the launcher UI
    /// can present them for re-enabling.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Load-order hint. Mods are merged in ascending order; ties are broken
    /// by name. Later-merged mods win conflicts.
    #[serde(default)]
    pub order: i64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(untagged)]
pub enum ModAuthor {
    Name(String),
    Role { name: String, role: String },
}

fn default_enabled() -> bool {
    true
}

impl ModManifest {
    /// Parse a manifest from JSON text and validate it.
    pub fn from_json_str(contents: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(contents)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from TOML text and validate it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(contents)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check the manifest's structural invariants.
    ///
    /// The name must be a valid identifier and the version must parse as a
    /// semantic version. Called by the `from_*_str` constructors; exposed for
    /// callers that build manifests programmatically.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if !is_valid_mod_name(&self.name) {
            return Err(ManifestError::InvalidName(self.name.clone()));
        }
        self.parsed_version()?;
        Ok(())
    }

    /// The manifest version as a comparable [`semver::Version`].
    pub fn parsed_version(&self) -> Result<Version, ManifestError> {
        Version::parse(&self.version).map_err(|source| ManifestError::InvalidVersion {
            version: self.version.clone(),
            source,
        })
    }
}

/// Whether `name` is a valid mod identifier.
///
/// Identifiers are non-empty, start with a lowercase alphanumeric, and
/// contain only lowercase alphanumerics, underscores and hyphens. They are
/// used as stable keys in build fingerprints and state records.
pub fn is_valid_mod_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_example_manifest() -> ModManifest {
        ModManifest {
            name: "crimson_armory".to_string(),
            display_name: "Crimson Armory".to_string(),
            version: "1.2.0".to_string(),
            description: "Reskins every heavy armor set with crimson trim".to_string(),
            authors: vec![
                ModAuthor::Name("Vex".to_string()),
                ModAuthor::Role {
                    name: "Harrow".to_string(),
                    role: "Textures".to_string(),
                },
            ],
            enabled: true,
            order: 10,
        }
    }

    #[test]
    fn test_json_parsing() {
        let json = r#"
        {
            "name": "crimson_armory",
            "display_name": "Crimson Armory",
            "version": "1.2.0",
            "description": "Reskins every heavy armor set with crimson trim",
            "authors": ["Vex", { "name": "Harrow", "role": "Textures" }],
            "enabled": true,
            "order": 10
        }
        "#;

        let manifest = ModManifest::from_json_str(json).unwrap();
        assert_eq!(manifest, create_example_manifest());
    }

    #[test]
    fn test_toml_parsing() {
        let toml = r#"
            name = "crimson_armory"
            display_name = "Crimson Armory"
            version = "1.2.0"
            description = "Reskins every heavy armor set with crimson trim"
            authors = ["Vex", { name = "Harrow", role = "Textures" }]
            enabled = true
            order = 10
        "#;

        let manifest = ModManifest::from_toml_str(toml).unwrap();
        assert_eq!(manifest, create_example_manifest());
    }

    #[test]
    fn test_defaults() {
        let json = r#"
        {
            "name": "plain",
            "display_name": "Plain",
            "version": "0.1.0"
        }
        "#;

        let manifest = ModManifest::from_json_str(json).unwrap();
        assert!(manifest.enabled);
        assert_eq!(manifest.order, 0);
        assert!(manifest.description.is_empty());
        assert!(manifest.authors.is_empty());
    }

    #[test]
    fn test_invalid_name_rejected() {
        let json = r#"
        {
            "name": "Bad Name!",
            "display_name": "Bad",
            "version": "1.0.0"
        }
        "#;

        let err = ModManifest::from_json_str(json).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidName(_)));
    }

    #[test]
    fn test_invalid_version_rejected() {
        let json = r#"
        {
            "name": "ok",
            "display_name": "Ok",
            "version": "not-a-version"
        }
        "#;

        let err = ModManifest::from_json_str(json).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidVersion { .. }));
    }

    #[test]
    fn test_version_comparison() {
        let older = ModManifest {
            version: "1.2.0".to_string(),
            ..create_example_manifest()
        };
        let newer = ModManifest {
            version: "1.10.0".to_string(),
            ..create_example_manifest()
        };

        assert!(older.parsed_version().unwrap() < newer.parsed_version().unwrap());
    }

    #[test]
    fn test_valid_mod_names() {
        assert!(is_valid_mod_name("crimson_armory"));
        assert!(is_valid_mod_name("x"));
        assert!(is_valid_mod_name("7days"));
        assert!(is_valid_mod_name("a-b_c9"));

        assert!(!is_valid_mod_name(""));
        assert!(!is_valid_mod_name("-leading-dash"));
        assert!(!is_valid_mod_name("_leading_underscore"));
        assert!(!is_valid_mod_name("Upper"));
        assert!(!is_valid_mod_name("has space"));
        assert!(!is_valid_mod_name("dot.name"));
    }
}
