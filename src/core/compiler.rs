//! Compiler identification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A compiler requested on the command line, optionally pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilerSpec {
    /// Compiler family name (e.g. `dmd`, `ldc`, `gdc`)
    pub name: String,
    /// Optional version pin (e.g. `2.100.0`)
    pub version_tag: Option<String>,
}

impl CompilerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        CompilerSpec {
            name: name.into(),
            version_tag: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version_tag = Some(version.into());
        self
    }

    /// The identifier handed to the installer: `name` or `name-version`.
    pub fn installer_id(&self) -> String {
        match &self.version_tag {
            Some(v) => format!("{}-{}", self.name, v),
            None => self.name.clone(),
        }
    }

    /// Binary the family installs when the activation script doesn't say.
    pub fn default_binary(&self) -> &str {
        match self.name.as_str() {
            "dmd" => "dmd",
            "ldc" => "ldc2",
            "gdc" => "gdc",
            other => other,
        }
    }
}

impl fmt::Display for CompilerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.installer_id())
    }
}

impl FromStr for CompilerSpec {
    type Err = String;

    /// Parse `dmd` or `dmd-2.100.0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("compiler name cannot be empty".to_string());
        }
        match s.split_once('-') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok(CompilerSpec::new(name).with_version(version))
            }
            Some(_) => Err(format!("invalid compiler spec '{}'", s)),
            None => Ok(CompilerSpec::new(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installer_id() {
        assert_eq!(CompilerSpec::new("dmd").installer_id(), "dmd");
        assert_eq!(
            CompilerSpec::new("ldc").with_version("1.30.0").installer_id(),
            "ldc-1.30.0"
        );
    }

    #[test]
    fn test_parse() {
        let spec: CompilerSpec = "dmd-2.100.0".parse().unwrap();
        assert_eq!(spec.name, "dmd");
        assert_eq!(spec.version_tag.as_deref(), Some("2.100.0"));

        let spec: CompilerSpec = "gdc".parse().unwrap();
        assert!(spec.version_tag.is_none());

        assert!("".parse::<CompilerSpec>().is_err());
        assert!("-2.1".parse::<CompilerSpec>().is_err());
    }

    #[test]
    fn test_default_binary() {
        assert_eq!(CompilerSpec::new("ldc").default_binary(), "ldc2");
        assert_eq!(CompilerSpec::new("dmd").default_binary(), "dmd");
        assert_eq!(CompilerSpec::new("tcc").default_binary(), "tcc");
    }
}
