use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One row of the brand directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandEntry {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "BrandImg")]
    pub image: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BrandDirectoryError {
    #[error("failed to read brand directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("brand directory is not a JSON array of {{Brand, BrandImg}} entries: {0}")]
    Format(#[from] serde_json::Error),
}

/// Brand-to-logo lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandDirectory {
    entries: Vec<BrandEntry>,
}

impl BrandDirectory {
    pub fn new(entries: Vec<BrandEntry>) -> Self {
        Self { entries }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BrandDirectoryError> {
        let entries: Vec<BrandEntry> = serde_json::from_reader(reader)?;
        Ok(Self::new(entries))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BrandDirectoryError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logo for `brand`, matched case-insensitively on the whole name.
    pub fn logo_for(&self, brand: &str) -> Option<&str> {
        let wanted = brand.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.brand.trim().to_lowercase() == wanted)
            .map(|entry| entry.image.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn directory() -> BrandDirectory {
        BrandDirectory::from_reader(Cursor::new(
            r#"[
                {"Brand": "BYD", "BrandImg": "https://cdn.example.com/logos/byd.png"},
                {"Brand": "Tesla", "BrandImg": "https://cdn.example.com/logos/tesla.png"}
            ]"#,
        ))
        .expect("directory parses")
    }

    #[test]
    fn lookup_ignores_case() {
        let directory = directory();
        assert_eq!(
            directory.logo_for("byd"),
            Some("https://cdn.example.com/logos/byd.png")
        );
        assert_eq!(
            directory.logo_for("TESLA"),
            Some("https://cdn.example.com/logos/tesla.png")
        );
    }

    #[test]
    fn unknown_or_blank_brand_has_no_logo() {
        let directory = directory();
        assert_eq!(directory.logo_for("Model"), None);
        assert_eq!(directory.logo_for(""), None);
        assert_eq!(directory.logo_for("BY"), None);
    }

    #[test]
    fn malformed_directory_is_rejected() {
        let result = BrandDirectory::from_reader(Cursor::new(r#"{"Brand": "BYD"}"#));
        assert!(matches!(result, Err(BrandDirectoryError::Format(_))));
    }
}
