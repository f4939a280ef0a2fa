use crate::error::ChurnError;
use camino::Utf8Path;
use tree_sitter::Language;

/// Languages with a registered complexity strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangId {
    Python,
}

impl std::fmt::Display for LangId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl LangId {
    const SUPPORTED: [LangId; 1] = [LangId::Python];

    pub fn name(self) -> &'static str {
        match self {
            Self::Python => "python",
        }
    }

    /// Lowercase file extensions handled by this language.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Python => &["py", "pyi"],
        }
    }

    /// Detect language from file extension, ignoring case.
    pub fn from_path(path: &Utf8Path) -> Result<Self, ChurnError> {
        let ext = match path.extension() {
            Some(e) if !e.is_empty() => e.to_ascii_lowercase(),
            _ => return Err(ChurnError::unsupported_language("<no extension>")),
        };
        Self::SUPPORTED
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
            .ok_or_else(|| ChurnError::unsupported_language(&ext))
    }

    pub fn ts_language(self) -> Language {
        match self {
            Self::Python => Language::new(tree_sitter_python::LANGUAGE),
        }
    }
}
