use serde::{Deserialize, Serialize};

/// Language reference record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: String,
    pub name: String,
    pub ecosystem: String,
}

/// Mapping from a file extension (without the leading dot) to a language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceExtension {
    pub extension: String,
    pub language_id: String,
    pub is_text: bool,
    /// The extension is the language's canonical one (`go` for Go, not `tmpl`)
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Mapping from an exact file name (`Makefile`, `go.mod`) to a language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBasename {
    pub name: String,
    pub language_id: String,
    pub is_text: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
