use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, DocumentId, ProjectId};

/// A file registered against a project.
///
/// The store does not copy file contents; it keeps a pointer to the file and
/// the size observed when the document was registered. `created_at` is the
/// upload time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub kind: DocumentKind,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub file: FileMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where the document lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub path: String,
    /// Size in bytes, `None` when the file could not be read at registration.
    pub size_bytes: Option<u64>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    General,
    Contract,
    Specification,
    Report,
    Design,
    Code,
    Image,
    Presentation,
    Other,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 9] = [
        Self::General,
        Self::Contract,
        Self::Specification,
        Self::Report,
        Self::Design,
        Self::Code,
        Self::Image,
        Self::Presentation,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Contract => "contract",
            Self::Specification => "specification",
            Self::Report => "report",
            Self::Design => "design",
            Self::Code => "code",
            Self::Image => "image",
            Self::Presentation => "presentation",
            Self::Other => "other",
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "contract" => Ok(Self::Contract),
            "specification" => Ok(Self::Specification),
            "report" => Ok(Self::Report),
            "design" => Ok(Self::Design),
            "code" => Ok(Self::Code),
            "image" => Ok(Self::Image),
            "presentation" => Ok(Self::Presentation),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown document kind `{other}`")),
        }
    }
}

/// Input for registering a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDocumentInput {
    /// The project this document belongs to. Must exist.
    pub project_id: ProjectId,
    pub title: String,
    /// Path to the file on the local file system.
    pub path: String,
    pub description: Option<String>,
    pub kind: Option<DocumentKind>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for updating a document. All fields are optional for partial updates.
///
/// Changing `path` re-reads the file size.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDocumentInput {
    pub project_id: Option<ProjectId>,
    pub title: Option<String>,
    pub path: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub kind: Option<DocumentKind>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}
