//! Knowledge base domain types.
//!
//! A [`KnowledgeDocument`] is the profile as stored on disk. Every field is
//! optional so a partially filled file still deserializes; a missing section
//! simply yields no chunks.

use serde::{Deserialize, Serialize};

/// The structured profile document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<About>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<Experience>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<Education>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
}

impl KnowledgeDocument {
    /// True when no section is present.
    pub fn is_empty(&self) -> bool {
        self.about.is_none()
            && self.experience.is_none()
            && self.education.is_none()
            && self.projects.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct About {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub skills: Option<Skills>,
}

/// Skills grouped by category. Unknown categories are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skills {
    pub programming: Vec<String>,
    pub libraries: Vec<String>,
    pub databases: Vec<String>,
    pub visualization: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub role: Option<String>,
    pub company: Option<String>,
    pub period: Option<String>,
    pub responsibilities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub graduation: Option<String>,
    pub coursework: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub problem: Option<String>,
    pub outcome: Option<String>,
    pub technologies: Vec<String>,
    /// Repository link; stored under `github` in existing profile files.
    #[serde(rename = "github", alias = "repository")]
    pub repository: Option<String>,
}

/// The section a chunk was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSource {
    About,
    Skills,
    Experience,
    Education,
    Projects,
}

impl ChunkSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::About => "about",
            Self::Skills => "skills",
            Self::Experience => "experience",
            Self::Education => "education",
            Self::Projects => "projects",
        }
    }
}

impl std::fmt::Display for ChunkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single retrievable unit of profile text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: ChunkSource,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: ChunkSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// A chunk with its relevance to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Non-negative relevance; 0.0 for fallback selections.
    pub score: f32,
    /// Position of the chunk in the chunker output, used as tie-break.
    pub index: usize,
}

impl ScoredChunk {
    pub fn text(&self) -> &str {
        &self.chunk.text
    }

    pub fn source(&self) -> ChunkSource {
        self.chunk.source
    }
}
