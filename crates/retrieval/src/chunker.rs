//! Flattens a [`KnowledgeDocument`] into scoreable chunks.
//!
//! Output order is about → skills → experience → education → projects, one
//! chunk per list entry. Missing leaf fields interpolate as empty strings.
//! A chunk whose field values are all blank carries only labels, so it is
//! dropped instead of competing in scoring.

use askfolio_core::knowledge::{About, Education, Experience, Project, Skills};
use askfolio_core::{Chunk, ChunkSource, KnowledgeDocument};
use tracing::debug;

/// Deterministic document → chunk conversion.
#[derive(Debug, Clone)]
pub struct Chunker {
    owner_name: String,
    min_chunk_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new("", 1)
    }
}

impl Chunker {
    /// `owner_name` stands in for a missing `about.name`.
    pub fn new(owner_name: impl Into<String>, min_chunk_chars: usize) -> Self {
        Self {
            owner_name: owner_name.into(),
            min_chunk_chars,
        }
    }

    pub fn from_config(config: &askfolio_config::AppConfig) -> Self {
        Self::new(
            config.profile.owner_name.clone(),
            config.retrieval.min_chunk_chars,
        )
    }

    /// Convert a document into its ordered chunk sequence.
    pub fn chunk(&self, doc: &KnowledgeDocument) -> Vec<Chunk> {
        let mut drafts: Vec<Draft> = Vec::new();

        if let Some(about) = &doc.about {
            drafts.push(self.about(about));
            if let Some(skills) = &about.skills {
                drafts.push(skills_draft(skills));
            }
        }

        if let Some(experience) = &doc.experience {
            drafts.extend(experience.iter().map(experience_draft));
        }

        if let Some(education) = &doc.education {
            drafts.push(education_draft(education));
        }

        if let Some(projects) = &doc.projects {
            drafts.extend(projects.iter().map(project_draft));
        }

        let total = drafts.len();
        let chunks: Vec<Chunk> = drafts
            .into_iter()
            .filter(|draft| draft.substance >= self.min_chunk_chars.max(1))
            .map(|draft| draft.chunk)
            .collect();

        if chunks.len() < total {
            debug!(
                dropped = total - chunks.len(),
                kept = chunks.len(),
                "Dropped chunks with no field content"
            );
        }

        chunks
    }

    fn about(&self, about: &About) -> Draft {
        let name = about.name.as_deref().unwrap_or(&self.owner_name);
        let summary = field(&about.summary);
        Draft::new(
            format!("About {name}: {summary}"),
            ChunkSource::About,
            substance(&[field(&about.name), summary]),
        )
    }
}

/// Convenience wrapper using the default chunker.
pub fn chunk(doc: &KnowledgeDocument) -> Vec<Chunk> {
    Chunker::default().chunk(doc)
}

struct Draft {
    chunk: Chunk,
    /// Characters of non-blank field content behind the chunk text.
    substance: usize,
}

impl Draft {
    fn new(text: String, source: ChunkSource, substance: usize) -> Self {
        Self {
            chunk: Chunk::new(text, source),
            substance,
        }
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn substance(parts: &[&str]) -> usize {
    parts.iter().map(|p| p.trim().chars().count()).sum()
}

fn list_substance(items: &[String]) -> usize {
    items.iter().map(|i| i.trim().chars().count()).sum()
}

fn skills_draft(skills: &Skills) -> Draft {
    let text = format!(
        "Skills: Programming - {}. Libraries - {}. Databases - {}. Visualization - {}.",
        skills.programming.join(", "),
        skills.libraries.join(", "),
        skills.databases.join(", "),
        skills.visualization.join(", "),
    );
    let amount = list_substance(&skills.programming)
        + list_substance(&skills.libraries)
        + list_substance(&skills.databases)
        + list_substance(&skills.visualization);
    Draft::new(text, ChunkSource::Skills, amount)
}

fn experience_draft(exp: &Experience) -> Draft {
    let text = format!(
        "{} at {} ({}): {}",
        field(&exp.role),
        field(&exp.company),
        field(&exp.period),
        exp.responsibilities.join(" "),
    );
    let amount = substance(&[field(&exp.role), field(&exp.company), field(&exp.period)])
        + list_substance(&exp.responsibilities);
    Draft::new(text, ChunkSource::Experience, amount)
}

fn education_draft(edu: &Education) -> Draft {
    let text = format!(
        "Education: {} from {} ({}). Coursework: {}",
        field(&edu.degree),
        field(&edu.institution),
        field(&edu.graduation),
        edu.coursework.join(", "),
    );
    let amount = substance(&[
        field(&edu.degree),
        field(&edu.institution),
        field(&edu.graduation),
    ]) + list_substance(&edu.coursework);
    Draft::new(text, ChunkSource::Education, amount)
}

fn project_draft(project: &Project) -> Draft {
    let mut text = format!(
        "Project: {} ({}). Description: {}. ",
        field(&project.title),
        field(&project.category),
        field(&project.description),
    );
    if let Some(problem) = present(&project.problem) {
        text.push_str(&format!("Problem: {problem}. "));
    }
    if let Some(outcome) = present(&project.outcome) {
        text.push_str(&format!("Outcome: {outcome}. "));
    }
    text.push_str(&format!(
        "Technologies used: {}",
        project.technologies.join(", ")
    ));
    if let Some(link) = present(&project.repository) {
        text.push_str(&format!(" GitHub: {link}"));
    }

    let amount = substance(&[
        field(&project.title),
        field(&project.category),
        field(&project.description),
        field(&project.problem),
        field(&project.outcome),
        field(&project.repository),
    ]) + list_substance(&project.technologies);
    Draft::new(text, ChunkSource::Projects, amount)
}
