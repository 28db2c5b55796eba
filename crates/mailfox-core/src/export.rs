//! Writing messages to disk.
//!
//! Every exported message shares one base name,
//! `<YYYYmmdd_HHMMSS>_<sanitized subject>`, under the export root:
//!
//! ```text
//! <root>/<base>.txt
//! <root>/<base>.html
//! <root>/<base>.eml
//! <root>/<base>/attachments/<file>
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, info, warn};

use crate::decoder::MessageSummary;

/// Longest subject fragment kept in a base name, in characters.
pub const MAX_SUBJECT_CHARS: usize = 30;

/// Used when a subject sanitizes to nothing.
pub const FALLBACK_SUBJECT: &str = "no_subject";

const SEPARATOR_WIDTH: usize = 50;

/// Failure writing one artifact.
#[derive(Debug, thiserror::Error)]
#[error("Failed to write {}: {source}", path.display())]
pub struct ExportError {
    /// The file or directory being written.
    pub path: PathBuf,
    /// The underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

/// What to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Header block plus text body.
    Text,
    /// HTML alternative, if present.
    Html,
    /// Raw message plus its attachments.
    Eml,
    /// All of the above.
    All,
}

impl ExportFormat {
    /// Maps a menu choice (`1`..`4`) to a format.
    #[must_use]
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(Self::Text),
            "2" => Some(Self::Html),
            "3" => Some(Self::Eml),
            "4" => Some(Self::All),
            _ => None,
        }
    }

    const fn includes(self, kind: ArtifactKind) -> bool {
        match self {
            Self::All => true,
            Self::Text => matches!(kind, ArtifactKind::Text),
            Self::Html => matches!(kind, ArtifactKind::Html),
            Self::Eml => matches!(kind, ArtifactKind::Eml | ArtifactKind::Attachment),
        }
    }
}

/// Kind of file written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `.txt` rendering.
    Text,
    /// `.html` body.
    Html,
    /// `.eml` raw message.
    Eml,
    /// One extracted attachment.
    Attachment,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::Eml => "eml",
            Self::Attachment => "attachments",
        })
    }
}

/// A file written by the exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Where it was written.
    pub path: PathBuf,
    /// What it is.
    pub kind: ArtifactKind,
}

/// Result of one export step.
#[derive(Debug)]
pub enum StepOutcome {
    /// Files written (possibly none, e.g. a message without attachments).
    Written(Vec<ExportArtifact>),
    /// The message has no HTML part; nothing was written.
    NoHtml,
    /// Some files were written and some failed.
    Partial {
        /// Files written.
        written: Vec<ExportArtifact>,
        /// One error per file that could not be written.
        failed: Vec<ExportError>,
    },
    /// The step failed; later steps still ran.
    Failed(ExportError),
}

/// Attachments written by [`Exporter::export_attachments`].
#[derive(Debug, Default)]
pub struct AttachmentBatch {
    /// Files written.
    pub written: Vec<ExportArtifact>,
    /// Attachments that could not be written. The others were still written.
    pub failed: Vec<ExportError>,
}

/// Outcome of [`Exporter::export`].
#[derive(Debug)]
pub struct ExportReport {
    /// Base name shared by all artifacts.
    pub base_name: String,
    /// One entry per step that ran, in order.
    pub steps: Vec<(ArtifactKind, StepOutcome)>,
}

impl ExportReport {
    /// All files written.
    pub fn artifacts(&self) -> impl Iterator<Item = &ExportArtifact> {
        self.steps.iter().flat_map(|(_, outcome)| match outcome {
            StepOutcome::Written(artifacts) | StepOutcome::Partial { written: artifacts, .. } => {
                artifacts.as_slice()
            }
            StepOutcome::NoHtml | StepOutcome::Failed(_) => &[][..],
        })
    }

    /// All failures, one per file that could not be written.
    pub fn failures(&self) -> impl Iterator<Item = (ArtifactKind, &ExportError)> {
        self.steps.iter().flat_map(|(kind, outcome)| {
            let errors = match outcome {
                StepOutcome::Failed(err) => std::slice::from_ref(err),
                StepOutcome::Partial { failed, .. } => failed.as_slice(),
                StepOutcome::Written(_) | StepOutcome::NoHtml => &[][..],
            };
            errors.iter().map(move |err| (*kind, err))
        })
    }

    /// Returns true if every step that ran succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Keeps alphanumerics, space, `.`, `_` and `-`, trims, and caps the length.
///
/// Returns [`FALLBACK_SUBJECT`] when nothing is left.
#[must_use]
pub fn sanitize_subject(subject: &str) -> String {
    let kept: String = subject
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect();
    let capped: String = kept.trim().chars().take(MAX_SUBJECT_CHARS).collect();
    let capped = capped.trim_end();

    if capped.is_empty() {
        FALLBACK_SUBJECT.to_string()
    } else {
        capped.to_string()
    }
}

/// `<YYYYmmdd_HHMMSS>_<sanitized subject>`.
#[must_use]
pub fn base_name<Tz>(subject: &str, timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{}_{}",
        timestamp.format("%Y%m%d_%H%M%S"),
        sanitize_subject(subject)
    )
}

/// Writes export artifacts under a root directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    root: PathBuf,
}

impl Exporter {
    /// Creates an exporter writing under `root`. Nothing is created yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The export root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs the steps selected by `format`, timestamped now.
    pub fn export(&self, summary: &MessageSummary, format: ExportFormat) -> ExportReport {
        self.export_at(summary, format, &Local::now())
    }

    /// Runs the steps selected by `format` in the order text, html, eml,
    /// attachments. A failing step is recorded and the rest still run; an
    /// unusable root fails every selected step under its own kind.
    pub fn export_at<Tz>(
        &self,
        summary: &MessageSummary,
        format: ExportFormat,
        timestamp: &DateTime<Tz>,
    ) -> ExportReport
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let base = base_name(&summary.subject, timestamp);
        let mut steps = Vec::new();

        for kind in [
            ArtifactKind::Text,
            ArtifactKind::Html,
            ArtifactKind::Eml,
            ArtifactKind::Attachment,
        ] {
            if !format.includes(kind) {
                continue;
            }

            let outcome = match kind {
                ArtifactKind::Text => self.export_text(&base, summary).map(|a| vec![a]),
                ArtifactKind::Html => match self.export_html(&base, summary) {
                    Ok(Some(artifact)) => Ok(vec![artifact]),
                    Ok(None) => {
                        steps.push((kind, StepOutcome::NoHtml));
                        continue;
                    }
                    Err(err) => Err(err),
                },
                ArtifactKind::Eml => self.export_eml(&base, summary.raw()).map(|a| vec![a]),
                ArtifactKind::Attachment => match self.export_attachments(&base, summary) {
                    Ok(batch) if batch.failed.is_empty() => Ok(batch.written),
                    Ok(AttachmentBatch { written, failed }) => {
                        for err in &failed {
                            warn!(step = %kind, error = %err, "attachment not written");
                        }
                        steps.push((kind, StepOutcome::Partial { written, failed }));
                        continue;
                    }
                    Err(err) => Err(err),
                },
            };

            let outcome = match outcome {
                Ok(artifacts) => StepOutcome::Written(artifacts),
                Err(err) => {
                    warn!(step = %kind, error = %err, "export step failed");
                    StepOutcome::Failed(err)
                }
            };
            steps.push((kind, outcome));
        }

        info!(base = %base, root = %self.root.display(), "export finished");
        ExportReport {
            base_name: base,
            steps,
        }
    }

    /// Writes `<base>.txt`: a header block, a separator, then the text body.
    ///
    /// Resolves the body if it has not been viewed yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn export_text(
        &self,
        base: &str,
        summary: &MessageSummary,
    ) -> Result<ExportArtifact, ExportError> {
        let contents = format!(
            "Subject: {}\nFrom: {}\nTo: {}\nDate: {}\n{}\n\n{}",
            summary.subject,
            summary.from,
            summary.to,
            summary.date,
            "-".repeat(SEPARATOR_WIDTH),
            summary.resolve_body(),
        );
        self.ensure_root()?;
        let path = self.root.join(format!("{base}.txt"));
        write(&path, contents.as_bytes())?;
        Ok(ExportArtifact {
            path,
            kind: ArtifactKind::Text,
        })
    }

    /// Writes `<base>.html` if the message has an HTML part.
    ///
    /// Returns `Ok(None)` without touching the disk otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn export_html(
        &self,
        base: &str,
        summary: &MessageSummary,
    ) -> Result<Option<ExportArtifact>, ExportError> {
        let Some(html) = summary.html() else {
            debug!(id = %summary.id, "no HTML part to export");
            return Ok(None);
        };

        self.ensure_root()?;
        let path = self.root.join(format!("{base}.html"));
        write(&path, html.as_bytes())?;
        Ok(Some(ExportArtifact {
            path,
            kind: ArtifactKind::Html,
        }))
    }

    /// Writes `<base>.eml` with the raw bytes unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn export_eml(&self, base: &str, raw: &[u8]) -> Result<ExportArtifact, ExportError> {
        self.ensure_root()?;
        let path = self.root.join(format!("{base}.eml"));
        write(&path, raw)?;
        Ok(ExportArtifact {
            path,
            kind: ArtifactKind::Eml,
        })
    }

    /// Writes each attachment into `<base>/attachments/`.
    ///
    /// Names that collide get `_1`, `_2`, ... before the extension so no
    /// attachment overwrites another. No attachments is not an error. A file
    /// that cannot be written is recorded in the batch and the rest are
    /// still written.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachments directory cannot be created.
    pub fn export_attachments(
        &self,
        base: &str,
        summary: &MessageSummary,
    ) -> Result<AttachmentBatch, ExportError> {
        self.ensure_root()?;
        let dir = self.root.join(base).join("attachments");
        fs::create_dir_all(&dir).map_err(|source| ExportError {
            path: dir.clone(),
            source,
        })?;

        let mut used = HashSet::new();
        let mut batch = AttachmentBatch::default();

        for attachment in summary.attachments() {
            let name = unique_name(&attachment.filename, &mut used);
            let path = dir.join(&name);
            match write(&path, &attachment.data) {
                Ok(()) => {
                    debug!(file = %name, bytes = attachment.data.len(), "attachment written");
                    batch.written.push(ExportArtifact {
                        path,
                        kind: ArtifactKind::Attachment,
                    });
                }
                Err(err) => batch.failed.push(err),
            }
        }

        Ok(batch)
    }

    fn ensure_root(&self) -> Result<(), ExportError> {
        fs::create_dir_all(&self.root).map_err(|source| ExportError {
            path: self.root.clone(),
            source,
        })
    }
}

fn write(path: &Path, data: &[u8]) -> Result<(), ExportError> {
    fs::write(path, data).map_err(|source| ExportError {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns `name`, or `stem_<k>.ext` for the first free `k`, and records it.
fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    (1..)
        .map(|k| match ext {
            Some(ext) => format!("{stem}_{k}.{ext}"),
            None => format!("{stem}_{k}"),
        })
        .find(|candidate| used.insert(candidate.clone()))
        .unwrap_or_else(|| name.to_string())
}
