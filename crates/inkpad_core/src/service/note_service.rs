//! Note use-case service.
//!
//! # Responsibility
//! - Provide note create/update/get/list APIs over the repository contract.
//! - Normalize and atomically replace note tags.
//! - Derive plain-text previews and render spans from the inline markup
//!   subset without altering stored text.
//!
//! # Invariants
//! - `rename_note` and `update_text_content` are the only operations that
//!   bump `modified_at`; folder moves and retagging never do.
//! - Tag names are trimmed and deduplicated case-sensitively.

use crate::model::note::{normalize_tags, FolderId, Note, NoteId};
use crate::repo::note_repo::{NoteListQuery, NoteRepository};
use crate::repo::RepoError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("valid italic regex"));
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid code regex"));
static MARKUP_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\*`#]+").expect("valid markup symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const PREVIEW_MAX_CHARS: usize = 100;

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Title input is empty after trimming.
    EmptyTitle,
    /// Tag input contains empty values.
    InvalidTag(String),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "note title must not be empty"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one canvas note.
    ///
    /// The canvas starts logically empty with the identity view; its rows are
    /// first written by the initial canvas save.
    pub fn create_note(&mut self, title: &str) -> Result<Note, NoteServiceError> {
        let title = non_empty_title(title)?;
        let note = Note::new(title);
        self.repo.create_note(&note)?;
        self.read_back(note.id, "created note not found in read-back")
    }

    /// Creates one text-only note. No canvas rows are ever written for it.
    pub fn create_text_note(
        &mut self,
        title: &str,
        content: &str,
    ) -> Result<Note, NoteServiceError> {
        let title = non_empty_title(title)?;
        let note = Note::new_text_only(title, content);
        self.repo.create_note(&note)?;
        self.read_back(note.id, "created note not found in read-back")
    }

    /// Gets one note by stable id.
    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>, NoteServiceError> {
        Ok(self.repo.get_note(id)?)
    }

    /// Replaces the title. Bumps `modified_at`.
    pub fn rename_note(&mut self, id: NoteId, title: &str) -> Result<Note, NoteServiceError> {
        let title = non_empty_title(title)?;
        if self.repo.update_title(id, &title)? == 0 {
            return Err(NoteServiceError::NoteNotFound(id));
        }
        self.read_back(id, "renamed note not found in read-back")
    }

    /// Replaces text-only content. Bumps `modified_at`.
    pub fn update_text_content(
        &mut self,
        id: NoteId,
        content: &str,
    ) -> Result<Note, NoteServiceError> {
        if self.repo.update_text_content(id, content)? == 0 {
            return Err(NoteServiceError::NoteNotFound(id));
        }
        self.read_back(id, "updated note not found in read-back")
    }

    /// Moves the note into a folder (or to the root with `None`). Does not
    /// bump `modified_at`.
    pub fn move_to_folder(
        &mut self,
        id: NoteId,
        folder_id: Option<FolderId>,
    ) -> Result<Note, NoteServiceError> {
        if self.repo.set_folder(id, folder_id)? == 0 {
            return Err(NoteServiceError::NoteNotFound(id));
        }
        self.read_back(id, "moved note not found in read-back")
    }

    /// Atomically replaces the full tag set for one note. Does not bump
    /// `modified_at`.
    pub fn set_note_tags(
        &mut self,
        id: NoteId,
        tags: Vec<String>,
    ) -> Result<Note, NoteServiceError> {
        for tag in &tags {
            if tag.trim().is_empty() {
                return Err(NoteServiceError::InvalidTag(tag.clone()));
            }
        }
        let normalized = normalize_tags(&tags);
        if self.repo.set_tags(id, &normalized)? == 0 {
            return Err(NoteServiceError::NoteNotFound(id));
        }
        self.read_back(id, "note missing after tag replacement")
    }

    /// Lists notes matching the query filters.
    pub fn list_notes(&self, query: &NoteListQuery) -> Result<Vec<Note>, NoteServiceError> {
        Ok(self.repo.list_notes(query)?)
    }

    /// Lists all known tags.
    pub fn list_tags(&self) -> Result<Vec<String>, NoteServiceError> {
        Ok(self.repo.list_tags()?)
    }

    /// Deletes one note; canvas content and tag links go with it.
    pub fn delete_note(&mut self, id: NoteId) -> Result<(), NoteServiceError> {
        if self.repo.delete_note(id)? == 0 {
            return Err(NoteServiceError::NoteNotFound(id));
        }
        Ok(())
    }

    fn read_back(
        &self,
        id: NoteId,
        context: &'static str,
    ) -> Result<Note, NoteServiceError> {
        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::InconsistentState(context))
    }
}

fn non_empty_title(title: &str) -> Result<String, NoteServiceError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(NoteServiceError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Render classification for one piece of annotation text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupKind {
    Plain,
    Header,
    Bold,
    Italic,
    Code,
}

/// One render span produced by [`scan_markup_spans`]. `text` is the content
/// with the markup delimiters stripped; the stored string is never altered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupSpan {
    pub kind: MarkupKind,
    pub text: String,
}

/// Splits annotation text into render spans for the inline markup subset:
/// `# ` headers, `**bold**`, `*italic*`, and `` `code` ``.
///
/// Interpretation happens here and in renderers only; unterminated or nested
/// markers fall through as plain text.
pub fn scan_markup_spans(text: &str) -> Vec<MarkupSpan> {
    let mut spans = Vec::new();
    for (line_index, line) in text.lines().enumerate() {
        if line_index > 0 {
            spans.push(MarkupSpan {
                kind: MarkupKind::Plain,
                text: "\n".to_string(),
            });
        }
        if let Some(header) = line.strip_prefix("# ") {
            spans.push(MarkupSpan {
                kind: MarkupKind::Header,
                text: header.to_string(),
            });
            continue;
        }
        scan_inline(line, &mut spans);
    }
    spans
}

fn scan_inline(line: &str, spans: &mut Vec<MarkupSpan>) {
    let mut rest = line;
    while !rest.is_empty() {
        let candidates = [
            (MarkupKind::Bold, BOLD_RE.find(rest)),
            (MarkupKind::Code, CODE_RE.find(rest)),
            (MarkupKind::Italic, ITALIC_RE.find(rest)),
        ];
        let earliest = candidates
            .into_iter()
            .filter_map(|(kind, found)| found.map(|m| (kind, m)))
            .min_by_key(|(_, m)| m.start());

        let Some((kind, m)) = earliest else {
            spans.push(MarkupSpan {
                kind: MarkupKind::Plain,
                text: rest.to_string(),
            });
            break;
        };

        if m.start() > 0 {
            spans.push(MarkupSpan {
                kind: MarkupKind::Plain,
                text: rest[..m.start()].to_string(),
            });
        }
        let delimiter = match kind {
            MarkupKind::Bold => 2,
            _ => 1,
        };
        let inner = &rest[m.start() + delimiter..m.end() - delimiter];
        spans.push(MarkupSpan {
            kind,
            text: inner.to_string(),
        });
        rest = &rest[m.end()..];
    }
}

/// Derives a plain-text preview from note/annotation content.
///
/// Markup symbols are removed, whitespace normalized, and the first
/// [`PREVIEW_MAX_CHARS`] characters retained.
pub fn derive_text_preview(content: &str) -> Option<String> {
    let without_symbols = MARKUP_SYMBOL_RE.replace_all(content, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(PREVIEW_MAX_CHARS).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{derive_text_preview, scan_markup_spans, MarkupKind, MarkupSpan};

    fn span(kind: MarkupKind, text: &str) -> MarkupSpan {
        MarkupSpan {
            kind,
            text: text.to_string(),
        }
    }

    #[test]
    fn header_line_becomes_header_span() {
        let spans = scan_markup_spans("# Shopping");
        assert_eq!(spans, vec![span(MarkupKind::Header, "Shopping")]);
    }

    #[test]
    fn inline_markup_splits_into_spans() {
        let spans = scan_markup_spans("buy **milk** and `eggs`");
        assert_eq!(
            spans,
            vec![
                span(MarkupKind::Plain, "buy "),
                span(MarkupKind::Bold, "milk"),
                span(MarkupKind::Plain, " and "),
                span(MarkupKind::Code, "eggs"),
            ]
        );
    }

    #[test]
    fn italic_does_not_swallow_bold() {
        let spans = scan_markup_spans("**strong** then *soft*");
        assert_eq!(spans[0], span(MarkupKind::Bold, "strong"));
        assert_eq!(spans[2], span(MarkupKind::Italic, "soft"));
    }

    #[test]
    fn unterminated_markers_stay_plain() {
        let spans = scan_markup_spans("half **open");
        assert_eq!(spans, vec![span(MarkupKind::Plain, "half **open")]);
    }

    #[test]
    fn preview_strips_markup_and_limits_length() {
        let source = "# title\n**bold** `code`";
        let preview = derive_text_preview(source).expect("preview should exist");
        assert!(!preview.contains('#'));
        assert!(!preview.contains('*'));
        assert!(preview.contains("title"));
        assert!(preview.chars().count() <= 100);
    }

    #[test]
    fn preview_of_blank_content_is_none() {
        assert_eq!(derive_text_preview("  \n\t"), None);
    }
}
