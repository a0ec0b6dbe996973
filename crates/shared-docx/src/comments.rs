//! Review comment insertion
//!
//! Every issue becomes one Word comment anchored on the first substantive
//! paragraph of the document. Insertion is best-effort: when the structural
//! edit cannot be applied (missing relationships part, unexpected markup, ...)
//! the comment text is appended to the paragraph as a highlighted run instead.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use shared_types::Issue;

use crate::error::{DocxError, Result};
use crate::package::{
    DocxPackage, COMMENTS_PART, CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, WORDML_NS,
};
use crate::paragraphs::{escape_xml, paragraphs, Paragraph};

/// Suffix appended to the file stem of every reviewed copy
pub const REVIEWED_SUFFIX: &str = "_REVIEWED";

const COMMENTS_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
const COMMENTS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";

/// Paragraphs with at most this many non-whitespace characters are skipped as anchors
const MIN_ANCHOR_CHARS: usize = 3;

lazy_static! {
    static ref COMMENT_ID_RE: Regex = Regex::new(r#"<w:comment\s[^>]*w:id="(\d+)""#).unwrap();
    static ref REL_ID_RE: Regex = Regex::new(r#"Id="rId(\d+)""#).unwrap();
    // `<w:pPr>`, `<w:pPr/>` and `</w:pPr>` but not `<w:pPrChange>`
    static ref PPR_TAG_RE: Regex = Regex::new(r"<(/?)w:pPr(?:\s[^>]*?)?(/?)>").unwrap();
}

/// How a single comment ended up in the reviewed copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentPlacement {
    /// A real comment in `word/comments.xml`, referenced from the paragraph
    StructuralEdit { comment_id: u32 },
    /// Inline `[COMMENT]` run with a yellow highlight
    FallbackHighlight,
}

#[derive(Debug, Clone)]
pub struct AnnotationOutcome {
    pub reviewed_path: PathBuf,
    pub anchor_paragraph: usize,
    pub placements: Vec<CommentPlacement>,
}

impl AnnotationOutcome {
    pub fn fallback_count(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| **p == CommentPlacement::FallbackHighlight)
            .count()
    }
}

/// Writes reviewed copies of documents into a fixed output directory.
#[derive(Debug, Clone)]
pub struct Annotator {
    output_dir: PathBuf,
    author: String,
    initials: String,
}

impl Annotator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            author: "ADGM Review Agent".to_string(),
            initials: "RA".to_string(),
        }
    }

    /// Path of the reviewed copy for `document_path`
    pub fn reviewed_path(&self, document_path: &Path) -> PathBuf {
        self.reviewed_path_numbered(document_path, 1)
    }

    /// `<stem>_REVIEWED.docx` for `copy` 1, `<stem>_REVIEWED_<copy>.docx` after that
    pub fn reviewed_path_numbered(&self, document_path: &Path, copy: usize) -> PathBuf {
        let stem = document_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        if copy <= 1 {
            self.output_dir.join(format!("{stem}{REVIEWED_SUFFIX}.docx"))
        } else {
            self.output_dir.join(format!("{stem}{REVIEWED_SUFFIX}_{copy}.docx"))
        }
    }

    /// Insert one comment per issue into a copy of `document_path`.
    ///
    /// The source file is only read. Fails when the document cannot be read
    /// or has no paragraph at all to carry the fallback annotation.
    pub fn annotate(&self, document_path: &Path, issues: &[Issue]) -> Result<AnnotationOutcome> {
        self.annotate_to(document_path, issues, self.reviewed_path(document_path))
    }

    /// Like [`Annotator::annotate`], writing the copy to `reviewed_path`.
    pub fn annotate_to(
        &self,
        document_path: &Path,
        issues: &[Issue],
        reviewed_path: PathBuf,
    ) -> Result<AnnotationOutcome> {
        let mut package = DocxPackage::open(document_path)?;
        let mut placements = Vec::with_capacity(issues.len());
        let mut anchor_paragraph = 0;

        for issue in issues {
            let note = issue.comment_text();
            let anchor = anchor_paragraph_index(&package)?;
            anchor_paragraph = anchor;

            let placement = match insert_comment(&mut package, anchor, &note, &self.author, &self.initials) {
                Ok(comment_id) => {
                    tracing::debug!(comment_id, paragraph = anchor, "Inserted review comment");
                    CommentPlacement::StructuralEdit { comment_id }
                }
                Err(err) => {
                    tracing::warn!(
                        document = %document_path.display(),
                        error = %err,
                        "Structural comment insertion failed, highlighting inline"
                    );
                    insert_highlight(&mut package, anchor, &note)?;
                    CommentPlacement::FallbackHighlight
                }
            };
            placements.push(placement);
        }

        if let Some(dir) = reviewed_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        package.save(&reviewed_path)?;

        Ok(AnnotationOutcome {
            reviewed_path,
            anchor_paragraph,
            placements,
        })
    }
}

/// First paragraph with more than three non-whitespace characters, or the
/// first paragraph when none qualifies.
pub fn anchor_paragraph_index(package: &DocxPackage) -> Result<usize> {
    let found = package.paragraphs()?;
    if found.is_empty() {
        return Err(DocxError::NoParagraphs);
    }
    Ok(found
        .iter()
        .find(|p| p.is_substantive(MIN_ANCHOR_CHARS))
        .map(|p| p.index)
        .unwrap_or(0))
}

fn locate(xml: &str, index: usize) -> Result<Paragraph> {
    paragraphs(xml)
        .into_iter()
        .nth(index)
        .ok_or(DocxError::NoParagraphs)
}

/// Structural path: comments part, relationship, content type and the
/// range/reference markup in the paragraph. Nothing is written to the
/// package unless every edit could be prepared.
pub fn insert_comment(
    package: &mut DocxPackage,
    paragraph_index: usize,
    text: &str,
    author: &str,
    initials: &str,
) -> Result<u32> {
    let document = package.part_str(DOCUMENT_PART)?;
    let paragraph = locate(document, paragraph_index)?;
    if paragraph.is_self_closing(document) {
        return Err(DocxError::Malformed(format!(
            "paragraph {paragraph_index} has no content to anchor a comment"
        )));
    }

    let existing_comments = package.part_str(COMMENTS_PART).ok().map(str::to_string);
    let comment_id = existing_comments
        .as_deref()
        .map(next_comment_id)
        .unwrap_or(0);

    let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let comment = format!(
        "<w:comment w:id=\"{comment_id}\" w:author=\"{}\" w:date=\"{date}\" w:initials=\"{}\">\
         <w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p></w:comment>",
        escape_xml(author),
        escape_xml(initials),
        escape_xml(text)
    );

    let ranged_document = with_comment_range(document, &paragraph, comment_id)?;
    let mut staged: Vec<(&str, String)> = Vec::new();

    match existing_comments {
        Some(comments) => {
            let close = comments
                .rfind("</w:comments>")
                .ok_or_else(|| DocxError::Malformed(COMMENTS_PART.to_string()))?;
            let mut updated = comments;
            updated.insert_str(close, &comment);
            staged.push((COMMENTS_PART, updated));
        }
        None => {
            staged.push((
                COMMENTS_PART,
                format!(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
                     <w:comments xmlns:w=\"{WORDML_NS}\">{comment}</w:comments>"
                ),
            ));
            staged.push((DOCUMENT_RELS_PART, with_comments_relationship(package)?));
            staged.push((CONTENT_TYPES_PART, with_comments_content_type(package)?));
        }
    }

    staged.push((DOCUMENT_PART, ranged_document));

    for (name, xml) in staged {
        package.set_part(name, xml.into_bytes());
    }
    Ok(comment_id)
}

/// Fallback path: append a highlighted `[COMMENT]` run to the paragraph.
pub fn insert_highlight(package: &mut DocxPackage, paragraph_index: usize, text: &str) -> Result<()> {
    let document = package.part_str(DOCUMENT_PART)?;
    let paragraph = locate(document, paragraph_index)?;
    let run = format!(
        "<w:r><w:rPr><w:highlight w:val=\"yellow\"/></w:rPr><w:t xml:space=\"preserve\"> [COMMENT] {}</w:t></w:r>",
        escape_xml(text)
    );

    let span = &document[paragraph.start..paragraph.end];
    let rewritten = if paragraph.is_self_closing(document) {
        // `<w:p .../>` becomes `<w:p ...>run</w:p>`
        format!("{}>{run}</w:p>", &span[..span.len() - 2])
    } else {
        let close = span.len() - "</w:p>".len();
        format!("{}{run}</w:p>", &span[..close])
    };

    let mut updated = String::with_capacity(document.len() + run.len());
    updated.push_str(&document[..paragraph.start]);
    updated.push_str(&rewritten);
    updated.push_str(&document[paragraph.end..]);
    package.set_part(DOCUMENT_PART, updated.into_bytes());
    Ok(())
}

fn next_comment_id(comments_xml: &str) -> u32 {
    COMMENT_ID_RE
        .captures_iter(comments_xml)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(0)
}

fn with_comments_relationship(package: &DocxPackage) -> Result<String> {
    let rels = package.part_str(DOCUMENT_RELS_PART)?;
    let close = rels
        .rfind("</Relationships>")
        .ok_or_else(|| DocxError::Malformed(DOCUMENT_RELS_PART.to_string()))?;
    let next_id = REL_ID_RE
        .captures_iter(rels)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(1);

    let mut updated = rels.to_string();
    updated.insert_str(
        close,
        &format!(
            "<Relationship Id=\"rId{next_id}\" Type=\"{COMMENTS_REL_TYPE}\" Target=\"comments.xml\"/>"
        ),
    );
    Ok(updated)
}

fn with_comments_content_type(package: &DocxPackage) -> Result<String> {
    let types = package.part_str(CONTENT_TYPES_PART)?;
    if types.contains("PartName=\"/word/comments.xml\"") {
        return Ok(types.to_string());
    }
    let close = types
        .rfind("</Types>")
        .ok_or_else(|| DocxError::Malformed(CONTENT_TYPES_PART.to_string()))?;

    let mut updated = types.to_string();
    updated.insert_str(
        close,
        &format!("<Override PartName=\"/word/comments.xml\" ContentType=\"{COMMENTS_CONTENT_TYPE}\"/>"),
    );
    Ok(updated)
}

/// Offset in `span` where paragraph content starts: after the top-level
/// `w:pPr` when present, otherwise right after the `<w:p>` tag.
///
/// `w:pPr` must be the first child; nested `w:pPr` inside `w:pPrChange` is
/// skipped by depth counting.
fn content_start(span: &str) -> Result<usize> {
    let malformed = |what: &str| DocxError::Malformed(format!("paragraph properties: {what}"));

    let open_end = span.find('>').map(|pos| pos + 1).ok_or_else(|| malformed("unterminated tag"))?;
    let body = &span[open_end..];
    let first_child = body.len() - body.trim_start().len();

    let mut tags = PPR_TAG_RE.captures_iter(body);
    let first = match tags.next() {
        None => return Ok(open_end),
        Some(caps) => caps,
    };
    let whole = first.get(0).ok_or_else(|| malformed("no match"))?;
    if whole.start() != first_child || !first[1].is_empty() {
        return Err(malformed("not the first child of the paragraph"));
    }
    if !first[2].is_empty() {
        return Ok(open_end + whole.end());
    }

    let mut depth = 1usize;
    for caps in tags {
        let tag = caps.get(0).ok_or_else(|| malformed("no match"))?;
        match (caps[1].is_empty(), caps[2].is_empty()) {
            // `</w:pPr>`
            (false, _) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open_end + tag.end());
                }
            }
            // `<w:pPr>`
            (true, true) => depth += 1,
            // `<w:pPr/>`
            (true, false) => {}
        }
    }
    Err(malformed("unclosed w:pPr"))
}

fn with_comment_range(document: &str, paragraph: &Paragraph, comment_id: u32) -> Result<String> {
    let span = &document[paragraph.start..paragraph.end];
    let open_at = content_start(span)?;
    let close_at = span.len() - "</w:p>".len();

    let mut rewritten = String::with_capacity(span.len() + 256);
    rewritten.push_str(&span[..open_at]);
    rewritten.push_str(&format!("<w:commentRangeStart w:id=\"{comment_id}\"/>"));
    rewritten.push_str(&span[open_at..close_at]);
    rewritten.push_str(&format!(
        "<w:commentRangeEnd w:id=\"{comment_id}\"/>\
         <w:r><w:rPr><w:rStyle w:val=\"CommentReference\"/></w:rPr><w:commentReference w:id=\"{comment_id}\"/></w:r>"
    ));
    rewritten.push_str(&span[close_at..]);

    let mut updated = String::with_capacity(document.len() + rewritten.len());
    updated.push_str(&document[..paragraph.start]);
    updated.push_str(&rewritten);
    updated.push_str(&document[paragraph.end..]);
    Ok(updated)
}
