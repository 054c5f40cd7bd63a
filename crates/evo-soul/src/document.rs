//! Persona document parser
//!
//! The document is line-oriented markdown:
//!
//! ```text
//! ## Personality                       <- section
//! ### Voice                            <- subsection
//! - Speaks plainly [MUTABLE]           <- bullet with trailing tag
//! - Always act with integrity [CORE]
//! ```
//!
//! A bullet's identity is its trimmed text. Proposals and snapshots match
//! bullets by exact string equality, never by position.

use evo_core::report::preview;
use evo_core::{EvoError, EvoResult};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Immutable tag marker
pub const CORE_TAG: &str = "[CORE]";
/// Mutable tag marker
pub const MUTABLE_TAG: &str = "[MUTABLE]";
/// List-item marker that opens a bullet
pub const BULLET_MARKER: &str = "- ";
/// Two-level heading marker
pub const SECTION_MARKER: &str = "## ";
/// Three-level heading marker
pub const SUBSECTION_MARKER: &str = "### ";

static TRAILING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[A-Z][A-Z_]*\]$").expect("trailing tag pattern"));
static LEADING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^- \[(CORE|MUTABLE)\]").expect("leading tag pattern"));

/// Bullet-level protection tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulletTag {
    /// `[CORE]`: never altered by the automated pipeline
    Immutable,
    /// `[MUTABLE]`
    Mutable,
    /// Any other trailing bracketed marker
    Unrecognized(String),
}

impl BulletTag {
    /// Classify a marker such as `[CORE]`
    #[must_use]
    pub fn from_marker(marker: &str) -> Self {
        match marker {
            CORE_TAG => Self::Immutable,
            MUTABLE_TAG => Self::Mutable,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Marker text
    #[must_use]
    pub fn marker(&self) -> &str {
        match self {
            Self::Immutable => CORE_TAG,
            Self::Mutable => MUTABLE_TAG,
            Self::Unrecognized(marker) => marker,
        }
    }

    /// Whether this is the immutable tag
    #[inline]
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        matches!(self, Self::Immutable)
    }
}

impl fmt::Display for BulletTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// One bullet line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    /// 1-based line number
    pub line: usize,
    /// Trimmed line text; the bullet's identity
    pub text: String,
    /// Trailing tag, if any
    pub tag: Option<BulletTag>,
    /// Owning section header
    pub section: Option<String>,
    /// Owning subsection header
    pub subsection: Option<String>,
}

impl Bullet {
    /// Whether the bullet carries the immutable tag
    #[inline]
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.tag.as_ref().is_some_and(BulletTag::is_immutable)
    }

    /// Whether a protection tag sits at the start instead of the end
    #[must_use]
    pub fn has_leading_tag(&self) -> bool {
        LEADING_TAG.is_match(&self.text)
    }
}

/// A header line that appears where it should not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisplacedHeader {
    /// 1-based line number
    pub line: usize,
    /// Trimmed header text
    pub text: String,
}

/// Parsed persona document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoulDocument {
    sections: IndexMap<String, IndexSet<String>>,
    bullets: Vec<Bullet>,
    orphan_subsections: Vec<MisplacedHeader>,
    duplicate_sections: Vec<MisplacedHeader>,
}

impl SoulDocument {
    /// Parse document text
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let mut current_section: Option<String> = None;
        let mut current_sub: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let stripped = raw.trim();

            if stripped.starts_with(SECTION_MARKER) && !stripped.starts_with(SUBSECTION_MARKER) {
                let name = stripped.to_string();
                if doc.sections.contains_key(&name) {
                    doc.duplicate_sections.push(MisplacedHeader {
                        line,
                        text: name.clone(),
                    });
                }
                doc.sections.entry(name.clone()).or_default();
                current_section = Some(name);
                current_sub = None;
            } else if stripped.starts_with(SUBSECTION_MARKER) {
                let name = stripped.to_string();
                match current_section.as_ref().and_then(|s| doc.sections.get_mut(s)) {
                    Some(subs) => {
                        subs.insert(name.clone());
                    }
                    None => doc.orphan_subsections.push(MisplacedHeader {
                        line,
                        text: name.clone(),
                    }),
                }
                current_sub = Some(name);
            } else if stripped.starts_with(BULLET_MARKER) {
                let tag = TRAILING_TAG
                    .find(stripped)
                    .map(|m| BulletTag::from_marker(m.as_str()));
                doc.bullets.push(Bullet {
                    line,
                    text: stripped.to_string(),
                    tag,
                    section: current_section.clone(),
                    subsection: current_sub.clone(),
                });
            }
        }

        doc
    }

    /// Read and parse a document file
    ///
    /// # Errors
    /// Returns [`EvoError::Io`] if the file cannot be read.
    pub fn load(path: &Path) -> EvoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EvoError::io(path, e))?;
        let doc = Self::parse(&text);
        tracing::debug!(
            "parsed {}: {} sections, {} bullets",
            path.display(),
            doc.sections.len(),
            doc.bullets.len()
        );
        Ok(doc)
    }

    /// Section headers in document order
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Number of distinct sections
    #[inline]
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Whether a section header exists
    #[inline]
    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Subsections of a section, in document order
    #[must_use]
    pub fn subsections(&self, section: &str) -> Option<&IndexSet<String>> {
        self.sections.get(section)
    }

    /// All bullets in document order
    #[inline]
    #[must_use]
    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    /// Subsection headers seen before any section
    #[inline]
    #[must_use]
    pub fn orphan_subsections(&self) -> &[MisplacedHeader] {
        &self.orphan_subsections
    }

    /// Repeated section headers (merged into the first occurrence)
    #[inline]
    #[must_use]
    pub fn duplicate_sections(&self) -> &[MisplacedHeader] {
        &self.duplicate_sections
    }

    /// Set of bullet identities
    #[must_use]
    pub fn bullet_texts(&self) -> HashSet<&str> {
        self.bullets.iter().map(|b| b.text.as_str()).collect()
    }

    /// Whether `text` (after trimming) is exactly some bullet line
    #[must_use]
    pub fn contains_bullet(&self, text: &str) -> bool {
        let needle = text.trim();
        self.bullets.iter().any(|b| b.text == needle)
    }

    /// First bullet sharing the leading `prefix_len` characters with `text`
    ///
    /// A best-effort hint for near misses, not a correctness mechanism.
    #[must_use]
    pub fn closest_by_prefix(&self, text: &str, prefix_len: usize) -> Option<&Bullet> {
        let prefix = preview(text.trim(), prefix_len);
        self.bullets
            .iter()
            .find(|b| preview(&b.text, prefix_len) == prefix)
    }

    /// Bullets carrying the immutable tag
    pub fn immutable_bullets(&self) -> impl Iterator<Item = &Bullet> {
        self.bullets.iter().filter(|b| b.is_immutable())
    }

    /// Number of bullets with exactly this tag
    #[must_use]
    pub fn count_tag(&self, tag: &BulletTag) -> usize {
        self.bullets
            .iter()
            .filter(|b| b.tag.as_ref() == Some(tag))
            .count()
    }

    /// Canonical outline: sections, subsections and bullets in order
    ///
    /// Re-parsing the outline yields the same bullet identities and tags.
    /// Bullets that precede every section are emitted first.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut section: Option<&str> = None;
        let mut subsection: Option<&str> = None;

        for bullet in &self.bullets {
            if bullet.section.as_deref() != section {
                section = bullet.section.as_deref();
                subsection = None;
                if let Some(name) = section {
                    out.push_str(name);
                    out.push('\n');
                }
            }
            if bullet.subsection.as_deref() != subsection {
                subsection = bullet.subsection.as_deref();
                if let Some(name) = subsection {
                    out.push_str(name);
                    out.push('\n');
                }
            }
            out.push_str(&bullet.text);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "# Soul

## Personality
### Voice
- Speaks plainly [MUTABLE]
- Always act with integrity [CORE]

## Boundaries
- Never share private data [CORE]
- [CORE] Misplaced tag
- No tag at all
- Odd tag [LEGACY]
";

    #[test]
    fn parses_sections_and_subsections() {
        let doc = SoulDocument::parse(DOC);
        assert_eq!(
            doc.sections().collect::<Vec<_>>(),
            vec!["## Personality", "## Boundaries"]
        );
        let subs = doc.subsections("## Personality").unwrap();
        assert!(subs.contains("### Voice"));
        assert!(doc.subsections("## Boundaries").unwrap().is_empty());
    }

    #[test]
    fn bullets_carry_owner_and_tag() {
        let doc = SoulDocument::parse(DOC);
        let first = &doc.bullets()[0];
        assert_eq!(first.line, 5);
        assert_eq!(first.text, "- Speaks plainly [MUTABLE]");
        assert_eq!(first.tag, Some(BulletTag::Mutable));
        assert_eq!(first.section.as_deref(), Some("## Personality"));
        assert_eq!(first.subsection.as_deref(), Some("### Voice"));

        let core = &doc.bullets()[2];
        assert!(core.is_immutable());
        assert_eq!(core.subsection, None);
    }

    #[test]
    fn classifies_defective_tags() {
        let doc = SoulDocument::parse(DOC);
        let misplaced = &doc.bullets()[3];
        assert_eq!(misplaced.tag, None);
        assert!(misplaced.has_leading_tag());

        assert_eq!(doc.bullets()[4].tag, None);
        assert_eq!(
            doc.bullets()[5].tag,
            Some(BulletTag::Unrecognized("[LEGACY]".to_string()))
        );
    }

    #[test]
    fn records_orphans_and_duplicates() {
        let doc = SoulDocument::parse("### Early\n- x [MUTABLE]\n## A\n## A\n");
        assert_eq!(doc.orphan_subsections()[0].text, "### Early");
        assert_eq!(doc.duplicate_sections()[0].line, 4);
        assert_eq!(doc.section_count(), 1);
        assert_eq!(doc.bullets()[0].section, None);
        assert_eq!(doc.bullets()[0].subsection.as_deref(), Some("### Early"));
    }

    #[test]
    fn exact_match_is_trimmed_string_equality() {
        let doc = SoulDocument::parse(DOC);
        assert!(doc.contains_bullet("  - Speaks plainly [MUTABLE]  "));
        assert!(!doc.contains_bullet("- Speaks plainly [MUTABLE]."));
        assert!(!doc.contains_bullet("- speaks plainly [MUTABLE]"));
    }

    #[test]
    fn closest_by_prefix_hint() {
        let doc = SoulDocument::parse(DOC);
        let hint = doc.closest_by_prefix("- Always act with integrity, always [CORE]", 20);
        assert_eq!(hint.unwrap().text, "- Always act with integrity [CORE]");
        assert!(doc.closest_by_prefix("- Something else entirely", 20).is_none());
    }

    #[test]
    fn indented_headers_are_recognised() {
        let doc = SoulDocument::parse("  ## Personality\n  - Calm [MUTABLE]\n");
        assert!(doc.has_section("## Personality"));
        assert_eq!(doc.bullets()[0].text, "- Calm [MUTABLE]");
    }

    #[test]
    fn bare_dash_is_not_a_bullet() {
        let doc = SoulDocument::parse("## A\n-\n- \n---\n");
        assert!(doc.bullets().is_empty());
    }

    #[test]
    fn render_round_trips_bullets() {
        let doc = SoulDocument::parse(DOC);
        let again = SoulDocument::parse(&doc.render());
        let pairs = |d: &SoulDocument| {
            d.bullets()
                .iter()
                .map(|b| (b.text.clone(), b.tag.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(pairs(&doc), pairs(&again));
    }
}
