//! Immutable-bullet snapshots
//!
//! A snapshot is the sorted set of `[CORE]` bullet texts at one point in
//! time. Saving one before an apply step and comparing after it detects
//! tampering with immutable content:
//!
//! 1. `evo-check snapshot save SOUL.md /tmp/soul_snapshot.json`
//! 2. apply the change
//! 3. `evo-check snapshot check SOUL.md /tmp/soul_snapshot.json`
//!
//! If the check fails the document must be reverted.
//!
//! # Modification pairing
//!
//! Removed and added bullets are paired as "modified" when they share their
//! first `prefix_len` characters. The heuristic tolerates false positives;
//! every unpaired removal is still reported on its own, so nothing is lost.

use crate::document::SoulDocument;
use evo_core::report::preview;
use evo_core::{EvoError, EvoResult, Finding, Severity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Saved set of immutable bullet texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutableSnapshot {
    core_bullets: BTreeSet<String>,
    count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
}

impl ImmutableSnapshot {
    /// Capture the immutable bullets of a document
    #[must_use]
    pub fn capture(doc: &SoulDocument) -> Self {
        Self::from_bullets(doc.immutable_bullets().map(|b| b.text.clone()))
    }

    /// Build from bullet texts
    #[must_use]
    pub fn from_bullets<I, S>(bullets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let core_bullets: BTreeSet<String> = bullets.into_iter().map(Into::into).collect();
        let digest = Some(digest_of(&core_bullets));
        Self {
            count: core_bullets.len(),
            core_bullets,
            digest,
        }
    }

    /// Sorted bullet texts
    #[inline]
    #[must_use]
    pub fn bullets(&self) -> &BTreeSet<String> {
        &self.core_bullets
    }

    /// Number of bullets
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.core_bullets.len()
    }

    /// Whether the snapshot holds no bullets
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core_bullets.is_empty()
    }

    /// Content digest (hex SHA-256 over the sorted bullets)
    #[must_use]
    pub fn digest(&self) -> String {
        self.digest
            .clone()
            .unwrap_or_else(|| digest_of(&self.core_bullets))
    }

    /// Load a saved snapshot
    ///
    /// Snapshots written without a digest are accepted; a digest that does
    /// not match the stored bullets means the file was edited by hand.
    ///
    /// # Errors
    /// Returns [`EvoError::Io`], [`EvoError::Json`] or [`EvoError::Snapshot`].
    pub fn load(path: &Path) -> EvoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EvoError::io(path, e))?;
        let snapshot: Self = serde_json::from_str(&text).map_err(|e| EvoError::json(path, e))?;
        if let Some(stored) = &snapshot.digest {
            let actual = digest_of(&snapshot.core_bullets);
            if *stored != actual {
                return Err(EvoError::Snapshot(format!(
                    "digest mismatch in {}: stored {stored}, computed {actual}",
                    path.display()
                )));
            }
        }
        Ok(snapshot)
    }

    /// Write the snapshot atomically (temp file in the same directory, then rename)
    ///
    /// # Errors
    /// Returns [`EvoError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> EvoResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let body = serde_json::to_string_pretty(self).map_err(|e| EvoError::json(path, e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| EvoError::io(dir, e))?;
        tmp.write_all(body.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| EvoError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| EvoError::io(path, e.error))?;
        tracing::info!("saved {} immutable bullets to {}", self.len(), path.display());
        Ok(())
    }

    /// Compare this (saved) snapshot against a current capture
    #[must_use]
    pub fn compare(&self, current: &ImmutableSnapshot, prefix_len: usize) -> Vec<SnapshotViolation> {
        if self.digest() == current.digest() {
            return Vec::new();
        }
        compare(&self.core_bullets, &current.core_bullets, prefix_len)
    }
}

fn digest_of(bullets: &BTreeSet<String>) -> String {
    let mut hasher = Sha256::new();
    for bullet in bullets {
        hasher.update(bullet.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Kind of immutability violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    /// Saved bullet missing from the current document
    Removed,
    /// Current bullet absent from the snapshot
    Added,
    /// Saved and current bullets share a prefix but differ
    Modified,
}

/// One difference between a saved snapshot and the current document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotViolation {
    /// What happened
    pub kind: ViolationKind,
    /// Saved text (removed/modified)
    pub before: Option<String>,
    /// Current text (added/modified)
    pub after: Option<String>,
}

impl SnapshotViolation {
    /// Severity: additions warn, everything else is critical
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self.kind {
            ViolationKind::Added => Severity::Warning,
            ViolationKind::Removed | ViolationKind::Modified => Severity::Critical,
        }
    }

    /// Human-readable description
    #[must_use]
    pub fn message(&self) -> String {
        let before = self.before.as_deref().unwrap_or_default();
        let after = self.after.as_deref().unwrap_or_default();
        match self.kind {
            ViolationKind::Removed => {
                format!("[CORE] bullet REMOVED: \"{}\"", preview(before, 80))
            }
            ViolationKind::Added => format!(
                "New [CORE] bullet appeared: \"{}\" (only users should add [CORE])",
                preview(after, 80)
            ),
            ViolationKind::Modified => format!(
                "[CORE] bullet MODIFIED:\n  Before: \"{}\"\n  After:  \"{}\"",
                preview(before, 80),
                preview(after, 80)
            ),
        }
    }

    /// Convert into a report finding
    #[must_use]
    pub fn into_finding(self) -> Finding {
        let finding = Finding::new(self.severity(), self.message());
        if self.kind == ViolationKind::Added {
            finding
        } else {
            finding.field("[CORE]")
        }
    }
}

/// Diff two immutable bullet sets
///
/// Removals come first, then additions, then prefix-paired modifications
/// (every saved × current pair whose first `prefix_len` characters agree but
/// whose full text differs).
#[must_use]
pub fn compare(
    saved: &BTreeSet<String>,
    current: &BTreeSet<String>,
    prefix_len: usize,
) -> Vec<SnapshotViolation> {
    let mut violations: Vec<SnapshotViolation> = saved
        .difference(current)
        .map(|b| SnapshotViolation {
            kind: ViolationKind::Removed,
            before: Some(b.clone()),
            after: None,
        })
        .collect();

    violations.extend(current.difference(saved).map(|b| SnapshotViolation {
        kind: ViolationKind::Added,
        before: None,
        after: Some(b.clone()),
    }));

    for before in saved {
        let prefix = preview(before, prefix_len);
        for after in current {
            if after != before && preview(after, prefix_len) == prefix {
                violations.push(SnapshotViolation {
                    kind: ViolationKind::Modified,
                    before: Some(before.clone()),
                    after: Some(after.clone()),
                });
            }
        }
    }

    violations
}
