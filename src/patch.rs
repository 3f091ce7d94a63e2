//! Writing a candidate into its source file, and taking it back out.
//!
//! Validation builds the program with the candidate in place, so the edit
//! has to be exact and reversible: the span is checked before writing, the
//! file is replaced atomically, and the returned [`AppliedPatch`] restores
//! the original text on `revert()` or, failing that, when dropped.

use crate::element::{span_to_bytes, SearchSpaceElement};
use crate::expr::expression_to_string;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// What the span must contain before it is overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanCheck {
    Exact(String),
    /// xxh3 of the expected text, used for long spans.
    Hash(u64),
}

impl SpanCheck {
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            SpanCheck::Hash(xxh3_64(text.as_bytes()))
        } else {
            SpanCheck::Exact(text.to_string())
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            SpanCheck::Exact(expected) => text == expected,
            SpanCheck::Hash(expected) => xxh3_64(text.as_bytes()) == *expected,
        }
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    Utf8 { path: PathBuf },

    #[error("span {location} does not fit in {path}")]
    SpanOutOfRange { location: String, path: PathBuf },

    #[error("{path}:{byte_start}..{byte_end} changed since the patch was prepared (found {found:?})")]
    SpanMismatch {
        path: PathBuf,
        byte_start: usize,
        byte_end: usize,
        found: String,
    },
}

/// Replacement of one byte span by a rendered patch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a SourcePatch does nothing until apply() is called"]
pub struct SourcePatch {
    pub file: PathBuf,
    pub byte_start: usize,
    pub byte_end: usize,
    pub new_text: String,
    pub expected_before: SpanCheck,
}

impl SourcePatch {
    /// Prepare the edit that puts `element` into `file`.
    ///
    /// The span's current text becomes the expected-before check, so a
    /// concurrent change to the file is detected at apply time.
    pub fn for_element(element: &SearchSpaceElement, file: &Path) -> Result<Self, PatchError> {
        let source = read_source(file)?;
        let location = &element.buggy().location;
        let (byte_start, byte_end) =
            span_to_bytes(&source, location).ok_or_else(|| PatchError::SpanOutOfRange {
                location: location.to_string(),
                path: file.to_path_buf(),
            })?;
        Ok(Self {
            file: file.to_path_buf(),
            byte_start,
            byte_end,
            new_text: expression_to_string(element.patch()),
            expected_before: SpanCheck::from_text(&source[byte_start..byte_end]),
        })
    }

    /// Write the patch and return the handle that reverts it.
    pub fn apply(&self) -> Result<AppliedPatch, PatchError> {
        let source = read_source(&self.file)?;
        let current = self.span(&source, self.byte_start, self.byte_end)?;
        if !self.expected_before.matches(current) {
            return Err(self.mismatch(current, self.byte_end));
        }

        let original_text = current.to_string();
        write_spliced(&self.file, &source, self.byte_start, self.byte_end, &self.new_text)?;
        tracing::debug!(
            file = %self.file.display(),
            start = self.byte_start,
            end = self.byte_end,
            "applied patch"
        );

        Ok(AppliedPatch {
            file: self.file.clone(),
            byte_start: self.byte_start,
            byte_end: self.byte_start + self.new_text.len(),
            patched_text: self.new_text.clone(),
            original_text,
            active: true,
        })
    }

    fn span<'a>(&self, source: &'a str, start: usize, end: usize) -> Result<&'a str, PatchError> {
        source.get(start..end).ok_or_else(|| PatchError::SpanOutOfRange {
            location: format!("{start}..{end}"),
            path: self.file.clone(),
        })
    }

    fn mismatch(&self, found: &str, byte_end: usize) -> PatchError {
        PatchError::SpanMismatch {
            path: self.file.clone(),
            byte_start: self.byte_start,
            byte_end,
            found: found.to_string(),
        }
    }
}

/// A patch currently present in a source file.
///
/// Dropping it without calling `revert()` (an early return, a panic while
/// the tests run) still puts the original text back; failures there are
/// logged.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "the source is reverted as soon as this is dropped"]
pub struct AppliedPatch {
    file: PathBuf,
    byte_start: usize,
    byte_end: usize,
    patched_text: String,
    original_text: String,
    active: bool,
}

impl AppliedPatch {
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Put the original text back, checking the patch is still in place.
    pub fn revert(mut self) -> Result<(), PatchError> {
        self.active = false;
        self.revert_inner()
    }

    fn revert_inner(&self) -> Result<(), PatchError> {
        let source = read_source(&self.file)?;
        let current = source
            .get(self.byte_start..self.byte_end)
            .ok_or_else(|| PatchError::SpanOutOfRange {
                location: format!("{}..{}", self.byte_start, self.byte_end),
                path: self.file.clone(),
            })?;
        if current != self.patched_text {
            return Err(PatchError::SpanMismatch {
                path: self.file.clone(),
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }
        write_spliced(
            &self.file,
            &source,
            self.byte_start,
            self.byte_end,
            &self.original_text,
        )?;
        tracing::debug!(file = %self.file.display(), "reverted patch");
        Ok(())
    }
}

impl Drop for AppliedPatch {
    fn drop(&mut self) {
        if self.active {
            if let Err(error) = self.revert_inner() {
                tracing::error!(%error, "could not revert patch; the source is left patched");
            }
        }
    }
}

fn read_source(path: &Path) -> Result<String, PatchError> {
    let bytes = fs::read(path).map_err(|source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| PatchError::Utf8 {
        path: path.to_path_buf(),
    })
}

fn write_spliced(
    path: &Path,
    source: &str,
    start: usize,
    end: usize,
    text: &str,
) -> Result<(), PatchError> {
    let mut content = String::with_capacity(source.len() - (end - start) + text.len());
    content.push_str(&source[..start]);
    content.push_str(text);
    content.push_str(&source[end..]);

    let io = |source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    };
    atomic_write(path, content.as_bytes()).map_err(io)?;
    // make-style builds compare mtimes; patch and revert can land in the same tick
    filetime::set_file_mtime(path, filetime::FileTime::now()).map_err(io)
}

/// Tempfile in the same directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{get_integer_expression, Expression, Operator, Type};
    use crate::location::{CandidateLocation, DefectClass, Location};
    use crate::space::F1xId;
    use std::sync::Arc;

    const SOURCE: &str = "int f(int x) {\n    if (x >= 0)\n        return 1;\n    return 0;\n}\n";

    fn element() -> SearchSpaceElement {
        let x = Expression::variable("x", Type::Integer, "int");
        let original = Expression::apply(Operator::Ge, vec![x.clone(), get_integer_expression(0)]);
        let loc = Arc::new(CandidateLocation {
            defect: DefectClass::Condition,
            location: Location {
                file_id: 0,
                begin_line: 2,
                begin_column: 9,
                end_line: 2,
                end_column: 15,
            },
            loc_id: 0,
            original,
            components: vec![Expression::apply(
                Operator::Gt,
                vec![x, get_integer_expression(0)],
            )],
        });
        SearchSpaceElement::decode(&loc, F1xId::default()).unwrap()
    }

    fn source_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.c");
        fs::write(&file, SOURCE).unwrap();
        (dir, file)
    }

    #[test]
    fn test_span_check() {
        assert!(SpanCheck::from_text("x >= 0").matches("x >= 0"));
        assert!(!SpanCheck::from_text("x >= 0").matches("x > 0"));

        let long = "y".repeat(2000);
        let check = SpanCheck::from_text(&long);
        assert!(matches!(check, SpanCheck::Hash(_)));
        assert!(check.matches(&long));
    }

    #[test]
    fn test_apply_and_revert() {
        let (_dir, file) = source_file();
        let patch = SourcePatch::for_element(&element(), &file).unwrap();
        assert_eq!(patch.expected_before, SpanCheck::Exact("x >= 0".to_string()));

        let applied = patch.apply().unwrap();
        let patched = fs::read_to_string(&file).unwrap();
        assert!(patched.contains("    if ((x > 0))\n"));

        applied.revert().unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), SOURCE);
    }

    #[test]
    fn test_apply_detects_concurrent_change() {
        let (_dir, file) = source_file();
        let patch = SourcePatch::for_element(&element(), &file).unwrap();
        fs::write(&file, SOURCE.replace("x >= 0", "x != 0")).unwrap();

        let err = patch.apply().unwrap_err();
        assert!(matches!(err, PatchError::SpanMismatch { ref found, .. } if found == "x != 0"));
    }

    #[test]
    fn test_revert_refuses_foreign_edit() {
        let (_dir, file) = source_file();
        let applied = SourcePatch::for_element(&element(), &file)
            .unwrap()
            .apply()
            .unwrap();
        fs::write(&file, SOURCE).unwrap();

        assert!(matches!(
            applied.revert().unwrap_err(),
            PatchError::SpanMismatch { .. }
        ));
    }

    #[test]
    fn test_dropped_patch_is_reverted() {
        let (_dir, file) = source_file();
        let applied = SourcePatch::for_element(&element(), &file)
            .unwrap()
            .apply()
            .unwrap();
        assert_ne!(fs::read_to_string(&file).unwrap(), SOURCE);
        drop(applied);
        assert_eq!(fs::read_to_string(&file).unwrap(), SOURCE);
    }

    #[test]
    fn test_panic_while_patched_restores_source() {
        let (_dir, file) = source_file();
        let patch = SourcePatch::for_element(&element(), &file).unwrap();
        let result = std::panic::catch_unwind(|| {
            let _applied = patch.apply().unwrap();
            panic!("test run blew up");
        });
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), SOURCE);
    }

    #[test]
    fn test_span_outside_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("short.c");
        fs::write(&file, "int x;\n").unwrap();
        let err = SourcePatch::for_element(&element(), &file).unwrap_err();
        assert!(matches!(err, PatchError::SpanOutOfRange { .. }));
    }
}
