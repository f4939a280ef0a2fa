use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tree_sitter::{Parser, Tree};

use crate::error::ChurnError;
use crate::language::LangId;

/// Files above this size are scored at the default complexity.
const MAX_SOURCE_SIZE: u64 = 16 * 1024 * 1024;
/// Larger files are memory-mapped instead of read.
const MMAP_THRESHOLD: u64 = 64 * 1024;

pub fn parse_source(source: &[u8], lang_id: LangId) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&lang_id.ts_language())
        .with_context(|| format!("Failed to load the {lang_id} grammar"))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ChurnError::parse_error(&format!("<{lang_id} source>")).into())
}

/// Current file content, mapped or owned depending on size.
pub enum SourceText {
    Mapped(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl std::ops::Deref for SourceText {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(m) => m,
            Self::Owned(v) => v,
        }
    }
}

/// Load the working-tree content of `path`.
pub fn load_source(path: &Path) -> Result<SourceText> {
    let display = path.display().to_string();
    let mut file = File::open(path).map_err(|_| ChurnError::content_lookup(&display))?;
    let len = file.metadata()?.len();

    if len > MAX_SOURCE_SIZE {
        bail!(ChurnError::complexity(
            &display,
            format!("file too large ({len} bytes > {MAX_SOURCE_SIZE} bytes)"),
        ));
    }
    if len > MMAP_THRESHOLD {
        // SAFETY: the map is read-only and dropped before the run ends.
        let map = unsafe { memmap2::Mmap::map(&file)? };
        return Ok(SourceText::Mapped(map));
    }

    let mut buf = Vec::with_capacity(len as usize);
    file.read_to_end(&mut buf)?;
    Ok(SourceText::Owned(buf))
}
