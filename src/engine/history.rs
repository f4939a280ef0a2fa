//! Commit stream reader backed by `git log -z --numstat`.
//!
//! Commits come out newest first, one at a time, while git is still writing;
//! the child process is killed if the stream is dropped early. Output is
//! NUL-separated so paths arrive verbatim, without git's C-style quoting.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::{Result, bail};
use tracing::debug;

use crate::error::ChurnError;
use crate::models::commit::{ChangeRecord, Commit};

const RECORD_SEP: char = '\u{1e}';
const UNIT_SEP: char = '\u{1f}';
const LOG_FORMAT: &str = "--format=%x1e%H%x1f%an";

/// A validated local git repository.
#[derive(Debug, Clone)]
pub struct GitHistory {
    root: PathBuf,
    has_commits: bool,
}

impl GitHistory {
    /// Open the repository containing `dir`.
    ///
    /// The working-tree root (not `dir` itself) becomes the base for content
    /// lookups, since numstat paths are relative to it.
    pub fn open(dir: &Path) -> Result<Self> {
        let location = dir.display().to_string();
        if !dir.is_dir() {
            bail!(ChurnError::repository_access(&location, "not a directory"));
        }

        let output = git(dir)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .map_err(|e| ChurnError::repository_access(&location, format!("failed to run git: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(ChurnError::repository_access(&location, stderr.trim()));
        }
        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());

        let has_commits = git(&root)
            .args(["rev-parse", "--verify", "--quiet", "HEAD"])
            .stdout(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        debug!(root = %root.display(), has_commits, "opened git repository");
        Ok(Self { root, has_commits })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stream at most `limit` commits, newest first.
    pub fn commits(&self, limit: usize) -> Result<CommitStream> {
        let location = self.root.display().to_string();
        if !self.has_commits || limit == 0 {
            return Ok(CommitStream::empty(location));
        }

        let mut child = git(&self.root)
            .args(["log", "-z", "--numstat", "-M", LOG_FORMAT, "-n", &limit.to_string()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ChurnError::repository_access(&location, format!("failed to run git: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ChurnError::repository_access(&location, "git produced no output"))?;
        let stderr = child.stderr.take().map(drain_stderr);

        Ok(CommitStream {
            child: Some(child),
            reader: Some(BufReader::new(stdout)),
            stderr,
            assembler: CommitAssembler::new(),
            location,
        })
    }
}

fn git(dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.args(["-c", "core.quotepath=off"]).current_dir(dir);
    cmd
}

/// Read git's stderr to the end on its own thread so a chatty git never
/// blocks on a full pipe while stdout is still being consumed.
fn drain_stderr(mut stderr: ChildStderr) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut text = String::new();
        let _ = stderr.read_to_string(&mut text);
        text
    })
}

/// Progress through a `-z` rename entry, whose paths follow as two tokens.
#[derive(Debug, Clone, Copy)]
enum Rename {
    Idle,
    OldPath { added: u64, deleted: u64 },
    NewPath { added: u64, deleted: u64 },
}

/// Builds commits from `-z` tokens.
#[derive(Debug)]
struct CommitAssembler {
    pending: Option<Commit>,
    rename: Rename,
}

impl CommitAssembler {
    fn new() -> Self {
        Self {
            pending: None,
            rename: Rename::Idle,
        }
    }

    /// Apply one NUL-terminated token; returns a commit once the next
    /// header closes it.
    fn consume(&mut self, token: &str) -> Option<Commit> {
        match std::mem::replace(&mut self.rename, Rename::Idle) {
            Rename::OldPath { added, deleted } => {
                self.rename = Rename::NewPath { added, deleted };
                return None;
            }
            Rename::NewPath { added, deleted } => {
                if !token.is_empty() {
                    self.push_change(ChangeRecord::from_path(token, added, deleted));
                }
                return None;
            }
            Rename::Idle => {}
        }

        let token = token.strip_prefix('\n').unwrap_or(token);
        if let Some(header) = token.strip_prefix(RECORD_SEP) {
            return self.pending.replace(parse_header(header));
        }
        match parse_numstat_entry(token) {
            Some(NumstatEntry::Change(change)) => self.push_change(change),
            Some(NumstatEntry::Rename { added, deleted }) => {
                self.rename = Rename::OldPath { added, deleted };
            }
            None => {}
        }
        None
    }

    fn push_change(&mut self, change: ChangeRecord) {
        if let Some(commit) = self.pending.as_mut() {
            commit.changes.push(change);
        }
    }
}

/// Lazy, finite, non-restartable sequence of commits.
pub struct CommitStream {
    child: Option<Child>,
    reader: Option<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
    assembler: CommitAssembler,
    location: String,
}

impl CommitStream {
    fn empty(location: String) -> Self {
        Self {
            child: None,
            reader: None,
            stderr: None,
            assembler: CommitAssembler::new(),
            location,
        }
    }

    /// Reap git once stdout is exhausted and surface a failed exit.
    fn finish(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            bail!(ChurnError::repository_access(
                &self.location,
                format!("git log failed: {}", stderr.trim()),
            ));
        }
        Ok(())
    }
}

impl Iterator for CommitStream {
    type Item = Result<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\0', &mut buf) {
                Ok(0) => {
                    self.reader = None;
                    if let Err(e) = self.finish() {
                        self.assembler.pending = None;
                        return Some(Err(e));
                    }
                    return self.assembler.pending.take().map(Ok);
                }
                Ok(_) => {
                    if buf.last() == Some(&0) {
                        buf.pop();
                    }
                    let token = String::from_utf8_lossy(&buf).into_owned();
                    if let Some(done) = self.assembler.consume(&token) {
                        return Some(Ok(done));
                    }
                }
                Err(e) => {
                    self.reader = None;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

impl Drop for CommitStream {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn parse_header(header: &str) -> Commit {
    let (hash, author) = header.split_once(UNIT_SEP).unwrap_or((header, ""));
    Commit {
        hash: hash.to_string(),
        author: author.to_string(),
        changes: Vec::new(),
    }
}

/// One `-z` numstat token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumstatEntry {
    Change(ChangeRecord),
    /// `added<TAB>deleted<TAB>` with the old and new paths in the next two
    /// tokens.
    Rename { added: u64, deleted: u64 },
}

/// Parse `added<TAB>deleted<TAB>path`. Binary files report `-` counts.
pub fn parse_numstat_entry(token: &str) -> Option<NumstatEntry> {
    let mut parts = token.splitn(3, '\t');
    let added = parse_count(parts.next()?)?;
    let deleted = parse_count(parts.next()?)?;
    let path = parts.next()?;
    if path.is_empty() {
        return Some(NumstatEntry::Rename { added, deleted });
    }
    Some(NumstatEntry::Change(ChangeRecord::from_path(path, added, deleted)))
}

fn parse_count(field: &str) -> Option<u64> {
    if field == "-" {
        Some(0)
    } else {
        field.parse().ok()
    }
}

#[cfg(test)]
pub(crate) mod test_repo {
    use std::path::Path;
    use std::process::Command;

    pub fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args([
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "init.defaultBranch=main",
            ])
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    pub fn init(dir: &Path) {
        git(dir, &["init", "-q"]);
    }

    /// Write each `(path, content)` and commit them as `author`.
    pub fn commit(dir: &Path, author: &str, files: &[(&str, &str)]) {
        for (path, content) in files {
            let full = dir.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(full, content).unwrap();
            git(dir, &["add", path]);
        }
        let author_arg = format!("{author} <{}@example.com>", author.to_lowercase());
        git(dir, &["commit", "-q", "-m", "change", "--author", &author_arg]);
    }
}
