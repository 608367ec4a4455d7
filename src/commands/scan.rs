use crate::git::{self, StatusSource};
use crate::status_parser::StatusReport;
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

const MARKER_DIR: &str = ".git";
const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCandidate {
    pub path: PathBuf,
    pub is_repository: bool,
}

/// A directory is a repository iff it has a `.git` directory directly inside.
pub fn classify(path: &Path) -> RepositoryCandidate {
    RepositoryCandidate {
        path: path.to_path_buf(),
        is_repository: path.join(MARKER_DIR).is_dir(),
    }
}

/// Immediate child directories of `parent`, in enumeration order.
pub fn locate_candidates(parent: &Path) -> Result<Vec<RepositoryCandidate>> {
    let entries = fs::read_dir(parent)
        .with_context(|| format!("Failed to list directory {}", parent.display()))?;

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        // Follows symlinks, unlike DirEntry::file_type
        if !path.is_dir() {
            continue;
        }
        candidates.push(classify(&path));
    }

    Ok(candidates)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub staged: usize,
    pub modified: usize,
    pub untracked: usize,
}

impl Totals {
    pub fn add(self, report: &StatusReport) -> Totals {
        Totals {
            staged: self.staged + report.staged.len(),
            modified: self.modified + report.modified.len(),
            untracked: self.untracked + report.untracked.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepoChanges {
    pub name: String,
    pub path: PathBuf,
    pub branch: Option<String>,
    pub report: StatusReport,
}

#[derive(Debug, Clone)]
pub struct Unreadable {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub base_dir: PathBuf,
    pub repositories_found: usize,
    pub changed: Vec<RepoChanges>,
    pub unreadable: Vec<Unreadable>,
    pub totals: Totals,
}

pub fn scan<S: StatusSource>(base_dir: &Path, source: &S) -> Result<ScanSummary> {
    let mut summary = ScanSummary {
        base_dir: base_dir.to_path_buf(),
        repositories_found: 0,
        changed: Vec::new(),
        unreadable: Vec::new(),
        totals: Totals::default(),
    };

    for candidate in locate_candidates(base_dir)? {
        if !candidate.is_repository {
            tracing::debug!(path = %candidate.path.display(), "not a git repository");
            continue;
        }
        summary.repositories_found += 1;

        let name = dir_name(&candidate.path);
        match source.status(&candidate.path) {
            Ok(Some(report)) => {
                summary.totals = summary.totals.add(&report);
                summary.changed.push(RepoChanges {
                    name,
                    branch: git::current_branch(&candidate.path),
                    path: candidate.path,
                    report,
                });
            }
            Ok(None) => tracing::debug!(repo = %name, "clean"),
            Err(err) => {
                tracing::warn!(repo = %name, %err, "skipping repository");
                summary.unreadable.push(Unreadable {
                    name,
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn execute<S: StatusSource>(base_dir: &Path, source: &S, color: ColorChoice) -> Result<()> {
    let summary = scan(base_dir, source)?;

    let mut stdout = StandardStream::stdout(color);
    render_report(&mut stdout, &summary).context("Failed to write report")?;
    Ok(())
}

pub fn render_report<W: WriteColor>(out: &mut W, summary: &ScanSummary) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(out, "Scanning directory: {}", summary.base_dir.display())?;
    writeln!(out, "{}", rule)?;
    writeln!(out)?;

    writeln!(out, "Found {} git repositories", summary.repositories_found)?;
    writeln!(out, "{} of them have changes", summary.changed.len())?;
    if !summary.unreadable.is_empty() {
        with_color(out, Color::Red, |out| {
            writeln!(out, "{} could not be read:", summary.unreadable.len())
        })?;
        for repo in &summary.unreadable {
            writeln!(out, "   ✗ {}: {}", repo.name, repo.reason)?;
        }
    }
    writeln!(out)?;

    if summary.changed.is_empty() {
        with_color(out, Color::Green, |out| {
            writeln!(out, "✓ All git repositories are clean (no changes)")
        })?;
        return Ok(());
    }

    writeln!(out, "{}", rule)?;
    writeln!(out, "Repositories with changes:")?;
    writeln!(out, "{}", rule)?;
    writeln!(out)?;

    for repo in &summary.changed {
        with_color(out, Color::Cyan, |out| writeln!(out, "📁 {}", repo.name))?;
        writeln!(out, "   Path: {}", repo.path.display())?;
        if let Some(branch) = &repo.branch {
            writeln!(out, "   Branch: {}", branch)?;
        }

        let report = &repo.report;
        if !report.staged.is_empty() {
            with_color(out, Color::Green, |out| {
                writeln!(
                    out,
                    "   ✓ Staged (Changes to be committed): {} files",
                    report.staged.len()
                )
            })?;
            for file in &report.staged {
                writeln!(out, "      - {}", file)?;
            }
        }
        if !report.modified.is_empty() {
            with_color(out, Color::Yellow, |out| {
                writeln!(
                    out,
                    "   ⚠ Modified (Changes not staged for commit): {} files",
                    report.modified.len()
                )
            })?;
            for file in &report.modified {
                writeln!(out, "      - {}", file)?;
            }
        }
        if !report.untracked.is_empty() {
            with_color(out, Color::Red, |out| {
                writeln!(
                    out,
                    "   ? Untracked (Untracked files): {} files",
                    report.untracked.len()
                )
            })?;
            for file in &report.untracked {
                writeln!(out, "      - {}", file)?;
            }
        }
        writeln!(out)?;
    }

    writeln!(out, "{}", rule)?;
    writeln!(out, "Totals:")?;
    writeln!(out, "  Staged: {} files", summary.totals.staged)?;
    writeln!(out, "  Modified: {} files", summary.totals.modified)?;
    writeln!(out, "  Untracked: {} files", summary.totals.untracked)?;
    writeln!(out, "{}", rule)?;

    Ok(())
}

fn with_color<W, F>(out: &mut W, color: Color, f: F) -> io::Result<()>
where
    W: WriteColor,
    F: FnOnce(&mut W) -> io::Result<()>,
{
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    let result = f(out);
    out.reset()?;
    result
}
