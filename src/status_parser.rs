use std::fmt;

const STAGED_HEADER: &str = "Changes to be committed:";
const MODIFIED_HEADER: &str = "Changes not staged for commit:";
const UNTRACKED_HEADER: &str = "Untracked files:";

// Lowercased phrases of the non-indented help lines git prints inside a section
const HINT_PHRASES: [&str; 3] = [
    "use \"git",
    "include in what will be committed",
    "no changes added",
];

/// A staged or modified entry, e.g. `modified: src/lib.rs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub status: Option<String>,
    pub path: String,
}

impl FileChange {
    /// Split an entry at its first colon into status prefix and path.
    /// Entries without a colon keep the whole line as the path.
    pub fn from_entry(entry: &str) -> Self {
        match entry.split_once(':') {
            Some((status, path)) => FileChange {
                status: Some(status.trim().to_string()),
                path: path.trim().to_string(),
            },
            None => FileChange {
                status: None,
                path: entry.to_string(),
            },
        }
    }
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Some(status) => write!(f, "{}: {}", status, self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Working-tree changes of a single repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub staged: Vec<FileChange>,
    pub modified: Vec<FileChange>,
    pub untracked: Vec<String>,
}

impl StatusReport {
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.modified.is_empty() && self.untracked.is_empty()
    }

    /// `None` for a clean repository so it never reaches the aggregator.
    pub fn into_changes(self) -> Option<StatusReport> {
        if self.is_empty() { None } else { Some(self) }
    }

    fn record(&mut self, section: Section, entry: &str) {
        match section {
            Section::Staged => self.staged.push(FileChange::from_entry(entry)),
            Section::Modified => self.modified.push(FileChange::from_entry(entry)),
            Section::Untracked => self.untracked.push(entry.to_string()),
            Section::None => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    None,
    Staged,
    Modified,
    Untracked,
}

/// What a single line of `git status` output means, independent of the
/// section it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Header(Section),
    Blank,
    Hint,
    Unindented,
    Indented(&'a str),
}

pub fn classify_line(line: &str) -> Line<'_> {
    if line.contains(STAGED_HEADER) {
        return Line::Header(Section::Staged);
    }
    if line.contains(MODIFIED_HEADER) {
        return Line::Header(Section::Modified);
    }
    if line.contains(UNTRACKED_HEADER) {
        return Line::Header(Section::Untracked);
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    if line.starts_with('\t') || line.starts_with("  ") {
        return Line::Indented(trimmed);
    }

    let lower = line.to_lowercase();
    if HINT_PHRASES.iter().any(|hint| lower.contains(hint)) {
        Line::Hint
    } else {
        Line::Unindented
    }
}

impl Section {
    /// Advance the parser by one line, returning the next section and the
    /// entry text to record under the current one, if any.
    pub fn step<'a>(self, line: &'a str) -> (Section, Option<&'a str>) {
        match classify_line(line) {
            Line::Header(section) => (section, None),
            _ if self == Section::None => (Section::None, None),
            Line::Blank | Line::Hint => (self, None),
            Line::Unindented => (Section::None, None),
            // Annotations such as `(use "git restore ..." to discard)`
            Line::Indented(entry) if entry.starts_with('(') => (self, None),
            Line::Indented(entry) => (self, Some(entry)),
        }
    }
}

/// Parse the long (human-readable) `git status` report.
///
/// This is a scraper over git's English wording and indentation. Filenames
/// containing a colon are split at the first colon in the staged and
/// modified sections, and indented lines starting with `(` are dropped.
pub fn parse_long(output: &str) -> Option<StatusReport> {
    let mut report = StatusReport::default();
    let mut section = Section::None;

    for line in output.lines() {
        let (next, entry) = section.step(line);
        if let Some(entry) = entry {
            report.record(section, entry);
        }
        section = next;
    }

    report.into_changes()
}

/// Parse `git status --porcelain` (v1) into the same shape as [`parse_long`].
pub fn parse_porcelain(output: &str) -> Option<StatusReport> {
    let mut report = StatusReport::default();

    for line in output.lines() {
        let mut chars = line.chars();
        let (Some(index), Some(worktree)) = (chars.next(), chars.next()) else {
            continue;
        };
        let path = line.get(3..).unwrap_or("").trim();
        if path.is_empty() {
            continue;
        }

        match (index, worktree) {
            ('?', '?') => {
                report.untracked.push(path.to_string());
                continue;
            }
            ('!', '!') => continue,
            // Unmerged paths live in their own section of the long report
            ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D') => continue,
            _ => {}
        }

        if let Some(status) = porcelain_status(index) {
            report.staged.push(FileChange {
                status: Some(status.to_string()),
                path: path.to_string(),
            });
        }
        if let Some(status) = porcelain_status(worktree) {
            report.modified.push(FileChange {
                status: Some(status.to_string()),
                path: path.to_string(),
            });
        }
    }

    report.into_changes()
}

fn porcelain_status(code: char) -> Option<&'static str> {
    match code {
        'M' => Some("modified"),
        'A' => Some("new file"),
        'D' => Some("deleted"),
        'R' => Some("renamed"),
        'C' => Some("copied"),
        'T' => Some("typechange"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rendered(changes: &[FileChange]) -> Vec<String> {
        changes.iter().map(ToString::to_string).collect()
    }

    const FULL_STATUS: &str = "On branch main
Your branch is up to date with 'origin/main'.

Changes to be committed:
  (use \"git restore --staged <file>...\" to unstage)
\tnew file:   src/new.rs
\tmodified:   README.md

Changes not staged for commit:
  (use \"git add <file>...\" to update what will be committed)
  (use \"git restore <file>...\" to discard changes in working directory)
\tmodified:   src/lib.rs
\tdeleted:    old.txt

Untracked files:
  (use \"git add <file>...\" to include in what will be committed)
\tnotes.md
\ttarget/

";

    #[test]
    fn test_parse_full_status() {
        let report = parse_long(FULL_STATUS).unwrap();
        assert_eq!(
            rendered(&report.staged),
            vec!["new file: src/new.rs", "modified: README.md"]
        );
        assert_eq!(
            rendered(&report.modified),
            vec!["modified: src/lib.rs", "deleted: old.txt"]
        );
        assert_eq!(report.untracked, vec!["notes.md", "target/"]);
    }

    #[test]
    fn test_staged_then_untracked() {
        let text = "Changes to be committed:\n\tmodified:   a.txt\n\nUntracked files:\n\tb.txt\n";
        let report = parse_long(text).unwrap();
        assert_eq!(rendered(&report.staged), vec!["modified: a.txt"]);
        assert!(report.modified.is_empty());
        assert_eq!(report.untracked, vec!["b.txt"]);
    }

    #[test]
    fn test_clean_repository() {
        let text = "On branch main\nnothing to commit, working tree clean\n";
        assert_eq!(parse_long(text), None);
        assert_eq!(parse_long(""), None);
    }

    #[test]
    fn test_header_without_entries() {
        assert_eq!(parse_long("Untracked files:\n\n"), None);
    }

    #[test]
    fn test_blank_line_keeps_section() {
        let text = "Changes not staged for commit:\n\n\n\tmodified:   a.txt\n";
        let report = parse_long(text).unwrap();
        assert_eq!(rendered(&report.modified), vec!["modified: a.txt"]);
    }

    #[test]
    fn test_unindented_line_ends_section() {
        let text = "Untracked files:\n\ta.txt\nsomething else\n\tb.txt\n";
        let report = parse_long(text).unwrap();
        assert_eq!(report.untracked, vec!["a.txt"]);
    }

    #[test]
    fn test_hint_lines_keep_section() {
        let text = "Changes not staged for commit:\n\
                    no changes added to commit (use \"git add\" and/or \"git commit -a\")\n\
                    \tmodified:   a.txt\n";
        let report = parse_long(text).unwrap();
        assert_eq!(rendered(&report.modified), vec!["modified: a.txt"]);
    }

    #[test]
    fn test_each_hint_phrase_keeps_section() {
        let hints = [
            "Please use \"git add\" first",
            "Nothing To Include In What Will Be Committed",
            "NO CHANGES ADDED yet",
        ];
        for hint in hints {
            assert_eq!(classify_line(hint), Line::Hint, "{hint}");
            let text = format!("Untracked files:\n{hint}\n\tb.txt\n");
            let report = parse_long(&text).unwrap();
            assert_eq!(report.untracked, vec!["b.txt"], "{hint}");
        }
    }

    #[test]
    fn test_non_hint_line_ends_section() {
        let text = "Untracked files:\nNothing to commit\n\tb.txt\n";
        assert_eq!(parse_long(text), None);
    }

    #[test]
    fn test_entry_without_colon_is_verbatim() {
        let text = "Changes to be committed:\n\tsomething odd\n";
        let report = parse_long(text).unwrap();
        assert_eq!(report.staged[0].status, None);
        assert_eq!(report.staged[0].path, "something odd");
    }

    #[test]
    fn test_split_on_first_colon_only() {
        let text = "Changes not staged for commit:\n\tmodified:   dir/a:b.txt\n";
        let report = parse_long(text).unwrap();
        assert_eq!(report.modified[0].status.as_deref(), Some("modified"));
        assert_eq!(report.modified[0].path, "dir/a:b.txt");
    }

    #[test]
    fn test_untracked_colon_kept() {
        let text = "Untracked files:\n\ttime: 10.txt\n";
        assert_eq!(parse_long(text).unwrap().untracked, vec!["time: 10.txt"]);
    }

    #[test]
    fn test_two_space_indent_is_entry() {
        let text = "Untracked files:\n  spaced.txt\n single.txt\n  after.txt\n";
        let report = parse_long(text).unwrap();
        assert_eq!(report.untracked, vec!["spaced.txt"]);
    }

    #[test]
    fn test_indented_lines_outside_section_ignored() {
        let text = "\tmodified:   a.txt\nOn branch main\n  stray\n";
        assert_eq!(parse_long(text), None);
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "Untracked files:\r\n\tb.txt\r\n";
        assert_eq!(parse_long(text).unwrap().untracked, vec!["b.txt"]);
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(
            classify_line("Changes to be committed:"),
            Line::Header(Section::Staged)
        );
        assert_eq!(classify_line("   "), Line::Blank);
        assert_eq!(
            classify_line("  (use \"git add <file>...\")"),
            Line::Indented("(use \"git add <file>...\")")
        );
        assert_eq!(
            classify_line("No changes added to commit (use \"git add\")"),
            Line::Hint
        );
        assert_eq!(classify_line("HEAD detached at 1a2b3c"), Line::Unindented);
    }

    #[test]
    fn test_step_transitions() {
        assert_eq!(Section::None.step("\ta.txt"), (Section::None, None));
        assert_eq!(
            Section::Staged.step("Untracked files:"),
            (Section::Untracked, None)
        );
        assert_eq!(Section::Modified.step(""), (Section::Modified, None));
        assert_eq!(
            Section::Untracked.step("\tb.txt"),
            (Section::Untracked, Some("b.txt"))
        );
        assert_eq!(
            Section::Untracked.step("\t(annotation)"),
            (Section::Untracked, None)
        );
        assert_eq!(Section::Staged.step("plain"), (Section::None, None));
    }

    #[test]
    fn test_parse_porcelain() {
        let text = "M  README.md\nMM src/lib.rs\n D old.txt\nA  src/new.rs\n?? notes.md\n!! target/\nUU conflict.rs\nR  a.rs -> b.rs\n";
        let report = parse_porcelain(text).unwrap();
        assert_eq!(
            rendered(&report.staged),
            vec![
                "modified: README.md",
                "modified: src/lib.rs",
                "new file: src/new.rs",
                "renamed: a.rs -> b.rs",
            ]
        );
        assert_eq!(
            rendered(&report.modified),
            vec!["modified: src/lib.rs", "deleted: old.txt"]
        );
        assert_eq!(report.untracked, vec!["notes.md"]);
    }

    #[test]
    fn test_parse_porcelain_clean() {
        assert_eq!(parse_porcelain(""), None);
        assert_eq!(parse_porcelain("!! ignored.log\n"), None);
    }

    const HEADERS: [&str; 3] = [STAGED_HEADER, MODIFIED_HEADER, UNTRACKED_HEADER];

    fn status_line_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(HEADERS.to_vec()).prop_map(|header| header.to_string()),
            "[\t ]{0,3}[A-Za-z0-9 :()./\"-]{0,30}",
        ]
    }

    proptest! {
        #[test]
        fn prop_text_without_headers_has_no_changes(text in "[a-z0-9 \t\n:()\"./-]{0,300}") {
            prop_assert_eq!(parse_long(&text), None);
        }

        #[test]
        fn prop_header_never_recorded_as_entry(lines in prop::collection::vec(status_line_strategy(), 0..40)) {
            let text = lines.join("\n");
            if let Some(report) = parse_long(&text) {
                let fields = report
                    .staged
                    .iter()
                    .chain(&report.modified)
                    .flat_map(|change| change.status.iter().chain(std::iter::once(&change.path)))
                    .chain(&report.untracked);
                for field in fields {
                    for header in HEADERS {
                        prop_assert!(!field.contains(header), "{:?} recorded as entry", field);
                    }
                }
            }
        }
    }
}
