use std::collections::HashMap;

use crate::models::commit::ChangeRecord;

/// Running churn and authorship for one file, keyed by base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    pub filename: String,
    /// Tree path from the newest commit naming one, used for content lookup.
    ///
    /// Set once and never overwritten by older records, so a renamed file
    /// resolves to its current location rather than the oldest path in the
    /// window (which a last-write-wins update over a newest-first walk gives).
    pub relative_path: Option<String>,
    pub churn: u64,
    /// Change events per author in first-seen order.
    pub authors: Vec<(String, u64)>,
}

/// Accumulates per-file churn and per-author change counts.
///
/// Files keep their first-seen position, which is the tie-break for every
/// ranking derived from this aggregate.
#[derive(Debug, Default)]
pub struct ChurnAggregator {
    index: HashMap<String, usize>,
    files: Vec<TrackedFile>,
}

impl ChurnAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book one non-ignored change record.
    pub fn record(&mut self, change: &ChangeRecord, author: &str) {
        let slot = match self.index.get(&change.filename) {
            Some(&i) => i,
            None => {
                self.files.push(TrackedFile {
                    filename: change.filename.clone(),
                    relative_path: None,
                    churn: 0,
                    authors: Vec::new(),
                });
                self.index
                    .insert(change.filename.clone(), self.files.len() - 1);
                self.files.len() - 1
            }
        };

        let file = &mut self.files[slot];
        file.churn += change.churn();
        if file.relative_path.is_none() {
            file.relative_path = change.relative_path.clone();
        }
        match file.authors.iter_mut().find(|(name, _)| name == author) {
            Some((_, count)) => *count += 1,
            None => file.authors.push((author.to_string(), 1)),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total churn booked across all files.
    pub fn total_churn(&self) -> u64 {
        self.files.iter().map(|f| f.churn).sum()
    }

    pub fn into_files(self) -> Vec<TrackedFile> {
        self.files
    }
}

/// Authors by descending change count, ties in first-seen order, at most `n`.
pub fn top_authors(authors: &[(String, u64)], n: usize) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = authors.to_vec();
    // stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str, added: u64, deleted: u64) -> ChangeRecord {
        ChangeRecord::from_path(path, added, deleted)
    }

    #[test]
    fn accumulates_churn_per_filename() {
        let mut agg = ChurnAggregator::new();
        agg.record(&change("src/a.py", 10, 2), "X");
        agg.record(&change("src/a.py", 1, 1), "Y");
        agg.record(&change("b.py", 5, 0), "X");

        let files = agg.into_files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "a.py");
        assert_eq!(files[0].churn, 14);
        assert_eq!(files[1].churn, 5);
    }

    #[test]
    fn moved_file_keeps_one_key_and_newest_path() {
        // newest commit first, as the history yields them
        let mut agg = ChurnAggregator::new();
        agg.record(&change("new/a.py", 1, 0), "X");
        agg.record(&change("old/a.py", 1, 0), "X");
        let files = agg.into_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path.as_deref(), Some("new/a.py"));
    }

    #[test]
    fn missing_path_does_not_erase_known_path() {
        let mut agg = ChurnAggregator::new();
        agg.record(&change("src/a.py", 1, 0), "X");
        let mut bare = change("a.py", 1, 0);
        bare.relative_path = None;
        agg.record(&bare, "X");
        assert_eq!(
            agg.into_files()[0].relative_path.as_deref(),
            Some("src/a.py")
        );
    }

    #[test]
    fn counts_change_events_per_author() {
        let mut agg = ChurnAggregator::new();
        for author in ["X", "Y", "X", "Z", "X"] {
            agg.record(&change("a.py", 1, 0), author);
        }
        let files = agg.into_files();
        assert_eq!(
            files[0].authors,
            vec![("X".into(), 3), ("Y".into(), 1), ("Z".into(), 1)]
        );
    }

    #[test]
    fn churn_is_conserved() {
        let mut agg = ChurnAggregator::new();
        let records = [
            change("a.py", 3, 4),
            change("b.py", 0, 9),
            change("a.py", 2, 0),
        ];
        for rec in &records {
            agg.record(rec, "X");
        }
        let expected: u64 = records.iter().map(|r| r.churn()).sum();
        assert_eq!(agg.total_churn(), expected);
    }

    #[test]
    fn top_authors_takes_two_highest() {
        let authors = vec![("Z".into(), 1), ("X".into(), 5), ("Y".into(), 3)];
        assert_eq!(
            top_authors(&authors, 2),
            vec![("X".to_string(), 5), ("Y".to_string(), 3)]
        );
    }

    #[test]
    fn top_authors_ties_keep_first_seen_order() {
        let authors = vec![("B".into(), 2), ("A".into(), 2), ("C".into(), 2)];
        assert_eq!(
            top_authors(&authors, 2),
            vec![("B".to_string(), 2), ("A".to_string(), 2)]
        );
    }
}
