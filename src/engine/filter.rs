//! Ignore policy for files that carry no design signal.

/// Dependency lockfiles, matched on the exact base name.
const IGNORED_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "composer.lock",
    "Gemfile.lock",
    "poetry.lock",
    "mix.lock",
];

/// Binary, generated and minified artifacts, matched on the lowercased name.
const IGNORED_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".css", ".map", ".min.js", ".json", ".xml",
];

/// Return true when `filename` must stay out of every tally.
pub fn should_ignore(filename: &str) -> bool {
    if IGNORED_FILES.contains(&filename) {
        return true;
    }
    let lower = filename.to_lowercase();
    IGNORED_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}
