//! Subject glob filter (`spec.md` §4.2): `*` matches zero-or-more of any
//! character, matching is case-insensitive, and an empty pattern passes
//! everything.

#[derive(Debug, Clone)]
pub struct Glob {
    /// `None` iff the filter was unset, in which case `matches` always
    /// returns true. `Some(segments)` with exactly one segment means the
    /// original pattern had no `*` and requires an exact match.
    segments: Option<Vec<String>>,
}

impl Glob {
    pub fn new(pattern: &str) -> Self {
        if pattern.is_empty() {
            return Self { segments: None };
        }
        let segments = pattern
            .split('*')
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>();
        Self {
            segments: Some(segments),
        }
    }

    pub fn matches(&self, subject: &str) -> bool {
        let segments = match &self.segments {
            None => return true,
            Some(s) => s,
        };
        let haystack = subject.to_lowercase();

        if segments.len() == 1 {
            return haystack == segments[0];
        }

        let first = segments.first().unwrap().as_str();
        let last = segments.last().unwrap().as_str();

        if haystack.len() < first.len() + last.len() {
            return false;
        }
        if !haystack.starts_with(first) || !haystack.ends_with(last) {
            return false;
        }

        // Walk the interior segments (neither first nor last) in order,
        // each one searched for strictly after the end of the previous
        // match, so overlapping segments can't double-count the haystack.
        let search_end = haystack.len() - last.len();
        let mut cursor = first.len();
        for seg in &segments[1..segments.len() - 1] {
            if seg.is_empty() {
                continue;
            }
            match haystack[cursor..search_end].find(seg.as_str()) {
                Some(pos) => cursor += pos + seg.len(),
                None => return false,
            }
        }
        cursor <= search_end
    }
}
