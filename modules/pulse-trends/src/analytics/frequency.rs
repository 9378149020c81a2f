use std::collections::HashMap;

use serde::Serialize;

/// Terms shorter than this are not counted.
pub const MIN_TERM_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

/// Count terms case-insensitively after trimming and rank them by descending
/// count. Ties keep first-seen order, so the result is fully deterministic for
/// a given input order.
pub fn ranked<I, S>(terms: I) -> Vec<TermCount>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: Vec<TermCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for term in terms {
        let term = term.as_ref().trim().to_lowercase();
        if term.chars().count() < MIN_TERM_CHARS {
            continue;
        }
        match index.get(&term) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(term.clone(), counts.len());
                counts.push(TermCount { term, count: 1 });
            }
        }
    }

    // sort_by is stable: equal counts stay in first-seen order.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// The `n` most frequent terms.
pub fn top_n<I, S>(terms: I, n: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ranked(terms).into_iter().take(n).map(|tc| tc.term).collect()
}
