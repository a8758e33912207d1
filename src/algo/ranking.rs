use std::collections::HashMap;

use serde::Serialize;

use crate::algo::subcategory::join_categories;

/// Frequency tally that remembers insertion order.
///
/// Ties in [`CategoryCounts::top_n`] go to the label inserted first, so the
/// result never depends on hash iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    counts: Vec<(String, usize)>,
    positions: HashMap<String, usize>,
}

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts = Self::new();
        for item in items {
            counts.add(item.as_ref());
        }
        counts
    }

    pub fn add(&mut self, label: &str) {
        match self.positions.get(label) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.positions.insert(label.to_string(), self.counts.len());
                self.counts.push((label.to_string(), 1));
            }
        }
    }

    pub fn get(&self, label: &str) -> usize {
        self.positions.get(label).map(|&i| self.counts[i].1).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[(String, usize)] {
        &self.counts
    }

    /// Up to `n` labels by descending count; stable sort keeps insertion
    /// order among equal counts.
    pub fn top_n(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> =
            self.counts.iter().map(|(l, c)| (l.as_str(), *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// Most frequent label, `None` for an empty tally.
    pub fn top1(&self) -> Option<&str> {
        self.top_n(1).first().map(|(l, _)| *l)
    }

    /// Up to five labels joined with a leading semicolon, `""` when empty.
    pub fn top5(&self) -> String {
        let labels: Vec<&str> = self.top_n(5).into_iter().map(|(l, _)| l).collect();
        join_categories(&labels)
    }
}

/// Ranked view of a rollup entity's categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCategories {
    pub top1: Option<String>,
    pub top5: String,
}

pub fn rank<I, S>(items: I) -> RankedCategories
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let counts = CategoryCounts::tally(items);
    RankedCategories {
        top1: counts.top1().map(String::from),
        top5: counts.top5(),
    }
}
