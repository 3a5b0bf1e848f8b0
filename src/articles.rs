//! Merging freshly discovered articles into a company's history.

use std::collections::HashSet;

use chrono::NaiveDate;
use itertools::Itertools;

use crate::models::Article;
use crate::utils::parse_article_date;

/// Articles from `incoming` whose URL is not already in `existing`.
///
/// Duplicates inside `incoming` are collapsed too, first occurrence wins.
pub fn new_articles(existing: &[Article], incoming: &[Article]) -> Vec<Article> {
    let known: HashSet<&str> = existing.iter().map(|a| a.url.as_str()).collect();
    incoming
        .iter()
        .filter(|a| !known.contains(a.url.as_str()))
        .unique_by(|a| a.url.clone())
        .cloned()
        .collect()
}

/// Merge `incoming` into `existing`, most recent first, capped at `max_len`.
///
/// New articles are placed ahead of the existing ones before a stable sort
/// by date, so same-day articles keep that relative order. Entries past
/// `max_len` are the oldest and are dropped.
pub fn merge_articles(existing: &[Article], incoming: &[Article], max_len: usize) -> Vec<Article> {
    let mut merged = new_articles(existing, incoming);
    merged.extend(existing.iter().cloned());
    merged.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
    merged.truncate(max_len);
    merged
}

// Unparseable dates sort as the oldest entries.
fn sort_key(article: &Article) -> NaiveDate {
    parse_article_date(&article.date).unwrap_or(NaiveDate::MIN)
}
