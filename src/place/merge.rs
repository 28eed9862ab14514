//! Sorted merge of metadata lists

use crate::zettel::Meta;
use std::cmp::Ordering;

/// Merge two lists sorted by descending identifier into one.
///
/// Identifiers present in both lists appear once, taken from `first`.
pub fn merge_sorted(first: Vec<Meta>, second: Vec<Meta>) -> Vec<Meta> {
    if second.is_empty() {
        return first;
    }
    if first.is_empty() {
        return second;
    }
    let mut result = Vec::with_capacity(first.len() + second.len());
    let mut first = first.into_iter().peekable();
    let mut second = second.into_iter().peekable();
    loop {
        let order = match (first.peek(), second.peek()) {
            (Some(a), Some(b)) => a.zid().cmp(&b.zid()),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => break,
        };
        match order {
            Ordering::Greater => result.extend(first.next()),
            Ordering::Less => result.extend(second.next()),
            Ordering::Equal => {
                result.extend(first.next());
                second.next();
            }
        }
    }
    result
}
