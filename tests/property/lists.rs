//! Merging, filtering and paging of metadata lists

use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use std::collections::BTreeSet;
use zettelstore::place::filter::{apply_sorter, create_filter_func};
use zettelstore::place::merge::merge_sorted;
use zettelstore::place::{Filter, Sorter};
use zettelstore::zettel::keys::{KEY_TAGS, KEY_TITLE};
use zettelstore::zettel::{Meta, Zid};

fn descending(ids: &BTreeSet<u64>, origin: &str) -> Vec<Meta> {
    ids.iter()
        .rev()
        .map(|n| {
            Meta::builder(Zid::new(*n).unwrap())
                .with(KEY_TITLE, origin)
                .build()
        })
        .collect()
}

fn tagged(tags: Vec<Vec<&'static str>>) -> Vec<Meta> {
    tags.into_iter()
        .enumerate()
        .map(|(i, tags)| {
            let mut builder = Meta::builder(Zid::new(20210101000000 + i as u64).unwrap());
            builder.set(KEY_TAGS, &tags.join(" "));
            builder.build()
        })
        .collect()
}

proptest! {
    #[test]
    fn test_merge_is_a_sorted_union_preferring_the_first_list(
        first in btree_set(1u64..500, 0..40),
        second in btree_set(1u64..500, 0..40),
    ) {
        let merged = merge_sorted(descending(&first, "first"), descending(&second, "second"));

        let ids: Vec<u64> = merged.iter().map(|m| m.zid().as_u64()).collect();
        let mut union: Vec<u64> = first.union(&second).copied().collect();
        union.reverse();
        prop_assert_eq!(ids, union);

        for meta in &merged {
            let n = meta.zid().as_u64();
            let expected = if first.contains(&n) { "first" } else { "second" };
            prop_assert_eq!(meta.get(KEY_TITLE), Some(expected));
        }
    }

    #[test]
    fn test_negated_filter_selects_the_complement(
        tags in vec(vec(prop::sample::select(vec!["#a", "#b", "#c", "#d"]), 0..4), 0..20),
        wanted in prop::sample::select(vec!["#a", "a,b", "#c,#d", "b"]),
    ) {
        let metas = tagged(tags);
        let filter = Filter::new().with(KEY_TAGS, wanted);
        let matches = create_filter_func(Some(&filter));
        let negated = filter.clone().negated();
        let rejects = create_filter_func(Some(&negated));
        for meta in &metas {
            prop_assert_ne!(matches(meta), rejects(meta));
        }
    }

    #[test]
    fn test_pages_partition_the_sorted_list(
        ids in btree_set(1u64..10_000, 0..60),
        limit in 1usize..10,
    ) {
        let metas = descending(&ids, "page");
        let all = apply_sorter(metas.clone(), None);
        let mut paged = Vec::new();
        let mut offset = 0;
        loop {
            let page = apply_sorter(metas.clone(), Some(&Sorter::default().page(offset, limit)));
            prop_assert!(page.len() <= limit);
            if page.is_empty() {
                break;
            }
            offset += page.len();
            paged.extend(page);
        }
        prop_assert_eq!(paged, all);
    }
}
