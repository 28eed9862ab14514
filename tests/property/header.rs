//! Metadata headers written by the store read back unchanged

use proptest::collection::btree_map;
use proptest::prelude::*;
use zettelstore::zettel::header::{parse_header, parse_meta, write_header, write_meta};
use zettelstore::zettel::keys::is_computed;
use zettelstore::zettel::{Meta, Zid};

fn meta_strategy() -> impl Strategy<Value = Meta> {
    (
        btree_map("[a-z][a-z0-9-]{0,12}", "[A-Za-z0-9#,.()]{1,8}( [A-Za-z0-9#,.()]{1,8}){0,3}", 0..8),
        any::<bool>(),
    )
        .prop_map(|(pairs, yaml_sep)| {
            let mut builder = Meta::builder(Zid::new(20210101000000).unwrap());
            for (key, value) in pairs {
                if !is_computed(&key) {
                    builder.set(&key, &value);
                }
            }
            builder.yaml_sep(yaml_sep);
            builder.build()
        })
}

proptest! {
    #[test]
    fn test_header_and_content_separate_cleanly(
        meta in meta_strategy(),
        content in "[A-Za-z0-9 :\n-]{0,60}",
    ) {
        let text = format!("{}{}", write_header(&meta), content);
        let (parsed, rest) = parse_header(meta.zid(), &text);
        prop_assert_eq!(&parsed, &meta);
        prop_assert_eq!(parsed.yaml_sep(), meta.yaml_sep());
        prop_assert_eq!(rest, content.as_str());
    }

    #[test]
    fn test_meta_files_read_back(meta in meta_strategy()) {
        let parsed = parse_meta(meta.zid(), &write_meta(&meta));
        prop_assert_eq!(parsed, meta);
    }

    #[test]
    fn test_written_pairs_follow_canonical_order(meta in meta_strategy()) {
        let written = write_meta(&meta);
        let keys: Vec<&str> = written
            .lines()
            .filter_map(|line| line.split_once(':').map(|(key, _)| key))
            .collect();
        let expected: Vec<&str> = meta.stored_pairs().into_iter().map(|(key, _)| key).collect();
        prop_assert_eq!(keys, expected);
    }
}
