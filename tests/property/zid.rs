//! Identifier formatting and parsing

use proptest::prelude::*;
use zettelstore::zettel::Zid;

proptest! {
    #[test]
    fn test_formatted_ids_parse_back(value in 1u64..=99_999_999_999_999) {
        let zid = Zid::new(value).unwrap();
        let text = zid.to_string();
        prop_assert_eq!(text.len(), Zid::LENGTH);
        prop_assert_eq!(Zid::parse(&text).unwrap(), zid);
    }

    #[test]
    fn test_order_follows_numeric_value(a in 1u64..=99_999_999_999_999, b in 1u64..=99_999_999_999_999) {
        let (za, zb) = (Zid::new(a).unwrap(), Zid::new(b).unwrap());
        prop_assert_eq!(za.cmp(&zb), a.cmp(&b));
        prop_assert_eq!(za.to_string().cmp(&zb.to_string()), a.cmp(&b));
    }

    #[test]
    fn test_malformed_text_is_rejected(text in "[0-9]{0,13}|[0-9]{15,20}|[0-9]{0,6}[a-z /:][0-9]{0,7}") {
        prop_assert!(Zid::parse(&text).is_err());
    }
}

#[test]
fn test_successor_stays_in_range() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&(1u64..99_999_999_999_999), |value| {
            let zid = Zid::new(value).unwrap();
            let next = zid.successor();
            assert!(next > zid);
            assert!(next.is_valid());
            Ok(())
        })
        .unwrap();
}
