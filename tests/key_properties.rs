//! Property-based tests for query keys and prefix invalidation.
//!
//! # Properties Tested
//!
//! 1. **Prefix Property**: every prefix of a key matches it, and only prefixes do
//! 2. **Equality Property**: keys are equal iff their parts are equal in order
//! 3. **Idempotence Property**: invalidating twice marks the same entries as once

use barcode_client::{KeyPart, QueryClient, QueryConfig, QueryKey};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_part() -> impl Strategy<Value = KeyPart> {
    prop_oneof![
        prop::sample::select(vec!["frag", "fans", "kids", "collection", "user"])
            .prop_map(KeyPart::from),
        (0i64..50).prop_map(KeyPart::Int),
        any::<bool>().prop_map(KeyPart::Bool),
    ]
}

fn arb_key() -> impl Strategy<Value = QueryKey> {
    prop::collection::vec(arb_part(), 1..5).prop_map(QueryKey::from_parts)
}

// ============================================================================
// Property 1: Prefix Property
// ============================================================================

proptest! {
    /// Property: every leading slice of a key is a prefix of it
    #[test]
    fn prop_every_prefix_matches(key in arb_key()) {
        for n in 0..=key.len() {
            let prefix = QueryKey::from_parts(key.parts()[..n].to_vec());
            prop_assert!(key.starts_with(&prefix));
        }
    }

    /// Property: a longer key never prefixes a shorter one
    #[test]
    fn prop_longer_key_never_prefixes(key in arb_key(), extra in arb_part()) {
        let longer = key.clone().with(extra);
        prop_assert!(!key.starts_with(&longer));
        prop_assert!(longer.starts_with(&key));
    }

    /// Property: prefix matching agrees with part-wise comparison
    #[test]
    fn prop_prefix_is_partwise(a in arb_key(), b in arb_key()) {
        let expected = b.len() <= a.len() && a.parts()[..b.len()] == b.parts()[..];
        prop_assert_eq!(a.starts_with(&b), expected);
    }
}

// ============================================================================
// Property 2: Equality Property
// ============================================================================

proptest! {
    /// Property: equal keys display identically, unequal keys differently
    #[test]
    fn prop_display_tracks_equality(a in arb_key(), b in arb_key()) {
        prop_assert_eq!(a == b, a.to_string() == b.to_string());
    }
}

// ============================================================================
// Property 3: Idempotence Property
// ============================================================================

proptest! {
    /// Property: invalidate(p); invalidate(p) has the same effect as invalidate(p)
    #[test]
    fn prop_invalidate_idempotent(keys in prop::collection::vec(arb_key(), 1..12), prefix in arb_key()) {
        let client = QueryClient::new(QueryConfig::default());
        for key in &keys {
            client.set_query_data(key, &key.to_string()).unwrap();
        }

        let expected = client.store().keys(&prefix).len();
        let once = client.invalidate(&prefix);
        let after_once = client.store().stats();
        let twice = client.invalidate(&prefix);

        prop_assert_eq!(once, expected);
        prop_assert_eq!(once, twice);
        prop_assert_eq!(after_once.clone(), client.store().stats());
        prop_assert_eq!(after_once.invalidated, expected);
    }
}
