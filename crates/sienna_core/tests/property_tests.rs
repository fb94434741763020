//! Property-based tests for sienna_core record handling.
//!
//! Uses proptest to check invariants that must hold for every value a
//! hand-edited record file can contain.

use proptest::prelude::*;
use sienna_core::record::{validate_name, TRAIT_NAMES};
use sienna_core::{Traits, Turn, UserRecord};

proptest! {
    /// Any integer written for a trait loads as a value in 0..=100.
    #[test]
    fn trait_values_always_clamped(values in proptest::collection::vec(any::<i32>(), 8)) {
        let mut obj = serde_json::Map::new();
        for (name, v) in TRAIT_NAMES.iter().zip(values.iter()) {
            obj.insert(name.to_string(), serde_json::json!(v));
        }
        let traits: Traits = serde_json::from_value(serde_json::Value::Object(obj)).unwrap();
        for (name, v) in TRAIT_NAMES.iter().zip(values.iter()) {
            let loaded = traits.get(name).unwrap();
            prop_assert!(loaded <= 100);
            prop_assert_eq!(loaded as i64, (*v as i64).clamp(0, 100));
        }
    }

    /// Dropping any subset of trait keys still yields all eight, with defaults filled in.
    #[test]
    fn missing_traits_take_defaults(mask in proptest::collection::vec(any::<bool>(), 8)) {
        let mut obj = serde_json::Map::new();
        for (name, keep) in TRAIT_NAMES.iter().zip(mask.iter()) {
            if *keep {
                obj.insert(name.to_string(), serde_json::json!(7));
            }
        }
        let traits: Traits = serde_json::from_value(serde_json::Value::Object(obj)).unwrap();
        let defaults = Traits::default();
        for (name, keep) in TRAIT_NAMES.iter().zip(mask.iter()) {
            let expected = if *keep { 7 } else { defaults.get(name).unwrap() };
            prop_assert_eq!(traits.get(name), Some(expected));
        }
        prop_assert_eq!(traits.iter().count(), 8);
    }

    /// Pruning only ever removes from the head and keeps the newest turns in order.
    #[test]
    fn prune_keeps_ordered_suffix(len in 0usize..120, high in 1usize..80, keep in 1usize..60) {
        let mut rec = UserRecord::fresh("Nova");
        for i in 0..len {
            rec.conversation_log.push(Turn::user(i.to_string()));
        }
        let pruned = rec.prune_log(high, keep);
        let after = rec.conversation_log.len();
        if len > high {
            prop_assert!(pruned);
            prop_assert_eq!(after, keep.min(len));
        } else {
            prop_assert!(!pruned);
            prop_assert_eq!(after, len);
        }
        for (offset, turn) in rec.conversation_log.iter().enumerate() {
            prop_assert_eq!(turn.content.clone(), (len - after + offset).to_string());
        }
    }

    /// Accepted names are exactly the trimmed inputs of 2 to 20 characters.
    #[test]
    fn name_gate_matches_char_count(name in "\\PC{0,30}") {
        let trimmed = name.trim();
        let n = trimmed.chars().count();
        match validate_name(&name) {
            Some(accepted) => {
                prop_assert!((2..=20).contains(&n));
                prop_assert_eq!(accepted, trimmed.to_string());
            }
            None => prop_assert!(!(2..=20).contains(&n)),
        }
    }
}
