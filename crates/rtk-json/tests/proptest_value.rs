// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based coverage for `Value`'s parse/serialise roundtrip and the
//! int/decimal distinction that §3.1 and §4.4 depend on.

use proptest::prelude::*;
use rtk_json::Value;

fn fast_config() -> ProptestConfig {
    ProptestConfig { cases: 128, ..ProptestConfig::default() }
}

proptest! {
    #![proptest_config(fast_config())]

    /// Any integer literal parses as `Value::Int`, never `Value::Decimal`.
    #[test]
    fn integer_literals_parse_as_int(n in any::<i64>()) {
        let v = Value::parse(&n.to_string()).unwrap();
        prop_assert_eq!(v, Value::Int(n));
    }

    /// A literal with an explicit fractional part always parses as
    /// `Value::Decimal`, regardless of the magnitude or sign of its parts.
    #[test]
    fn fractional_literals_parse_as_decimal(
        whole in -1_000_000i64..1_000_000,
        frac in 0u32..1000,
    ) {
        let text = format!("{whole}.{frac:03}");
        let v = Value::parse(&text).unwrap();
        prop_assert!(matches!(v, Value::Decimal(_)));
    }

    /// Parsing, re-serialising through `into_serde_json`, and parsing
    /// again from that serialised form is idempotent for arrays of plain
    /// integers — no precision or ordering loss round-tripping the
    /// `serde_json` boundary used at the edge of the interpreter.
    #[test]
    fn int_array_round_trips_through_serde_json(values in proptest::collection::vec(any::<i64>(), 0..16)) {
        let text = format!("[{}]", values.iter().map(i64::to_string).collect::<Vec<_>>().join(","));
        let parsed = Value::parse(&text).unwrap();
        let json = parsed.clone().into_serde_json();
        let back = Value::from_serde_json(json);
        prop_assert_eq!(parsed, back);
    }

    /// Trailing zeros never change a decimal's numeric value as observed
    /// through `to_decimal` — this is the property §4.4's equality rule
    /// (`10.100 == 10.1`) relies on.
    #[test]
    fn trailing_zeros_do_not_change_decimal_value(
        whole in 0i64..10_000,
        frac in 0u32..1000,
        extra_zeros in 0usize..5,
    ) {
        let padded = format!("{whole}.{frac:03}{}", "0".repeat(extra_zeros));
        let bare = format!("{whole}.{frac:03}");
        let a = Value::parse(&padded).unwrap();
        let b = Value::parse(&bare).unwrap();
        prop_assert_eq!(a.to_decimal(), b.to_decimal());
    }

    /// Object key order, however arbitrary, is preserved exactly through a
    /// parse — §3.1's "insertion order preserved" invariant.
    #[test]
    fn object_key_order_is_preserved(keys in proptest::collection::vec("[a-z]{1,6}", 1..8)) {
        let unique: Vec<String> = {
            let mut seen = std::collections::HashSet::new();
            keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
        };
        let text = format!(
            "{{{}}}",
            unique.iter().enumerate().map(|(i, k)| format!("\"{k}\":{i}")).collect::<Vec<_>>().join(",")
        );
        let v = Value::parse(&text).unwrap();
        let observed: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
        prop_assert_eq!(observed, unique);
    }
}
