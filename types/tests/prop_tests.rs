use proptest::prelude::*;

use dustproof_types::{Lamports, Timestamp};

proptest! {
    /// Rendering never loses a lamport: parse(render(x)) == x.
    #[test]
    fn decimal_rendering_is_exact(raw in 0u64..u64::MAX) {
        let amount = Lamports::new(raw);
        let parsed = Lamports::parse_decimal(&amount.to_decimal_string()).unwrap();
        prop_assert_eq!(parsed, amount);
    }

    /// Distinct lamport counts always render differently, even one unit apart.
    #[test]
    fn adjacent_amounts_render_distinctly(raw in 0u64..(u64::MAX - 1)) {
        let a = Lamports::new(raw).to_decimal_string();
        let b = Lamports::new(raw + 1).to_decimal_string();
        prop_assert_ne!(a, b);
    }

    /// Every rendering carries exactly nine fractional digits.
    #[test]
    fn fraction_is_fixed_at_lamport_precision(raw in 0u64..u64::MAX) {
        let rendered = Lamports::new(raw).to_decimal_string();
        let frac_len = rendered.split_once('.').map(|(_, f)| f.len()).unwrap_or(0);
        prop_assert_eq!(frac_len, 9);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }
}
