// Property tests for the value encoding, interning and arithmetic

use proptest::prelude::*;
use scm754::config::Config;
use scm754::interpreter::engine::Interpreter;
use scm754::memory::{Heap, SymbolTable, Value};

proptest! {
    #[test]
    fn numbers_round_trip_through_the_encoding(n in any::<f64>()) {
        let v = Value::number(n);
        prop_assert!(v.is_number());
        let back = v.as_number().unwrap();
        if n.is_nan() {
            prop_assert!(back.is_nan());
        } else {
            prop_assert_eq!(back.to_bits(), n.to_bits());
        }
    }

    #[test]
    fn chars_round_trip_through_the_encoding(c in any::<char>()) {
        let v = Value::character(c);
        prop_assert!(v.is_char());
        prop_assert!(!v.is_number());
        prop_assert_eq!(v.as_char(), Some(c));
    }

    #[test]
    fn interning_is_idempotent(name in "[a-z!?*<>=+-][a-z0-9!?*<>=+-]{0,12}") {
        let mut heap = Heap::new(16, 64, 4);
        let mut symbols = SymbolTable::new();
        let first = symbols.intern(&mut heap, name.as_bytes()).unwrap();
        let second = symbols.intern(&mut heap, name.as_bytes()).unwrap();
        prop_assert_eq!(first, second);
        prop_assert!(first.is_symbol());
        prop_assert_eq!(heap.strings_in_use(), 1);
    }

    #[test]
    fn addition_folds_like_integer_sum(xs in prop::collection::vec(-1_000_000i64..1_000_000, 0..20)) {
        let mut interp = Interpreter::new(Config::default()).unwrap();
        let operands: Vec<String> = xs.iter().map(|x| x.to_string()).collect();
        let source = format!("(+ {})", operands.join(" "));
        let expected: i64 = xs.iter().sum();
        prop_assert_eq!(interp.eval_str(&source).unwrap(), expected.to_string());
    }

    #[test]
    fn quoted_lists_print_back_unchanged(xs in prop::collection::vec(-999i64..999, 0..10)) {
        let mut interp = Interpreter::new(Config::default()).unwrap();
        let items: Vec<String> = xs.iter().map(|x| x.to_string()).collect();
        let list = format!("({})", items.join(" "));
        prop_assert_eq!(interp.eval_str(&format!("'{}", list)).unwrap(), list);
    }
}
