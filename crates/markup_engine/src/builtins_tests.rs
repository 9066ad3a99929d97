use serde_json::json;

use super::*;
use crate::value::Iteration;

fn apply(name: &str, value: impl Into<Value>, args: &[&str]) -> Result<Value, FilterError> {
    let registry = FilterRegistry::with_builtins();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    registry
        .get(name)
        .unwrap_or_else(|| panic!("filter {name} is not registered"))
        .apply(&value.into(), &args)
}

fn ok(name: &str, value: impl Into<Value>, args: &[&str]) -> Value {
    apply(name, value, args).unwrap()
}

#[test]
fn test_blank_supplies_default_for_absent_and_empty_values() {
    assert_eq!(ok("blank", Value::Undefined, &["N/A"]), Value::from("N/A"));
    assert_eq!(ok("blank", Value::Null, &["N/A"]), Value::from("N/A"));
    assert_eq!(ok("blank", "", &["N/A"]), Value::from("N/A"));
    assert_eq!(ok("blank", "John", &["N/A"]), Value::from("John"));
    assert_eq!(ok("blank", 0.0, &["N/A"]), Value::Number(0.0));
    assert_eq!(ok("blank", Value::Undefined, &[]), Value::Undefined);
}

#[test]
fn test_blank_is_idempotent_on_present_values() {
    let once = ok("blank", "x", &["d"]);
    assert_eq!(ok("blank", once.clone(), &["d"]), once);
}

#[test]
fn test_empty_and_notempty() {
    assert_eq!(ok("empty", "  ", &[]), Value::from("  "));
    assert_eq!(ok("empty", "John", &[]), Value::Bool(false));
    assert_eq!(ok("empty", Value::Array(vec![]), &[]), Value::Array(vec![]));
    assert_eq!(ok("notempty", "John", &[]), Value::from("John"));
    assert_eq!(ok("notempty", "", &[]), Value::Bool(false));
    assert_eq!(ok("notempty", Value::Undefined, &[]), Value::Bool(false));
}

#[test]
fn test_numeric_comparisons_return_input_or_false() {
    assert_eq!(ok("more", 34.0, &["30"]), Value::Number(34.0));
    assert_eq!(ok("more", 34.0, &["40"]), Value::Bool(false));
    assert_eq!(ok("less", 34.0, &["40"]), Value::Number(34.0));
    assert_eq!(ok("ormore", 34.0, &["34"]), Value::Number(34.0));
    assert_eq!(ok("orless", 34.0, &["33"]), Value::Bool(false));
    assert_eq!(ok("between", 34.0, &["30", "40"]), Value::Number(34.0));
    assert_eq!(ok("between", 34.0, &["35", "40"]), Value::Bool(false));
}

#[test]
fn test_comparisons_measure_sequences_by_length() {
    let brothers = Value::from(json!(["Jack", "Joe", "Jim"]));
    assert_eq!(ok("more", brothers.clone(), &["2"]), brothers);
    assert_eq!(ok("less", brothers, &["2"]), Value::Bool(false));
}

#[test]
fn test_comparisons_measure_numeric_strings_as_numbers() {
    assert_eq!(ok("more", "10", &["9"]), Value::from("10"));
}

#[test]
fn test_comparisons_fall_back_to_lexical_order() {
    assert_eq!(ok("more", "b", &["a"]), Value::from("b"));
    assert_eq!(ok("less", "b", &["a"]), Value::Bool(false));
}

#[test]
fn test_comparison_on_absent_value_is_false() {
    assert_eq!(ok("more", Value::Undefined, &["1"]), Value::Bool(false));
}

#[test]
fn test_comparison_without_bound_is_missing_argument() {
    assert!(matches!(
        apply("more", 1.0, &[]),
        Err(FilterError::MissingArgument { position: 1, .. })
    ));
}

#[test]
fn test_equals_compares_numbers_and_text() {
    assert_eq!(ok("equals", 33.3, &["33.3"]), Value::Number(33.3));
    assert_eq!(ok("equals", "John", &["John"]), Value::from("John"));
    assert_eq!(ok("equals", "John", &["Jack"]), Value::Bool(false));
    assert_eq!(ok("notequals", "John", &["Jack"]), Value::from("John"));
}

#[test]
fn test_like_is_a_case_insensitive_pattern_match() {
    assert_eq!(ok("like", "John", &["john"]), Value::from("John"));
    assert_eq!(ok("like", "John", &["^Jo"]), Value::from("John"));
    assert_eq!(ok("like", "John", &["Adam"]), Value::Bool(false));
    assert_eq!(ok("notlike", "John", &["Adam"]), Value::from("John"));
}

#[test]
fn test_like_rejects_invalid_pattern() {
    assert!(matches!(
        apply("like", "John", &["("]),
        Err(FilterError::InvalidArgument { .. })
    ));
}

#[test]
fn test_case_filters() {
    assert_eq!(ok("upcase", "John", &[]), Value::from("JOHN"));
    assert_eq!(ok("downcase", "John", &[]), Value::from("john"));
    assert_eq!(
        ok("capcase", "life is like a box", &[]),
        Value::from("Life Is Like A Box")
    );
}

#[test]
fn test_upcase_is_idempotent() {
    let once = ok("upcase", "Mixed Case", &[]);
    assert_eq!(ok("upcase", once.clone(), &[]), once);
}

#[test]
fn test_string_filters_reject_absent_input() {
    assert!(matches!(
        apply("upcase", Value::Undefined, &[]),
        Err(FilterError::InvalidInput { .. })
    ));
}

#[test]
fn test_chop_and_tease_truncate_with_ellipsis() {
    assert_eq!(ok("chop", "Jackson", &["4"]), Value::from("Jack..."));
    assert_eq!(ok("chop", "Jack", &["4"]), Value::from("Jack"));
    assert_eq!(
        ok("tease", "life is like a box of chocolates", &["3"]),
        Value::from("life is like...")
    );
    assert_eq!(ok("tease", "short words", &["5"]), Value::from("short words"));
}

#[test]
fn test_chop_rejects_non_numeric_length() {
    assert!(matches!(
        apply("chop", "Jackson", &["many"]),
        Err(FilterError::InvalidArgument { .. })
    ));
}

#[test]
fn test_trim_and_pack() {
    assert_eq!(ok("trim", "  x  ", &[]), Value::from("x"));
    assert_eq!(ok("pack", "  a   b  c ", &[]), Value::from("a b c"));
}

#[test]
fn test_trim_is_idempotent() {
    let once = ok("trim", "\t padded \n", &[]);
    assert_eq!(ok("trim", once.clone(), &[]), once);
}

#[test]
fn test_markup_filters() {
    assert_eq!(
        ok("style", "John", &["bold"]),
        Value::from(r#"<span class="bold">John</span>"#)
    );
    assert_eq!(ok("clean", "<b>bold</b> text", &[]), Value::from("bold text"));
    assert_eq!(
        ok("sanitize", "<a href='x'>", &[]),
        Value::from("&lt;a href=&#39;x&#39;&gt;")
    );
}

#[test]
fn test_sub_replaces_every_match() {
    assert_eq!(ok("sub", "a-b-c", &["-", "+"]), Value::from("a+b+c"));
    assert_eq!(ok("sub", "a-b", &["-"]), Value::from("ab"));
}

#[test]
fn test_url_encodes_like_a_full_uri() {
    assert_eq!(
        ok("url", "example.com?a=b c=d", &[]),
        Value::from("example.com?a=b%20c=d")
    );
    assert_eq!(ok("url", "é", &[]), Value::from("%C3%A9"));
}

#[test]
fn test_split_and_repeat() {
    assert_eq!(ok("split", "a,b", &[]), Value::from(json!(["a", "b"])));
    assert_eq!(ok("split", "a b", &[" "]), Value::from(json!(["a", "b"])));
    assert_eq!(ok("repeat", "ab", &[]), Value::from("abab"));
    assert_eq!(ok("repeat", "ab", &["3", "-"]), Value::from("ab-ab-ab"));
}

#[test]
fn test_number_filters() {
    assert_eq!(ok("round", 33.3, &[]), Value::Number(33.0));
    assert_eq!(ok("round", 2.5, &[]), Value::Number(3.0));
    assert_eq!(ok("fix", 3.14159, &["2"]), Value::from("3.14"));
    assert_eq!(ok("mod", 7.0, &["3"]), Value::Number(1.0));
    assert_eq!(ok("plus", 34.0, &["1"]), Value::Number(35.0));
    assert_eq!(ok("minus", 34.0, &["4"]), Value::Number(30.0));
    assert_eq!(ok("times", 3.0, &["3"]), Value::Number(9.0));
    assert_eq!(ok("divide", 9.0, &["3"]), Value::Number(3.0));
}

#[test]
fn test_divisibility_and_parity() {
    assert_eq!(ok("divisible", 222.0, &["3"]), Value::Number(222.0));
    assert_eq!(ok("divisible", 223.0, &["3"]), Value::Bool(false));
    assert_eq!(ok("divisible", 6.0, &["0"]), Value::Bool(false));
    assert_eq!(ok("even", 222.0, &[]), Value::Number(222.0));
    assert_eq!(ok("even", 333.0, &[]), Value::Bool(false));
    assert_eq!(ok("odd", 333.0, &[]), Value::Number(333.0));
    assert_eq!(ok("odd", Value::Bool(false), &[]), Value::Bool(false));
}

#[test]
fn test_parity_uses_loop_position() {
    let second = Value::Iter(Iteration::new(1, 3));
    assert_eq!(ok("odd", second.clone(), &[]), second);
    assert_eq!(ok("even", second, &[]), Value::Bool(false));
}

#[test]
fn test_number_extracts_numeric_content() {
    assert_eq!(ok("number", "$1,234.50", &[]), Value::Number(1234.5));
    assert!(apply("number", "none", &[]).is_err());
}

#[test]
fn test_size_of_sequences_strings_and_loops() {
    assert_eq!(ok("size", json!(["a", "b", "c"]), &[]), Value::from(3usize));
    assert_eq!(ok("length", "John", &[]), Value::from(4usize));
    assert_eq!(
        ok("size", Value::Iter(Iteration::new(0, 5)), &[]),
        Value::from(5usize)
    );
    assert!(apply("size", 1.0, &[]).is_err());
}

#[test]
fn test_reverse_sequence_and_string() {
    assert_eq!(
        ok("reverse", json!([1, 2, 3]), &[]),
        Value::from(json!([3, 2, 1]))
    );
    assert_eq!(ok("reverse", "abc", &[]), Value::from("cba"));
}

#[test]
fn test_join_uses_comma_by_default() {
    let names = json!(["Jack", "Joe", "Jim"]);
    assert_eq!(ok("join", names.clone(), &[]), Value::from("Jack,Joe,Jim"));
    assert_eq!(ok("join", names, &[" + "]), Value::from("Jack + Joe + Jim"));
}

#[test]
fn test_limit_takes_count_from_offset() {
    let names = json!(["Jack", "Joe", "Jim"]);
    assert_eq!(ok("limit", names.clone(), &["2"]), Value::from(json!(["Jack", "Joe"])));
    assert_eq!(ok("limit", names.clone(), &["1", "1"]), Value::from(json!(["Joe"])));
    assert_eq!(ok("limit", names, &["5", "2"]), Value::from(json!(["Jim"])));
}

#[test]
fn test_slice_defaults_to_the_remainder() {
    let names = json!(["Jack", "Joe", "Jim"]);
    assert_eq!(ok("slice", names.clone(), &["1"]), Value::from(json!(["Joe", "Jim"])));
    assert_eq!(ok("slice", names, &["0", "1"]), Value::from(json!(["Jack"])));
}

#[test]
fn test_sort_plain_and_by_property() {
    assert_eq!(
        ok("sort", json!(["Joe", "Adam", "Jim"]), &[]),
        Value::from(json!(["Adam", "Jim", "Joe"]))
    );
    assert_eq!(ok("sort", json!([10, 9, 100]), &[]), Value::from(json!([9, 10, 100])));

    let people = json!([{"name": "Joe", "age": 40}, {"name": "Jim", "age": 21}]);
    let sorted = ok("sort", people, &["age"]);
    assert_eq!(
        sorted,
        Value::from(json!([{"name": "Jim", "age": 21}, {"name": "Joe", "age": 40}]))
    );
}

#[test]
fn test_first_and_last_on_loop_metadata() {
    assert_eq!(
        ok("first", Value::Iter(Iteration::new(0, 3)), &[]),
        Value::Bool(true)
    );
    assert_eq!(
        ok("last", Value::Iter(Iteration::new(1, 3)), &[]),
        Value::Bool(false)
    );
    assert_eq!(
        ok("last", Value::Iter(Iteration::new(2, 3)), &[]),
        Value::Bool(true)
    );
}

#[test]
fn test_first_and_last_on_sequences() {
    let names = json!(["Jack", "Joe", "Jim"]);
    assert_eq!(ok("first", names.clone(), &[]), Value::from("Jack"));
    assert_eq!(ok("last", names, &[]), Value::from("Jim"));
    assert_eq!(ok("first", Value::Array(vec![]), &[]), Value::Undefined);
}

#[test]
fn test_has_and_sift_match_on_property() {
    let people = json!([{"name": "Joe", "sex": "m"}, {"name": "Ann", "sex": "f"}]);
    assert_eq!(ok("has", people.clone(), &["sex", "f"]), Value::Bool(true));
    assert_eq!(ok("has", people.clone(), &["sex", "x"]), Value::Bool(false));
    assert_eq!(
        ok("sift", people, &["sex", "m"]),
        Value::from(json!([{"name": "Joe", "sex": "m"}]))
    );
}

#[test]
fn test_bool_and_falsy() {
    assert_eq!(ok("bool", "John", &[]), Value::Bool(true));
    assert_eq!(ok("bool", Value::Bool(false), &[]), Value::Bool(false));
    assert_eq!(ok("falsy", "", &[]), Value::Bool(true));
}

#[test]
fn test_choose_picks_by_truthiness() {
    assert_eq!(ok("choose", Value::Bool(true), &["M", "F"]), Value::from("M"));
    assert_eq!(ok("choose", Value::Bool(false), &["M", "F"]), Value::from("F"));
    assert_eq!(ok("choose", Value::Bool(false), &["M"]), Value::from(""));
}

#[test]
fn test_toggle_maps_values_to_labels() {
    let args = ["135,145,155", "Small,Medium,Large"];
    assert_eq!(ok("toggle", 145.0, &args), Value::from("Medium"));
    assert_eq!(ok("toggle", 999.0, &args), Value::from(""));
    assert_eq!(
        ok("cases", 999.0, &["135,145", "Small,Medium", "Unknown"]),
        Value::from("Unknown")
    );
}

#[test]
fn test_pluralize_picks_variant_by_count() {
    assert_eq!(ok("pluralize", "brother;;brothers", &["1"]), Value::from("brother"));
    assert_eq!(ok("pluralize", "brother;;brothers", &["3"]), Value::from("brothers"));
    assert_eq!(ok("pluralize", "sheep", &["3"]), Value::from("sheep"));
}

#[test]
fn test_call_dispatches_plain_value_methods() {
    assert_eq!(ok("call", 3.14159, &["to_fixed", "2"]), Value::from("3.14"));
    assert_eq!(ok("call", "john", &["to_uppercase"]), Value::from("JOHN"));
    assert!(matches!(
        apply("call", "john", &["explode"]),
        Err(FilterError::MethodNotFound { .. })
    ));
}

#[test]
fn test_call_dispatches_host_objects() {
    struct Greeter;

    impl crate::value::MethodTable for Greeter {
        fn type_name(&self) -> &str {
            "Greeter"
        }

        fn call(&self, method: &str, args: &[String]) -> Result<Value, FilterError> {
            match method {
                "greet" => Ok(Value::String(format!(
                    "Hello {}",
                    args.first().map(String::as_str).unwrap_or("world")
                ))),
                _ => Err(FilterError::MethodNotFound {
                    method: method.to_string(),
                }),
            }
        }
    }

    assert_eq!(
        ok("call", Value::object(Greeter), &["greet", "Ann"]),
        Value::from("Hello Ann")
    );
}

#[test]
fn test_call_requires_a_method_name() {
    assert!(matches!(
        apply("call", "john", &[]),
        Err(FilterError::MissingArgument { .. })
    ));
}

#[test]
fn test_fix_rejects_too_many_digits() {
    assert_eq!(ok("fix", 1.5, &["100"]).to_string().len(), 102);
    assert!(matches!(
        apply("fix", 1.5, &["70000"]),
        Err(FilterError::InvalidArgument { .. })
    ));
    assert!(matches!(
        apply("fix", 1.5, &["1e19"]),
        Err(FilterError::InvalidArgument { .. })
    ));
}

#[test]
fn test_call_rejects_too_many_digits() {
    assert!(matches!(
        apply("call", 1.5, &["to_fixed", "70000"]),
        Err(FilterError::InvalidArgument { .. })
    ));
    assert!(matches!(
        apply("call", 1.5, &["to_precision", "101"]),
        Err(FilterError::InvalidArgument { .. })
    ));
    assert_eq!(ok("call", 1.5, &["to_precision", "3"]), Value::from("1.50"));
}

#[test]
fn test_repeat_rejects_oversized_output() {
    assert!(matches!(
        apply("repeat", "ab", &["1e19"]),
        Err(FilterError::InvalidArgument { .. })
    ));
    assert!(matches!(
        apply("repeat", "", &["1e19"]),
        Err(FilterError::InvalidArgument { .. })
    ));
    assert!(matches!(
        apply("repeat", "x", &["2000000"]),
        Err(FilterError::InvalidArgument { .. })
    ));
    assert_eq!(ok("repeat", "x", &["1000"]).to_string().len(), 1000);
}
