use super::*;

fn shout(value: &Value, _args: &[String]) -> Result<Value, FilterError> {
    Ok(Value::String(format!("{value}!")))
}

struct Prefix(String);

impl Filter for Prefix {
    fn apply(&self, value: &Value, _args: &[String]) -> Result<Value, FilterError> {
        Ok(Value::String(format!("{}{value}", self.0)))
    }
}

#[test]
fn test_new_registry_is_empty() {
    let registry = FilterRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_register_function_and_apply() {
    let mut registry = FilterRegistry::new();
    registry.register("shout", shout);

    let filter = registry.get("shout").unwrap();
    assert_eq!(
        filter.apply(&Value::from("hey"), &[]).unwrap(),
        Value::from("hey!")
    );
}

#[test]
fn test_register_closure_with_arguments() {
    let mut registry = FilterRegistry::new();
    registry.register("times", |value: &Value, args: &[String]| -> Result<Value, FilterError> {
        let n = args
            .first()
            .and_then(|a| a.trim().parse::<f64>().ok())
            .unwrap_or(1.0);
        Ok(Value::Number(value.as_number().unwrap_or(0.0) * n))
    });

    let result = registry
        .get("times")
        .unwrap()
        .apply(&Value::Number(3.0), &["3".to_string()])
        .unwrap();
    assert_eq!(result, Value::Number(9.0));
}

#[test]
fn test_register_stateful_filter() {
    let mut registry = FilterRegistry::new();
    registry.register("tag", Prefix("#".to_string()));

    let result = registry.get("tag").unwrap().apply(&Value::from("rust"), &[]);
    assert_eq!(result.unwrap(), Value::from("#rust"));
}

#[test]
fn test_register_replaces_existing_entry() {
    let mut registry = FilterRegistry::new();
    registry.register("x", shout);
    registry.register("x", Prefix(">".to_string()));

    assert_eq!(registry.len(), 1);
    let result = registry.get("x").unwrap().apply(&Value::from("a"), &[]);
    assert_eq!(result.unwrap(), Value::from(">a"));
}

#[test]
fn test_extend_merges_entries() {
    let mut base = FilterRegistry::new();
    base.register("shout", shout);

    let mut extra = FilterRegistry::new();
    extra.register("tag", Prefix("#".to_string()));

    base.extend(extra);
    assert_eq!(base.names(), vec!["shout", "tag"]);
}

#[test]
fn test_with_builtins_registers_core_library() {
    let registry = FilterRegistry::with_builtins();
    for name in ["blank", "upcase", "trim", "join", "first", "call", "more"] {
        assert!(registry.contains(name), "missing built-in filter {name}");
    }
}

#[test]
fn test_debug_lists_names() {
    let mut registry = FilterRegistry::new();
    registry.register("shout", shout);
    assert_eq!(
        format!("{registry:?}"),
        r#"FilterRegistry { filters: ["shout"] }"#
    );
}
