//! Built-in filters.
//!
//! Comparison filters follow one convention: on success they return their
//! input unchanged, on failure the boolean `false`. That lets them chain
//! (`{{if age|more>10|less>50}}`) and drive conditionals, which select the
//! else branch on exactly `false`.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::config::DEFAULT_MAX_TEMPLATE_SIZE;
use crate::errors::FilterError;
use crate::filters::FilterRegistry;
use crate::value::{Value, MAX_FRACTION_DIGITS};

#[cfg(test)]
#[path = "builtins_tests.rs"]
mod tests;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace pattern is valid"));

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[^>]+>").expect("markup pattern is valid"));

/// Registers every built-in filter into `registry`.
pub fn register_builtins(registry: &mut FilterRegistry) {
    // presence and comparison
    registry.register("blank", blank);
    registry.register("empty", empty);
    registry.register("notempty", notempty);
    registry.register("more", |v: &Value, a: &[String]| compare("more", v, a, |o| o.is_gt()));
    registry.register("less", |v: &Value, a: &[String]| compare("less", v, a, |o| o.is_lt()));
    registry.register("ormore", |v: &Value, a: &[String]| compare("ormore", v, a, |o| o.is_ge()));
    registry.register("orless", |v: &Value, a: &[String]| compare("orless", v, a, |o| o.is_le()));
    registry.register("between", between);
    registry.register("equals", |v: &Value, a: &[String]| equality("equals", v, a, true));
    registry.register("notequals", |v: &Value, a: &[String]| equality("notequals", v, a, false));
    registry.register("like", |v: &Value, a: &[String]| pattern_match("like", v, a, true));
    registry.register("notlike", |v: &Value, a: &[String]| pattern_match("notlike", v, a, false));

    // strings
    registry.register("upcase", upcase);
    registry.register("downcase", downcase);
    registry.register("capcase", capcase);
    registry.register("chop", chop);
    registry.register("tease", tease);
    registry.register("trim", trim);
    registry.register("pack", pack);
    registry.register("style", style);
    registry.register("clean", clean);
    registry.register("sub", sub);
    registry.register("url", url);
    registry.register("split", split);
    registry.register("sanitize", sanitize);
    registry.register("repeat", repeat);

    // numbers
    registry.register("round", round);
    registry.register("fix", fix);
    registry.register("mod", modulo);
    registry.register("divisible", divisible);
    registry.register("even", |v: &Value, _: &[String]| parity("even", v, 0.0));
    registry.register("odd", |v: &Value, _: &[String]| parity("odd", v, 1.0));
    registry.register("number", parse_number);
    registry.register("plus", |v: &Value, a: &[String]| arithmetic("plus", v, a, |x, y| x + y));
    registry.register("minus", |v: &Value, a: &[String]| arithmetic("minus", v, a, |x, y| x - y));
    registry.register("times", |v: &Value, a: &[String]| arithmetic("times", v, a, |x, y| x * y));
    registry.register("divide", |v: &Value, a: &[String]| arithmetic("divide", v, a, |x, y| x / y));

    // sequences
    registry.register("size", size);
    registry.register("length", size);
    registry.register("reverse", reverse);
    registry.register("join", join);
    registry.register("limit", limit);
    registry.register("slice", slice);
    registry.register("sort", sort);
    registry.register("first", |v: &Value, _: &[String]| position("first", v, true));
    registry.register("last", |v: &Value, _: &[String]| position("last", v, false));
    registry.register("has", has);
    registry.register("sift", sift);

    // logic
    registry.register("bool", truthy);
    registry.register("falsy", falsy);
    registry.register("choose", choose);
    registry.register("toggle", toggle);
    registry.register("cases", toggle);
    registry.register("pluralize", pluralize);

    // host objects
    registry.register("call", call);
}

// ============================================================================
// argument and input helpers
// ============================================================================

fn invalid_input(filter: &str, reason: &str) -> FilterError {
    FilterError::InvalidInput {
        filter: filter.to_string(),
        reason: reason.to_string(),
    }
}

fn arg<'a>(filter: &str, args: &'a [String], position: usize) -> Result<&'a str, FilterError> {
    args.get(position)
        .map(String::as_str)
        .ok_or_else(|| FilterError::MissingArgument {
            filter: filter.to_string(),
            position: position + 1,
        })
}

fn number_arg(filter: &str, args: &[String], position: usize) -> Result<f64, FilterError> {
    let raw = arg(filter, args, position)?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FilterError::InvalidArgument {
            filter: filter.to_string(),
            argument: raw.to_string(),
            reason: "expected a number".to_string(),
        })
}

fn count_arg(filter: &str, args: &[String], position: usize) -> Result<usize, FilterError> {
    let n = number_arg(filter, args, position)?;
    if n < 0.0 {
        return Err(FilterError::InvalidArgument {
            filter: filter.to_string(),
            argument: args[position].clone(),
            reason: "expected a non-negative count".to_string(),
        });
    }
    Ok(n as usize)
}

/// Display form of the input; an absent value is not text.
fn text(filter: &str, value: &Value) -> Result<String, FilterError> {
    if value.is_undefined() {
        return Err(invalid_input(filter, "value is undefined"));
    }
    Ok(value.to_string())
}

fn number(filter: &str, value: &Value) -> Result<f64, FilterError> {
    value
        .as_number()
        .ok_or_else(|| invalid_input(filter, "expected a number"))
}

fn array<'v>(filter: &str, value: &'v Value) -> Result<&'v [Value], FilterError> {
    value
        .as_array()
        .ok_or_else(|| invalid_input(filter, "expected a sequence"))
}

fn js_round(n: f64) -> f64 {
    (n + 0.5).floor()
}

/// A value reduced to something orderable: sizes for sequences, numbers
/// where the text is numeric, text otherwise.
#[derive(Debug, Clone, PartialEq)]
enum Measure {
    Number(f64),
    Text(String),
}

fn measure(value: &Value) -> Option<Measure> {
    match value {
        Value::Array(items) => Some(Measure::Number(items.len() as f64)),
        Value::Null => Some(Measure::Number(0.0)),
        Value::String(s) => Some(
            s.trim()
                .parse::<f64>()
                .map(Measure::Number)
                .unwrap_or_else(|_| Measure::Text(s.clone())),
        ),
        Value::Number(_) | Value::Bool(_) | Value::Iter(_) => value.as_number().map(Measure::Number),
        _ => None,
    }
}

fn order(left: &Measure, right: &str) -> Option<Ordering> {
    match (left, right.trim().parse::<f64>()) {
        (Measure::Number(l), Ok(r)) => l.partial_cmp(&r),
        (Measure::Number(l), Err(_)) => Some(l.to_string().as_str().cmp(right.trim())),
        (Measure::Text(l), _) => Some(l.as_str().cmp(right.trim())),
    }
}

fn pass_if(value: &Value, condition: bool) -> Value {
    if condition {
        value.clone()
    } else {
        Value::Bool(false)
    }
}

// ============================================================================
// presence and comparison
// ============================================================================

fn blank(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let present = match value {
        Value::Number(_) => true,
        other => other.is_truthy(),
    };
    if present {
        Ok(value.clone())
    } else {
        Ok(args.first().map(|d| Value::from(d.as_str())).unwrap_or_default())
    }
}

fn is_blank_text(value: &Value) -> bool {
    !value.is_truthy() || value.to_string().trim().is_empty()
}

fn empty(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(pass_if(value, is_blank_text(value)))
}

fn notempty(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(pass_if(value, !is_blank_text(value)))
}

fn compare(
    filter: &str,
    value: &Value,
    args: &[String],
    accept: impl Fn(Ordering) -> bool,
) -> Result<Value, FilterError> {
    let bound = arg(filter, args, 0)?;
    let holds = measure(value)
        .and_then(|m| order(&m, bound))
        .is_some_and(accept);
    Ok(pass_if(value, holds))
}

fn between(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let low = number_arg("between", args, 0)?;
    let high = number_arg("between", args, 1)?;
    let holds = match measure(value) {
        Some(Measure::Number(n)) => n >= low && n <= high,
        _ => false,
    };
    Ok(pass_if(value, holds))
}

fn equality(filter: &str, value: &Value, args: &[String], expect: bool) -> Result<Value, FilterError> {
    let other = arg(filter, args, 0)?;
    let equal = match (value.as_number(), other.trim().parse::<f64>()) {
        (Some(l), Ok(r)) if !matches!(value, Value::String(_)) => l == r,
        _ => value.to_string() == other,
    };
    Ok(pass_if(value, equal == expect))
}

fn pattern_match(filter: &str, value: &Value, args: &[String], expect: bool) -> Result<Value, FilterError> {
    let pattern = arg(filter, args, 0)?;
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| FilterError::InvalidArgument {
            filter: filter.to_string(),
            argument: pattern.to_string(),
            reason: e.to_string(),
        })?;
    let matched = regex.is_match(&text(filter, value)?);
    Ok(pass_if(value, matched == expect))
}

// ============================================================================
// strings
// ============================================================================

fn upcase(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(text("upcase", value)?.to_uppercase().into())
}

fn downcase(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(text("downcase", value)?.to_lowercase().into())
}

fn trim(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(text("trim", value)?.trim().into())
}

fn capcase(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    let mut previous_is_word = false;
    let capitalized: String = text("capcase", value)?
        .chars()
        .flat_map(|c| {
            let upper = !previous_is_word && c.is_alphanumeric();
            previous_is_word = c.is_alphanumeric() || c == '_';
            let mapped: Vec<char> = if upper {
                c.to_uppercase().collect()
            } else {
                vec![c]
            };
            mapped
        })
        .collect();
    Ok(capitalized.into())
}

fn chop(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let s = text("chop", value)?;
    let n = count_arg("chop", args, 0)?;
    if s.chars().count() > n {
        Ok(format!("{}...", s.chars().take(n).collect::<String>()).into())
    } else {
        Ok(s.into())
    }
}

fn tease(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let s = text("tease", value)?;
    let n = count_arg("tease", args, 0)?;
    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() > n {
        Ok(format!("{}...", words[..n].join(" ")).into())
    } else {
        Ok(s.into())
    }
}

fn pack(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    let s = text("pack", value)?;
    Ok(WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned().into())
}

fn clean(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(MARKUP_TAG.replace_all(&text("clean", value)?, "").into_owned().into())
}

fn style(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let classes = arg("style", args, 0)?;
    Ok(format!(r#"<span class="{classes}">{}</span>"#, text("style", value)?).into())
}

fn sub(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let pattern = arg("sub", args, 0)?;
    let replacement = args.get(1).map(String::as_str).unwrap_or_default();
    let regex = Regex::new(pattern).map_err(|e| FilterError::InvalidArgument {
        filter: "sub".to_string(),
        argument: pattern.to_string(),
        reason: e.to_string(),
    })?;
    Ok(regex
        .replace_all(&text("sub", value)?, replacement)
        .into_owned()
        .into())
}

fn url(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(encode_uri(&text("url", value)?).into())
}

/// Percent-encodes everything except the characters a full URI may contain.
fn encode_uri(s: &str) -> String {
    const KEEP: &[u8] = b";,/?:@&=+$-_.!~*'()#";

    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || KEEP.contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn split(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let s = text("split", value)?;
    let separator = args.first().map(String::as_str).unwrap_or(",");
    Ok(Value::Array(s.split(separator).map(Value::from).collect()))
}

fn sanitize(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    let s = text("sanitize", value)?;
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '/' => escaped.push_str("&#x2F;"),
            c => escaped.push(c),
        }
    }
    Ok(escaped.into())
}

fn repeat(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let s = text("repeat", value)?;
    let count = if args.is_empty() {
        2
    } else {
        count_arg("repeat", args, 0)?
    };
    let separator = args.get(1).map(String::as_str).unwrap_or_default();
    let bytes = (s.len() + separator.len()).max(1).checked_mul(count);
    if !matches!(bytes, Some(bytes) if bytes <= DEFAULT_MAX_TEMPLATE_SIZE) {
        return Err(FilterError::InvalidArgument {
            filter: "repeat".to_string(),
            argument: args.first().cloned().unwrap_or_default(),
            reason: format!("output would exceed {DEFAULT_MAX_TEMPLATE_SIZE} bytes"),
        });
    }
    Ok(vec![s.as_str(); count].join(separator).into())
}

// ============================================================================
// numbers
// ============================================================================

fn round(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(Value::Number(js_round(number("round", value)?)))
}

fn fix(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let n = number("fix", value)?;
    let digits = count_arg("fix", args, 0)?;
    if digits > MAX_FRACTION_DIGITS {
        return Err(FilterError::InvalidArgument {
            filter: "fix".to_string(),
            argument: args[0].clone(),
            reason: format!("expected at most {MAX_FRACTION_DIGITS} digits"),
        });
    }
    Ok(format!("{n:.digits$}").into())
}

fn modulo(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    Ok(Value::Number(number("mod", value)? % number_arg("mod", args, 0)?))
}

fn divisible(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    if value.is_false() {
        return Ok(Value::Bool(false));
    }
    let n = number("divisible", value)?;
    let divisor = number_arg("divisible", args, 0)?;
    Ok(pass_if(value, divisor != 0.0 && n % divisor == 0.0))
}

fn parity(filter: &str, value: &Value, remainder: f64) -> Result<Value, FilterError> {
    if value.is_false() {
        return Ok(Value::Bool(false));
    }
    let n = number(filter, value)?;
    Ok(pass_if(value, (n % 2.0).abs() == remainder))
}

fn parse_number(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    if let Value::Number(_) = value {
        return Ok(value.clone());
    }
    let digits: String = text("number", value)?
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();
    digits
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| invalid_input("number", "no numeric content"))
}

fn arithmetic(
    filter: &str,
    value: &Value,
    args: &[String],
    op: impl Fn(f64, f64) -> f64,
) -> Result<Value, FilterError> {
    Ok(Value::Number(op(number(filter, value)?, number_arg(filter, args, 0)?)))
}

// ============================================================================
// sequences
// ============================================================================

fn size(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    value
        .len()
        .map(Value::from)
        .ok_or_else(|| invalid_input("size", "value has no length"))
}

fn reverse(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    match value {
        Value::Array(items) => Ok(Value::Array(items.iter().rev().cloned().collect())),
        Value::String(s) => Ok(s.chars().rev().collect::<String>().into()),
        _ => Err(invalid_input("reverse", "expected a sequence or string")),
    }
}

fn join(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let separator = args.first().map(String::as_str).unwrap_or(",");
    let joined = array("join", value)?
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(separator);
    Ok(joined.into())
}

fn window(items: &[Value], start: usize, len: usize) -> Value {
    Value::Array(items.iter().skip(start).take(len).cloned().collect())
}

fn limit(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let items = array("limit", value)?;
    let count = count_arg("limit", args, 0)?;
    let offset = if args.len() > 1 {
        count_arg("limit", args, 1)?
    } else {
        0
    };
    Ok(window(items, offset, count))
}

fn slice(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let items = array("slice", value)?;
    let start = count_arg("slice", args, 0)?;
    let len = if args.len() > 1 {
        count_arg("slice", args, 1)?
    } else {
        items.len()
    };
    Ok(window(items, start, len))
}

fn sort_key(value: &Value, property: Option<&str>) -> Option<Measure> {
    match property {
        Some(property) => value.child(property).and_then(|v| measure(&v)),
        None => measure(value),
    }
}

fn sort(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let property = args.first().map(|p| p.trim()).filter(|p| !p.is_empty());
    let mut items = array("sort", value)?.to_vec();
    items.sort_by(|a, b| match (sort_key(a, property), sort_key(b, property)) {
        (Some(Measure::Number(x)), Some(Measure::Number(y))) => {
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (x, y) => {
            let text = |m: Option<Measure>| match m {
                Some(Measure::Text(s)) => s,
                Some(Measure::Number(n)) => n.to_string(),
                None => String::new(),
            };
            text(x).cmp(&text(y))
        }
    });
    Ok(Value::Array(items))
}

fn position(filter: &str, value: &Value, first: bool) -> Result<Value, FilterError> {
    match value {
        Value::Iter(iter) => Ok(Value::Bool(if first {
            iter.is_first()
        } else {
            iter.is_last()
        })),
        Value::Array(items) => {
            let item = if first { items.first() } else { items.last() };
            Ok(item.cloned().unwrap_or_default())
        }
        _ => Err(invalid_input(filter, "expected loop metadata or a sequence")),
    }
}

fn property_equals(item: &Value, property: &str, expected: &str) -> bool {
    item.child(property)
        .is_some_and(|v| v.to_string() == expected)
}

fn has(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let property = arg("has", args, 0)?;
    let expected = arg("has", args, 1)?;
    Ok(Value::Bool(
        array("has", value)?
            .iter()
            .any(|item| property_equals(item, property, expected)),
    ))
}

fn sift(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let property = arg("sift", args, 0)?;
    let expected = arg("sift", args, 1)?;
    Ok(Value::Array(
        array("sift", value)?
            .iter()
            .filter(|item| property_equals(item, property, expected))
            .cloned()
            .collect(),
    ))
}

// ============================================================================
// logic
// ============================================================================

fn truthy(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(Value::Bool(value.is_truthy()))
}

fn falsy(value: &Value, _: &[String]) -> Result<Value, FilterError> {
    Ok(Value::Bool(!value.is_truthy()))
}

fn choose(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let chosen = if value.is_truthy() {
        arg("choose", args, 0)?
    } else {
        args.get(1).map(String::as_str).unwrap_or_default()
    };
    Ok(chosen.into())
}

fn toggle(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let values = arg("toggle", args, 0)?;
    let labels: Vec<&str> = arg("toggle", args, 1)?.split(',').collect();
    let fallback = args.get(2).map(String::as_str).unwrap_or_default();

    let needle = value.to_string();
    let label = values
        .split(',')
        .position(|candidate| candidate.trim() == needle)
        .and_then(|i| labels.get(i).copied())
        .unwrap_or(fallback);
    Ok(label.into())
}

fn pluralize(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let s = text("pluralize", value)?;
    let n = number_arg("pluralize", args, 0)?;
    let variants: Vec<&str> = s.split(";;").collect();
    let chosen = if n == 1.0 {
        variants[0]
    } else {
        variants.get(1).copied().unwrap_or(variants[0])
    };
    Ok(chosen.trim().into())
}

// ============================================================================
// host objects
// ============================================================================

fn call(value: &Value, args: &[String]) -> Result<Value, FilterError> {
    let method = arg("call", args, 0)?.trim();
    value.call_method(method, &args[1..])
}
