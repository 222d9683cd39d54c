//! Built-in Tera templates.
//!
//! The templates are compiled into the crate, so a report can be rendered without any resource directory.

use serde_json::Value;
use tera::{Error, Result, Tera};

use std::collections::HashMap;
use std::path::MAIN_SEPARATOR;

pub const INDEX: &str = "index.html";
pub const PAGE: &str = "page.html";

const INDEX_TEMPLATE: &str = include_str!("../../res/html/index.html");
const PAGE_TEMPLATE: &str = include_str!("../../res/html/page.html");

pub const STYLE_CSS: &str = include_str!("../../res/html/style.css");
pub const REPORT_JS: &str = include_str!("../../res/html/report.js");

/// Creates the Tera template registry holding the index and page templates.
///
/// The registry additionally contains the following filters:
///
/// | Filter | Action |
/// |--------|--------|
/// | `clamp(min=0, max=100)` | Clamps a floating-point number between 0 and 100 |
/// | `to_fixed(precision=3)` | Prints a floating-point number as fixed format with 3 decimal points |
/// | `filename` | Extracts the filename part from a full path |
pub fn new() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![(INDEX, INDEX_TEMPLATE), (PAGE, PAGE_TEMPLATE)])?;
    tera.register_filter("clamp", clamp);
    tera.register_filter("to_fixed", to_fixed);
    tera.register_filter("filename", filename);
    Ok(tera)
}

/// Provides the `clamp` filter.
fn clamp(value: &Value, options: &HashMap<String, Value>) -> Result<Value> {
    let number = value.as_f64().ok_or_else(|| Error::msg("expecting number to clamp"))?;
    let min = options.get("min").and_then(Value::as_f64).ok_or_else(|| Error::msg("clamp should have a min number"))?;
    let max = options.get("max").and_then(Value::as_f64).ok_or_else(|| Error::msg("clamp should have a max number"))?;
    Ok(number.max(min).min(max).into())
}

/// Provides the `to_fixed` filter.
fn to_fixed(value: &Value, options: &HashMap<String, Value>) -> Result<Value> {
    let number = value.as_f64().ok_or_else(|| Error::msg("expecting number to format"))?;
    let digits = options.get("precision").and_then(Value::as_u64).unwrap_or(0) as usize;
    Ok(Value::String(format!("{:.*}", digits, number)))
}

/// Provides the `filename` filter.
fn filename(value: &Value, _: &HashMap<String, Value>) -> Result<Value> {
    let path = value.as_str().ok_or_else(|| Error::msg("expecting path"))?;
    let start = path.rfind(MAIN_SEPARATOR).map_or(0, |s| s + MAIN_SEPARATOR.len_utf8());
    Ok(Value::from(&path[start..]))
}

#[test]
fn test_filters() {
    let mut options = HashMap::new();
    options.insert("precision".to_owned(), Value::from(3));
    assert_eq!(to_fixed(&Value::from(100.0 * 2.0 / 3.0), &options).unwrap(), Value::from("66.667"));
    assert_eq!(to_fixed(&Value::from(0), &options).unwrap(), Value::from("0.000"));

    let mut options = HashMap::new();
    options.insert("min".to_owned(), Value::from(0.0));
    options.insert("max".to_owned(), Value::from(100.0));
    assert_eq!(clamp(&Value::from(120.5), &options).unwrap(), Value::from(100.0));

    assert_eq!(filename(&Value::from("/w/src/main.c"), &HashMap::new()).unwrap(), Value::from("main.c"));
    assert!(filename(&Value::from(1), &HashMap::new()).is_err());
}

#[test]
fn test_templates_compile() {
    new().unwrap();
}
