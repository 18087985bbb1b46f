//! # Component Inputs — Typed Values with a Line Format
//!
//! Every component script declares a list of inputs. An input is a name plus
//! an [`InputValue`], a tagged union over the nine supported datatypes. Ranges
//! (for `int`/`float`) and item lists (for `enum`) travel with the value, so a
//! parsed declaration and a live instance value share one type.
//!
//! ## Line Format
//!
//! Instances are stored as newline-joined records:
//!
//! ```text
//! speed,float,2.5
//! offset,vec2,0,-1.5
//! title,string,Hello\nWorld
//! ```
//!
//! A record is split on the first two commas only, so string payloads may
//! contain commas. Backslashes and newlines inside text payloads are escaped,
//! which keeps every record on one line and makes the text form round-trip
//! exactly for every datatype.
//!
//! Ranges and enum items are *not* part of the record. They belong to the
//! schema and are re-attached when a stored value is merged onto a freshly
//! parsed declaration (see [`InputValue::with_string_value`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmithyError};
use crate::math::{Vec2, Vec3, Vec4};

/// Sentinel item of an enum declaration that had no usable item list.
pub const BAD_ENUM: &str = "BAD_ENUM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    String,
    Bool,
    Enum,
    Object,
}

impl Datatype {
    pub const ALL: [Datatype; 9] = [
        Datatype::Int,
        Datatype::Float,
        Datatype::Vec2,
        Datatype::Vec3,
        Datatype::Vec4,
        Datatype::String,
        Datatype::Bool,
        Datatype::Enum,
        Datatype::Object,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Datatype::Int => "int",
            Datatype::Float => "float",
            Datatype::Vec2 => "vec2",
            Datatype::Vec3 => "vec3",
            Datatype::Vec4 => "vec4",
            Datatype::String => "string",
            Datatype::Bool => "bool",
            Datatype::Enum => "enum",
            Datatype::Object => "object",
        }
    }

    /// Component count for vector types.
    pub fn arity(self) -> Option<usize> {
        match self {
            Datatype::Vec2 => Some(2),
            Datatype::Vec3 => Some(3),
            Datatype::Vec4 => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = SmithyError;

    fn from_str(s: &str) -> Result<Self> {
        Datatype::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| SmithyError::Parse {
                input: s.to_string(),
                reason: "unknown datatype".to_string(),
            })
    }
}

/// Inclusive numeric bounds. Unbounded sides are infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputRange {
    pub min: f64,
    pub max: f64,
}

impl InputRange {
    pub const UNBOUNDED: Self = Self {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        // `f64::clamp` panics when min > max; a badly declared range just
        // leaves the value alone.
        if self.min > self.max {
            return value;
        }
        value.max(self.min).min(self.max)
    }
}

impl Default for InputRange {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

// ── InputValue ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Int { value: i64, range: InputRange },
    Float { value: f64, range: InputRange },
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    String(String),
    Bool(bool),
    Enum { value: String, items: Vec<String> },
    /// Name of another entity, empty when unset.
    Object(String),
}

impl InputValue {
    pub fn int(value: i64) -> Self {
        InputValue::Int {
            value,
            range: InputRange::UNBOUNDED,
        }
    }

    pub fn float(value: f64) -> Self {
        InputValue::Float {
            value,
            range: InputRange::UNBOUNDED,
        }
    }

    /// An enum value, substituting the first item when `value` isn't one of
    /// `items`. An empty item list yields [`InputValue::bad_enum`].
    pub fn enumeration(value: impl Into<String>, items: Vec<String>) -> Self {
        if items.is_empty() {
            return Self::bad_enum();
        }
        let value = value.into();
        let value = if items.contains(&value) {
            value
        } else {
            items[0].clone()
        };
        InputValue::Enum { value, items }
    }

    pub fn bad_enum() -> Self {
        InputValue::Enum {
            value: BAD_ENUM.to_string(),
            items: vec![BAD_ENUM.to_string()],
        }
    }

    pub fn is_bad_enum(&self) -> bool {
        matches!(self, InputValue::Enum { items, .. } if items.len() == 1 && items[0] == BAD_ENUM)
    }

    /// The declaration default for a datatype with no arguments.
    pub fn default_for(datatype: Datatype) -> Self {
        match datatype {
            Datatype::Int => Self::int(0),
            Datatype::Float => Self::float(0.0),
            Datatype::Vec2 => InputValue::Vec2(Vec2::ZERO),
            Datatype::Vec3 => InputValue::Vec3(Vec3::ZERO),
            Datatype::Vec4 => InputValue::Vec4(Vec4::ZERO),
            Datatype::String => InputValue::String(String::new()),
            Datatype::Bool => InputValue::Bool(false),
            Datatype::Enum => Self::bad_enum(),
            Datatype::Object => InputValue::Object(String::new()),
        }
    }

    pub fn datatype(&self) -> Datatype {
        match self {
            InputValue::Int { .. } => Datatype::Int,
            InputValue::Float { .. } => Datatype::Float,
            InputValue::Vec2(_) => Datatype::Vec2,
            InputValue::Vec3(_) => Datatype::Vec3,
            InputValue::Vec4(_) => Datatype::Vec4,
            InputValue::String(_) => Datatype::String,
            InputValue::Bool(_) => Datatype::Bool,
            InputValue::Enum { .. } => Datatype::Enum,
            InputValue::Object(_) => Datatype::Object,
        }
    }

    /// The payload in record form (the third field of a stored line).
    pub fn to_string_value(&self) -> String {
        match self {
            InputValue::Int { value, .. } => value.to_string(),
            InputValue::Float { value, .. } => value.to_string(),
            InputValue::Vec2(v) => join_floats(&v.to_array()),
            InputValue::Vec3(v) => join_floats(&v.to_array()),
            InputValue::Vec4(v) => join_floats(&v.to_array()),
            InputValue::String(s) | InputValue::Object(s) => escape(s),
            InputValue::Enum { value, .. } => escape(value),
            InputValue::Bool(b) => b.to_string(),
        }
    }

    /// Parse `text` into a value of the same datatype, keeping this value's
    /// range or item list.
    pub fn with_string_value(&self, text: &str) -> Result<InputValue> {
        let parsed = Self::from_string_value(self.datatype(), text)?;
        Ok(match (self, parsed) {
            (InputValue::Int { range, .. }, InputValue::Int { value, .. }) => InputValue::Int {
                value,
                range: *range,
            },
            (InputValue::Float { range, .. }, InputValue::Float { value, .. }) => {
                InputValue::Float {
                    value,
                    range: *range,
                }
            }
            (InputValue::Enum { items, .. }, InputValue::Enum { value, .. }) => {
                Self::enumeration(value, items.clone())
            }
            (_, other) => other,
        })
    }

    /// Parse a stored payload without any schema. Ranges are unbounded and an
    /// enum's item list holds only its own value.
    pub fn from_string_value(datatype: Datatype, text: &str) -> Result<InputValue> {
        let bad = |reason: &str| SmithyError::Parse {
            input: text.to_string(),
            reason: format!("{reason} for {datatype}"),
        };
        Ok(match datatype {
            Datatype::Int => Self::int(text.trim().parse().map_err(|_| bad("expected integer"))?),
            Datatype::Float => {
                Self::float(text.trim().parse().map_err(|_| bad("expected number"))?)
            }
            Datatype::Vec2 => InputValue::Vec2(Vec2::from_array(split_floats(text).ok_or_else(
                || bad("expected 2 comma-separated numbers"),
            )?)),
            Datatype::Vec3 => InputValue::Vec3(Vec3::from_array(split_floats(text).ok_or_else(
                || bad("expected 3 comma-separated numbers"),
            )?)),
            Datatype::Vec4 => InputValue::Vec4(Vec4::from_array(split_floats(text).ok_or_else(
                || bad("expected 4 comma-separated numbers"),
            )?)),
            Datatype::String => InputValue::String(unescape(text)),
            Datatype::Object => InputValue::Object(unescape(text)),
            Datatype::Bool => InputValue::Bool(match text.trim() {
                "true" | "True" | "1" => true,
                "false" | "False" | "0" => false,
                _ => return Err(bad("expected true or false")),
            }),
            Datatype::Enum => {
                let value = unescape(text);
                InputValue::Enum {
                    items: vec![value.clone()],
                    value,
                }
            }
        })
    }
}

fn join_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn split_floats<const N: usize>(text: &str) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    let mut parts = text.split(',');
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ── ComponentInput ──────────────────────────────────────────────────────

/// A named input, either a schema declaration or an instance value.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInput {
    pub name: String,
    pub value: InputValue,
}

impl ComponentInput {
    pub fn new(name: impl Into<String>, value: InputValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn datatype(&self) -> Datatype {
        self.value.datatype()
    }

    /// `name,datatype,stringvalue`
    pub fn encode(&self) -> String {
        format!(
            "{},{},{}",
            self.name,
            self.datatype(),
            self.value.to_string_value()
        )
    }

    pub fn decode(line: &str) -> Result<Self> {
        let mut fields = line.splitn(3, ',');
        let (Some(name), Some(datatype), Some(text)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(SmithyError::Parse {
                input: line.to_string(),
                reason: "expected name,datatype,value".to_string(),
            });
        };
        let datatype: Datatype = datatype.parse()?;
        Ok(Self::new(name, InputValue::from_string_value(datatype, text)?))
    }
}

/// Join inputs into the newline-separated record form.
pub fn encode_inputs(inputs: &[ComponentInput]) -> String {
    inputs
        .iter()
        .map(ComponentInput::encode)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode every record in `data`. Bad records are skipped and reported.
pub fn decode_inputs(data: &str) -> (Vec<ComponentInput>, Vec<String>) {
    let mut inputs = Vec::new();
    let mut errors = Vec::new();
    for line in data.lines().filter(|l| !l.is_empty()) {
        match ComponentInput::decode(line) {
            Ok(input) => inputs.push(input),
            Err(e) => errors.push(e.to_string()),
        }
    }
    (inputs, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<InputValue> {
        vec![
            InputValue::Int {
                value: -42,
                range: InputRange::new(-100.0, 100.0),
            },
            InputValue::Float {
                value: 0.1 + 0.2,
                range: InputRange::UNBOUNDED,
            },
            InputValue::float(f64::INFINITY),
            InputValue::Vec2(Vec2::new(1.5, -0.25)),
            InputValue::Vec3(Vec3::new(0.1, 2.0, 1e-7)),
            InputValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0)),
            InputValue::String("comma, back\\slash\nnew line".to_string()),
            InputValue::String(String::new()),
            InputValue::Bool(true),
            InputValue::Bool(false),
            InputValue::enumeration("b", vec!["a".into(), "b".into(), "c".into()]),
            InputValue::Object("Player".to_string()),
            InputValue::Object(String::new()),
        ]
    }

    #[test]
    fn every_datatype_round_trips_through_string_form() {
        for value in samples() {
            let text = value.to_string_value();
            assert_eq!(value.with_string_value(&text).unwrap(), value, "{text}");
        }
    }

    #[test]
    fn records_round_trip_without_schema() {
        let inputs: Vec<_> = samples()
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                let bare = InputValue::from_string_value(v.datatype(), &v.to_string_value());
                ComponentInput::new(format!("in{i}"), bare.unwrap())
            })
            .collect();

        let data = encode_inputs(&inputs);
        assert_eq!(data.lines().count(), inputs.len());
        let (decoded, errors) = decode_inputs(&data);
        assert!(errors.is_empty());
        assert_eq!(decoded, inputs);
        assert_eq!(encode_inputs(&decoded), data);
    }

    #[test]
    fn enum_outside_items_falls_back_to_first() {
        let schema = InputValue::enumeration("a", vec!["a".into(), "b".into()]);
        let v = schema.with_string_value("zzz").unwrap();
        assert_eq!(
            v,
            InputValue::Enum {
                value: "a".into(),
                items: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn empty_enum_is_sentinel() {
        let v = InputValue::enumeration("x", vec![]);
        assert!(v.is_bad_enum());
    }

    #[test]
    fn decode_splits_on_first_two_commas() {
        let input = ComponentInput::decode("greeting,string,hello, world").unwrap();
        assert_eq!(input.value, InputValue::String("hello, world".into()));
    }

    #[test]
    fn decode_rejects_bad_records() {
        assert!(ComponentInput::decode("speed,float").is_err());
        assert!(ComponentInput::decode("speed,quaternion,1").is_err());
        assert!(ComponentInput::decode("offset,vec2,1,2,3").is_err());
        assert!(ComponentInput::decode("flag,bool,maybe").is_err());
    }

    #[test]
    fn bool_accepts_capitalised_literals() {
        let v = InputValue::from_string_value(Datatype::Bool, "True").unwrap();
        assert_eq!(v, InputValue::Bool(true));
    }

    #[test]
    fn range_clamp() {
        let r = InputRange::new(0.0, 10.0);
        assert_eq!(r.clamp(12.0), 10.0);
        assert_eq!(r.clamp(-1.0), 0.0);
        assert_eq!(InputRange::new(5.0, 1.0).clamp(3.0), 3.0);
    }
}
