//! # Script Declarations — `--$name(type, args...)`
//!
//! A component script declares its inputs in a block of special comments at
//! the very top of the file:
//!
//! ```text
//! --$speed(float, 2.5, 0, 10)
//! --$facing(enum, ["left", "right"], "right")
//! --$target(object)
//! local Component = {}
//! ```
//!
//! Only the leading run of `--$` lines counts. Scanning stops at the first
//! line that doesn't start with the prefix, so a `--$` further down the file
//! is an ordinary comment.
//!
//! ## Arguments
//!
//! | type              | positional arguments       | default          |
//! |-------------------|----------------------------|------------------|
//! | `int` / `float`   | `default, min, max`        | `0`, `-inf..inf` |
//! | `vec2/3/4`        | `[x, y, ...]`              | zero vector      |
//! | `string`          | `default`                  | `""`             |
//! | `bool`            | `default`                  | `false`          |
//! | `object`          | `default` (entity name)    | `""`             |
//! | `enum`            | `[items...], default`      | first item       |
//!
//! Arguments are literals: numbers (`inf` allowed), quoted strings, bare
//! words, lists, `true`/`false`, `nil`. The keyword forms `default=`, `min=`,
//! `max=` and `items=` are accepted in place of positions. Ranges are recorded
//! but not enforced here.
//!
//! A line that can't be parsed becomes one entry in the error log and the
//! scan moves on to the next line.

use std::path::Path;

use crate::component::input::{ComponentInput, Datatype, InputRange, InputValue};
use crate::error::{IoResultExt, Result, SmithyError};
use crate::math::{Vec2, Vec3, Vec4};

/// Every declaration line starts with this.
pub const DECLARATION_PREFIX: &str = "--$";

/// Inputs and error strings collected from one script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptInputs {
    pub inputs: Vec<ComponentInput>,
    pub errors: Vec<String>,
}

impl ScriptInputs {
    /// Errors joined into the single log string shown to users.
    pub fn err_log(&self) -> String {
        self.errors.join("\n")
    }
}

/// Read `path` and parse its declaration block.
pub fn parse_script_inputs(path: &Path) -> Result<ScriptInputs> {
    let source = std::fs::read_to_string(path).at(path)?;
    Ok(parse_script_source(&source))
}

pub fn parse_script_source(source: &str) -> ScriptInputs {
    let mut parsed = ScriptInputs::default();
    for line in source.lines() {
        let Some(declaration) = line.strip_prefix(DECLARATION_PREFIX) else {
            break;
        };
        match parse_declaration(declaration) {
            Ok((input, warning)) => {
                if let Some(warning) = warning {
                    parsed.errors.push(format!("{}: {warning}", input.name));
                }
                parsed.inputs.push(input);
            }
            Err(reason) => parsed.errors.push(format!(
                "Could not parse input '{}': {reason}",
                declaration.trim()
            )),
        }
    }
    parsed
}

/// Parse a single declaration, with or without the `--$` prefix.
///
/// The second element is a soft error: the input is still usable but the
/// declaration was wrong (an enum without items).
pub fn parse_input(declaration: &str) -> Result<(ComponentInput, Option<String>)> {
    let trimmed = declaration.trim();
    let body = trimmed.strip_prefix(DECLARATION_PREFIX).unwrap_or(trimmed);
    parse_declaration(body).map_err(|reason| SmithyError::Parse {
        input: trimmed.to_string(),
        reason,
    })
}

type ParseResult<T> = std::result::Result<T, String>;

fn parse_declaration(declaration: &str) -> ParseResult<(ComponentInput, Option<String>)> {
    let (name, rest) = declaration
        .split_once('(')
        .ok_or_else(|| "missing '('".to_string())?;
    let name = name.trim();
    let name = name.strip_suffix(':').unwrap_or(name).trim();
    if name.is_empty() {
        return Err("missing input name".to_string());
    }
    if name.contains(',') {
        return Err("input names can't contain ','".to_string());
    }

    let close = rest.rfind(')').ok_or_else(|| "missing ')'".to_string())?;
    let inner = &rest[..close];
    let (datatype, args) = inner.split_once(',').unwrap_or((inner, ""));
    let datatype: Datatype = datatype
        .trim()
        .parse()
        .map_err(|_| format!("unknown type '{}'", datatype.trim()))?;
    let args = ArgParser::new(args).parse_all()?;

    let (value, warning) = build_value(datatype, &args)?;
    Ok((ComponentInput::new(name, value), warning))
}

fn build_value(datatype: Datatype, args: &Args) -> ParseResult<(InputValue, Option<String>)> {
    let value = match datatype {
        Datatype::Int => InputValue::Int {
            value: args.get(0, "default").map(Literal::as_int).transpose()?.unwrap_or(0),
            range: args.range()?,
        },
        Datatype::Float => InputValue::Float {
            value: args.number(0, "default")?.unwrap_or(0.0),
            range: args.range()?,
        },
        Datatype::Vec2 => InputValue::Vec2(Vec2::from_array(args.vector()?)),
        Datatype::Vec3 => InputValue::Vec3(Vec3::from_array(args.vector()?)),
        Datatype::Vec4 => InputValue::Vec4(Vec4::from_array(args.vector()?)),
        Datatype::String => InputValue::String(
            args.get(0, "default").map(Literal::as_text).transpose()?.unwrap_or_default(),
        ),
        Datatype::Bool => {
            InputValue::Bool(args.get(0, "default").map(Literal::as_bool).transpose()?.unwrap_or(false))
        }
        Datatype::Object => InputValue::Object(match args.get(0, "default") {
            None | Some(Literal::Nil) | Some(Literal::Bool(false)) => String::new(),
            Some(other) => other.as_text()?,
        }),
        Datatype::Enum => {
            let items = match args.get(0, "items") {
                Some(Literal::List(items)) if !items.is_empty() => items
                    .iter()
                    .map(Literal::as_text)
                    .collect::<ParseResult<Vec<_>>>()?,
                _ => {
                    return Ok((
                        InputValue::bad_enum(),
                        Some("Enum input has no items".to_string()),
                    ));
                }
            };
            let default = match args.get(1, "default") {
                Some(lit) => lit.as_text()?,
                None => items[0].clone(),
            };
            InputValue::enumeration(default, items)
        }
    };
    Ok((value, None))
}

// ── Argument literals ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Literal>),
    Nil,
}

impl Literal {
    fn as_number(&self) -> ParseResult<Option<f64>> {
        match self {
            Literal::Int(i) => Ok(Some(*i as f64)),
            Literal::Float(f) => Ok(Some(*f)),
            Literal::Nil => Ok(None),
            other => Err(format!("expected a number, found {other:?}")),
        }
    }

    fn as_int(&self) -> ParseResult<i64> {
        match self {
            Literal::Int(i) => Ok(*i),
            Literal::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(*f as i64),
            Literal::Bool(b) => Ok(*b as i64),
            other => Err(format!("expected an integer, found {other:?}")),
        }
    }

    fn as_bool(&self) -> ParseResult<bool> {
        match self {
            Literal::Bool(b) => Ok(*b),
            Literal::Int(i) => Ok(*i != 0),
            Literal::Nil => Ok(false),
            other => Err(format!("expected true or false, found {other:?}")),
        }
    }

    fn as_text(&self) -> ParseResult<String> {
        match self {
            Literal::Str(s) => Ok(s.clone()),
            Literal::Int(i) => Ok(i.to_string()),
            Literal::Float(f) => Ok(f.to_string()),
            Literal::Bool(b) => Ok(b.to_string()),
            Literal::Nil => Ok(String::new()),
            Literal::List(_) => Err("expected a single value, found a list".to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    positional: Vec<Literal>,
    keyword: Vec<(String, Literal)>,
}

impl Args {
    /// Keyword form wins over position.
    fn get(&self, index: usize, key: &str) -> Option<&Literal> {
        self.keyword
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .or_else(|| self.positional.get(index))
    }

    fn number(&self, index: usize, key: &str) -> ParseResult<Option<f64>> {
        match self.get(index, key) {
            Some(lit) => lit.as_number(),
            None => Ok(None),
        }
    }

    fn range(&self) -> ParseResult<InputRange> {
        Ok(InputRange::new(
            self.number(1, "min")?.unwrap_or(f64::NEG_INFINITY),
            self.number(2, "max")?.unwrap_or(f64::INFINITY),
        ))
    }

    fn vector<const N: usize>(&self) -> ParseResult<[f32; N]> {
        let mut out = [0.0; N];
        match self.get(0, "default") {
            None | Some(Literal::Nil) => {}
            Some(Literal::List(items)) if items.len() == N => {
                for (slot, item) in out.iter_mut().zip(items) {
                    *slot = item
                        .as_number()?
                        .ok_or_else(|| "vector components can't be nil".to_string())?
                        as f32;
                }
            }
            Some(other) => return Err(format!("expected a list of {N} numbers, found {other:?}")),
        }
        Ok(out)
    }
}

struct ArgParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> ArgParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn parse_all(mut self) -> ParseResult<Args> {
        let mut args = Args::default();
        loop {
            self.skip_ws();
            if self.peek().is_none() {
                break;
            }
            let keyword = self.keyword();
            let value = self.literal()?;
            match keyword {
                Some(key) => args.keyword.push((key, value)),
                None => args.positional.push(value),
            }
            self.skip_ws();
            match self.bump() {
                None => break,
                Some(',') => {}
                Some(c) => return Err(format!("unexpected '{c}' in arguments")),
            }
        }
        Ok(args)
    }

    /// Consume `ident =` if present.
    fn keyword(&mut self) -> Option<String> {
        let start = self.pos;
        let ident = self.take_while(|c| c.is_alphanumeric() || c == '_');
        if !ident.is_empty() && !ident.starts_with(|c: char| c.is_ascii_digit()) {
            self.skip_ws();
            if self.peek() == Some('=') {
                self.bump();
                self.skip_ws();
                return Some(ident.to_string());
            }
        }
        self.pos = start;
        None
    }

    fn literal(&mut self) -> ParseResult<Literal> {
        self.skip_ws();
        match self.peek() {
            None => Err("missing value".to_string()),
            Some(open @ ('[' | '{')) => self.list(if open == '[' { ']' } else { '}' }),
            Some(quote @ ('"' | '\'')) => self.quoted(quote),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(_) => Ok(self.bare_word()),
        }
    }

    fn list(&mut self, close: char) -> ParseResult<Literal> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(Literal::List(items));
            }
            items.push(self.literal()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some(c) if c == close => return Ok(Literal::List(items)),
                Some(c) => return Err(format!("unexpected '{c}' in list")),
                None => return Err(format!("unterminated list, expected '{close}'")),
            }
        }
    }

    fn quoted(&mut self, quote: char) -> ParseResult<Literal> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".to_string()),
                Some(c) if c == quote => return Ok(Literal::Str(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err("unterminated string".to_string()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> ParseResult<Literal> {
        let token = self.take_while(|c| c.is_alphanumeric() || matches!(c, '.' | '+' | '-' | '_'));
        let token = token.replace("math.", "");
        if let Ok(i) = token.parse::<i64>() {
            return Ok(Literal::Int(i));
        }
        token
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| format!("invalid number '{token}'"))
    }

    fn bare_word(&mut self) -> Literal {
        let word = self
            .take_while(|c| !matches!(c, ',' | ']' | '}' | '[' | '{'))
            .trim();
        match word {
            "true" | "True" => Literal::Bool(true),
            "false" | "False" => Literal::Bool(false),
            "nil" | "None" => Literal::Nil,
            "inf" | "math.inf" => Literal::Float(f64::INFINITY),
            other => Literal::Str(other.to_string()),
        }
    }
}
