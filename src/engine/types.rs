//! Engine Type Tags
//!
//! Parses the engine's declared column type names into a closed set of
//! variants the decoder can dispatch on.
//!
//! # Supported Tags
//!
//! ```text
//! Date | Date32 | DateTime[('tz')] | DateTime64(p[, 'tz'])
//! String | FixedString(n) | LowCardinality(T)
//! Int8..Int256 | UInt8..UInt256 | Float32 | Float64 | Bool | UUID
//! Array(T) | Map(K, V) | Nullable(T)
//! ```
//!
//! Anything else (`Decimal(10, 2)`, `Enum8(...)`, `Tuple(...)`, `IPv4`, ...)
//! parses to [`EngineType::Other`] holding the original text.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map_res, opt, recognize},
    error::{Error, ErrorKind},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// A declared column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineType {
    /// `Date` or `Date32`
    Date,
    /// `DateTime`, optionally with a time zone
    DateTime { timezone: Option<String> },
    /// `DateTime64(precision[, tz])`
    DateTime64 {
        precision: u8,
        timezone: Option<String>,
    },
    String,
    FixedString(usize),
    LowCardinality(Box<EngineType>),
    /// Signed integer of the given bit width
    Int(u16),
    /// Unsigned integer of the given bit width
    UInt(u16),
    /// Float of the given bit width
    Float(u8),
    Bool,
    Uuid,
    Array(Box<EngineType>),
    Map(Box<EngineType>, Box<EngineType>),
    Nullable(Box<EngineType>),
    /// Unrecognized tag, kept verbatim
    Other(String),
}

impl EngineType {
    /// Parse a type tag. Never fails: unparsable tags become [`EngineType::Other`].
    pub fn parse(type_name: &str) -> Self {
        let trimmed = type_name.trim();
        match parse_type(trimmed) {
            Ok(("", ty)) => ty,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

fn parse_type(input: &str) -> IResult<&str, EngineType> {
    alt((
        parse_wrapper,
        parse_map,
        parse_datetime64,
        parse_datetime,
        parse_fixed_string,
        parse_named,
    ))(input)
}

/// `Nullable(T)`, `LowCardinality(T)`, `Array(T)`
fn parse_wrapper(input: &str) -> IResult<&str, EngineType> {
    let (input, name) = alt((tag("Nullable"), tag("LowCardinality"), tag("Array")))(input)?;
    let (input, inner) = delimited(
        pair(char('('), multispace0),
        parse_type,
        pair(multispace0, char(')')),
    )(input)?;

    let inner = Box::new(inner);
    let ty = match name {
        "Nullable" => EngineType::Nullable(inner),
        "LowCardinality" => EngineType::LowCardinality(inner),
        _ => EngineType::Array(inner),
    };
    Ok((input, ty))
}

/// `Map(K, V)`
fn parse_map(input: &str) -> IResult<&str, EngineType> {
    let (input, _) = tag("Map")(input)?;
    let (input, _) = pair(char('('), multispace0)(input)?;
    let (input, key) = parse_type(input)?;
    let (input, _) = tuple((multispace0, char(','), multispace0))(input)?;
    let (input, value) = parse_type(input)?;
    let (input, _) = pair(multispace0, char(')'))(input)?;

    Ok((input, EngineType::Map(Box::new(key), Box::new(value))))
}

/// `DateTime64(3)` or `DateTime64(9, 'UTC')`
fn parse_datetime64(input: &str) -> IResult<&str, EngineType> {
    let (input, _) = tag("DateTime64")(input)?;
    let (input, _) = pair(char('('), multispace0)(input)?;
    let (input, precision) = map_res(digit1, str::parse::<u8>)(input)?;
    let (input, timezone) = opt(preceded(
        tuple((multispace0, char(','), multispace0)),
        parse_quoted,
    ))(input)?;
    let (input, _) = pair(multispace0, char(')'))(input)?;

    Ok((
        input,
        EngineType::DateTime64 {
            precision,
            timezone: timezone.map(str::to_string),
        },
    ))
}

/// `DateTime` or `DateTime('Europe/Berlin')`
fn parse_datetime(input: &str) -> IResult<&str, EngineType> {
    let (input, _) = tag("DateTime")(input)?;
    let (input, timezone) = opt(delimited(
        pair(char('('), multispace0),
        parse_quoted,
        pair(multispace0, char(')')),
    ))(input)?;

    Ok((
        input,
        EngineType::DateTime {
            timezone: timezone.map(str::to_string),
        },
    ))
}

/// `FixedString(16)`
fn parse_fixed_string(input: &str) -> IResult<&str, EngineType> {
    let (input, _) = tag("FixedString")(input)?;
    let (input, len) = delimited(
        pair(char('('), multispace0),
        map_res(digit1, str::parse::<usize>),
        pair(multispace0, char(')')),
    )(input)?;

    Ok((input, EngineType::FixedString(len)))
}

/// Plain names, plus any other `Name(args...)` kept as [`EngineType::Other`]
fn parse_named(input: &str) -> IResult<&str, EngineType> {
    let (input, text) = recognize(pair(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        opt(balanced_parens),
    ))(input)?;

    let ty = match text {
        "Date" | "Date32" => EngineType::Date,
        "String" => EngineType::String,
        "Int8" => EngineType::Int(8),
        "Int16" => EngineType::Int(16),
        "Int32" => EngineType::Int(32),
        "Int64" => EngineType::Int(64),
        "Int128" => EngineType::Int(128),
        "Int256" => EngineType::Int(256),
        "UInt8" => EngineType::UInt(8),
        "UInt16" => EngineType::UInt(16),
        "UInt32" => EngineType::UInt(32),
        "UInt64" => EngineType::UInt(64),
        "UInt128" => EngineType::UInt(128),
        "UInt256" => EngineType::UInt(256),
        "Float32" => EngineType::Float(32),
        "Float64" => EngineType::Float(64),
        "Bool" | "Boolean" => EngineType::Bool,
        "UUID" => EngineType::Uuid,
        other => EngineType::Other(other.to_string()),
    };
    Ok((input, ty))
}

/// Single-quoted literal, returns the contents
fn parse_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('\''), take_while(|c: char| c != '\''), char('\''))(input)
}

/// A parenthesized argument list with nesting and quoted strings
fn balanced_parens(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('(') {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    }

    let mut depth = 0usize;
    let mut in_quote = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if in_quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '\'' {
                in_quote = false;
            }
            continue;
        }

        match c {
            '\'' => in_quote = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], &input[..=i]));
                }
            }
            _ => {}
        }
    }

    Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil)))
}
