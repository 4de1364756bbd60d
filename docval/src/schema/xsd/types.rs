//! Built-in XML Schema datatypes and restriction facets.

use std::sync::LazyLock;

use regex::Regex;

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid lexical-space regex {pattern}: {err}"),
    }
}

static DECIMAL: LazyLock<Regex> = LazyLock::new(|| compile(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)$"));
static INTEGER: LazyLock<Regex> = LazyLock::new(|| compile(r"^[+-]?\d+$"));
static DOUBLE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^(?:[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?|[+-]?INF|NaN)$")
});
static DATE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^-?\d{4,}-(\d{2})-(\d{2})(?:Z|[+-]\d{2}:\d{2})?$"));
static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"^-?\d{4,}-(\d{2})-(\d{2})",           // date
        r"T(\d{2}):(\d{2}):(\d{2})(?:\.\d+)?", // time
        r"(?:Z|[+-]\d{2}:\d{2})?$",            // optional zone
    ))
});
static TIME: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(\d{2}):(\d{2}):(\d{2})(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?$"));
static G_YEAR: LazyLock<Regex> = LazyLock::new(|| compile(r"^-?\d{4,}(?:Z|[+-]\d{2}:\d{2})?$"));
static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^-?P(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?$")
});
static NC_NAME: LazyLock<Regex> = LazyLock::new(|| compile(r"^[A-Za-z_][A-Za-z0-9._-]*$"));
static NAME: LazyLock<Regex> = LazyLock::new(|| compile(r"^[A-Za-z_:][A-Za-z0-9._:-]*$"));
static QNAME: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^(?:[A-Za-z_][A-Za-z0-9._-]*:)?[A-Za-z_][A-Za-z0-9._-]*$")
});
static NM_TOKEN: LazyLock<Regex> = LazyLock::new(|| compile(r"^[A-Za-z0-9._:-]+$"));
static LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[a-zA-Z]{1,8}(?:-[a-zA-Z0-9]{1,8})*$"));
static BASE64: LazyLock<Regex> = LazyLock::new(|| compile(r"^[A-Za-z0-9+/\s]*={0,2}$"));
static HEX: LazyLock<Regex> = LazyLock::new(|| compile(r"^(?:[0-9a-fA-F]{2})*$"));

/// Built-in datatypes recognized by local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Builtin {
    AnySimpleType,
    String,
    Token,
    Language,
    Name,
    NcName,
    NmToken,
    QName,
    AnyUri,
    Boolean,
    Decimal,
    Integer { min: Option<i128>, max: Option<i128> },
    Double,
    Date,
    DateTime,
    Time,
    GYear,
    Duration,
    Base64Binary,
    HexBinary,
}

impl Builtin {
    const fn bounded(min: i128, max: i128) -> Self {
        Self::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    pub(super) fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "anyType" | "anySimpleType" => Self::AnySimpleType,
            "string" | "normalizedString" => Self::String,
            "token" | "NMTOKENS" | "IDREFS" | "ENTITIES" => Self::Token,
            "language" => Self::Language,
            "Name" => Self::Name,
            "NCName" | "ID" | "IDREF" | "ENTITY" => Self::NcName,
            "NMTOKEN" => Self::NmToken,
            "QName" | "NOTATION" => Self::QName,
            "anyURI" => Self::AnyUri,
            "boolean" => Self::Boolean,
            "decimal" => Self::Decimal,
            "float" | "double" => Self::Double,
            "integer" => Self::Integer {
                min: None,
                max: None,
            },
            "nonNegativeInteger" => Self::Integer {
                min: Some(0),
                max: None,
            },
            "positiveInteger" => Self::Integer {
                min: Some(1),
                max: None,
            },
            "nonPositiveInteger" => Self::Integer {
                min: None,
                max: Some(0),
            },
            "negativeInteger" => Self::Integer {
                min: None,
                max: Some(-1),
            },
            "long" => Self::bounded(i128::from(i64::MIN), i128::from(i64::MAX)),
            "int" => Self::bounded(i128::from(i32::MIN), i128::from(i32::MAX)),
            "short" => Self::bounded(i128::from(i16::MIN), i128::from(i16::MAX)),
            "byte" => Self::bounded(i128::from(i8::MIN), i128::from(i8::MAX)),
            "unsignedLong" => Self::bounded(0, i128::from(u64::MAX)),
            "unsignedInt" => Self::bounded(0, i128::from(u32::MAX)),
            "unsignedShort" => Self::bounded(0, i128::from(u16::MAX)),
            "unsignedByte" => Self::bounded(0, i128::from(u8::MAX)),
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            "time" => Self::Time,
            "gYear" => Self::GYear,
            "duration" => Self::Duration,
            "base64Binary" => Self::Base64Binary,
            "hexBinary" => Self::HexBinary,
            _ => return None,
        })
    }

    /// Whether `value` is in the lexical space of this type.
    ///
    /// Whitespace is collapsed (trimmed) for every type except `string`.
    pub(super) fn accepts(self, value: &str) -> bool {
        let v = value.trim();
        match self {
            Self::AnySimpleType | Self::String | Self::Token | Self::AnyUri => true,
            Self::Language => LANGUAGE.is_match(v),
            Self::Name => NAME.is_match(v),
            Self::NcName => NC_NAME.is_match(v),
            Self::NmToken => NM_TOKEN.is_match(v),
            Self::QName => QNAME.is_match(v),
            Self::Boolean => matches!(v, "true" | "false" | "1" | "0"),
            Self::Decimal => DECIMAL.is_match(v),
            Self::Integer { min, max } => INTEGER.is_match(v) && integer_in_range(v, min, max),
            Self::Double => DOUBLE.is_match(v),
            Self::Date => DATE
                .captures(v)
                .is_some_and(|c| field_in(&c, 1, 1, 12) && field_in(&c, 2, 1, 31)),
            Self::DateTime => DATE_TIME.captures(v).is_some_and(|c| {
                field_in(&c, 1, 1, 12)
                    && field_in(&c, 2, 1, 31)
                    && field_in(&c, 3, 0, 24)
                    && field_in(&c, 4, 0, 59)
                    && field_in(&c, 5, 0, 60)
            }),
            Self::Time => TIME.captures(v).is_some_and(|c| {
                field_in(&c, 1, 0, 24) && field_in(&c, 2, 0, 59) && field_in(&c, 3, 0, 60)
            }),
            Self::GYear => G_YEAR.is_match(v),
            Self::Duration => DURATION.is_match(v) && !v.ends_with('P') && !v.ends_with('T'),
            Self::Base64Binary => BASE64.is_match(v),
            Self::HexBinary => HEX.is_match(v),
        }
    }
}

fn integer_in_range(v: &str, min: Option<i128>, max: Option<i128>) -> bool {
    match v.parse::<i128>() {
        Ok(n) => min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m),
        // beyond i128: only an unbounded side can hold it
        Err(_) if v.starts_with('-') => min.is_none(),
        Err(_) => max.is_none(),
    }
}

fn field_in(captures: &regex::Captures<'_>, group: usize, low: u32, high: u32) -> bool {
    captures
        .get(group)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .is_some_and(|n| (low..=high).contains(&n))
}

/// Restriction facets of a user-defined simple type.
#[derive(Debug, Clone, Default)]
pub(super) struct Facets {
    pub(super) enumeration: Vec<String>,
    /// Source pattern and its anchored compiled form.
    pub(super) patterns: Vec<(String, Regex)>,
    pub(super) length: Option<usize>,
    pub(super) min_length: Option<usize>,
    pub(super) max_length: Option<usize>,
    pub(super) min_inclusive: Option<f64>,
    pub(super) max_inclusive: Option<f64>,
    pub(super) min_exclusive: Option<f64>,
    pub(super) max_exclusive: Option<f64>,
}

impl Facets {
    fn has_bounds(&self) -> bool {
        self.min_inclusive.is_some()
            || self.max_inclusive.is_some()
            || self.min_exclusive.is_some()
            || self.max_exclusive.is_some()
    }

    /// Describe the first facet `value` violates, if any.
    pub(super) fn violation(&self, value: &str) -> Option<String> {
        let v = value.trim();

        if !self.enumeration.is_empty() && !self.enumeration.iter().any(|e| e == v) {
            return Some(format!(
                "'{v}' is not one of the allowed values: {}",
                self.enumeration.join(", ")
            ));
        }

        // patterns declared in the same restriction step are alternatives
        if !self.patterns.is_empty() && !self.patterns.iter().any(|(_, re)| re.is_match(v)) {
            let sources: Vec<&str> = self.patterns.iter().map(|(s, _)| s.as_str()).collect();
            return Some(format!(
                "'{v}' does not match pattern '{}'",
                sources.join("' or '")
            ));
        }

        let len = v.chars().count();
        if let Some(expected) = self.length
            && len != expected
        {
            return Some(format!("'{v}' must be exactly {expected} characters long"));
        }
        if let Some(min) = self.min_length
            && len < min
        {
            return Some(format!("'{v}' is shorter than the minimum length {min}"));
        }
        if let Some(max) = self.max_length
            && len > max
        {
            return Some(format!("'{v}' is longer than the maximum length {max}"));
        }

        if self.has_bounds() {
            let Ok(n) = v.parse::<f64>() else {
                return Some(format!("'{v}' is not a number"));
            };
            if self.min_inclusive.is_some_and(|m| n < m) {
                return Some(format!("'{v}' is below the minimum {}", fmt_num(self.min_inclusive)));
            }
            if self.max_inclusive.is_some_and(|m| n > m) {
                return Some(format!("'{v}' is above the maximum {}", fmt_num(self.max_inclusive)));
            }
            if self.min_exclusive.is_some_and(|m| n <= m) {
                return Some(format!("'{v}' must be greater than {}", fmt_num(self.min_exclusive)));
            }
            if self.max_exclusive.is_some_and(|m| n >= m) {
                return Some(format!("'{v}' must be less than {}", fmt_num(self.max_exclusive)));
            }
        }
        None
    }
}

fn fmt_num(bound: Option<f64>) -> String {
    bound.map_or_else(String::new, |b| b.to_string())
}
