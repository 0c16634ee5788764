//! Built-in XML Schema datatypes.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Builtin {
    AnySimpleType,
    String,
    NormalizedString,
    Token,
    Language,
    Name,
    NcName,
    NmToken,
    NmTokens,
    Id,
    IdRef,
    IdRefs,
    Entity,
    AnyUri,
    QName,
    Boolean,
    Decimal,
    Integer,
    Long,
    Int,
    Short,
    Byte,
    NonNegativeInteger,
    PositiveInteger,
    NonPositiveInteger,
    NegativeInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    Float,
    Double,
    Date,
    DateTime,
    Time,
    Duration,
    GYear,
    GYearMonth,
    GMonth,
    GDay,
    GMonthDay,
    Base64Binary,
    HexBinary,
}

impl Builtin {
    /// Look up a built-in by its local name. `anyType` is handled by the
    /// compiler because it is not a simple type.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "anySimpleType" => Self::AnySimpleType,
            "string" => Self::String,
            "normalizedString" => Self::NormalizedString,
            "token" => Self::Token,
            "language" => Self::Language,
            "Name" => Self::Name,
            "NCName" => Self::NcName,
            "NMTOKEN" => Self::NmToken,
            "NMTOKENS" => Self::NmTokens,
            "ID" => Self::Id,
            "IDREF" => Self::IdRef,
            "IDREFS" => Self::IdRefs,
            "ENTITY" => Self::Entity,
            "anyURI" => Self::AnyUri,
            "QName" => Self::QName,
            "boolean" => Self::Boolean,
            "decimal" => Self::Decimal,
            "integer" => Self::Integer,
            "long" => Self::Long,
            "int" => Self::Int,
            "short" => Self::Short,
            "byte" => Self::Byte,
            "nonNegativeInteger" => Self::NonNegativeInteger,
            "positiveInteger" => Self::PositiveInteger,
            "nonPositiveInteger" => Self::NonPositiveInteger,
            "negativeInteger" => Self::NegativeInteger,
            "unsignedLong" => Self::UnsignedLong,
            "unsignedInt" => Self::UnsignedInt,
            "unsignedShort" => Self::UnsignedShort,
            "unsignedByte" => Self::UnsignedByte,
            "float" => Self::Float,
            "double" => Self::Double,
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            "time" => Self::Time,
            "duration" => Self::Duration,
            "gYear" => Self::GYear,
            "gYearMonth" => Self::GYearMonth,
            "gMonth" => Self::GMonth,
            "gDay" => Self::GDay,
            "gMonthDay" => Self::GMonthDay,
            "base64Binary" => Self::Base64Binary,
            "hexBinary" => Self::HexBinary,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AnySimpleType => "anySimpleType",
            Self::String => "string",
            Self::NormalizedString => "normalizedString",
            Self::Token => "token",
            Self::Language => "language",
            Self::Name => "Name",
            Self::NcName => "NCName",
            Self::NmToken => "NMTOKEN",
            Self::NmTokens => "NMTOKENS",
            Self::Id => "ID",
            Self::IdRef => "IDREF",
            Self::IdRefs => "IDREFS",
            Self::Entity => "ENTITY",
            Self::AnyUri => "anyURI",
            Self::QName => "QName",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Int => "int",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::PositiveInteger => "positiveInteger",
            Self::NonPositiveInteger => "nonPositiveInteger",
            Self::NegativeInteger => "negativeInteger",
            Self::UnsignedLong => "unsignedLong",
            Self::UnsignedInt => "unsignedInt",
            Self::UnsignedShort => "unsignedShort",
            Self::UnsignedByte => "unsignedByte",
            Self::Float => "float",
            Self::Double => "double",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Time => "time",
            Self::Duration => "duration",
            Self::GYear => "gYear",
            Self::GYearMonth => "gYearMonth",
            Self::GMonth => "gMonth",
            Self::GDay => "gDay",
            Self::GMonthDay => "gMonthDay",
            Self::Base64Binary => "base64Binary",
            Self::HexBinary => "hexBinary",
        }
    }

    /// Types whose whitespace is preserved as-is.
    fn preserves_whitespace(&self) -> bool {
        matches!(self, Self::String | Self::AnySimpleType)
    }

    pub fn is_numeric(&self) -> bool {
        self.integer_range().is_some() || matches!(self, Self::Decimal | Self::Float | Self::Double)
    }

    fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date
                | Self::DateTime
                | Self::Time
                | Self::GYear
                | Self::GYearMonth
                | Self::GMonth
                | Self::GDay
                | Self::GMonthDay
        )
    }

    fn integer_range(&self) -> Option<(i128, i128)> {
        Some(match self {
            Self::Integer => (i128::MIN, i128::MAX),
            Self::Long => (i64::MIN as i128, i64::MAX as i128),
            Self::Int => (i32::MIN as i128, i32::MAX as i128),
            Self::Short => (i16::MIN as i128, i16::MAX as i128),
            Self::Byte => (i8::MIN as i128, i8::MAX as i128),
            Self::NonNegativeInteger => (0, i128::MAX),
            Self::PositiveInteger => (1, i128::MAX),
            Self::NonPositiveInteger => (i128::MIN, 0),
            Self::NegativeInteger => (i128::MIN, -1),
            Self::UnsignedLong => (0, u64::MAX as i128),
            Self::UnsignedInt => (0, u32::MAX as i128),
            Self::UnsignedShort => (0, u16::MAX as i128),
            Self::UnsignedByte => (0, u8::MAX as i128),
            _ => return None,
        })
    }

    /// Apply the type's whitespace rule.
    pub fn normalize<'a>(&self, value: &'a str) -> std::borrow::Cow<'a, str> {
        if self.preserves_whitespace() {
            return value.into();
        }
        if *self == Self::NormalizedString {
            return value.replace(['\t', '\n', '\r'], " ").into();
        }
        let collapsed: Vec<&str> = value.split_whitespace().collect();
        if collapsed.len() == 1 && collapsed[0] == value {
            value.into()
        } else {
            collapsed.join(" ").into()
        }
    }

    /// Check a lexical value (already whitespace-normalized).
    pub fn check(&self, value: &str) -> Result<(), String> {
        let ok = match self {
            Self::AnySimpleType | Self::String | Self::NormalizedString | Self::AnyUri => true,
            Self::Token => !value.starts_with(' ') && !value.ends_with(' ') && !value.contains("  "),
            Self::Language => is_language(value),
            Self::Name => is_name(value),
            Self::NcName | Self::Id | Self::IdRef | Self::Entity => is_ncname(value),
            Self::NmToken => is_nmtoken(value),
            Self::NmTokens => !value.is_empty() && value.split(' ').all(is_nmtoken),
            Self::IdRefs => !value.is_empty() && value.split(' ').all(is_ncname),
            Self::QName => is_qname(value),
            Self::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            Self::Decimal => is_decimal(value),
            Self::Float | Self::Double => is_float(value),
            Self::Date => parse_date(strip_timezone(value)).is_some(),
            Self::DateTime => is_date_time(value),
            Self::Time => parse_time(strip_timezone(value)).is_some(),
            Self::Duration => is_duration(value),
            Self::GYear => is_year(strip_timezone(value)),
            Self::GYearMonth => is_year_month(strip_timezone(value)),
            Self::GMonth => is_g_part(strip_timezone(value), "--", 1, 12),
            Self::GDay => is_g_part(strip_timezone(value), "---", 1, 31),
            Self::GMonthDay => is_month_day(strip_timezone(value)),
            Self::Base64Binary => is_base64(value),
            Self::HexBinary => value.len() % 2 == 0 && value.chars().all(|c| c.is_ascii_hexdigit()),
            Self::Integer
            | Self::Long
            | Self::Int
            | Self::Short
            | Self::Byte
            | Self::NonNegativeInteger
            | Self::PositiveInteger
            | Self::NonPositiveInteger
            | Self::NegativeInteger
            | Self::UnsignedLong
            | Self::UnsignedInt
            | Self::UnsignedShort
            | Self::UnsignedByte => return self.check_integer(value),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("'{value}' is not a valid value for type {}", self.name()))
        }
    }

    fn check_integer(&self, value: &str) -> Result<(), String> {
        let Some((min, max)) = self.integer_range() else {
            return Ok(());
        };
        let parsed = parse_integer(value)
            .ok_or_else(|| format!("'{value}' is not a valid value for type {}", self.name()))?;
        if parsed < min || parsed > max {
            return Err(format!("'{value}' is out of range for type {}", self.name()));
        }
        Ok(())
    }

    /// Compare two values of this type for ordering facets. `None` when the
    /// type has no order or either value does not parse.
    pub fn compare(&self, a: &str, b: &str) -> Option<Ordering> {
        if self.is_numeric() {
            let a = parse_number(a)?;
            let b = parse_number(b)?;
            return a.partial_cmp(&b);
        }
        if self.is_temporal() {
            // Same-format ISO 8601 values order lexically.
            return Some(a.cmp(b));
        }
        None
    }

    /// Length of a value as counted by the `length` facets.
    pub fn length_of(&self, value: &str) -> usize {
        match self {
            Self::HexBinary => value.len() / 2,
            Self::Base64Binary => {
                let chars: Vec<char> = value.chars().filter(|c| !c.is_whitespace()).collect();
                let padding = chars.iter().rev().take_while(|c| **c == '=').count();
                ((chars.len() / 4) * 3).saturating_sub(padding.min(2))
            }
            Self::NmTokens | Self::IdRefs => value.split(' ').count(),
            _ => value.chars().count(),
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_numeric() || c == '-' || c == '.' || c == '\u{B7}'
}

fn is_name(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if is_name_start(c)) && chars.all(is_name_char)
}

fn is_ncname(value: &str) -> bool {
    !value.contains(':') && is_name(value)
}

fn is_nmtoken(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_name_char)
}

fn is_qname(value: &str) -> bool {
    match value.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => is_ncname(value),
    }
}

fn is_language(value: &str) -> bool {
    let mut parts = value.split('-');
    let primary_ok = matches!(parts.next(), Some(p) if (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    primary_ok && parts.all(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn parse_integer(value: &str) -> Option<i128> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i128>().ok()
}

fn is_decimal(value: &str) -> bool {
    let unsigned = value
        .strip_prefix('+')
        .or_else(|| value.strip_prefix('-'))
        .unwrap_or(value);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    (!int_part.is_empty() || !frac_part.is_empty())
        && int_part.chars().all(|c| c.is_ascii_digit())
        && frac_part.chars().all(|c| c.is_ascii_digit())
}

fn is_float(value: &str) -> bool {
    if matches!(value, "INF" | "-INF" | "+INF" | "NaN") {
        return true;
    }
    let (mantissa, exponent) = match value.find(['e', 'E']) {
        Some(idx) => (&value[..idx], Some(&value[idx + 1..])),
        None => (value, None),
    };
    let exponent_ok = match exponent {
        Some(e) => parse_integer(e).is_some(),
        None => true,
    };
    is_decimal(mantissa) && exponent_ok
}

fn parse_number(value: &str) -> Option<f64> {
    match value.trim() {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        other if is_float(other) => other.parse::<f64>().ok(),
        _ => None,
    }
}

/// Remove an optional `Z` or `±hh:mm` suffix. Returns the input unchanged
/// when the suffix is malformed so the caller rejects it.
fn strip_timezone(value: &str) -> &str {
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    if value.len() > 6 {
        let (head, tail) = value.split_at(value.len() - 6);
        let bytes = tail.as_bytes();
        let looks_like_offset = (bytes[0] == b'+' || bytes[0] == b'-')
            && bytes[3] == b':'
            && tail[1..3].chars().all(|c| c.is_ascii_digit())
            && tail[4..6].chars().all(|c| c.is_ascii_digit());
        if looks_like_offset && head.len() >= 2 {
            let hours: u32 = tail[1..3].parse().unwrap_or(99);
            let minutes: u32 = tail[4..6].parse().unwrap_or(99);
            if hours <= 14 && minutes < 60 {
                return head;
            }
        }
    }
    value
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.strip_prefix('-').unwrap_or(value);
    let mut parts = value.splitn(3, '-');
    let year = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    if year.len() < 4 || month.len() != 2 || day.len() != 2 {
        return None;
    }
    if ![year, month, day]
        .iter()
        .all(|p| p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let (hms, fraction) = match value.split_once('.') {
        Some((h, f)) => (h, Some(f)),
        None => (value, None),
    };
    if let Some(f) = fraction {
        if f.is_empty() || !f.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }
    if hms.len() != 8 {
        return None;
    }
    if hms == "24:00:00" && fraction.map_or(true, |f| f.chars().all(|c| c == '0')) {
        return NaiveTime::from_hms_opt(0, 0, 0);
    }
    NaiveTime::parse_from_str(hms, "%H:%M:%S").ok()
}

fn is_date_time(value: &str) -> bool {
    let Some((date, time)) = strip_timezone(value).split_once('T') else {
        return false;
    };
    parse_date(date).is_some() && parse_time(time).is_some()
}

fn is_duration(value: &str) -> bool {
    let value = value.strip_prefix('-').unwrap_or(value);
    let Some(body) = value.strip_prefix('P') else {
        return false;
    };
    if body.is_empty() {
        return false;
    }
    let (date_part, time_part) = match body.split_once('T') {
        Some((d, t)) => {
            if t.is_empty() {
                return false;
            }
            (d, Some(t))
        }
        None => (body, None),
    };
    duration_section(date_part, &['Y', 'M', 'D'], false)
        && time_part.map_or(true, |t| duration_section(t, &['H', 'M', 'S'], true))
}

fn duration_section(section: &str, designators: &[char], seconds_fraction: bool) -> bool {
    let mut next = 0;
    let mut number = String::new();
    for c in section.chars() {
        if c.is_ascii_digit() || (c == '.' && seconds_fraction) {
            number.push(c);
            continue;
        }
        let Some(pos) = designators[next..].iter().position(|d| *d == c) else {
            return false;
        };
        if number.is_empty() || (number.contains('.') && c != 'S') {
            return false;
        }
        number.clear();
        next += pos + 1;
    }
    number.is_empty()
}

fn is_year(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    digits.len() >= 4 && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_year_month(value: &str) -> bool {
    match value.rsplit_once('-') {
        Some((year, month)) => is_year(year) && month.len() == 2 && matches!(month.parse::<u32>(), Ok(1..=12)),
        None => false,
    }
}

fn is_g_part(value: &str, prefix: &str, min: u32, max: u32) -> bool {
    match value.strip_prefix(prefix) {
        Some(digits) => {
            digits.len() == 2
                && digits.chars().all(|c| c.is_ascii_digit())
                && matches!(digits.parse::<u32>(), Ok(n) if n >= min && n <= max)
        }
        None => false,
    }
}

fn is_month_day(value: &str) -> bool {
    let Some(rest) = value.strip_prefix("--") else {
        return false;
    };
    let Some((month, day)) = rest.split_once('-') else {
        return false;
    };
    // 2000 is a leap year, so --02-29 is accepted.
    match (month.parse::<u32>(), day.parse::<u32>()) {
        (Ok(m), Ok(d)) if month.len() == 2 && day.len() == 2 => {
            NaiveDate::from_ymd_opt(2000, m, d).is_some()
        }
        _ => false,
    }
}

fn is_base64(value: &str) -> bool {
    let chars: Vec<char> = value.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.len() % 4 != 0 {
        return false;
    }
    let padding = chars.iter().rev().take_while(|c| **c == '=').count();
    padding <= 2
        && chars[..chars.len() - padding]
            .iter()
            .all(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        assert_eq!(Builtin::from_name("string"), Some(Builtin::String));
        assert_eq!(Builtin::from_name("NCName"), Some(Builtin::NcName));
        assert_eq!(Builtin::from_name("anyType"), None);
        assert_eq!(Builtin::from_name("strng"), None);
    }

    #[test]
    fn integers_respect_ranges() {
        assert!(Builtin::Int.check("42").is_ok());
        assert!(Builtin::Int.check("+42").is_ok());
        assert!(Builtin::Int.check("-2147483648").is_ok());
        assert!(Builtin::Int.check("2147483648").is_err());
        assert!(Builtin::Byte.check("128").is_err());
        assert!(Builtin::UnsignedByte.check("255").is_ok());
        assert!(Builtin::UnsignedByte.check("-1").is_err());
        assert!(Builtin::PositiveInteger.check("0").is_err());
        assert!(Builtin::NonNegativeInteger.check("0").is_ok());
        assert!(Builtin::Integer.check("1.5").is_err());
        assert!(Builtin::Integer.check("").is_err());
    }

    #[test]
    fn out_of_range_message_names_type() {
        let err = Builtin::Short.check("40000").unwrap_err();
        assert_eq!(err, "'40000' is out of range for type short");
    }

    #[test]
    fn decimals_and_floats() {
        assert!(Builtin::Decimal.check("3.14").is_ok());
        assert!(Builtin::Decimal.check("-.5").is_ok());
        assert!(Builtin::Decimal.check("1e3").is_err());
        assert!(Builtin::Double.check("1e3").is_ok());
        assert!(Builtin::Double.check("-1.5E-7").is_ok());
        assert!(Builtin::Double.check("INF").is_ok());
        assert!(Builtin::Double.check("NaN").is_ok());
        assert!(Builtin::Double.check("inf").is_err());
        assert!(Builtin::Float.check("abc").is_err());
    }

    #[test]
    fn booleans() {
        for ok in ["true", "false", "1", "0"] {
            assert!(Builtin::Boolean.check(ok).is_ok(), "{ok}");
        }
        assert!(Builtin::Boolean.check("yes").is_err());
        assert!(Builtin::Boolean.check("TRUE").is_err());
    }

    #[test]
    fn dates_and_times() {
        assert!(Builtin::Date.check("2024-02-29").is_ok());
        assert!(Builtin::Date.check("2023-02-29").is_err());
        assert!(Builtin::Date.check("2024-01-05Z").is_ok());
        assert!(Builtin::Date.check("2024-01-05+02:00").is_ok());
        assert!(Builtin::Date.check("2024-1-5").is_err());
        assert!(Builtin::DateTime.check("2024-01-05T10:20:30").is_ok());
        assert!(Builtin::DateTime.check("2024-01-05T10:20:30.125Z").is_ok());
        assert!(Builtin::DateTime.check("2024-01-05 10:20:30").is_err());
        assert!(Builtin::Time.check("23:59:59").is_ok());
        assert!(Builtin::Time.check("24:00:00").is_ok());
        assert!(Builtin::Time.check("25:00:00").is_err());
    }

    #[test]
    fn durations() {
        assert!(Builtin::Duration.check("P1Y2M3DT4H5M6.5S").is_ok());
        assert!(Builtin::Duration.check("-PT30M").is_ok());
        assert!(Builtin::Duration.check("P").is_err());
        assert!(Builtin::Duration.check("PT").is_err());
        assert!(Builtin::Duration.check("P1H").is_err());
        assert!(Builtin::Duration.check("P1D2Y").is_err());
    }

    #[test]
    fn gregorian_parts() {
        assert!(Builtin::GYear.check("2024").is_ok());
        assert!(Builtin::GYearMonth.check("2024-12").is_ok());
        assert!(Builtin::GYearMonth.check("2024-13").is_err());
        assert!(Builtin::GMonth.check("--07").is_ok());
        assert!(Builtin::GDay.check("---31").is_ok());
        assert!(Builtin::GDay.check("---32").is_err());
        assert!(Builtin::GMonthDay.check("--02-29").is_ok());
        assert!(Builtin::GMonthDay.check("--04-31").is_err());
    }

    #[test]
    fn names_and_tokens() {
        assert!(Builtin::NcName.check("model_1").is_ok());
        assert!(Builtin::NcName.check("1model").is_err());
        assert!(Builtin::NcName.check("a:b").is_err());
        assert!(Builtin::QName.check("a:b").is_ok());
        assert!(Builtin::NmTokens.check("a b c").is_ok());
        assert!(Builtin::Language.check("en-US").is_ok());
        assert!(Builtin::Language.check("english-language").is_ok());
        assert!(Builtin::Language.check("englishlang-x").is_err());
        assert!(Builtin::Language.check("en--US").is_err());
    }

    #[test]
    fn binary_types() {
        assert!(Builtin::HexBinary.check("0fA1").is_ok());
        assert!(Builtin::HexBinary.check("0fA").is_err());
        assert!(Builtin::Base64Binary.check("aGVsbG8=").is_ok());
        assert!(Builtin::Base64Binary.check("aGVsbG8").is_err());
        assert_eq!(Builtin::Base64Binary.length_of("aGVsbG8="), 5);
        assert_eq!(Builtin::HexBinary.length_of("0fA1"), 2);
    }

    #[test]
    fn whitespace_rules() {
        assert_eq!(Builtin::String.normalize("  a  b "), "  a  b ");
        assert_eq!(Builtin::NormalizedString.normalize("a\tb"), "a b");
        assert_eq!(Builtin::Token.normalize("  a   b "), "a b");
        assert_eq!(Builtin::Int.normalize(" 42\n"), "42");
    }

    #[test]
    fn ordering() {
        assert_eq!(Builtin::Int.compare("9", "10"), Some(Ordering::Less));
        assert_eq!(Builtin::Date.compare("2024-01-02", "2024-01-01"), Some(Ordering::Greater));
        assert_eq!(Builtin::String.compare("a", "b"), None);
    }
}
