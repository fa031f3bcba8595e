//! DynamoDB `AttributeValue` type with custom serialization.
//!
//! `AttributeValue` is a tagged union where exactly one variant is present.
//! The JSON wire format uses single-key objects like `{"S": "hello"}`.
//!
//! Both directions enforce the union contract:
//!
//! - encoding rejects empty sets, sets with duplicate members and `N`
//!   payloads that are not decimal numbers ([`ValueError::InvalidValue`]);
//! - decoding rejects objects with zero or several type tags, unknown tags,
//!   wrongly-typed payloads and malformed base64
//!   ([`ValueError::MalformedValue`]).

use std::collections::{HashMap, HashSet};
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::{self, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValueError;

/// The type tags allowed on the wire.
pub const TYPE_TAGS: [&str; 10] = ["S", "N", "B", "SS", "NS", "BS", "BOOL", "NULL", "L", "M"];

/// DynamoDB attribute value.
///
/// Numbers are always string-encoded to preserve arbitrary precision.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Number value (decimal string).
    N(String),
    /// Binary value (base64-encoded in JSON).
    B(Bytes),
    /// String set.
    Ss(Vec<String>),
    /// Number set (decimal strings).
    Ns(Vec<String>),
    /// Binary set (base64-encoded in JSON).
    Bs(Vec<Bytes>),
    /// Boolean value.
    Bool(bool),
    /// Null value, sent as `{"NULL": true}`.
    Null,
    /// List of attribute values.
    L(Vec<AttributeValue>),
    /// Map of attribute values.
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Build a number value from anything that displays as a decimal.
    ///
    /// The result is not validated until it is encoded.
    #[must_use]
    pub fn number(n: impl fmt::Display) -> Self {
        Self::N(n.to_string())
    }

    /// Build a string set, rejecting empty input and duplicates.
    pub fn string_set<I, T>(members: I) -> Result<Self, ValueError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let value = Self::Ss(members.into_iter().map(Into::into).collect());
        value.validate_shallow()?;
        Ok(value)
    }

    /// Build a number set, rejecting empty input, duplicates and non-numbers.
    pub fn number_set<I, T>(members: I) -> Result<Self, ValueError>
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        let value = Self::Ns(members.into_iter().map(|m| m.to_string()).collect());
        value.validate_shallow()?;
        Ok(value)
    }

    /// Build a binary set, rejecting empty input and duplicates.
    pub fn binary_set<I, T>(members: I) -> Result<Self, ValueError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        let value = Self::Bs(members.into_iter().map(Into::into).collect());
        value.validate_shallow()?;
        Ok(value)
    }

    /// Returns `true` if this is a string value.
    #[must_use]
    pub fn is_s(&self) -> bool {
        matches!(self, Self::S(_))
    }

    /// Returns `true` if this is a number value.
    #[must_use]
    pub fn is_n(&self) -> bool {
        matches!(self, Self::N(_))
    }

    /// Returns `true` if this is a binary value.
    #[must_use]
    pub fn is_b(&self) -> bool {
        matches!(self, Self::B(_))
    }

    /// Returns `true` if this is a null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for the scalar types allowed in keys and ordered
    /// comparisons (`S`, `N`, `B`).
    #[must_use]
    pub fn is_key_scalar(&self) -> bool {
        matches!(self, Self::S(_) | Self::N(_) | Self::B(_))
    }

    /// Returns `true` for the three set types.
    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Ss(_) | Self::Ns(_) | Self::Bs(_))
    }

    /// Returns the string value if this is an `S` variant.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number string if this is an `N` variant.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the bytes if this is a `B` variant.
    #[must_use]
    pub fn as_b(&self) -> Option<&Bytes> {
        match self {
            Self::B(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the map if this is an `M` variant.
    #[must_use]
    pub fn as_m(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the list if this is an `L` variant.
    #[must_use]
    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::L(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the boolean if this is a `Bool` variant.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the DynamoDB type descriptor string (e.g., "S", "N", "BOOL").
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }

    /// Validate this value and everything nested inside it.
    pub fn validate(&self) -> Result<(), ValueError> {
        self.validate_shallow()?;
        match self {
            Self::L(list) => list.iter().try_for_each(Self::validate),
            Self::M(map) => map.values().try_for_each(Self::validate),
            _ => Ok(()),
        }
    }

    /// Encode into the wire JSON shape.
    pub fn encode(&self) -> Result<serde_json::Value, ValueError> {
        self.validate()?;
        serde_json::to_value(self).map_err(|e| ValueError::InvalidValue(e.to_string()))
    }

    /// Decode from the wire JSON shape.
    pub fn decode(wire: &serde_json::Value) -> Result<Self, ValueError> {
        Self::deserialize(wire).map_err(|e| ValueError::MalformedValue(e.to_string()))
    }

    /// Checks the constraints of this node only; children are checked when
    /// they are serialized themselves.
    fn validate_shallow(&self) -> Result<(), ValueError> {
        match self {
            Self::N(n) => check_number(n),
            Self::Ss(members) => check_unique("SS", members.iter().map(String::as_str)),
            Self::Ns(members) => {
                let canonical = members
                    .iter()
                    .map(|n| {
                        check_number(n)?;
                        Ok(canonical_number(n).unwrap_or_else(|| n.clone()))
                    })
                    .collect::<Result<Vec<_>, ValueError>>()?;
                check_unique("NS", canonical.iter().map(String::as_str))
            }
            Self::Bs(members) => check_unique("BS", members.iter().map(Bytes::as_ref)),
            _ => Ok(()),
        }
    }
}

fn check_unique<'a, T>(
    tag: &str,
    members: impl ExactSizeIterator<Item = &'a T>,
) -> Result<(), ValueError>
where
    T: Eq + std::hash::Hash + ?Sized + fmt::Debug + 'a,
{
    if members.len() == 0 {
        return Err(ValueError::InvalidValue(format!("{tag} set must not be empty")));
    }
    let mut seen = HashSet::with_capacity(members.len());
    for member in members {
        if !seen.insert(member) {
            return Err(ValueError::InvalidValue(format!(
                "{tag} set contains duplicate member {member:?}"
            )));
        }
    }
    Ok(())
}

/// Rewrite a decimal string so that numerically equal values compare equal.
///
/// The result is `0` or `[-]0.<digits>e<exp>` with no leading or trailing
/// zeros in `<digits>`, so `1`, `1.0`, `01` and `0.1e1` all map to
/// `0.1e1`. Returns `None` when `n` is not a number or its exponent does
/// not fit in an `i64`.
#[must_use]
pub fn canonical_number(n: &str) -> Option<String> {
    check_number(n).ok()?;
    let negative = n.starts_with('-');
    let unsigned = n.strip_prefix(['+', '-']).unwrap_or(n);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let digits = format!("{int_part}{frac_part}");
    let leading = digits.len() - digits.trim_start_matches('0').len();
    let significant = digits.trim_matches('0');
    if significant.is_empty() {
        return Some("0".to_owned());
    }
    let int_len = i64::try_from(int_part.len()).ok()?;
    let skipped = i64::try_from(leading).ok()?;
    let point = int_len.checked_add(exponent)?.checked_sub(skipped)?;
    let sign = if negative { "-" } else { "" };
    Some(format!("{sign}0.{significant}e{point}"))
}

/// Accepts `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`.
fn check_number(n: &str) -> Result<(), ValueError> {
    let invalid = || ValueError::InvalidValue(format!("{n:?} is not a valid number"));

    let unsigned = n.strip_prefix(['+', '-']).unwrap_or(n);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (unsigned, None),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid());
    }
    if let Some(exp) = exponent {
        let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if digits.is_empty() || !all_digits(digits) {
            return Err(invalid());
        }
    }
    Ok(())
}

impl Eq for AttributeValue {}

impl std::hash::Hash for AttributeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::S(s) | Self::N(s) => s.hash(state),
            Self::B(b) => b.hash(state),
            Self::Bool(b) => b.hash(state),
            Self::Null => {}
            Self::Ss(v) | Self::Ns(v) => v.hash(state),
            Self::Bs(v) => v.hash(state),
            Self::L(v) => v.hash(state),
            Self::M(m) => {
                // Deterministic hash for maps: sort keys.
                let mut pairs: Vec<_> = m.iter().collect();
                pairs.sort_by_key(|(k, _)| *k);
                for (k, v) in pairs {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{{S: {s}}}"),
            Self::N(n) => write!(f, "{{N: {n}}}"),
            Self::B(b) => write!(f, "{{B: {} bytes}}", b.len()),
            Self::Ss(v) => write!(f, "{{SS: {v:?}}}"),
            Self::Ns(v) => write!(f, "{{NS: {v:?}}}"),
            Self::Bs(v) => write!(f, "{{BS: {} items}}", v.len()),
            Self::Bool(b) => write!(f, "{{BOOL: {b}}}"),
            Self::Null => f.write_str("{NULL: true}"),
            Self::L(v) => write!(f, "{{L: {} items}}", v.len()),
            Self::M(m) => write!(f, "{{M: {} keys}}", m.len()),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::S(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::S(s.to_owned())
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Bytes> for AttributeValue {
    fn from(b: Bytes) -> Self {
        Self::B(b)
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.validate_shallow().map_err(ser::Error::custom)?;

        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::S(s) => map.serialize_entry("S", s)?,
            Self::N(n) => map.serialize_entry("N", n)?,
            Self::B(b) => map.serialize_entry("B", &STANDARD.encode(b))?,
            Self::Ss(v) => map.serialize_entry("SS", v)?,
            Self::Ns(v) => map.serialize_entry("NS", v)?,
            Self::Bs(v) => {
                let encoded: Vec<String> = v.iter().map(|b| STANDARD.encode(b)).collect();
                map.serialize_entry("BS", &encoded)?;
            }
            Self::Bool(b) => map.serialize_entry("BOOL", b)?,
            Self::Null => map.serialize_entry("NULL", &true)?,
            Self::L(list) => map.serialize_entry("L", list)?,
            Self::M(m) => map.serialize_entry("M", m)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeValueVisitor)
    }
}

struct AttributeValueVisitor;

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a DynamoDB AttributeValue object with exactly one type key")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let Some(tag) = map.next_key::<String>()? else {
            return Err(de::Error::custom(
                "AttributeValue must have exactly one type key, found none",
            ));
        };

        let value = match tag.as_str() {
            "S" => AttributeValue::S(map.next_value()?),
            "N" => AttributeValue::N(map.next_value()?),
            "B" => {
                let encoded: String = map.next_value()?;
                AttributeValue::B(decode_base64(&encoded)?)
            }
            "SS" => AttributeValue::Ss(map.next_value()?),
            "NS" => AttributeValue::Ns(map.next_value()?),
            "BS" => {
                let encoded: Vec<String> = map.next_value()?;
                let decoded = encoded
                    .iter()
                    .map(|e| decode_base64(e))
                    .collect::<Result<Vec<_>, _>>()?;
                AttributeValue::Bs(decoded)
            }
            "BOOL" => AttributeValue::Bool(map.next_value()?),
            "NULL" => {
                let flag: bool = map.next_value()?;
                if !flag {
                    return Err(de::Error::custom("NULL attribute value must be `true`"));
                }
                AttributeValue::Null
            }
            "L" => AttributeValue::L(map.next_value()?),
            "M" => AttributeValue::M(map.next_value()?),
            other => return Err(de::Error::unknown_field(other, &TYPE_TAGS)),
        };

        if let Some(extra) = map.next_key::<String>()? {
            return Err(de::Error::custom(format!(
                "AttributeValue must have exactly one type key, found `{tag}` and `{extra}`"
            )));
        }

        value.validate_shallow().map_err(de::Error::custom)?;
        Ok(value)
    }
}

fn decode_base64<E: de::Error>(encoded: &str) -> Result<Bytes, E> {
    STANDARD
        .decode(encoded)
        .map(Bytes::from)
        .map_err(|e| E::custom(format!("invalid base64 payload: {e}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_serialize_string_value() {
        let val = AttributeValue::S("hello".to_owned());
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"S":"hello"}"#);
    }

    #[test]
    fn test_should_serialize_null_and_bool() {
        assert_eq!(AttributeValue::Null.encode().unwrap(), json!({"NULL": true}));
        assert_eq!(
            AttributeValue::Bool(false).encode().unwrap(),
            json!({"BOOL": false})
        );
    }

    #[test]
    fn test_should_serialize_nested_list() {
        let val = AttributeValue::L(vec![
            AttributeValue::S("a".to_owned()),
            AttributeValue::number(1),
            AttributeValue::L(vec![AttributeValue::Null]),
        ]);
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"L":[{"S":"a"},{"N":"1"},{"L":[{"NULL":true}]}]}"#);
    }

    #[test]
    fn test_should_roundtrip_every_variant() {
        let mut inner = HashMap::new();
        inner.insert("k".to_owned(), AttributeValue::Bool(true));
        let values = vec![
            AttributeValue::S("text".to_owned()),
            AttributeValue::S(String::new()),
            AttributeValue::N("-12.5e+3".to_owned()),
            AttributeValue::B(Bytes::from_static(b"\x00\x01\xff")),
            AttributeValue::string_set(["a", "b"]).unwrap(),
            AttributeValue::number_set([1, 2, 3]).unwrap(),
            AttributeValue::binary_set([Bytes::from_static(b"x"), Bytes::from_static(b"y")])
                .unwrap(),
            AttributeValue::Bool(true),
            AttributeValue::Null,
            AttributeValue::L(vec![AttributeValue::number(7), AttributeValue::Null]),
            AttributeValue::M(inner),
        ];
        for value in values {
            let wire = value.encode().unwrap();
            assert_eq!(AttributeValue::decode(&wire).unwrap(), value, "wire: {wire}");
        }
    }

    #[test]
    fn test_should_roundtrip_high_precision_numbers_exactly() {
        for n in [
            "3.14159265358979323846264338327950288",
            "123456789012345678901234567890",
            "-0.000000000000000000000000000001",
            "99999999999999999999999999999999999999",
            "1E+125",
        ] {
            let value = AttributeValue::N(n.to_owned());
            let decoded = AttributeValue::decode(&value.encode().unwrap()).unwrap();
            assert_eq!(decoded.as_n(), Some(n));
        }
    }

    #[test]
    fn test_should_roundtrip_binary_payloads_of_many_lengths() {
        for len in (0..=1000).step_by(37).chain([1, 2, 3, 1000]) {
            #[allow(clippy::cast_possible_truncation)]
            let payload: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();
            let value = AttributeValue::B(Bytes::from(payload));
            let decoded = AttributeValue::decode(&value.encode().unwrap()).unwrap();
            assert_eq!(decoded, value, "length {len}");
        }
    }

    #[test]
    fn test_should_reject_two_type_tags() {
        let err = AttributeValue::decode(&json!({"S": "a", "N": "1"})).unwrap_err();
        assert!(matches!(err, ValueError::MalformedValue(_)), "{err}");
    }

    #[test]
    fn test_should_reject_zero_type_tags() {
        let err = AttributeValue::decode(&json!({})).unwrap_err();
        assert!(matches!(err, ValueError::MalformedValue(_)), "{err}");
    }

    #[test]
    fn test_should_reject_unknown_tag_and_wrong_payload() {
        assert!(matches!(
            AttributeValue::decode(&json!({"X": "a"})),
            Err(ValueError::MalformedValue(_))
        ));
        assert!(matches!(
            AttributeValue::decode(&json!({"N": 1})),
            Err(ValueError::MalformedValue(_))
        ));
        assert!(matches!(
            AttributeValue::decode(&json!("S")),
            Err(ValueError::MalformedValue(_))
        ));
    }

    #[test]
    fn test_should_reject_malformed_base64() {
        let err = AttributeValue::decode(&json!({"B": "not base64!!"})).unwrap_err();
        assert!(matches!(err, ValueError::MalformedValue(_)));
        let err = AttributeValue::decode(&json!({"BS": ["AAEC", "%%%"]})).unwrap_err();
        assert!(matches!(err, ValueError::MalformedValue(_)));
    }

    #[test]
    fn test_should_reject_null_false() {
        let err = AttributeValue::decode(&json!({"NULL": false})).unwrap_err();
        assert!(matches!(err, ValueError::MalformedValue(_)));
    }

    #[test]
    fn test_should_reject_duplicate_set_members_on_encode() {
        let value = AttributeValue::Ss(vec!["a".to_owned(), "a".to_owned()]);
        assert!(matches!(value.encode(), Err(ValueError::InvalidValue(_))));

        let value = AttributeValue::Bs(vec![Bytes::from_static(b"x"), Bytes::from_static(b"x")]);
        assert!(matches!(value.encode(), Err(ValueError::InvalidValue(_))));

        assert!(AttributeValue::number_set([5, 5]).is_err());
    }

    #[test]
    fn test_should_reject_numerically_equal_number_set_members() {
        let value = AttributeValue::Ns(vec!["1".to_owned(), "1.0".to_owned(), "01".to_owned()]);
        assert!(matches!(value.encode(), Err(ValueError::InvalidValue(_))));

        let value = AttributeValue::Ns(vec!["-0".to_owned(), "0.000".to_owned()]);
        assert!(matches!(value.encode(), Err(ValueError::InvalidValue(_))));

        let value = AttributeValue::Ns(vec!["1.5".to_owned(), "15e-1".to_owned()]);
        assert!(serde_json::to_string(&value).is_err());

        // Distinct numbers keep their original spelling on the wire.
        let value = AttributeValue::Ns(vec!["1.0".to_owned(), "10".to_owned()]);
        assert_eq!(value.encode().unwrap(), json!({"NS": ["1.0", "10"]}));
    }

    #[test]
    fn test_should_canonicalize_numbers() {
        for (raw, canonical) in [
            ("1", "0.1e1"),
            ("01", "0.1e1"),
            ("1.000", "0.1e1"),
            ("0.1e1", "0.1e1"),
            ("+100", "0.1e3"),
            ("-0.0025", "-0.25e-2"),
            (".5", "0.5e0"),
            ("-0", "0"),
            ("0e10", "0"),
        ] {
            assert_eq!(canonical_number(raw).as_deref(), Some(canonical), "{raw}");
        }
        assert_eq!(canonical_number("abc"), None);
        assert_eq!(canonical_number("1e99999999999999999999"), None);
    }

    #[test]
    fn test_should_reject_empty_sets() {
        assert!(matches!(
            AttributeValue::Ns(Vec::new()).encode(),
            Err(ValueError::InvalidValue(_))
        ));
        assert!(AttributeValue::string_set(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_should_reject_invalid_sets_nested_in_maps() {
        let mut m = HashMap::new();
        m.insert("tags".to_owned(), AttributeValue::Ss(Vec::new()));
        let value = AttributeValue::L(vec![AttributeValue::M(m)]);
        assert!(matches!(value.validate(), Err(ValueError::InvalidValue(_))));
        assert!(serde_json::to_string(&value).is_err());
    }

    #[test]
    fn test_should_validate_number_syntax() {
        for ok in ["0", "-1", "+2", "3.", ".5", "6.02e23", "1E-7", "-0.0"] {
            assert!(check_number(ok).is_ok(), "{ok}");
        }
        for bad in ["", "-", ".", "1.2.3", "abc", "1e", "1e+", "NaN", "1_000", " 1"] {
            assert!(check_number(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_should_decode_sets_from_wire() {
        let val = AttributeValue::decode(&json!({"NS": ["1", "2", "3"]})).unwrap();
        assert!(matches!(val, AttributeValue::Ns(ref v) if v.len() == 3));
        let val = AttributeValue::decode(&json!({"SS": ["a", "b"]})).unwrap();
        assert!(val.is_set());
    }
}
