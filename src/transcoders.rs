//! Built-in storage transcoders
//!
//! Every transcoder is a stateless unit-like value. Decoding never fails
//! loudly: input that cannot be represented yields `None`, which callers
//! treat exactly like a missing entry.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::transcoder::{StorageDecoder, StorageEncoder};

/// Transcoder that encodes values as JSON strings.
///
/// The type parameter defaults to [`serde_json::Value`], which is what the
/// concrete storage services use when no other transcoder is requested.
pub struct JsonTranscoder<T = serde_json::Value> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonTranscoder<T> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonTranscoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonTranscoder<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for JsonTranscoder<T> {}

impl<T> fmt::Debug for JsonTranscoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonTranscoder")
    }
}

impl<T: Serialize> StorageEncoder<T> for JsonTranscoder<T> {
    fn encode(&self, value: &T) -> String {
        match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                // Values serde_json refuses (e.g. maps with non-string keys)
                // are stored as null so writes never fail.
                warn!("Failed to encode value as JSON, storing null: {}", e);
                "null".to_string()
            }
        }
    }
}

impl<T: DeserializeOwned> StorageDecoder<T> for JsonTranscoder<T> {
    fn decode(&self, value: &str) -> Option<T> {
        serde_json::from_str(value).ok()
    }
}

/// Transcoder that stores strings as is.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StringTranscoder;

impl StorageEncoder<String> for StringTranscoder {
    fn encode(&self, value: &String) -> String {
        value.clone()
    }
}

impl StorageEncoder<str> for StringTranscoder {
    fn encode(&self, value: &str) -> String {
        value.to_string()
    }
}

impl StorageDecoder<String> for StringTranscoder {
    fn decode(&self, value: &str) -> Option<String> {
        Some(value.to_string())
    }
}

/// Transcoder for `bool` values, stored as `"true"` or `"false"`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BooleanTranscoder;

impl StorageEncoder<bool> for BooleanTranscoder {
    fn encode(&self, value: &bool) -> String {
        value.to_string()
    }
}

impl StorageDecoder<bool> for BooleanTranscoder {
    fn decode(&self, value: &str) -> Option<bool> {
        match value {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

/// Transcoder for `f64` values.
///
/// Numbers are written and read the way a browser would: `1` rather than
/// `1.0`, exponent notation outside `[1e-6, 1e21)`, and lenient parsing of
/// surrounding whitespace and `0x`/`0o`/`0b` literals. Only finite values
/// decode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NumberTranscoder;

impl StorageEncoder<f64> for NumberTranscoder {
    fn encode(&self, value: &f64) -> String {
        format_number(*value)
    }
}

impl StorageDecoder<f64> for NumberTranscoder {
    fn decode(&self, value: &str) -> Option<f64> {
        parse_number(value).filter(|n| n.is_finite())
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let abs = value.abs();
    if (1e-6..1e21).contains(&abs) {
        return value.to_string();
    }

    let formatted = format!("{:e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        let value = digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, digit| acc * f64::from(radix) + f64::from(digit));
        return Some(value);
    }

    // Rust accepts spellings such as "inf" and "nan" that a browser would
    // not; they are non-finite and get filtered by the caller anyway.
    trimmed.parse::<f64>().ok()
}

/// Transcoder for timestamps stored as ISO 8601 / RFC 3339 strings with
/// millisecond precision, e.g. `2019-08-26T15:18:05.822Z`.
///
/// Years outside `0000..=9999` use the expanded six digit form with an
/// explicit sign, e.g. `+010000-01-01T00:00:00.000Z`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateIsoTranscoder;

impl StorageEncoder<DateTime<Utc>> for DateIsoTranscoder {
    fn encode(&self, value: &DateTime<Utc>) -> String {
        let year = value.year();
        if (0..=9999).contains(&year) {
            return value.to_rfc3339_opts(SecondsFormat::Millis, true);
        }

        let sign = if year < 0 { '-' } else { '+' };
        format!(
            "{}{:06}{}",
            sign,
            year.unsigned_abs(),
            value.format("-%m-%dT%H:%M:%S%.3fZ")
        )
    }
}

/// Parses `±YYYYYY-MM-DDTHH:MM:SS[.sss](Z|±hh:mm)`.
fn parse_expanded_year(value: &str) -> Option<DateTime<Utc>> {
    let sign = match value.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits = value.get(1..7)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) || value.as_bytes().get(7) != Some(&b'-') {
        return None;
    }
    let year = sign * digits.parse::<i32>().ok()?;
    // "-000000" is not a valid year.
    if year == 0 && sign < 0 {
        return None;
    }

    // Parse the remainder against a leap placeholder year, then move it to
    // the real year; Feb 29 of a non-leap year fails in `with_year`.
    let parsed = DateTime::parse_from_rfc3339(&format!("2000{}", value.get(7..)?)).ok()?;
    let local = parsed.naive_local().with_year(year)?;
    let offset = TimeDelta::seconds(i64::from(parsed.offset().local_minus_utc()));
    local.checked_sub_signed(offset).map(|naive| naive.and_utc())
}

impl StorageDecoder<DateTime<Utc>> for DateIsoTranscoder {
    fn decode(&self, value: &str) -> Option<DateTime<Utc>> {
        if let Some(parsed) = parse_expanded_year(value) {
            return Some(parsed);
        }

        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.with_timezone(&Utc));
        }

        // Date-only forms are interpreted as UTC midnight.
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

/// Transcoder for timestamps stored as milliseconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateEpochTranscoder;

impl StorageEncoder<DateTime<Utc>> for DateEpochTranscoder {
    fn encode(&self, value: &DateTime<Utc>) -> String {
        value.timestamp_millis().to_string()
    }
}

impl StorageDecoder<DateTime<Utc>> for DateEpochTranscoder {
    fn decode(&self, value: &str) -> Option<DateTime<Utc>> {
        value
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// Runtime selector over the built-in transcoders.
///
/// Used where the transcoder is chosen by configuration or on the command
/// line rather than in code.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscoderKind {
    #[default]
    Json,
    String,
    Boolean,
    Number,
    DateIso,
    DateEpoch,
}

impl TranscoderKind {
    pub const ALL: [TranscoderKind; 6] = [
        TranscoderKind::Json,
        TranscoderKind::String,
        TranscoderKind::Boolean,
        TranscoderKind::Number,
        TranscoderKind::DateIso,
        TranscoderKind::DateEpoch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TranscoderKind::Json => "json",
            TranscoderKind::String => "string",
            TranscoderKind::Boolean => "boolean",
            TranscoderKind::Number => "number",
            TranscoderKind::DateIso => "date-iso",
            TranscoderKind::DateEpoch => "date-epoch",
        }
    }

    /// Parses user supplied text as a value of this kind and returns its
    /// stored representation, or `None` if the text is not a valid value.
    pub fn normalize(&self, input: &str) -> Option<String> {
        match self {
            TranscoderKind::Json => {
                let json = JsonTranscoder::<serde_json::Value>::new();
                json.decode(input).map(|v| json.encode(&v))
            }
            TranscoderKind::String => StringTranscoder.decode(input),
            TranscoderKind::Boolean => BooleanTranscoder
                .decode(input)
                .map(|v| BooleanTranscoder.encode(&v)),
            TranscoderKind::Number => NumberTranscoder
                .decode(input)
                .map(|v| NumberTranscoder.encode(&v)),
            TranscoderKind::DateIso => DateIsoTranscoder
                .decode(input)
                .map(|v| DateIsoTranscoder.encode(&v)),
            TranscoderKind::DateEpoch => DateEpochTranscoder
                .decode(input)
                .map(|v| DateEpochTranscoder.encode(&v)),
        }
    }

    /// Decodes a stored string with this kind and formats the decoded value
    /// for display. Dates are always shown in ISO form.
    pub fn render(&self, stored: &str) -> Option<String> {
        match self {
            TranscoderKind::Json => JsonTranscoder::<serde_json::Value>::new()
                .decode(stored)
                .map(|v| v.to_string()),
            TranscoderKind::String => StringTranscoder.decode(stored),
            TranscoderKind::Boolean => BooleanTranscoder.decode(stored).map(|v| v.to_string()),
            TranscoderKind::Number => NumberTranscoder.decode(stored).map(format_number),
            TranscoderKind::DateIso => DateIsoTranscoder
                .decode(stored)
                .map(|v| DateIsoTranscoder.encode(&v)),
            TranscoderKind::DateEpoch => DateEpochTranscoder
                .decode(stored)
                .map(|v| DateIsoTranscoder.encode(&v)),
        }
    }
}

impl fmt::Display for TranscoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TranscoderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TranscoderKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = TranscoderKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown transcoder '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::StorageService;
    use serde_json::json;

    fn date(iso: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(iso).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_json_encode() {
        let t = JsonTranscoder::<serde_json::Value>::new();
        assert_eq!(t.encode(&json!(null)), "null");
        assert_eq!(t.encode(&json!(123.45)), "123.45");
        assert_eq!(t.encode(&json!("a string")), "\"a string\"");
        assert_eq!(t.encode(&json!([1, 2, "a", 3, "b"])), "[1,2,\"a\",3,\"b\"]");
        assert_eq!(
            t.encode(&json!({ "foo": null, "bar": { "beer": true }, "baz": "dunno" })),
            "{\"bar\":{\"beer\":true},\"baz\":\"dunno\",\"foo\":null}"
        );
    }

    #[test]
    fn test_json_decode() {
        let t = JsonTranscoder::<serde_json::Value>::new();
        assert_eq!(t.decode("null"), Some(json!(null)));
        assert_eq!(t.decode("123.45"), Some(json!(123.45)));
        assert_eq!(t.decode("\"a string\""), Some(json!("a string")));
        assert_eq!(t.decode("[1,2,\"a\",3,\"b\"]"), Some(json!([1, 2, "a", 3, "b"])));
        assert_eq!(
            t.decode("{\"foo\":null,\"bar\":{\"beer\":true},\"baz\":\"dunno\"}"),
            Some(json!({ "foo": null, "bar": { "beer": true }, "baz": "dunno" }))
        );
        assert_eq!(t.decode("a-very-much-incorrect-json-string"), None);
    }

    #[test]
    fn test_json_typed_values() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Settings {
            theme: String,
            font_size: u32,
        }

        let t = JsonTranscoder::<Settings>::new();
        let settings = Settings {
            theme: "dark".to_string(),
            font_size: 14,
        };
        let encoded = t.encode(&settings);
        assert_eq!(encoded, "{\"theme\":\"dark\",\"font_size\":14}");
        assert_eq!(t.decode(&encoded), Some(settings));

        // Well-formed JSON of the wrong shape cannot be represented.
        assert_eq!(t.decode("{\"theme\":\"dark\"}"), None);
        assert_eq!(t.decode("[]"), None);
    }

    #[test]
    fn test_json_unencodable_value_stored_as_null() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON object keys");
        let t = JsonTranscoder::<HashMap<(i32, i32), &str>>::new();
        assert_eq!(t.encode(&map), "null");
    }

    #[test]
    fn test_string() {
        let weird = "<{we1rd \" charact3r$ ' 4nd s7uff!!!";
        assert_eq!(StringTranscoder.encode("can-be-any-string"), "can-be-any-string");
        assert_eq!(StringTranscoder.encode(weird), weird);
        assert_eq!(StringTranscoder.encode(&String::new()), "");

        assert_eq!(StringTranscoder.decode(weird), Some(weird.to_string()));
        assert_eq!(StringTranscoder.decode(""), Some(String::new()));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(BooleanTranscoder.encode(&true), "true");
        assert_eq!(BooleanTranscoder.encode(&false), "false");

        assert_eq!(BooleanTranscoder.decode("true"), Some(true));
        assert_eq!(BooleanTranscoder.decode("false"), Some(false));
        assert_eq!(BooleanTranscoder.decode("oops"), None);
        assert_eq!(BooleanTranscoder.decode(""), None);
        assert_eq!(BooleanTranscoder.decode("1"), None);
        assert_eq!(BooleanTranscoder.decode("TRUE"), None);
    }

    #[test]
    fn test_number_encode() {
        assert_eq!(NumberTranscoder.encode(&0.0), "0");
        assert_eq!(NumberTranscoder.encode(&-0.0), "0");
        assert_eq!(NumberTranscoder.encode(&1.0), "1");
        assert_eq!(NumberTranscoder.encode(&13.37), "13.37");
        assert_eq!(NumberTranscoder.encode(&-1.2e-34), "-1.2e-34");
        assert_eq!(NumberTranscoder.encode(&0.000001), "0.000001");
        assert_eq!(NumberTranscoder.encode(&1e-7), "1e-7");
        assert_eq!(NumberTranscoder.encode(&1e20), "100000000000000000000");
        assert_eq!(NumberTranscoder.encode(&1e21), "1e+21");
        assert_eq!(NumberTranscoder.encode(&f64::NAN), "NaN");
        assert_eq!(NumberTranscoder.encode(&f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_number_decode() {
        assert_eq!(NumberTranscoder.decode("0"), Some(0.0));
        assert_eq!(NumberTranscoder.decode("1"), Some(1.0));
        assert_eq!(NumberTranscoder.decode("13.37"), Some(13.37));
        assert_eq!(NumberTranscoder.decode("-1.2E-34"), Some(-1.2e-34));
        assert_eq!(NumberTranscoder.decode("1e+21"), Some(1e21));
        assert_eq!(NumberTranscoder.decode("  42  "), Some(42.0));
        assert_eq!(NumberTranscoder.decode("0x1F"), Some(31.0));
        assert_eq!(NumberTranscoder.decode("0b101"), Some(5.0));
        assert_eq!(NumberTranscoder.decode(""), Some(0.0));

        assert_eq!(NumberTranscoder.decode("not really a number"), None);
        assert_eq!(NumberTranscoder.decode("1x1"), None);
        assert_eq!(NumberTranscoder.decode("NaN"), None);
        assert_eq!(NumberTranscoder.decode("Infinity"), None);
        assert_eq!(NumberTranscoder.decode("1e999"), None);
        assert_eq!(NumberTranscoder.decode("0xZZ"), None);
    }

    #[test]
    fn test_number_decode_radix_literals() {
        assert_eq!(NumberTranscoder.decode("0o17"), Some(15.0));
        assert_eq!(NumberTranscoder.decode("0X1f"), Some(31.0));
        assert_eq!(NumberTranscoder.decode("0x"), None);
        assert_eq!(NumberTranscoder.decode("0x+1"), None);
        assert_eq!(NumberTranscoder.decode("0b+1"), None);
        assert_eq!(NumberTranscoder.decode("0o8"), None);

        // Literals wider than 128 bits still decode to a finite number.
        let wide = format!("0x1{}", "0".repeat(34));
        assert_eq!(NumberTranscoder.decode(&wide), Some(2f64.powi(136)));
    }

    #[test]
    fn test_date_iso() {
        let d = date("2019-08-26T15:18:05.822Z");
        assert_eq!(DateIsoTranscoder.encode(&d), "2019-08-26T15:18:05.822Z");
        assert_eq!(DateIsoTranscoder.decode("2019-08-26T15:18:05.822Z"), Some(d));
        assert_eq!(DateIsoTranscoder.decode("2019-08-26T17:18:05.822+02:00"), Some(d));
        assert_eq!(
            DateIsoTranscoder.decode("2019-08-26"),
            Some(date("2019-08-26T00:00:00Z"))
        );
        assert_eq!(DateIsoTranscoder.decode("invalid"), None);
        assert_eq!(DateIsoTranscoder.decode(""), None);

        let now = Utc::now();
        let decoded = DateIsoTranscoder.decode(&DateIsoTranscoder.encode(&now)).unwrap();
        assert_eq!(decoded.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_date_iso_expanded_years() {
        let far = DateTime::<Utc>::from_timestamp_millis(253402300800000).unwrap();
        assert_eq!(DateIsoTranscoder.encode(&far), "+010000-01-01T00:00:00.000Z");
        assert_eq!(DateIsoTranscoder.decode("+010000-01-01T00:00:00.000Z"), Some(far));

        let before = date("0000-12-31T23:59:59.999Z") - TimeDelta::days(366);
        assert_eq!(before.year(), -1);
        let encoded = DateIsoTranscoder.encode(&before);
        assert_eq!(encoded, "-000001-12-31T23:59:59.999Z");
        assert_eq!(DateIsoTranscoder.decode(&encoded), Some(before));

        assert_eq!(
            DateIsoTranscoder.decode("+010000-01-01T02:00:00.000+02:00"),
            Some(far)
        );
        assert_eq!(DateIsoTranscoder.decode("-000000-01-01T00:00:00.000Z"), None);
        assert_eq!(DateIsoTranscoder.decode("+010001-02-29T00:00:00.000Z"), None);
        assert_eq!(DateIsoTranscoder.decode("+10000-01-01T00:00:00.000Z"), None);

        let storage = crate::memory::InMemoryStorageService::new();
        let dates = storage.with_default_transcoder(DateIsoTranscoder);
        dates.set("far", &far);
        assert_eq!(dates.get("far"), Some(far));
        dates.set("before", &before);
        assert_eq!(dates.get("before"), Some(before));
    }

    #[test]
    fn test_date_epoch() {
        let d = date("2019-08-26T15:18:05.822Z");
        assert_eq!(DateEpochTranscoder.encode(&d), "1566832685822");
        assert_eq!(DateEpochTranscoder.decode("1566832685822"), Some(d));
        assert_eq!(DateEpochTranscoder.decode("-1000"), Some(date("1969-12-31T23:59:59Z")));
        assert_eq!(DateEpochTranscoder.decode("invalid"), None);
        assert_eq!(DateEpochTranscoder.decode(""), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("json".parse::<TranscoderKind>(), Ok(TranscoderKind::Json));
        assert_eq!("Date-ISO".parse::<TranscoderKind>(), Ok(TranscoderKind::DateIso));
        assert_eq!("date-epoch".parse::<TranscoderKind>(), Ok(TranscoderKind::DateEpoch));
        assert!("xml".parse::<TranscoderKind>().is_err());

        for kind in TranscoderKind::ALL {
            assert_eq!(kind.to_string().parse::<TranscoderKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_kind_normalize() {
        assert_eq!(
            TranscoderKind::Json.normalize("{ \"a\" : [1, 2] }"),
            Some("{\"a\":[1,2]}".to_string())
        );
        assert_eq!(TranscoderKind::Json.normalize("{oops"), None);
        assert_eq!(TranscoderKind::String.normalize("  as is "), Some("  as is ".to_string()));
        assert_eq!(TranscoderKind::Boolean.normalize("true"), Some("true".to_string()));
        assert_eq!(TranscoderKind::Boolean.normalize("yes"), None);
        assert_eq!(TranscoderKind::Number.normalize(" 1.50 "), Some("1.5".to_string()));
        assert_eq!(
            TranscoderKind::DateIso.normalize("2019-08-26T17:18:05.822+02:00"),
            Some("2019-08-26T15:18:05.822Z".to_string())
        );
        assert_eq!(
            TranscoderKind::DateEpoch.normalize("1566832685822"),
            Some("1566832685822".to_string())
        );
    }

    #[test]
    fn test_kind_render() {
        assert_eq!(TranscoderKind::Json.render("\"text\""), Some("\"text\"".to_string()));
        assert_eq!(TranscoderKind::Number.render("13.37"), Some("13.37".to_string()));
        assert_eq!(TranscoderKind::Number.render("abc"), None);
        assert_eq!(
            TranscoderKind::DateEpoch.render("1566832685822"),
            Some("2019-08-26T15:18:05.822Z".to_string())
        );
        assert_eq!(TranscoderKind::Boolean.render("\"true\""), None);
    }

    #[test]
    fn test_kind_deserialize() {
        #[derive(Deserialize)]
        struct Holder {
            kind: TranscoderKind,
        }

        let holder: Holder = serde_json::from_str("{\"kind\":\"date-epoch\"}").unwrap();
        assert_eq!(holder.kind, TranscoderKind::DateEpoch);
    }
}
