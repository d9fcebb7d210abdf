//! `STARTSETUP` record parsing.
//!
//! The setup reply is a `%`-delimited record of at least 16 fields. Only five
//! are used:
//!
//! | Index | Field |
//! |---|---|
//! | 2 | firmware version |
//! | 3 | temperature (°C) |
//! | 5 | current position |
//! | 6 | maximum position |
//! | 7 | minimum position |

use serde::Serialize;

use super::text::{split_sv, to_double, FIELD_DELIMITER};
use super::transport::{StarpointError, StarpointResult};

/// Minimum number of fields in a well-formed setup record.
pub const SETUP_MIN_FIELDS: usize = 16;

const FIRMWARE_FIELD: usize = 2;
const TEMPERATURE_FIELD: usize = 3;
const POSITION_FIELD: usize = 5;
const MAX_POSITION_FIELD: usize = 6;
const MIN_POSITION_FIELD: usize = 7;

/// Initial focuser state reported by `STARTSETUP`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupRecord {
    pub firmware_version: String,
    pub temperature: f64,
    pub position: u32,
    pub max_position: u32,
    pub min_position: u32,
}

impl SetupRecord {
    /// Parse a trimmed setup reply.
    ///
    /// Fails if the record is short or any numeric field does not parse; no
    /// partially filled record is ever returned.
    pub fn parse(reply: &str) -> StarpointResult<Self> {
        let fields = split_sv(reply, FIELD_DELIMITER);
        if fields.len() < SETUP_MIN_FIELDS {
            return Err(StarpointError::ProtocolError(format!(
                "Setup record has {} fields, expected at least {SETUP_MIN_FIELDS}",
                fields.len()
            )));
        }

        let temperature = number(fields[TEMPERATURE_FIELD], "temperature")?;
        let position = ticks(fields[POSITION_FIELD], "position")?;
        let max_position = ticks(fields[MAX_POSITION_FIELD], "maximum position")?;
        let min_position = ticks(fields[MIN_POSITION_FIELD], "minimum position")?;

        Ok(Self {
            firmware_version: fields[FIRMWARE_FIELD].to_string(),
            temperature,
            position,
            max_position,
            min_position,
        })
    }
}

fn number(field: &str, name: &str) -> StarpointResult<f64> {
    to_double(field).ok_or_else(|| {
        StarpointError::ParseError(format!("Unable to parse {name} value {field:?}"))
    })
}

/// Positions are sent as decimal numbers but must fit a tick counter.
fn ticks(field: &str, name: &str) -> StarpointResult<u32> {
    let value = number(field, name)?;
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(StarpointError::ParseError(format!(
            "{name} value {value} is outside the tick range"
        )));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(fields: &[&str]) -> String {
        fields.join("%")
    }

    fn valid_fields() -> Vec<&'static str> {
        vec![
            "SP", "1", "2.1.0", "21.5", "0", "1234", "60000", "100", "a", "b", "c", "d", "e",
            "f", "g", "h",
        ]
    }

    #[test]
    fn test_parse_valid_record() {
        let setup = SetupRecord::parse(&record(&valid_fields())).unwrap();
        assert_eq!(setup.firmware_version, "2.1.0");
        assert_relative_eq!(setup.temperature, 21.5);
        assert_eq!(setup.position, 1234);
        assert_eq!(setup.max_position, 60000);
        assert_eq!(setup.min_position, 100);
    }

    #[test]
    fn test_parse_accepts_extra_and_empty_fields() {
        let mut fields = valid_fields();
        fields[0] = "";
        fields.extend(["", "extra"]);
        assert!(SetupRecord::parse(&record(&fields)).is_ok());

        // 15 fields plus a trailing delimiter is 16 fields
        let mut short = record(&valid_fields()[..15]);
        short.push('%');
        assert!(SetupRecord::parse(&short).is_ok());
    }

    #[test]
    fn test_parse_rejects_short_record() {
        let short = record(&valid_fields()[..15]);
        assert!(matches!(
            SetupRecord::parse(&short),
            Err(StarpointError::ProtocolError(_))
        ));
        assert!(matches!(
            SetupRecord::parse(""),
            Err(StarpointError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_numeric_fields() {
        for index in [TEMPERATURE_FIELD, POSITION_FIELD, MAX_POSITION_FIELD, MIN_POSITION_FIELD] {
            let mut fields = valid_fields();
            fields[index] = "12x";
            let result = SetupRecord::parse(&record(&fields));
            assert!(
                matches!(result, Err(StarpointError::ParseError(_))),
                "field {index} accepted garbage"
            );
        }
    }

    #[test]
    fn test_parse_firmware_is_not_numeric() {
        let mut fields = valid_fields();
        fields[FIRMWARE_FIELD] = "v2-beta";
        let setup = SetupRecord::parse(&record(&fields)).unwrap();
        assert_eq!(setup.firmware_version, "v2-beta");
    }

    #[test]
    fn test_parse_position_range() {
        let mut fields = valid_fields();
        fields[POSITION_FIELD] = "-5";
        assert!(SetupRecord::parse(&record(&fields)).is_err());

        fields[POSITION_FIELD] = "1e12";
        assert!(SetupRecord::parse(&record(&fields)).is_err());

        fields[POSITION_FIELD] = "1234.9";
        assert_eq!(SetupRecord::parse(&record(&fields)).unwrap().position, 1234);
    }

    #[test]
    fn test_parse_negative_temperature() {
        let mut fields = valid_fields();
        fields[TEMPERATURE_FIELD] = " -4.25 ";
        let setup = SetupRecord::parse(&record(&fields)).unwrap();
        assert_relative_eq!(setup.temperature, -4.25);
    }
}
