//! Text helpers for Starpoint replies.
//!
//! Replies are short ASCII frames such as `1234#` or the `%`-delimited
//! `STARTSETUP` record. Everything here is pure: no I/O, and apart from
//! [`split_sv`] returning its field list, no allocation. Views returned by
//! [`trim_sv`] and [`split_sv`] borrow from the input.
//!
//! Numeric parsing is strict. The whole trimmed field must be a number, so a
//! reply like `"12x"` is rejected instead of being read as `12`.

use super::command::TERMINATOR;

/// Default delimiter between fields of the setup record.
pub const FIELD_DELIMITER: char = '%';

/// Whitespace as classified by C `isspace` in the "C" locale.
///
/// Unlike [`u8::is_ascii_whitespace`] this includes vertical tab (0x0B).
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Trim surrounding whitespace in place, then drop one trailing terminator.
///
/// ```
/// use focuser::starpoint::text::trim;
///
/// let mut reply = String::from("  MOVEA100#  ");
/// trim(&mut reply);
/// assert_eq!(reply, "MOVEA100");
/// ```
pub fn trim(s: &mut String) {
    let start = s.len() - s.trim_start_matches(is_space).len();
    s.drain(..start);
    let end = s.trim_end_matches(is_space).len();
    s.truncate(end);
    if s.ends_with(TERMINATOR) {
        s.pop();
    }
}

/// Trim surrounding whitespace without copying. The terminator is kept.
pub fn trim_sv(sv: &str) -> &str {
    sv.trim_matches(is_space)
}

/// Split `s` on `delim` into borrowed fields.
///
/// Empty fields are preserved, including one after a trailing delimiter, and
/// an empty input yields a single empty field.
pub fn split_sv(s: &str, delim: char) -> Vec<&str> {
    s.split(delim).collect()
}

/// Parse a whole trimmed field as a floating point number.
///
/// An explicit `+` sign is rejected along with any trailing characters.
pub fn to_double(sv: &str) -> Option<f64> {
    let sv = trim_sv(sv);
    if sv.is_empty() || sv.starts_with('+') {
        return None;
    }
    sv.parse().ok()
}

/// Parse a whole trimmed field as an unsigned integer in `radix`.
///
/// Signs are rejected, as is any radix outside `2..=36`.
pub fn to_u32(sv: &str, radix: u32) -> Option<u32> {
    let sv = trim_sv(sv);
    if !(2..=36).contains(&radix) || sv.is_empty() || sv.starts_with(['+', '-']) {
        return None;
    }
    u32::from_str_radix(sv, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_trim_strips_whitespace_and_one_terminator() {
        let mut s = String::from("  MOVEA100#  ");
        trim(&mut s);
        assert_eq!(s, "MOVEA100");

        let mut s = String::from("1234##");
        trim(&mut s);
        assert_eq!(s, "1234#");

        let mut s = String::from("\x0B\tFOUND1982#\r\n");
        trim(&mut s);
        assert_eq!(s, "FOUND1982");
    }

    #[test]
    fn test_trim_terminator_only_after_whitespace() {
        // Whitespace in front of the terminator survives: only one pass of each.
        let mut s = String::from("abc #");
        trim(&mut s);
        assert_eq!(s, "abc ");

        let mut s = String::from("   ");
        trim(&mut s);
        assert_eq!(s, "");

        let mut s = String::from("#");
        trim(&mut s);
        assert_eq!(s, "");
    }

    #[test]
    fn test_trim_sv_keeps_terminator() {
        let raw = " \t21.5# \n";
        let view = trim_sv(raw);
        assert_eq!(view, "21.5#");
        // Borrowed from the original buffer
        assert_eq!(view.as_ptr(), raw[2..].as_ptr());
    }

    #[test]
    fn test_split_sv() {
        assert_eq!(split_sv("a%b%c", '%'), vec!["a", "b", "c"]);
        assert_eq!(split_sv("a%%b", '%'), vec!["a", "", "b"]);
        assert_eq!(split_sv("", '%'), vec![""]);
        assert_eq!(split_sv("a%b%", FIELD_DELIMITER), vec!["a", "b", ""]);
        assert_eq!(split_sv("a,b", FIELD_DELIMITER), vec!["a,b"]);
    }

    #[test]
    fn test_to_double() {
        assert_relative_eq!(to_double("  3.5 ").unwrap(), 3.5);
        assert_relative_eq!(to_double("-12.25").unwrap(), -12.25);
        assert_relative_eq!(to_double("1e3").unwrap(), 1000.0);
        assert_relative_eq!(to_double("40000").unwrap(), 40000.0);
        assert_eq!(to_double("3.5x"), None);
        assert_eq!(to_double(""), None);
        assert_eq!(to_double("   "), None);
        assert_eq!(to_double("+3.5"), None);
        assert_eq!(to_double("3.5#"), None);
    }

    #[test]
    fn test_to_u32() {
        assert_eq!(to_u32("042", 10), Some(42));
        assert_eq!(to_u32(" 1234\r\n", 10), Some(1234));
        assert_eq!(to_u32("ff", 16), Some(255));
        assert_eq!(to_u32("4294967295", 10), Some(u32::MAX));
        assert_eq!(to_u32("4294967296", 10), None);
        assert_eq!(to_u32("-1", 10), None);
        assert_eq!(to_u32("+1", 10), None);
        assert_eq!(to_u32("12x", 10), None);
        assert_eq!(to_u32("1.5", 10), None);
        assert_eq!(to_u32("", 10), None);
        assert_eq!(to_u32("12", 1), None);
        assert_eq!(to_u32("12", 37), None);
    }
}
