use chrono::NaiveDate;
use kolscope_core::DATE_UNKNOWN;
use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}) (\w{3,})$").expect("valid regex"));

/// Full-date layouts, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y %b %d",
    "%b %d, %Y",
    "%Y %B %d",
    "%Y-%b-%d",
];

/// Year-month layouts: the day is pinned to the first of the month.
const MONTH_FORMATS: &[(&str, &str, &str)] = &[("%Y %b %d", " ", "01"), ("%Y-%m-%d", "-", "01")];

/// Normalize a free-form publication date to `YYYY-MM-DD`.
///
/// Unparseable input of the form `"<year> <word>"` falls back to January 1st
/// of that year; anything else yields `"N/A"`.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return DATE_UNKNOWN.to_string();
    }

    if let Some(date) = parse_known_layout(raw) {
        return date.format("%Y-%m-%d").to_string();
    }

    if let Some(caps) = YEAR_WORD_RE.captures(raw) {
        let year = &caps[1];
        let month = &caps[2];
        return match NaiveDate::parse_from_str(&format!("{year} {month} 01"), "%Y %b %d") {
            Ok(date) => date.format("%Y-%m-%d").to_string(),
            Err(_) => format!("{year}-01-01"),
        };
    }

    DATE_UNKNOWN.to_string()
}

fn parse_known_layout(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            MONTH_FORMATS.iter().find_map(|(fmt, sep, day)| {
                NaiveDate::parse_from_str(&format!("{raw}{sep}{day}"), fmt).ok()
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_dates() {
        assert_eq!(normalize_date("2021-05-03"), "2021-05-03");
        assert_eq!(normalize_date("2021/05/03"), "2021-05-03");
        assert_eq!(normalize_date("2021 May 03"), "2021-05-03");
        assert_eq!(normalize_date("May 03, 2021"), "2021-05-03");
        assert_eq!(normalize_date("2021-May-03"), "2021-05-03");
    }

    #[test]
    fn year_and_month_pin_the_first() {
        assert_eq!(normalize_date("2021 May"), "2021-05-01");
        assert_eq!(normalize_date("2021-05"), "2021-05-01");
    }

    #[test]
    fn year_with_unknown_word_falls_back_to_january() {
        assert_eq!(normalize_date("2021 Spring"), "2021-01-01");
        assert_eq!(normalize_date("2019 Winter"), "2019-01-01");
    }

    #[test]
    fn unparseable_is_not_available() {
        assert_eq!(normalize_date("garbage"), "N/A");
        assert_eq!(normalize_date(""), "N/A");
        assert_eq!(normalize_date("2020 Nov-Dec"), "N/A");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(normalize_date("  2021 May 03 \n"), "2021-05-03");
    }
}
