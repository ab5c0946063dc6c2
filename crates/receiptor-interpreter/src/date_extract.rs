//! Stage 3 — locating and canonicalizing the purchase date.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

const SCAN_LINES: usize = 30;

/// Biases resolution of the ambiguous `NN/NN/YYYY` date shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocaleHint {
    Us,
    Intl,
    #[default]
    None,
}

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_iso, r"\b(\d{4})-(\d{2})-(\d{2})\b");
re!(
    re_month_name,
    r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{1,2}),?\s+(\d{4})\b"
);
re!(
    re_month_abbr,
    r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\.?\s+(\d{4})\b"
);
re!(re_dot, r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b");
re!(re_dash, r"\b(\d{1,2})-(\d{1,2})-(\d{2,4})\b");
re!(re_slash, r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b");

/// Searches the first ~30 lines of the (denoised) transcript for a
/// date-shaped token and canonicalizes it to ISO form. Falls back to
/// `today`, without recording a correction, when nothing is found.
pub fn extract_date(transcript: &str, today: NaiveDate, locale_hint: LocaleHint) -> NaiveDate {
    let scan_text: String = transcript
        .lines()
        .take(SCAN_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    try_iso(&scan_text)
        .or_else(|| try_month_name(&scan_text))
        .or_else(|| try_month_abbr(&scan_text))
        .or_else(|| try_dot(&scan_text))
        .or_else(|| try_dash(&scan_text))
        .or_else(|| try_slash(&scan_text, locale_hint))
        .unwrap_or(today)
}

fn try_iso(text: &str) -> Option<NaiveDate> {
    let c = re_iso().captures(text)?;
    let y: i32 = c[1].parse().ok()?;
    let m: u32 = c[2].parse().ok()?;
    let d: u32 = c[3].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

fn try_month_name(text: &str) -> Option<NaiveDate> {
    let c = re_month_name().captures(text)?;
    let month = month_name_to_num(&c[1])?;
    let day: u32 = c[2].parse().ok()?;
    let year: i32 = c[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn try_month_abbr(text: &str) -> Option<NaiveDate> {
    let c = re_month_abbr().captures(text)?;
    let day: u32 = c[1].parse().ok()?;
    let month = abbr_month_to_num(&c[2])?;
    let year: i32 = c[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `DD.MM.YYYY` — the dotted form is always day-first.
fn try_dot(text: &str) -> Option<NaiveDate> {
    let c = re_dot().captures(text)?;
    let day: u32 = c[1].parse().ok()?;
    let month: u32 = c[2].parse().ok()?;
    let year: i32 = c[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `MM-DD-YYYY` — the dashed form is always month-first.
fn try_dash(text: &str) -> Option<NaiveDate> {
    let c = re_dash().captures(text)?;
    let month: u32 = c[1].parse().ok()?;
    let day: u32 = c[2].parse().ok()?;
    let year = expand_year(c[3].parse().ok()?);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `NN/NN/YYYY` — ambiguous between `MM/DD/YYYY` and `DD/MM/YYYY`. A locale
/// hint wins if given; otherwise `MM/DD` is tried first and `DD/MM` only if
/// `MM/DD` would be an impossible date.
fn try_slash(text: &str, locale_hint: LocaleHint) -> Option<NaiveDate> {
    let c = re_slash().captures(text)?;
    let p1: u32 = c[1].parse().ok()?;
    let p2: u32 = c[2].parse().ok()?;
    let year = expand_year(c[3].parse().ok()?);

    match locale_hint {
        LocaleHint::Us => NaiveDate::from_ymd_opt(year, p1, p2),
        LocaleHint::Intl => NaiveDate::from_ymd_opt(year, p2, p1),
        LocaleHint::None => {
            NaiveDate::from_ymd_opt(year, p1, p2).or_else(|| NaiveDate::from_ymd_opt(year, p2, p1))
        }
    }
}

fn expand_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

fn month_name_to_num(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "january" => Some(1),
        "february" => Some(2),
        "march" => Some(3),
        "april" => Some(4),
        "may" => Some(5),
        "june" => Some(6),
        "july" => Some(7),
        "august" => Some(8),
        "september" => Some(9),
        "october" => Some(10),
        "november" => Some(11),
        "december" => Some(12),
        _ => None,
    }
}

fn abbr_month_to_num(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 28).unwrap()
    }

    #[test]
    fn extracts_iso_date() {
        let d = extract_date("AMAZON\nOrder 2024-03-15\nTotal $49.99", today(), LocaleHint::None);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn extracts_full_month_name() {
        let d = extract_date("WHOLE FOODS\nMarch 15, 2024\nTotal $87.50", today(), LocaleHint::None);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn extracts_abbreviated_month() {
        let d = extract_date("WALMART\n15 Jan 2024\nTotal $120.00", today(), LocaleHint::None);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn extracts_dot_form_as_day_month_year() {
        let d = extract_date("STORE\n15.03.2024\nTotal $5.00", today(), LocaleHint::None);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn extracts_dash_form_as_month_day_year() {
        let d = extract_date("STORE\n03-15-2024\nTotal $5.00", today(), LocaleHint::None);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn slash_prefers_mm_dd_with_no_locale_hint() {
        let d = extract_date("STORE\n01/15/2024\nTotal $5.00", today(), LocaleHint::None);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn slash_falls_back_to_dd_mm_when_mm_dd_impossible() {
        // Month 13 is impossible as MM/DD, so this must be DD/MM: Dec 25.
        let d = extract_date("STORE\n25/12/2024\nTotal $5.00", today(), LocaleHint::None);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
    }

    #[test]
    fn slash_respects_intl_locale_hint() {
        let d = extract_date("STORE\n02/03/2024\nTotal $5.00", today(), LocaleHint::Intl);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }

    #[test]
    fn slash_respects_us_locale_hint() {
        let d = extract_date("STORE\n02/03/2024\nTotal $5.00", today(), LocaleHint::Us);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
    }

    #[test]
    fn falls_back_to_today_when_no_date_found() {
        let d = extract_date("STORE\nno date here\nTotal $5.00", today(), LocaleHint::None);
        assert_eq!(d, today());
    }

    #[test]
    fn ignores_dates_beyond_scan_window() {
        let mut lines = vec!["header".to_string(); 35];
        lines.push("2024-03-15".to_string());
        let transcript = lines.join("\n");
        let d = extract_date(&transcript, today(), LocaleHint::None);
        assert_eq!(d, today());
    }
}
