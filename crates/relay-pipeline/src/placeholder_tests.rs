use super::*;
use chrono::{NaiveDate, NaiveDateTime};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_milli_opt(h, mi, s, ms)
        .unwrap()
}

fn expand(template: &str) -> Result<String, PlaceholderError> {
    PlaceholderExpander::expand_at(template, &at(2024, 3, 5, 14, 7, 9, 120))
}

#[test]
fn test_no_placeholders_returns_input() {
    assert_eq!(expand("/srv/reports/daily.csv").unwrap(), "/srv/reports/daily.csv");
    assert_eq!(expand("").unwrap(), "");
}

#[test]
fn test_trailing_text_is_preserved() {
    assert_eq!(expand("report-{yyyyMMdd}.csv").unwrap(), "report-20240305.csv");
}

#[test]
fn test_multiple_placeholders() {
    assert_eq!(
        expand("/out/{yyyy}/{MM}/sales-{dd}-{HHmmss}.tsv").unwrap(),
        "/out/2024/03/sales-05-140709.tsv"
    );
}

#[test]
fn test_expansion_is_pure() {
    let instant = at(2023, 12, 31, 23, 59, 59, 999);
    let a = PlaceholderExpander::expand_at("r-{yyyy-MM-dd HH.mm}", &instant).unwrap();
    let b = PlaceholderExpander::expand_at("r-{yyyy-MM-dd HH.mm}", &instant).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, "r-2023-12-31 23.59");
}

#[test]
fn test_unbalanced_braces() {
    assert_eq!(
        expand("report-{yyyy.csv"),
        Err(PlaceholderError::Unbalanced { open: 1, close: 0 })
    );
    assert_eq!(
        expand("report-yyyy}.csv"),
        Err(PlaceholderError::Unbalanced { open: 0, close: 1 })
    );
}

#[test]
fn test_closing_before_opening() {
    assert_eq!(
        expand("}yyyy{"),
        Err(PlaceholderError::Misordered {
            open_at: 5,
            close_at: 0
        })
    );
}

#[test]
fn test_nested_braces_rejected() {
    assert!(matches!(
        expand("{yy{MM}dd}"),
        Err(PlaceholderError::Misordered { .. })
    ));
}

#[test]
fn test_short_specifiers() {
    assert_eq!(expand("{y}-{M}-{d}-{H}-{m}-{s}").unwrap(), "24-3-5-14-7-9");
}

#[test]
fn test_month_and_weekday_names() {
    // 2024-03-05 is a Tuesday.
    assert_eq!(expand("{MMMM MMM dddd ddd}").unwrap(), "March Mar Tuesday Tue");
}

#[test]
fn test_twelve_hour_clock() {
    assert_eq!(expand("{hh:mm tt}").unwrap(), "02:07 PM");
    assert_eq!(expand("{h t}").unwrap(), "2 P");

    let midnight = at(2024, 3, 5, 0, 30, 0, 0);
    assert_eq!(
        PlaceholderExpander::expand_at("{hh tt}", &midnight).unwrap(),
        "12 AM"
    );
}

#[test]
fn test_fractional_seconds() {
    assert_eq!(expand("{ss.fff}").unwrap(), "09.120");
    assert_eq!(expand("{ss.FFF}").unwrap(), "09.12");

    let whole = at(2024, 3, 5, 0, 0, 9, 0);
    assert_eq!(
        PlaceholderExpander::expand_at("{ss.FFF}", &whole).unwrap(),
        "09"
    );
}

#[test]
fn test_quoted_and_escaped_literals() {
    assert_eq!(expand("{yyyy'y'MM}").unwrap(), "2024y03");
    assert_eq!(expand("{\"day\"dd}").unwrap(), "day05");
    assert_eq!(expand("{\\d\\ddd}").unwrap(), "dd05");
}

#[test]
fn test_other_characters_are_literal() {
    assert_eq!(expand("{yyyy_MM-dd Q}").unwrap(), "2024_03-05 Q");
}

#[test]
fn test_percent_prefix() {
    assert_eq!(expand("{%d}").unwrap(), "5");
}

#[test]
fn test_expand_uses_current_time() {
    let before = Local::now().year();
    let expanded: i32 = PlaceholderExpander::expand("{yyyy}").unwrap().parse().unwrap();
    assert!(expanded == before || expanded == before + 1);
}
