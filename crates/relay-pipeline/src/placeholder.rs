//! Date/time placeholder expansion for output path templates.
//!
//! A template such as `reports/sales-{yyyyMMdd}.csv` contains brace-delimited
//! tokens whose content is a custom date/time format. Supported specifiers:
//!
//! | Specifier | Output |
//! |---|---|
//! | `yyyy`, `yy`, `y` | year (4 digits, 2 digits, unpadded 2-digit) |
//! | `MMMM`, `MMM`, `MM`, `M` | month name, abbreviation, 2 digits, unpadded |
//! | `dddd`, `ddd`, `dd`, `d` | weekday name, abbreviation, day 2 digits, unpadded |
//! | `HH`, `H`, `hh`, `h` | 24-hour and 12-hour clock |
//! | `mm`, `m`, `ss`, `s` | minutes, seconds |
//! | `f`.., `F`.. | fractional seconds (`F` drops trailing zeros) |
//! | `tt`, `t` | `AM`/`PM`, `A`/`P` |
//!
//! Text in single or double quotes and characters after `\` are copied
//! verbatim; every other character is literal.

use chrono::{Datelike, Local, Timelike};

use crate::error::PlaceholderError;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Expands `{...}` date/time placeholders in path templates.
pub struct PlaceholderExpander;

impl PlaceholderExpander {
    /// Expand `template` against the current local time.
    pub fn expand(template: &str) -> Result<String, PlaceholderError> {
        Self::expand_at(template, &Local::now())
    }

    /// Expand `template` against `at`.
    ///
    /// A template without braces is returned unchanged. Literal text between
    /// and after placeholders is preserved.
    pub fn expand_at<T>(template: &str, at: &T) -> Result<String, PlaceholderError>
    where
        T: Datelike + Timelike,
    {
        let opens: Vec<usize> = template.match_indices('{').map(|(i, _)| i).collect();
        let closes: Vec<usize> = template.match_indices('}').map(|(i, _)| i).collect();

        if opens.is_empty() && closes.is_empty() {
            return Ok(template.to_string());
        }
        if opens.len() != closes.len() {
            return Err(PlaceholderError::Unbalanced {
                open: opens.len(),
                close: closes.len(),
            });
        }

        let mut out = String::with_capacity(template.len() + 16);
        let mut cursor = 0;
        for (&open, &close) in opens.iter().zip(&closes) {
            if close < open {
                return Err(PlaceholderError::Misordered {
                    open_at: open,
                    close_at: close,
                });
            }
            // Nested or interleaved braces pair an opening brace with the
            // closing brace of the previous token.
            if open < cursor {
                return Err(PlaceholderError::Misordered {
                    open_at: open,
                    close_at: cursor - 1,
                });
            }
            out.push_str(&template[cursor..open]);
            format_datetime(&template[open + 1..close], at, &mut out);
            cursor = close + 1;
        }
        out.push_str(&template[cursor..]);

        Ok(out)
    }
}

/// Render `at` using a custom format string.
fn format_datetime<T>(format: &str, at: &T, out: &mut String)
where
    T: Datelike + Timelike,
{
    let chars: Vec<char> = format.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();

        match c {
            'y' => {
                let year = at.year();
                match run {
                    1 => out.push_str(&(year % 100).to_string()),
                    2 => out.push_str(&format!("{:02}", year % 100)),
                    n => out.push_str(&format!("{:0width$}", year, width = n)),
                }
            }
            'M' => {
                let month = at.month();
                match run {
                    1 => out.push_str(&month.to_string()),
                    2 => out.push_str(&format!("{:02}", month)),
                    3 => out.push_str(&MONTHS[month0(at)][..3]),
                    _ => out.push_str(MONTHS[month0(at)]),
                }
            }
            'd' => match run {
                1 => out.push_str(&at.day().to_string()),
                2 => out.push_str(&format!("{:02}", at.day())),
                3 => out.push_str(&weekday_name(at)[..3]),
                _ => out.push_str(weekday_name(at)),
            },
            'H' => push_number(out, at.hour(), run),
            'h' => push_number(out, at.hour12().1, run),
            'm' => push_number(out, at.minute(), run),
            's' => push_number(out, at.second(), run),
            'f' => out.push_str(&fraction(at, run)),
            'F' => {
                let digits = fraction(at, run);
                let trimmed = digits.trim_end_matches('0');
                if trimmed.is_empty() {
                    if out.ends_with('.') {
                        out.pop();
                    }
                } else {
                    out.push_str(trimmed);
                }
            }
            't' => {
                let marker = if at.hour12().0 { "PM" } else { "AM" };
                out.push_str(if run == 1 { &marker[..1] } else { marker });
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&x| x == c)
                    .map_or(chars.len(), |p| i + 1 + p);
                out.extend(&chars[i + 1..end]);
                i = (end + 1).min(chars.len());
                continue;
            }
            '\\' => {
                match chars.get(i + 1) {
                    Some(&next) => out.push(next),
                    None => out.push('\\'),
                }
                i += 2;
                continue;
            }
            // Single-specifier prefix, e.g. `%d`.
            '%' => {
                i += 1;
                continue;
            }
            other => {
                out.push(other);
                i += 1;
                continue;
            }
        }

        i += run;
    }
}

fn push_number(out: &mut String, value: u32, run: usize) {
    if run == 1 {
        out.push_str(&value.to_string());
    } else {
        out.push_str(&format!("{:02}", value));
    }
}

fn month0<T: Datelike>(at: &T) -> usize {
    at.month0() as usize
}

fn weekday_name<T: Datelike>(at: &T) -> &'static str {
    WEEKDAYS[at.weekday().num_days_from_monday() as usize]
}

/// The first `run` digits of the fractional second, at most nine.
fn fraction<T: Timelike>(at: &T, run: usize) -> String {
    let nanos = at.nanosecond() % 1_000_000_000;
    let digits = format!("{:09}", nanos);
    digits[..run.min(9)].to_string()
}

#[cfg(test)]
#[path = "placeholder_tests.rs"]
mod tests;
