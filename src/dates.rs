use chrono::{Datelike, Duration, NaiveDate};

/// Storage format for dates exchanged with the backend.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Monday and Friday of the week containing `date`.
///
/// Saturday and Sunday belong to the week that started on the preceding
/// Monday.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(4))
}

/// The five weekdays (Mon-Fri) of the week containing `date`.
pub fn school_week(date: NaiveDate) -> [NaiveDate; 5] {
    let (monday, _) = week_bounds(date);
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// First and last day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(first);
    (first, last)
}

/// Monday-first grid for a month; leading cells before the 1st are `None`
/// and the grid is padded to whole weeks.
pub fn month_grid(year: i32, month: u32) -> Option<Vec<Option<NaiveDate>>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (_, last) = month_bounds(first);

    let lead = first.weekday().num_days_from_monday() as usize;
    let mut cells: Vec<Option<NaiveDate>> = vec![None; lead];
    cells.extend(first.iter_days().take_while(|d| *d <= last).map(Some));
    while cells.len() % 7 != 0 {
        cells.push(None);
    }
    Some(cells)
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM` month argument.
pub fn parse_month(s: &str) -> Option<(i32, u32)> {
    let (year, month) = s.trim().split_once('-')?;
    let year = year.parse().ok()?;
    let month = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}

pub fn is_weekday(date: NaiveDate) -> bool {
    date.weekday().number_from_monday() <= 5
}
