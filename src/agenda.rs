//! Calendar projection of repeating tasks.
//!
//! Repetition is display-only: a `weekly` task shows up on every seventh
//! day of the month grid, but no extra task records ever exist.

use crate::types::{RepeatFrequency, Task};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Dates of `year`/`month` on which `task` occurs.
pub fn occurrences(task: &Task, year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let anchor = task.due_date.date_naive();

    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .filter(|day| occurs_on(task.repeat_frequency, anchor, *day))
        .collect()
}

fn occurs_on(frequency: RepeatFrequency, anchor: NaiveDate, day: NaiveDate) -> bool {
    if day < anchor {
        return false;
    }
    match frequency {
        RepeatFrequency::None => day == anchor,
        RepeatFrequency::Daily => true,
        RepeatFrequency::Weekly => (day - anchor).num_days() % 7 == 0,
        RepeatFrequency::Monthly => day.day() == anchor.day(),
    }
}

/// Map each date of the month to the tasks occurring on it. Dates with
/// nothing scheduled are absent.
pub fn month<'a>(tasks: &'a [Task], year: i32, month: u32) -> BTreeMap<NaiveDate, Vec<&'a Task>> {
    let mut days: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        for day in occurrences(task, year, month) {
            days.entry(day).or_default().push(task);
        }
    }
    days
}
