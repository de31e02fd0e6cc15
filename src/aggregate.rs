//! Read-only rollups over expense and schedule snapshots.
//!
//! Every function here takes a slice previously read from the store and never
//! touches the store itself, so any of them can be re-run at any time. Calendar
//! questions ("which month", "which day", "today") are answered in the
//! caller's time zone.

use crate::models::{Expense, ExpenseCategory, PaymentMethod, Schedule};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;

/// One group of a breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown<K> {
    pub key: K,
    /// Sum of amounts in this group, minor units
    pub amount: u64,
    /// Share of the set's total, 0-100
    pub percentage: f64,
}

/// Sum of all amounts.
pub fn total(expenses: &[Expense]) -> u64 {
    expenses.iter().map(|e| e.amount).sum()
}

/// Sum of amounts not yet paid.
pub fn unpaid_total(expenses: &[Expense]) -> u64 {
    expenses.iter().filter(|e| !e.is_paid).map(|e| e.amount).sum()
}

/// Expenses dated within a calendar month in `tz`.
pub fn in_month<'a, Tz: TimeZone>(
    expenses: &'a [Expense],
    year: i32,
    month: u32,
    tz: &Tz,
) -> Vec<&'a Expense> {
    expenses
        .iter()
        .filter(|e| {
            let local = e.expense_date.with_timezone(tz);
            local.year() == year && local.month() == month
        })
        .collect()
}

/// Total spent within a calendar month in `tz`.
pub fn monthly_total<Tz: TimeZone>(expenses: &[Expense], year: i32, month: u32, tz: &Tz) -> u64 {
    in_month(expenses, year, month, tz)
        .into_iter()
        .map(|e| e.amount)
        .sum()
}

/// Amount and share per category, largest first.
pub fn category_breakdown<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> Vec<Breakdown<ExpenseCategory>> {
    breakdown(expenses, |e| e.category)
}

/// Amount and share per payment method, largest first.
pub fn payment_method_breakdown<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> Vec<Breakdown<PaymentMethod>> {
    breakdown(expenses, |e| e.payment_method)
}

fn breakdown<'a, K: Ord + Copy>(
    expenses: impl IntoIterator<Item = &'a Expense>,
    key: impl Fn(&Expense) -> K,
) -> Vec<Breakdown<K>> {
    let mut sums: BTreeMap<K, u64> = BTreeMap::new();
    for expense in expenses {
        *sums.entry(key(expense)).or_insert(0) += expense.amount;
    }

    let total: u64 = sums.values().sum();
    let mut groups: Vec<Breakdown<K>> = sums
        .into_iter()
        .map(|(key, amount)| Breakdown {
            key,
            amount,
            percentage: if total == 0 {
                0.0
            } else {
                amount as f64 / total as f64 * 100.0
            },
        })
        .collect();
    // Stable: equal amounts keep key order
    groups.sort_by(|a, b| b.amount.cmp(&a.amount));
    groups
}

/// Schedules whose event falls on `date` in `tz`.
pub fn schedules_on<'a, Tz: TimeZone>(
    schedules: &'a [Schedule],
    date: NaiveDate,
    tz: &Tz,
) -> Vec<&'a Schedule> {
    schedules
        .iter()
        .filter(|s| s.event_date.with_timezone(tz).date_naive() == date)
        .collect()
}

/// Number of schedules on `date` in `tz`.
pub fn events_on<Tz: TimeZone>(schedules: &[Schedule], date: NaiveDate, tz: &Tz) -> usize {
    schedules_on(schedules, date, tz).len()
}

/// Day-of-month to schedule count for one month. Days without events are absent.
pub fn month_occupancy<Tz: TimeZone>(
    schedules: &[Schedule],
    year: i32,
    month: u32,
    tz: &Tz,
) -> BTreeMap<u32, usize> {
    let mut days = BTreeMap::new();
    for schedule in schedules {
        let local = schedule.event_date.with_timezone(tz);
        if local.year() == year && local.month() == month {
            *days.entry(local.day()).or_insert(0) += 1;
        }
    }
    days
}

/// Open schedules from the start of today onwards, soonest first.
pub fn upcoming<'a, Tz: TimeZone>(schedules: &'a [Schedule], now: &DateTime<Tz>) -> Vec<&'a Schedule> {
    let start_of_day = start_of_day(now);
    let mut upcoming: Vec<&Schedule> = schedules
        .iter()
        .filter(|s| !s.is_completed && s.event_date >= start_of_day)
        .collect();
    upcoming.sort_by_key(|s| s.event_date);
    upcoming
}

/// Local midnight of `now`'s date.
fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(chrono::NaiveTime::MIN);
    // Midnight can be skipped by a DST jump; the UTC reading is close enough
    tz.from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}
