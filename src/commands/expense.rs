//! Expense commands.

use super::{
    Deleted, Output, Toggled, format_amount, format_local, json, open_store, resolve_id, short_id,
};
use crate::Result;
use crate::aggregate::{self, Breakdown};
use crate::models::{Expense, ExpenseCategory, ExpenseDraft, ExpensePatch, PaymentMethod};
use chrono::{Datelike, Local};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(transparent)]
pub struct ExpenseRecord {
    pub expense: Expense,
}

impl Output for ExpenseRecord {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let e = &self.expense;
        let mut out = format!(
            "{} {} {} ({}, {}) on {}{}",
            short_id(&e.id),
            e.title,
            format_amount(e.amount),
            e.category,
            e.payment_method,
            format_local(&e.expense_date),
            if e.is_paid { "" } else { " [unpaid]" }
        );
        if !e.notes.is_empty() {
            out.push_str(&format!("\n  Notes: {}", e.notes));
        }
        out
    }
}

#[derive(Serialize)]
pub struct ExpenseList {
    pub expenses: Vec<Expense>,
    pub count: usize,
    pub total: u64,
}

impl Output for ExpenseList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.expenses.is_empty() {
            return "No expenses.".to_string();
        }
        let mut lines = vec![format!(
            "{} expense(s), {} total:",
            self.count,
            format_amount(self.total)
        )];
        for e in &self.expenses {
            lines.push(format!(
                "  {} {} {:>10} {} [{}]{}",
                short_id(&e.id),
                e.expense_date.with_timezone(&Local).format("%Y-%m-%d"),
                format_amount(e.amount),
                e.title,
                e.category,
                if e.is_paid { "" } else { " (unpaid)" }
            ));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
pub struct ExpenseSummary {
    /// `YYYY-MM`, or absent when summarizing every expense
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    pub count: usize,
    pub total: u64,
    pub unpaid: u64,
    pub by_category: Vec<Breakdown<ExpenseCategory>>,
    pub by_payment_method: Vec<Breakdown<PaymentMethod>>,
}

impl Output for ExpenseSummary {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let scope = self.month.as_deref().unwrap_or("all time");
        let mut lines = vec![
            format!("Spending for {}: {}", scope, format_amount(self.total)),
            format!("  {} expense(s), {} unpaid", self.count, format_amount(self.unpaid)),
        ];
        if !self.by_category.is_empty() {
            lines.push("By category:".to_string());
            for group in &self.by_category {
                lines.push(format!(
                    "  {:<16} {:>12} {:>5.1}%",
                    group.key.as_str(),
                    format_amount(group.amount),
                    group.percentage
                ));
            }
            lines.push("By payment method:".to_string());
            for group in &self.by_payment_method {
                lines.push(format!(
                    "  {:<16} {:>12} {:>5.1}%",
                    group.key.as_str(),
                    format_amount(group.amount),
                    group.percentage
                ));
            }
        }
        lines.join("\n")
    }
}

pub fn expense_add(data_dir: &Path, draft: ExpenseDraft) -> Result<ExpenseRecord> {
    let mut store = open_store(data_dir)?;
    let expense = store.create::<Expense>(draft)?;
    Ok(ExpenseRecord { expense })
}

/// List expenses, newest first.
pub fn expense_list(
    data_dir: &Path,
    month: Option<(i32, u32)>,
    category: Option<ExpenseCategory>,
    unpaid_only: bool,
) -> Result<ExpenseList> {
    let store = open_store(data_dir)?;
    let filter = |e: &Expense| {
        category.is_none_or(|c| e.category == c)
            && (!unpaid_only || !e.is_paid)
            && month.is_none_or(|(year, month)| {
                let local = e.expense_date.with_timezone(&Local);
                local.year() == year && local.month() == month
            })
    };
    let newest_first = |a: &Expense, b: &Expense| b.expense_date.cmp(&a.expense_date);
    let expenses = store.query::<Expense>(Some(&filter), Some(&newest_first))?;
    Ok(ExpenseList {
        count: expenses.len(),
        total: aggregate::total(&expenses),
        expenses,
    })
}

pub fn expense_update(data_dir: &Path, id: &str, patch: ExpensePatch) -> Result<ExpenseRecord> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<Expense>(&store, id)?;
    Ok(ExpenseRecord {
        expense: store.update(id, patch)?,
    })
}

pub fn expense_paid(data_dir: &Path, id: &str) -> Result<Toggled> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<Expense>(&store, id)?;
    let value = store.relations().toggle_paid(id)?;
    Ok(Toggled {
        id,
        field: "is_paid",
        value,
    })
}

pub fn expense_delete(data_dir: &Path, id: &str) -> Result<Deleted> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<Expense>(&store, id)?;
    store.delete::<Expense>(id)?;
    Ok(Deleted {
        id,
        kind: "expense".to_string(),
        children_deleted: None,
    })
}

/// Totals and breakdowns for one local month, or for every expense when
/// `month` is `None`.
pub fn expense_summary(data_dir: &Path, month: Option<(i32, u32)>) -> Result<ExpenseSummary> {
    let store = open_store(data_dir)?;
    let expenses = store.list::<Expense>()?;

    let scoped: Vec<Expense> = match month {
        Some((year, m)) => aggregate::in_month(&expenses, year, m, &Local)
            .into_iter()
            .cloned()
            .collect(),
        None => expenses,
    };

    Ok(ExpenseSummary {
        month: month.map(|(year, m)| format!("{:04}-{:02}", year, m)),
        count: scoped.len(),
        total: aggregate::total(&scoped),
        unpaid: aggregate::unpaid_total(&scoped),
        by_category: aggregate::category_breakdown(&scoped),
        by_payment_method: aggregate::payment_method_breakdown(&scoped),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::commands::{init, parse_datetime};
    use crate::test_utils::TestEnv;

    fn add(env: &TestEnv, amount: i64, category: ExpenseCategory, date: &str, paid: bool) {
        expense_add(
            env.data_path(),
            ExpenseDraft {
                title: Some(format!("{} {}", category, amount)),
                amount: Some(amount),
                category: Some(category),
                expense_date: Some(parse_datetime(date).unwrap()),
                is_paid: Some(paid),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn test_summary_for_month() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        add(&env, 8800, ExpenseCategory::Ticket, "2024-05-03", true);
        add(&env, 3000, ExpenseCategory::Goods, "2024-05-20", false);
        add(&env, 1200, ExpenseCategory::Food, "2024-06-01", true);

        let summary = expense_summary(env.data_path(), Some((2024, 5))).unwrap();
        assert_eq!(summary.month.as_deref(), Some("2024-05"));
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total, 11800);
        assert_eq!(summary.unpaid, 3000);
        assert_eq!(summary.by_category[0].key, ExpenseCategory::Ticket);
        let share: f64 = summary.by_category.iter().map(|g| g.percentage).sum();
        assert!((share - 100.0).abs() < 1e-9);

        let all = expense_summary(env.data_path(), None).unwrap();
        assert_eq!(all.total, 13000);
    }

    #[test]
    fn test_summary_of_nothing() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        let summary = expense_summary(env.data_path(), Some((2024, 1))).unwrap();
        assert_eq!(summary.total, 0);
        assert!(summary.by_category.is_empty());
        assert!(summary.to_human().contains("¥0"));
    }

    #[test]
    fn test_list_newest_first_and_unpaid() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        add(&env, 100, ExpenseCategory::Food, "2024-05-01", true);
        add(&env, 200, ExpenseCategory::Food, "2024-05-02", false);

        let list = expense_list(env.data_path(), None, None, false).unwrap();
        assert_eq!(list.expenses[0].amount, 200);
        assert_eq!(list.total, 300);

        let unpaid = expense_list(env.data_path(), None, None, true).unwrap();
        assert_eq!(unpaid.count, 1);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        let result = expense_add(
            env.data_path(),
            ExpenseDraft {
                amount: Some(-1),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::InvalidFieldValue(_))));
        assert_eq!(expense_list(env.data_path(), None, None, false).unwrap().count, 0);
    }
}
