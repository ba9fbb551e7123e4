//! Listing helpers: facet counts, salary ordering, pagination windows.
//!
//! All pure and single-pass; the handlers feed them rows already loaded from
//! the store.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::job::JobRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyCount {
    pub value: String,
    pub count: u32,
}

/// Counts how often each value occurs, in first-seen order. `values` returns
/// every value an item carries, so array-valued properties count each element.
pub fn count_property_values<'a, T, F, I>(items: &'a [T], values: F) -> Vec<FrequencyCount>
where
    F: Fn(&'a T) -> I,
    I: IntoIterator<Item = &'a str>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<FrequencyCount> = Vec::new();

    for item in items {
        for value in values(item) {
            match index.get(value) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(value, counts.len());
                    counts.push(FrequencyCount {
                        value: value.to_string(),
                        count: 1,
                    });
                }
            }
        }
    }
    counts
}

/// Facets shown beside the job list.
#[derive(Debug, Clone, Serialize)]
pub struct JobFacets {
    pub type_frequency: Vec<FrequencyCount>,
    pub category_frequency: Vec<FrequencyCount>,
    pub level_frequency: Vec<FrequencyCount>,
    pub salary_frequency: Vec<FrequencyCount>,
}

pub fn job_facets(jobs: &[JobRow]) -> JobFacets {
    JobFacets {
        type_frequency: count_property_values(jobs, |j| [j.job_type.as_str()]),
        category_frequency: count_property_values(jobs, |j| [j.category.as_str()]),
        level_frequency: count_property_values(jobs, |j| [j.level.as_str()]),
        salary_frequency: count_property_values(jobs, |j| [j.salary.as_str()]),
    }
}

fn salary_pattern() -> &'static Regex {
    static SALARY: OnceLock<Regex> = OnceLock::new();
    SALARY.get_or_init(|| Regex::new(r"\$\d+(?:,\d{3})*").expect("salary pattern compiles"))
}

/// First dollar amount in a salary string: `$70,000 - $85,000` → 70000.
pub fn min_salary(salary: &str) -> Option<u64> {
    let m = salary_pattern().find(salary)?;
    let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Splits `$271,937 - $461,083` into its numbers. Unparsable parts are skipped.
pub fn separate_salary_numbers(salary: &str) -> Vec<u64> {
    salary
        .replace('$', "")
        .split('-')
        .filter_map(|part| part.replace(',', "").trim().parse().ok())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryOrder {
    SalaryAsc,
    SalaryDesc,
}

/// Orders jobs by minimum salary. Jobs without a parsable salary go last in
/// either direction; ties keep their input order.
pub fn sort_salary_ranges(jobs: &mut [JobRow], order: SalaryOrder) {
    jobs.sort_by(|a, b| {
        let (a, b) = (min_salary(&a.salary), min_salary(&b.salary));
        match (a, b) {
            (Some(a), Some(b)) => match order {
                SalaryOrder::SalaryAsc => a.cmp(&b),
                SalaryOrder::SalaryDesc => b.cmp(&a),
            },
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
}

/// What the pager renders for the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub current: i64,
    pub total_pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
    /// Page numbers to show, at most `width` of them, centred on `current`.
    pub pages: Vec<i64>,
}

pub fn page_window(current: i64, total_pages: i64, width: i64) -> PageWindow {
    let total = total_pages.max(0);
    let current = current.clamp(1, total.max(1));
    let width = width.max(1).min(total);

    let mut start = current - width / 2;
    start = start.max(1);
    let end = (start + width - 1).min(total);
    start = (end - width + 1).max(1);

    PageWindow {
        current,
        total_pages: total,
        has_prev: current > 1,
        has_next: current < total,
        pages: if total == 0 {
            Vec::new()
        } else {
            (start..=end).collect()
        },
    }
}
