//! Derived views over a completion log.
//!
//! Everything here is a pure function of the catalog, the log and an explicit
//! date or local time; nothing reads a clock. Per-day counts only include ids
//! the catalog knows, so entries left over from an older catalog never push a
//! day past 100%.

use crate::{
    catalog::{Catalog, Category, RoutineItem, TimeOfDay},
    date_key::DateKey,
    log::CompletionLog,
};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Upper bound on how far back a streak walk goes.
pub const STREAK_SAFETY_DAYS: u32 = 3650;
pub const WEEK: usize = 7;
pub const MONTH: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub average_completion: u8,
    pub streak: u32,
    pub total_tasks_done: u32,
    pub best_day: Option<DateKey>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DayPercent {
    pub date: DateKey,
    pub percent: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryStat {
    pub category: Category,
    pub done: usize,
    pub total: usize,
    pub percent: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayProgress {
    pub done: usize,
    pub remaining: usize,
    pub percent: u8,
}

fn done_count(catalog: &Catalog, log: &CompletionLog, date: DateKey) -> usize {
    log.get(date)
        .map(|ids| ids.iter().filter(|id| catalog.contains(id)).count())
        .unwrap_or(0)
}

/// `round(100 * done / total)`, half rounding up; 0 when `total` is 0.
fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((200 * done + total) / (2 * total)).min(100) as u8
}

pub fn completion_percent(catalog: &Catalog, log: &CompletionLog, date: DateKey) -> u8 {
    percent(done_count(catalog, log, date), catalog.len())
}

pub fn day_progress(catalog: &Catalog, log: &CompletionLog, date: DateKey) -> DayProgress {
    let done = done_count(catalog, log, date);
    DayProgress {
        done,
        remaining: catalog.len() - done,
        percent: percent(done, catalog.len()),
    }
}

/// Consecutive days ending at `today` with at least one completed task.
pub fn streak(catalog: &Catalog, log: &CompletionLog, today: DateKey) -> u32 {
    let mut count = 0;
    let mut day = Some(today);
    while let Some(d) = day {
        if count >= STREAK_SAFETY_DAYS || done_count(catalog, log, d) == 0 {
            break;
        }
        count += 1;
        day = d.pred();
    }
    count
}

/// Mean completion over days with at least one completed task. Days with
/// nothing done are left out of the denominator.
pub fn average_completion(catalog: &Catalog, log: &CompletionLog) -> u8 {
    let total = catalog.len();
    let ratios: Vec<f64> = log
        .days()
        .map(|(date, _)| done_count(catalog, log, date))
        .filter(|&done| done > 0)
        .map(|done| done as f64 / total as f64)
        .collect();
    if ratios.is_empty() {
        return 0;
    }
    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    (mean * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Every logged completion, including ids the catalog no longer lists.
pub fn total_tasks_done(log: &CompletionLog) -> u32 {
    log.days().map(|(_, ids)| ids.len() as u32).sum()
}

/// Day with the most completed tasks; the earliest one wins a tie.
pub fn best_day(catalog: &Catalog, log: &CompletionLog) -> Option<DateKey> {
    let mut best: Option<(DateKey, usize)> = None;
    for (date, _) in log.days() {
        let done = done_count(catalog, log, date);
        if done == 0 {
            continue;
        }
        if best.map_or(true, |(_, n)| done > n) {
            best = Some((date, done));
        }
    }
    best.map(|(date, _)| date)
}

pub fn summary(catalog: &Catalog, log: &CompletionLog, today: DateKey) -> Summary {
    Summary {
        average_completion: average_completion(catalog, log),
        streak: streak(catalog, log, today),
        total_tasks_done: total_tasks_done(log),
        best_day: best_day(catalog, log),
    }
}

/// The `n` days ending at `today`, oldest first, with missing days at 0%.
pub fn rolling_window(
    catalog: &Catalog,
    log: &CompletionLog,
    today: DateKey,
    n: usize,
) -> Vec<DayPercent> {
    (0..n)
        .filter_map(|i| today.days_before((n - 1 - i) as u64))
        .map(|date| DayPercent {
            date,
            percent: completion_percent(catalog, log, date),
        })
        .collect()
}

pub fn category_efficiency(
    catalog: &Catalog,
    log: &CompletionLog,
    date: DateKey,
) -> Vec<CategoryStat> {
    Category::ALL
        .iter()
        .map(|&category| {
            let total = catalog.in_category(category).count();
            let done = catalog
                .in_category(category)
                .filter(|it| log.is_done(date, &it.id))
                .count();
            CategoryStat {
                category,
                done,
                total,
                percent: percent(done, total),
            }
        })
        .collect()
}

/// Earliest uncompleted item on `date` scheduled strictly after `now`'s
/// time of day. Items sharing a time resolve to catalog order.
pub fn next_upcoming_task<'a>(
    catalog: &'a Catalog,
    log: &CompletionLog,
    date: DateKey,
    now: NaiveDateTime,
) -> Option<&'a RoutineItem> {
    let now_minutes = TimeOfDay::from_naive_time(now.time()).minutes();
    catalog
        .items()
        .iter()
        .filter(|it| it.time.minutes() > now_minutes && !log.is_done(date, &it.id))
        .min_by_key(|it| it.time.minutes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn at(date: &str, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    fn log_with(entries: &[(&str, &[&str])]) -> CompletionLog {
        let mut log = CompletionLog::new();
        for (date, ids) in entries {
            for id in *ids {
                log.toggle(d(date), id);
            }
        }
        log
    }

    const ALL_IDS: [&str; 12] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12"];

    #[test]
    fn completion_percent_of_three_out_of_twelve_is_25() {
        let c = Catalog::builtin();
        let log = log_with(&[("2024-01-10", &["1", "2", "3"])]);
        assert_eq!(completion_percent(&c, &log, d("2024-01-10")), 25);
        assert_eq!(completion_percent(&c, &log, d("2024-01-11")), 0);
    }

    #[test]
    fn completion_percent_rounds_and_stays_in_bounds() {
        let c = Catalog::builtin();
        for k in 0..=12usize {
            let log = log_with(&[("2024-01-10", &ALL_IDS[..k])]);
            let p = completion_percent(&c, &log, d("2024-01-10"));
            assert!(p <= 100);
            assert_eq!(p as f64, (100.0 * k as f64 / 12.0).round());
        }
        // 1/12 = 8.33 -> 8, 1/8 = 12.5 -> 13 (half rounds up).
        assert_eq!(percent(1, 12), 8);
        assert_eq!(percent(1, 8), 13);
    }

    #[test]
    fn stale_ids_do_not_inflate_percent_but_count_in_total() {
        let c = Catalog::builtin();
        let log = log_with(&[("2024-01-10", &["1", "old-a", "old-b"])]);
        assert_eq!(completion_percent(&c, &log, d("2024-01-10")), 8);
        assert_eq!(total_tasks_done(&log), 3);
        assert_eq!(summary(&c, &log, d("2024-01-10")).total_tasks_done, 3);

        let only_stale = log_with(&[("2024-01-10", &["gone"])]);
        assert_eq!(streak(&c, &only_stale, d("2024-01-10")), 0);
    }

    #[test]
    fn streak_is_zero_when_today_is_empty() {
        let c = Catalog::builtin();
        let log = log_with(&[("2024-01-10", &ALL_IDS), ("2024-01-09", &["1"])]);
        assert_eq!(streak(&c, &log, d("2024-01-11")), 0);
    }

    #[test]
    fn streak_counts_consecutive_days_back_from_today() {
        let c = Catalog::builtin();
        let log = log_with(&[
            ("2024-01-07", &["1"]),
            ("2024-01-09", &["2"]),
            ("2024-01-10", &["3", "4"]),
            ("2024-01-11", &["5"]),
        ]);
        assert_eq!(streak(&c, &log, d("2024-01-11")), 3);
        assert_eq!(streak(&c, &log, d("2024-01-07")), 1);
    }

    #[test]
    fn streak_stops_at_toggled_off_day() {
        let c = Catalog::builtin();
        let mut log = log_with(&[("2024-01-10", &["1"]), ("2024-01-11", &["1"])]);
        log.toggle(d("2024-01-10"), "1");
        assert_eq!(streak(&c, &log, d("2024-01-11")), 1);
    }

    #[test]
    fn streak_crosses_month_and_year_boundaries() {
        let c = Catalog::builtin();
        let log = log_with(&[
            ("2023-12-30", &["1"]),
            ("2023-12-31", &["1"]),
            ("2024-01-01", &["1"]),
        ]);
        assert_eq!(streak(&c, &log, d("2024-01-01")), 3);
    }

    #[test]
    fn streak_is_capped() {
        let c = Catalog::builtin();
        let mut log = CompletionLog::new();
        let today = d("2030-01-01");
        for back in 0..(STREAK_SAFETY_DAYS as u64 + 20) {
            log.toggle(today.days_before(back).unwrap(), "1");
        }
        assert_eq!(streak(&c, &log, today), STREAK_SAFETY_DAYS);
    }

    #[test]
    fn average_excludes_empty_days() {
        let c = Catalog::builtin();
        let mut log = log_with(&[
            ("2024-01-08", &ALL_IDS),
            ("2024-01-09", &["1", "2", "3", "4", "5", "6"]),
            ("2024-01-10", &["1"]),
        ]);
        // Emptied day stays in the map but not in the denominator.
        log.toggle(d("2024-01-10"), "1");
        assert_eq!(average_completion(&c, &log), 75);
        assert_eq!(average_completion(&c, &CompletionLog::new()), 0);
    }

    #[test]
    fn average_rounds_once_over_exact_ratios() {
        let c = Catalog::builtin();
        // 1/12 and 2/12: mean 12.5% -> 13.
        let log = log_with(&[("2024-01-09", &["1"]), ("2024-01-10", &["1", "2"])]);
        assert_eq!(average_completion(&c, &log), 13);
    }

    #[test]
    fn summary_totals_and_best_day() {
        let c = Catalog::builtin();
        let log = log_with(&[
            ("2024-01-08", &["1", "2"]),
            ("2024-01-09", &["1", "2", "3"]),
            ("2024-01-10", &["4", "5", "6"]),
        ]);
        let s = summary(&c, &log, d("2024-01-10"));
        assert_eq!(s.total_tasks_done, 8);
        assert_eq!(s.streak, 3);
        assert_eq!(s.best_day, Some(d("2024-01-09")));
        assert_eq!(s.average_completion, 22);

        let empty = summary(&c, &CompletionLog::new(), d("2024-01-10"));
        assert_eq!(empty.best_day, None);
        assert_eq!(empty.total_tasks_done, 0);
    }

    #[test]
    fn rolling_window_is_fixed_length_oldest_first() {
        let c = Catalog::builtin();
        let log = log_with(&[("2024-01-10", &["1", "2", "3"]), ("2023-12-01", &["1"])]);
        for n in [WEEK, MONTH] {
            let w = rolling_window(&c, &log, d("2024-01-10"), n);
            assert_eq!(w.len(), n);
            assert_eq!(w.last().map(|p| p.date), Some(d("2024-01-10")));
            assert!(w.windows(2).all(|p| p[0].date.succ() == Some(p[1].date)));
            assert!(w.iter().all(|p| p.percent <= 100));
        }
        let week = rolling_window(&c, &log, d("2024-01-10"), WEEK);
        assert_eq!(week[0].date, d("2024-01-04"));
        assert_eq!(week[6].percent, 25);
        assert!(week[..6].iter().all(|p| p.percent == 0));

        let empty = rolling_window(&c, &CompletionLog::new(), d("2024-01-10"), MONTH);
        assert_eq!(empty.len(), MONTH);
    }

    #[test]
    fn category_efficiency_in_fixed_order() {
        let c = Catalog::builtin();
        let log = log_with(&[("2024-01-10", &["1", "2", "5", "9"])]);
        let stats = category_efficiency(&c, &log, d("2024-01-10"));
        let order: Vec<Category> = stats.iter().map(|s| s.category).collect();
        assert_eq!(order, Category::ALL.to_vec());
        assert_eq!((stats[0].done, stats[0].total, stats[0].percent), (2, 4, 50));
        assert_eq!((stats[1].done, stats[1].total, stats[1].percent), (1, 2, 50));
        assert_eq!((stats[2].done, stats[2].total, stats[2].percent), (0, 2, 0));
        assert_eq!((stats[3].done, stats[3].total, stats[3].percent), (1, 4, 25));
    }

    #[test]
    fn empty_category_is_zero_percent() {
        let c = Catalog::new(vec![
            RoutineItem::new("a", "6:00 AM", "Run", "🏃", Category::Morning).unwrap(),
            RoutineItem::new("b", "9:00 PM", "Read", "📖", Category::Night).unwrap(),
        ])
        .unwrap();
        let log = log_with(&[("2024-01-10", &["a", "b"])]);
        let stats = category_efficiency(&c, &log, d("2024-01-10"));
        assert_eq!(stats[1].total, 0);
        assert_eq!(stats[1].percent, 0);
        assert_eq!(stats[2].percent, 0);
        assert_eq!(stats[0].percent, 100);
        assert_eq!(stats[3].percent, 100);
    }

    #[test]
    fn empty_catalog_never_divides_by_zero() {
        let c = Catalog::new(Vec::new()).unwrap();
        let log = log_with(&[("2024-01-10", &["1"])]);
        assert_eq!(completion_percent(&c, &log, d("2024-01-10")), 0);
        assert_eq!(average_completion(&c, &log), 0);
        assert!(category_efficiency(&c, &log, d("2024-01-10"))
            .iter()
            .all(|s| s.percent == 0));
    }

    #[test]
    fn next_task_after_current_time() {
        let c = Catalog::builtin();
        let log = log_with(&[("2024-01-10", &["1", "2"])]);
        let next = next_upcoming_task(&c, &log, d("2024-01-10"), at("2024-01-10", 6, 30));
        assert_eq!(next.map(|it| it.id.as_str()), Some("3"));
        assert_eq!(next.map(|it| it.time.to_string()).as_deref(), Some("7:00 AM"));
    }

    #[test]
    fn next_task_skips_completed_and_exact_time() {
        let c = Catalog::builtin();
        let log = log_with(&[("2024-01-10", &["3"])]);
        // At exactly 7:00 AM the 7:00 item is not "after" now; 3 is done anyway.
        let next = next_upcoming_task(&c, &log, d("2024-01-10"), at("2024-01-10", 7, 0));
        assert_eq!(next.map(|it| it.id.as_str()), Some("4"));
    }

    #[test]
    fn next_task_none_when_nothing_remains() {
        let c = Catalog::builtin();
        let log = log_with(&[("2024-01-10", &["11"])]);
        // After 11:00 PM only the 12:00 AM item is left, and it sorts to 0 minutes.
        assert!(next_upcoming_task(&c, &log, d("2024-01-10"), at("2024-01-10", 23, 0)).is_none());

        let all = log_with(&[("2024-01-10", &ALL_IDS)]);
        assert!(next_upcoming_task(&c, &all, d("2024-01-10"), at("2024-01-10", 4, 0)).is_none());
    }

    #[test]
    fn next_task_is_earliest_by_time_not_catalog_order() {
        let c = Catalog::new(vec![
            RoutineItem::new("late", "9:00 PM", "Read", "📖", Category::Night).unwrap(),
            RoutineItem::new("early", "8:00 AM", "Run", "🏃", Category::Morning).unwrap(),
            RoutineItem::new("also-early", "8:00 AM", "Stretch", "🧘", Category::Morning).unwrap(),
        ])
        .unwrap();
        let log = CompletionLog::new();
        let next = next_upcoming_task(&c, &log, d("2024-01-10"), at("2024-01-10", 7, 0));
        assert_eq!(next.map(|it| it.id.as_str()), Some("early"));
    }

    #[test]
    fn analytics_are_repeatable() {
        let c = Catalog::builtin();
        let log = log_with(&[("2024-01-09", &["1"]), ("2024-01-10", &["2", "3"])]);
        let today = d("2024-01-10");
        assert_eq!(summary(&c, &log, today), summary(&c, &log, today));
        assert_eq!(
            rolling_window(&c, &log, today, WEEK),
            rolling_window(&c, &log, today, WEEK)
        );
    }
}
