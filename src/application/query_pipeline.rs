// Query pipeline - filter, sort, paginate and aggregate a reading history
use crate::domain::query::{
    FilterState, MetricSummary, Page, PageInfo, PageRequest, SortConfig, SortDirection, Statistics,
};
use crate::domain::reading::{Reading, ReadingField};
use std::cmp::Ordering;

/// Filter `history` and order the matches by `sort`.
///
/// Always returns a freshly allocated sequence; the input is never reordered.
/// The sort is stable, so readings with equal keys keep their history order in
/// both directions.
pub fn filter_and_sort(history: &[Reading], filters: &FilterState, sort: &SortConfig) -> Vec<Reading> {
    let unbounded = filters.is_unbounded();
    let mut filtered: Vec<Reading> = history
        .iter()
        .filter(|reading| unbounded || filters.matches(reading))
        .cloned()
        .collect();

    if let Some(key) = sort.key {
        filtered.sort_by(|a, b| {
            let ordering = compare_by(key, a, b);
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }

    filtered
}

fn compare_by(key: ReadingField, a: &Reading, b: &Reading) -> Ordering {
    if key == ReadingField::Timestamp {
        return a.timestamp.cmp(&b.timestamp);
    }

    match (key.numeric_value(a), key.numeric_value(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => compare_text(&a.sensor_id, &b.sensor_id),
    }
}

/// Case-insensitive first, exact bytes as tie-break.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Slice out one page. A page past the end yields no items; clamping the page
/// number is left to the caller.
pub fn paginate(sequence: &[Reading], request: PageRequest) -> Page {
    let total = sequence.len();
    let page_size = request.page_size();
    let page_number = request.page_number();
    let total_pages = total.div_ceil(page_size);

    let start = (page_number - 1).saturating_mul(page_size).min(total);
    let end = page_number.saturating_mul(page_size).min(total);

    Page {
        items: sequence[start..end].to_vec(),
        info: PageInfo {
            page_number,
            page_size,
            total,
            total_pages,
            has_next: page_number < total_pages,
            has_prev: page_number > 1,
        },
    }
}

/// Average, minimum and maximum per metric, rounded to one decimal.
/// `None` when there is nothing to aggregate.
pub fn compute_statistics(sequence: &[Reading]) -> Option<Statistics> {
    if sequence.is_empty() {
        return None;
    }

    Some(Statistics {
        count: sequence.len(),
        temperature: summarize(sequence.iter().map(|r| r.temperature)),
        humidity: summarize(sequence.iter().map(|r| r.humidity)),
        air_quality: summarize(sequence.iter().map(|r| r.air_quality)),
    })
}

fn summarize(values: impl Iterator<Item = f64>) -> MetricSummary {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for value in values {
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }

    MetricSummary {
        avg: round_to_tenth(sum / count as f64),
        min: round_to_tenth(min),
        max: round_to_tenth(max),
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
