use pagespeed_types::{
    metrics::{MetricKind, MetricSet, Strategy},
    run::{Averages, IterationResult},
};

/// Mean metrics for one device over the usable iterations.
///
/// Returns `None` when no iteration is usable. Within a returned set each
/// field is the mean of the values present for that field, or `None` when no
/// iteration reported it.
pub fn average_device(results: &[IterationResult], strategy: Strategy) -> Option<MetricSet> {
    let sets: Vec<&MetricSet> = results
        .iter()
        .filter(|result| result.is_usable())
        .filter_map(|result| result.metrics(strategy))
        .collect();
    if sets.is_empty() {
        return None;
    }

    Some(MetricSet::from_fn(|kind| mean_of(&sets, kind)))
}

/// Averages for both devices, or `None` when neither has usable data.
pub fn compute_averages(results: &[IterationResult]) -> Option<Averages> {
    let averages = Averages {
        desktop: average_device(results, Strategy::Desktop),
        mobile: average_device(results, Strategy::Mobile),
    };
    (!averages.is_empty()).then_some(averages)
}

fn mean_of(sets: &[&MetricSet], kind: MetricKind) -> Option<f64> {
    let (sum, count) = sets
        .iter()
        .filter_map(|set| set.get(kind))
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}
