//! Per-metric accumulation of observations across builds.

use crate::model::{Condensed, NumericStats, RawValue, ResultValue};
use std::collections::BTreeMap;

/// How much history a metric keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Retention {
    /// Every observation until the next reset.
    #[default]
    Unbounded,
    /// Only the given number of highest-numbered builds.
    Window(usize),
}

/// Streaming count / mean / sum of squared deviations with min and max.
///
/// Two sets are combined with the pairwise update of Chan et al., so the
/// result does not depend on the order in which observations or partial
/// sets arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Moments {
    pub fn single(x: f64) -> Self {
        Self { count: 1, mean: x, m2: 0.0, min: x, max: x }
    }

    /// Rebuild moments from published statistics over `count` observations.
    pub fn from_stats(count: u64, stats: &NumericStats) -> Self {
        if count == 0 {
            return Self::default();
        }
        Self {
            count,
            mean: stats.average,
            m2: stats.std_deviation * stats.std_deviation * count as f64,
            min: stats.minimum,
            max: stats.maximum,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn merge(&mut self, other: &Moments) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        self.mean += delta * nb / n;
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Population statistics, absent until one numeric observation exists.
    pub fn stats(&self) -> Option<NumericStats> {
        if self.count == 0 {
            return None;
        }
        let variance = (self.m2 / self.count as f64).max(0.0);
        Some(NumericStats { minimum: self.min, maximum: self.max, average: self.mean, std_deviation: variance.sqrt() })
    }
}

/// A mergeable summary of one or more observations of a metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partial {
    moments: Moments,
    passed: u64,
    failed: u64,
    latest: Option<(u64, RawValue)>,
}

impl Partial {
    /// One build's observation.
    pub fn observe(build: u64, value: &ResultValue) -> Self {
        let moments = value.value.as_f64().filter(|v| v.is_finite()).map(Moments::single).unwrap_or_default();
        let (passed, failed) = if value.passed() { (1, 0) } else { (0, 1) };
        Self { moments, passed, failed, latest: Some((build, value.value.clone())) }
    }

    /// A previously condensed record, e.g. from a persisted snapshot.
    ///
    /// The record's numeric statistics cover all of its observations.
    pub fn seed(condensed: &Condensed) -> Self {
        let moments = condensed
            .stats
            .as_ref()
            .map(|s| Moments::from_stats(condensed.observations().max(1), s))
            .unwrap_or_default();
        Self {
            moments,
            passed: condensed.passed,
            failed: condensed.failed,
            latest: Some((condensed.previous_build.unwrap_or(0), condensed.previous.clone())),
        }
    }

    pub fn latest_build(&self) -> Option<u64> {
        self.latest.as_ref().map(|(b, _)| *b)
    }

    pub fn merge(&mut self, other: &Partial) {
        self.moments.merge(&other.moments);
        self.passed += other.passed;
        self.failed += other.failed;
        match (&self.latest, &other.latest) {
            (Some((mine, _)), Some((theirs, _))) if theirs <= mine => {}
            (_, Some(latest)) => self.latest = Some(latest.clone()),
            (_, None) => {}
        }
    }

    fn condensed(&self) -> Option<Condensed> {
        let (build, previous) = self.latest.clone()?;
        Some(Condensed {
            previous,
            previous_build: Some(build),
            stats: self.moments.stats(),
            passed: self.passed,
            failed: self.failed,
        })
    }
}

/// Accumulated history of one metric key.
#[derive(Debug, Clone)]
pub struct Accumulator {
    retention: Retention,
    /// Metadata of the most recent contributing value.
    template: ResultValue,
    total: Partial,
    window: BTreeMap<u64, Partial>,
}

impl Accumulator {
    pub fn new(retention: Retention, template: &ResultValue) -> Self {
        let mut template = template.clone();
        template.parent = None;
        template.condensed = None;
        Self { retention, template, total: Partial::default(), window: BTreeMap::new() }
    }

    pub fn observe(&mut self, build: u64, value: &ResultValue) {
        self.merge_partial(Partial::observe(build, value), value);
    }

    pub fn seed(&mut self, value: &ResultValue) {
        if let Some(condensed) = &value.condensed {
            self.merge_partial(Partial::seed(condensed), value);
        }
    }

    fn merge_partial(&mut self, partial: Partial, source: &ResultValue) {
        let newest = match self.retention {
            Retention::Unbounded => self.total.latest_build(),
            Retention::Window(_) => self.window.keys().next_back().copied(),
        };
        if partial.latest_build() >= newest {
            self.template = ResultValue { parent: None, condensed: None, ..source.clone() };
        }

        match self.retention {
            Retention::Unbounded => self.total.merge(&partial),
            Retention::Window(size) => {
                let build = partial.latest_build().unwrap_or(0);
                self.window.entry(build).or_default().merge(&partial);
                while self.window.len() > size.max(1) {
                    self.window.pop_first();
                }
            }
        }
    }

    /// Number of builds or seeded records currently retained.
    pub fn observations(&self) -> u64 {
        self.current().map(|p| p.passed + p.failed).unwrap_or(0)
    }

    fn current(&self) -> Option<Partial> {
        match self.retention {
            Retention::Unbounded => Some(self.total.clone()),
            Retention::Window(_) => {
                let mut folded = Partial::default();
                for partial in self.window.values() {
                    folded.merge(partial);
                }
                Some(folded)
            }
        }
    }

    pub fn condensed(&self) -> Option<Condensed> {
        self.current()?.condensed()
    }

    /// The metric as a value whose raw value is the most recent observation.
    pub fn to_value(&self) -> Option<ResultValue> {
        let condensed = self.condensed()?;
        let mut value = self.template.clone();
        value.value = condensed.previous.clone();
        value.condensed = Some(condensed);
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comparison, PassPolicy};

    fn float(v: f64) -> ResultValue {
        ResultValue::new("wall", RawValue::Float(v)).with_condense(true)
    }

    #[test]
    fn test_moments_population_std_deviation() {
        let mut m = Moments::default();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            m.merge(&Moments::single(x));
        }
        let stats = m.stats().unwrap();
        assert_eq!(stats.average, 5.0);
        assert!((stats.std_deviation - 2.0).abs() < 1e-12);
        assert_eq!(stats.minimum, 2.0);
        assert_eq!(stats.maximum, 9.0);
    }

    #[test]
    fn test_empty_moments_have_no_stats() {
        assert!(Moments::default().stats().is_none());
    }

    #[test]
    fn test_previous_is_highest_build() {
        let mut acc = Accumulator::new(Retention::Unbounded, &float(0.0));
        acc.observe(7, &float(70.0));
        acc.observe(9, &float(90.0));
        acc.observe(8, &float(80.0));
        let condensed = acc.condensed().unwrap();
        assert_eq!(condensed.previous, RawValue::Float(90.0));
        assert_eq!(condensed.previous_build, Some(9));
        assert_eq!(condensed.observations(), 3);
    }

    #[test]
    fn test_pass_policy_counts() {
        let limit = Some(PassPolicy::new(Comparison::Le, 100.0));
        let mut acc = Accumulator::new(Retention::Unbounded, &float(0.0));
        for (build, v) in [(1, 50.0), (2, 150.0), (3, 100.0)] {
            acc.observe(build, &float(v).with_pass(limit));
        }
        let condensed = acc.condensed().unwrap();
        assert_eq!((condensed.passed, condensed.failed), (2, 1));
    }

    #[test]
    fn test_boolean_metric_has_no_stats() {
        let ok = |b| ResultValue::new("ok", RawValue::Boolean(b));
        let mut acc = Accumulator::new(Retention::Unbounded, &ok(true));
        acc.observe(1, &ok(true));
        acc.observe(2, &ok(false));
        let condensed = acc.condensed().unwrap();
        assert!(condensed.stats.is_none());
        assert_eq!((condensed.passed, condensed.failed), (1, 1));
        assert_eq!(condensed.previous, RawValue::Boolean(false));
    }

    #[test]
    fn test_window_evicts_oldest_builds() {
        let mut acc = Accumulator::new(Retention::Window(2), &float(0.0));
        acc.observe(3, &float(30.0));
        acc.observe(1, &float(10.0));
        acc.observe(2, &float(20.0));
        let stats = acc.condensed().unwrap().stats.unwrap();
        assert_eq!(stats.minimum, 20.0);
        assert_eq!(stats.maximum, 30.0);
        assert_eq!(stats.average, 25.0);
        assert_eq!(acc.observations(), 2);
    }

    #[test]
    fn test_seed_then_observe_matches_direct_merge() {
        let mut direct = Accumulator::new(Retention::Unbounded, &float(0.0));
        for (build, v) in [(1, 1.0), (2, 3.0), (3, 8.0)] {
            direct.observe(build, &float(v));
        }

        let mut seeded_source = Accumulator::new(Retention::Unbounded, &float(0.0));
        seeded_source.observe(1, &float(1.0));
        seeded_source.observe(2, &float(3.0));
        let snapshot = seeded_source.to_value().unwrap();

        let mut resumed = Accumulator::new(Retention::Unbounded, &snapshot);
        resumed.seed(&snapshot);
        resumed.observe(3, &float(8.0));

        let a = direct.condensed().unwrap();
        let b = resumed.condensed().unwrap();
        let (sa, sb) = (a.stats.unwrap(), b.stats.unwrap());
        assert!((sa.average - sb.average).abs() < 1e-9);
        assert!((sa.std_deviation - sb.std_deviation).abs() < 1e-9);
        assert_eq!(a.previous, b.previous);
        assert_eq!(a.observations(), b.observations());
    }

    #[test]
    fn test_non_finite_observation_counts_without_stats() {
        let mut acc = Accumulator::new(Retention::Unbounded, &float(0.0));
        acc.observe(1, &float(1.0));
        acc.observe(2, &float(f64::NAN));
        acc.observe(3, &float(f64::INFINITY));
        let condensed = acc.condensed().unwrap();
        let stats = condensed.stats.unwrap();
        assert_eq!((stats.minimum, stats.maximum, stats.average), (1.0, 1.0, 1.0));
        assert_eq!(stats.std_deviation, 0.0);
        assert_eq!(condensed.observations(), 3);
    }

    #[test]
    fn test_window_holds_a_seeded_record_in_one_slot() {
        let mut source = Accumulator::new(Retention::Unbounded, &float(0.0));
        source.observe(1, &float(1.0));
        source.observe(2, &float(3.0));
        let snapshot = source.to_value().unwrap();

        let mut acc = Accumulator::new(Retention::Window(2), &snapshot);
        acc.seed(&snapshot);
        acc.observe(3, &float(5.0));
        // The seeded record keeps both of its builds until it is evicted.
        assert_eq!(acc.observations(), 3);

        acc.observe(4, &float(7.0));
        assert_eq!(acc.observations(), 2);
        assert_eq!(acc.condensed().unwrap().stats.unwrap().minimum, 5.0);
    }

    #[test]
    fn test_template_follows_newest_build() {
        let mut acc = Accumulator::new(Retention::Unbounded, &float(0.0));
        acc.observe(5, &float(1.0).with_unit(Some("ms".to_string())));
        acc.observe(4, &float(2.0).with_unit(Some("s".to_string())));
        assert_eq!(acc.to_value().unwrap().unit.as_deref(), Some("ms"));
    }
}
