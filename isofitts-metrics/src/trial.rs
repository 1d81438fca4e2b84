use isofitts_core::{
    CaptureRule, LogEvent, WidthConvention, contains_with, fitts_index_of_difficulty, path_length,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A per-trial quantity that could not be computed. Reported alongside the
/// trial instead of a NaN or infinite value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "kebab-case")]
pub enum DegenerateMetric {
    #[error("cursor never moved, efficiency undefined")]
    ZeroPathLength,
    #[error("trial spans no time, throughput undefined")]
    ZeroDuration,
    #[error("goal has no width, index of difficulty undefined")]
    ZeroWidth,
    #[error("no ticks were logged for this trial")]
    EmptyTrial,
}

/// The ticks of one trial, in log order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSlice<'a> {
    pub trial: usize,
    pub events: Vec<&'a LogEvent>,
}

/// Groups events by trial index, ascending.
///
/// Trial indices missing between the first and last logged trial come back
/// as empty slices so gaps stay visible in the output.
pub fn partition(events: &[LogEvent]) -> Vec<TrialSlice<'_>> {
    let mut groups: BTreeMap<usize, Vec<&LogEvent>> = BTreeMap::new();
    for event in events {
        groups.entry(event.trial).or_default().push(event);
    }
    let Some((&first, _)) = groups.first_key_value() else {
        return Vec::new();
    };
    let Some((&last, _)) = groups.last_key_value() else {
        return Vec::new();
    };
    (first..=last)
        .map(|trial| TrialSlice {
            trial,
            events: groups.remove(&trial).unwrap_or_default(),
        })
        .collect()
}

/// Count of inside-to-outside transitions.
pub fn count_overshoots(containment: impl IntoIterator<Item = bool>) -> usize {
    let mut previous = false;
    let mut count = 0;
    for inside in containment {
        if previous && !inside {
            count += 1;
        }
        previous = inside;
    }
    count
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMetrics {
    pub trial: usize,
    pub ticks: usize,
    /// Clock span from the first to the last tick.
    pub movement_time_secs: f64,
    /// Straight-line distance from the starting cursor to the goal center.
    pub distance: f64,
    pub path_length: f64,
    pub overshoots: usize,
    pub index_of_difficulty: Option<f64>,
    pub efficiency: Option<f64>,
    pub throughput: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<DegenerateMetric>,
}

impl TrialMetrics {
    pub fn compute(slice: &TrialSlice<'_>, capture: CaptureRule, width: WidthConvention) -> Self {
        let (Some(first), Some(last)) = (slice.events.first(), slice.events.last()) else {
            return Self::empty(slice.trial);
        };

        let mut anomalies = Vec::new();
        let goal = first.goal;
        let distance = first.cursor.center_distance(&goal);

        let centers: Vec<(f64, f64)> = slice.events.iter().map(|e| e.cursor.center()).collect();
        let travelled = path_length(&centers);
        let efficiency = if travelled > 0.0 {
            Some(distance / travelled)
        } else {
            anomalies.push(DegenerateMetric::ZeroPathLength);
            None
        };

        let w = width.width_of(&goal);
        let index_of_difficulty = if w > 0.0 {
            Some(fitts_index_of_difficulty(distance, w))
        } else {
            anomalies.push(DegenerateMetric::ZeroWidth);
            None
        };

        let movement_time_secs = last.clock_secs - first.clock_secs;
        let throughput = match index_of_difficulty {
            _ if movement_time_secs <= 0.0 => {
                anomalies.push(DegenerateMetric::ZeroDuration);
                None
            }
            Some(id) => Some(id / movement_time_secs),
            None => None,
        };

        let overshoots = count_overshoots(
            slice
                .events
                .iter()
                .map(|e| contains_with(&e.cursor, &e.goal, capture)),
        );

        Self {
            trial: slice.trial,
            ticks: slice.events.len(),
            movement_time_secs: movement_time_secs.max(0.0),
            distance,
            path_length: travelled,
            overshoots,
            index_of_difficulty,
            efficiency,
            throughput,
            anomalies,
        }
    }

    fn empty(trial: usize) -> Self {
        Self {
            trial,
            ticks: 0,
            movement_time_secs: 0.0,
            distance: 0.0,
            path_length: 0.0,
            overshoots: 0,
            index_of_difficulty: None,
            efficiency: None,
            throughput: None,
            anomalies: vec![DegenerateMetric::EmptyTrial],
        }
    }
}
