// 🎯 Nearest-Point Matcher - the track point closest in time to a photo
//
// Distance is |point.time - t|; on equal distance the earlier point wins,
// so among points sharing an instant the first one in the track is used.
//
// `nearest_point` binary-searches the insertion position and compares the two
// neighbours. `nearest_point_linear` is the reference scan; both must always
// return the same point.

use crate::entities::{Track, TrackPoint};
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct NearestPoint<'a> {
    pub index: usize,
    pub point: &'a TrackPoint,

    /// |point.time - t|
    pub distance: TimeDelta,
}

fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> TimeDelta {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// Reference implementation: full scan
pub fn nearest_point_linear(track: &Track, time: DateTime<Utc>) -> NearestPoint<'_> {
    let points = track.points();
    let mut best = 0;
    let mut best_distance = distance(points[0].time, time);

    for (i, point) in points.iter().enumerate().skip(1) {
        let d = distance(point.time, time);
        // strict: keeps the earlier point on ties
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }

    NearestPoint {
        index: best,
        point: &points[best],
        distance: best_distance,
    }
}

/// O(log n) search over the time-ordered points
pub fn nearest_point(track: &Track, time: DateTime<Utc>) -> NearestPoint<'_> {
    let points = track.points();

    // first point at or after `time`
    let right = points.partition_point(|p| p.time < time);

    let index = if right == 0 {
        0
    } else {
        // first point of the run sharing the left neighbour's instant
        let left_time = points[right - 1].time;
        let left = points.partition_point(|p| p.time < left_time);

        if right == points.len()
            || distance(left_time, time) <= distance(points[right].time, time)
        {
            left
        } else {
            right
        }
    };

    NearestPoint {
        index,
        point: &points[index],
        distance: distance(points[index].time, time),
    }
}
