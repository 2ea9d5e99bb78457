// 🧭 Track Assigner - which track was recording when the shutter fired?
//
// Candidate rule: track.start <= t <= track.end (both ends inclusive, a GPX
// start or end point is a plausible shutter moment).
//
// Overlapping candidates are resolved deterministically:
//   1. smallest span (end - start), the tightest-fitting track
//   2. latest start, the most recently begun track
//   3. lowest index in the track list

use crate::entities::{Photo, Track};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    /// Exactly one track contains the instant
    Assigned(usize),

    /// Several tracks contain the instant; `chosen` won the tie-break
    Ambiguous { chosen: usize, candidates: Vec<usize> },

    /// No track contains the instant
    Unassigned,
}

impl Assignment {
    /// Index of the track the photo belongs to, if any
    pub fn track_index(&self) -> Option<usize> {
        match self {
            Assignment::Assigned(i) => Some(*i),
            Assignment::Ambiguous { chosen, .. } => Some(*chosen),
            Assignment::Unassigned => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Assignment::Ambiguous { .. })
    }
}

/// Indices of every track whose span contains `time`
pub fn candidates(time: DateTime<Utc>, tracks: &[Track]) -> Vec<usize> {
    tracks
        .iter()
        .enumerate()
        .filter(|(_, track)| track.contains(time))
        .map(|(i, _)| i)
        .collect()
}

pub fn assign(photo: &Photo, tracks: &[Track]) -> Assignment {
    assign_at(photo.time, tracks)
}

pub fn assign_at(time: DateTime<Utc>, tracks: &[Track]) -> Assignment {
    let candidates = candidates(time, tracks);

    match candidates.as_slice() {
        [] => Assignment::Unassigned,
        [only] => Assignment::Assigned(*only),
        _ => {
            let chosen = candidates
                .iter()
                .copied()
                .min_by_key(|&i| (tracks[i].span(), Reverse(tracks[i].start()), i))
                .unwrap_or(candidates[0]);
            Assignment::Ambiguous { chosen, candidates }
        }
    }
}
