//! Visibility rules and profile aggregates over a user's trip list.
//!
//! Everything here is a pure function of the trips and an explicit `now`.
//! Callers capture `now` once per request and pass the same instant to every
//! function so one page never mixes two clocks.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::trip::{Trip, TripView};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub trips: usize,
    pub destinations: usize,
    pub countries: usize,
}

/// Whether a single trip may be shown to the viewer at `now`.
pub fn is_visible(trip: &Trip, owner_viewing: bool, now: DateTime<Utc>) -> bool {
    if owner_viewing {
        return true;
    }
    if trip.hide_upcoming && trip.ends_at() > now {
        return false;
    }
    !trip.secret
}

/// Keeps the trips the viewer is allowed to see, in their original order.
pub fn filter_for_viewer(trips: Vec<Trip>, owner_viewing: bool, now: DateTime<Utc>) -> Vec<Trip> {
    trips
        .into_iter()
        .filter(|trip| is_visible(trip, owner_viewing, now))
        .collect()
}

pub fn annotate_future(trips: Vec<Trip>, now: DateTime<Utc>) -> Vec<TripView> {
    trips
        .into_iter()
        .map(|trip| {
            let is_future = trip.starts_at() > now;
            TripView { trip, is_future }
        })
        .collect()
}

/// Soonest trip that has not started yet.
///
/// `sorted_trips` must be ordered by `from`, newest first. The trip right
/// above the first started one is the next trip. When nothing has started
/// yet there is no cut point and `None` is returned, even though every trip
/// lies in the future.
pub fn find_next_trip(sorted_trips: &[Trip], now: DateTime<Utc>) -> Option<&Trip> {
    let first_started = sorted_trips
        .iter()
        .position(|trip| trip.starts_at() <= now)?;
    if first_started == 0 {
        return None;
    }
    sorted_trips.get(first_started - 1)
}

/// Counts over trips that started strictly before `now`.
pub fn compute_totals(trips: &[Trip], now: DateTime<Utc>) -> Totals {
    let past: Vec<&Trip> = trips.iter().filter(|trip| trip.starts_at() < now).collect();
    let destinations: HashSet<&str> = past.iter().map(|trip| trip.destination.as_str()).collect();
    let countries: HashSet<&str> = past.iter().map(|trip| trip.country.as_str()).collect();

    Totals {
        trips: past.len(),
        destinations: destinations.len(),
        countries: countries.len(),
    }
}

/// Everything the public profile renders, derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub trips: Vec<TripView>,
    pub next_trip: Option<TripView>,
    pub totals: Totals,
}

/// Filters for the viewer first; next trip and totals only ever see what the
/// viewer is allowed to see.
pub fn summarize(trips: Vec<Trip>, owner_viewing: bool, now: DateTime<Utc>) -> ProfileSummary {
    let visible = filter_for_viewer(trips, owner_viewing, now);
    let next_trip = find_next_trip(&visible, now).map(|trip| TripView {
        trip: trip.clone(),
        is_future: trip.starts_at() > now,
    });
    let totals = compute_totals(&visible, now);

    ProfileSummary {
        trips: annotate_future(visible, now),
        next_trip,
        totals,
    }
}
