//! Timeslot grid and the free-seat capacity counter.

use std::fmt;
use std::sync::RwLock;

/// Days in the timetable (Monday..Friday).
pub const DAYS: usize = 5;
/// Periods per day.
pub const PERIODS: usize = 6;

const DAY_NAMES: [&str; DAYS] = ["monday", "tuesday", "wednesday", "thursday", "friday"];

/// A `(day, period)` pair on the 5×6 timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timeslot {
    pub day: u8,
    pub period: u8,
}

impl Timeslot {
    /// Returns `None` when the pair is outside the grid.
    pub fn new(day: u8, period: u8) -> Option<Self> {
        ((day as usize) < DAYS && (period as usize) < PERIODS).then_some(Self { day, period })
    }

    /// All 30 timeslots, day-major.
    pub fn all() -> impl Iterator<Item = Timeslot> {
        (0..DAYS as u8).flat_map(|day| (0..PERIODS as u8).map(move |period| Timeslot { day, period }))
    }

    /// Wire name of the day (`"monday"`..`"friday"`).
    pub fn day_name(self) -> &'static str {
        DAY_NAMES[self.day as usize % DAYS]
    }

    /// Inverse of [`Timeslot::day_name`] paired with a 1-based wire period.
    pub fn from_wire(day: &str, period: u8) -> Option<Self> {
        let d = DAY_NAMES.iter().position(|n| n.eq_ignore_ascii_case(day))?;
        Self::new(d as u8, period.checked_sub(1)?)
    }

    #[inline]
    pub(crate) fn index(self) -> (usize, usize) {
        (self.day as usize, self.period as usize)
    }
}

impl fmt::Display for Timeslot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.day, self.period)
    }
}

/// Remaining free seats per timeslot across all active courses.
///
/// This is a scheduling hint, not an authority: between a reservation and its commit
/// or rollback the counter may diverge from the sum over courses.
#[derive(Debug, Default)]
pub struct CapacityCounter {
    grid: RwLock<[[i32; PERIODS]; DAYS]>,
}

impl CapacityCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, slot: Timeslot) {
        self.inc_by(slot, 1);
    }

    /// Adds `n` seats to `slot` (used when a course with `n` seats is added).
    pub fn inc_by(&self, slot: Timeslot, n: i32) {
        let (d, p) = slot.index();
        let mut grid = self.grid.write().unwrap_or_else(|e| e.into_inner());
        grid[d][p] += n;
    }

    pub fn dec(&self, slot: Timeslot) {
        self.inc_by(slot, -1);
    }

    /// +1 on every slot.
    pub fn inc_all(&self) {
        let mut grid = self.grid.write().unwrap_or_else(|e| e.into_inner());
        grid.iter_mut().flatten().for_each(|v| *v += 1);
    }

    pub fn get(&self, slot: Timeslot) -> i32 {
        let (d, p) = slot.index();
        self.grid.read().unwrap_or_else(|e| e.into_inner())[d][p]
    }

    /// Sum over the grid.
    pub fn total(&self) -> i64 {
        self.grid
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .flatten()
            .map(|v| i64::from(*v))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_bounds_are_checked() {
        assert!(Timeslot::new(4, 5).is_some());
        assert!(Timeslot::new(5, 0).is_none());
        assert!(Timeslot::new(0, 6).is_none());
        assert_eq!(Timeslot::all().count(), DAYS * PERIODS);
    }

    #[test]
    fn wire_form_is_one_based() {
        let slot = Timeslot::new(2, 0).unwrap();
        assert_eq!(slot.day_name(), "wednesday");
        assert_eq!(Timeslot::from_wire("Wednesday", 1), Some(slot));
        assert_eq!(Timeslot::from_wire("sunday", 1), None);
        assert_eq!(Timeslot::from_wire("monday", 0), None);
    }

    #[test]
    fn counter_tracks_increments() {
        let c = CapacityCounter::new();
        let slot = Timeslot::new(2, 3).unwrap();
        c.inc_by(slot, 50);
        c.dec(slot);
        c.dec(slot);
        c.inc(slot);
        assert_eq!(c.get(slot), 49);

        c.inc_all();
        assert_eq!(c.get(slot), 50);
        assert_eq!(c.get(Timeslot::new(0, 0).unwrap()), 1);
        assert_eq!(c.total(), 50 + 29);
    }
}
