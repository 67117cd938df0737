//! Temporal presence tracking of detected classes.
use std::time::{Duration, Instant};

/// Observations a class must exceed before it counts as confirmed.
pub const FRAME_COUNT_THRESHOLD: u32 = 10;

/// How long a class stays active after it was last seen.
pub const SECONDS_THRESHOLD: Duration = Duration::from_millis(1000);

/// Per-class observation counter with a freshness timestamp.
#[derive(Debug, Clone)]
pub struct PresenceRecord {
    pub class_name: String,
    pub count: u32,
    pub last_seen: Instant,
}

impl PresenceRecord {
    fn new(class_name: &str, now: Instant) -> Self {
        Self {
            class_name: class_name.to_owned(),
            count: 1,
            last_seen: now,
        }
    }

    /// Whether the class has been observed often enough to be confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.count > FRAME_COUNT_THRESHOLD
    }
}

/// Insertion-ordered set of active presence records.
///
/// Counts only grow while a class keeps reappearing; the sole way down is
/// full removal once the class has not been seen for [`SECONDS_THRESHOLD`].
/// There is deliberately no decay.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    records: Vec<PresenceRecord>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame's observed class names.
    ///
    /// Every observed name bumps its record by exactly one and refreshes
    /// its timestamp; first sightings create a record with count 1. Classes
    /// absent from the frame are left untouched.
    pub fn observe<'a>(&mut self, names: impl IntoIterator<Item = &'a str>, now: Instant) {
        for name in names {
            match self.records.iter_mut().find(|rec| rec.class_name == name) {
                Some(rec) => {
                    rec.count = rec.count.saturating_add(1);
                    rec.last_seen = now;
                }
                None => self.records.push(PresenceRecord::new(name, now)),
            }
        }
    }

    /// Drop every record not seen within [`SECONDS_THRESHOLD`] of `now`.
    ///
    /// Staleness is only ever checked here; between calls, stale records
    /// stay visible and can even be refreshed again.
    pub fn expire(&mut self, now: Instant) {
        self.records
            .retain(|rec| now.duration_since(rec.last_seen) <= SECONDS_THRESHOLD);
    }

    /// Names of confirmed classes, in record insertion order.
    pub fn confirmed_names(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|rec| rec.is_confirmed())
            .map(|rec| rec.class_name.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&PresenceRecord> {
        self.records.iter().find(|rec| rec.class_name == name)
    }

    pub fn records(&self) -> &[PresenceRecord] {
        &self.records
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn first_sighting_creates_a_record() {
        let mut tracker = PresenceTracker::new();
        let now = Instant::now();

        tracker.observe(["cola"], now);

        let rec = tracker.get("cola").expect("record");
        assert_eq!(rec.count, 1);
        assert_eq!(rec.last_seen, now);
    }

    #[test]
    fn each_appearance_increments_by_one() {
        let mut tracker = PresenceTracker::new();
        let start = Instant::now();

        for frame in 0..7u64 {
            tracker.observe(["cola"], start + millis(frame * 30));
        }

        assert_eq!(tracker.get("cola").map(|rec| rec.count), Some(7));
    }

    #[test]
    fn two_boxes_of_one_class_in_a_frame_count_twice() {
        let mut tracker = PresenceTracker::new();
        let now = Instant::now();

        tracker.observe(["cola", "cola"], now);

        assert_eq!(tracker.get("cola").map(|rec| rec.count), Some(2));
    }

    #[test]
    fn absence_leaves_other_records_untouched() {
        let mut tracker = PresenceTracker::new();
        let start = Instant::now();

        tracker.observe(["cola", "chips"], start);
        tracker.observe(["chips"], start + millis(30));

        assert_eq!(tracker.get("cola").map(|rec| rec.count), Some(1));
        assert_eq!(tracker.get("cola").map(|rec| rec.last_seen), Some(start));
        assert_eq!(tracker.get("chips").map(|rec| rec.count), Some(2));
    }

    #[test]
    fn expiry_is_strictly_after_the_window() {
        let mut tracker = PresenceTracker::new();
        let start = Instant::now();
        tracker.observe(["cola"], start);

        tracker.expire(start + millis(1000));
        assert!(tracker.get("cola").is_some());

        tracker.expire(start + millis(1001));
        assert!(tracker.get("cola").is_none());
    }

    #[test]
    fn stale_records_survive_until_expire_runs() {
        let mut tracker = PresenceTracker::new();
        let start = Instant::now();
        tracker.observe(["cola"], start);

        // Well past the window, but nothing expired it yet; a new sighting
        // refreshes the same record.
        tracker.observe(["cola"], start + millis(5000));

        assert_eq!(tracker.get("cola").map(|rec| rec.count), Some(2));

        tracker.expire(start + millis(5500));
        assert!(tracker.get("cola").is_some());
    }

    #[test]
    fn confirmation_needs_more_than_the_threshold() {
        let mut tracker = PresenceTracker::new();
        let start = Instant::now();

        for frame in 0..FRAME_COUNT_THRESHOLD as u64 {
            tracker.observe(["cola"], start + millis(frame * 30));
        }
        assert!(tracker.confirmed_names().is_empty());

        tracker.observe(["cola"], start + millis(330));
        assert_eq!(tracker.confirmed_names(), vec!["cola".to_string()]);
    }

    #[test]
    fn confirmed_names_keep_insertion_order() {
        let mut tracker = PresenceTracker::new();
        let start = Instant::now();

        for frame in 0..12u64 {
            tracker.observe(["soap", "cola"], start + millis(frame * 30));
        }

        assert_eq!(
            tracker.confirmed_names(),
            vec!["soap".to_string(), "cola".to_string()]
        );
    }

    #[test]
    fn count_grows_without_bound_while_present() {
        let mut tracker = PresenceTracker::new();
        let start = Instant::now();

        for frame in 0..500u64 {
            tracker.observe(["cola"], start + millis(frame));
            tracker.expire(start + millis(frame));
        }

        assert_eq!(tracker.get("cola").map(|rec| rec.count), Some(500));
    }

    #[test]
    fn expiry_discards_the_count_entirely() {
        let mut tracker = PresenceTracker::new();
        let start = Instant::now();

        for frame in 0..20u64 {
            tracker.observe(["cola"], start + millis(frame * 30));
        }
        tracker.expire(start + millis(2000));
        assert!(tracker.get("cola").is_none());

        tracker.observe(["cola"], start + millis(2100));
        assert_eq!(tracker.get("cola").map(|rec| rec.count), Some(1));
    }
}
