use parking_lot::Mutex;
use std::collections::HashMap;

/// Running rating aggregate for one record
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rating {
    pub count: u32,
    pub sum: f64,
}

impl Rating {
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / f64::from(self.count)
    }
}

pub trait RatingStore: Send + Sync {
    /// Record one score and return the updated aggregate
    fn add(&self, record_id: &str, score: f64) -> Rating;
}

/// Every access mutates, so a plain mutex rather than a reader/writer lock
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    ratings: Mutex<HashMap<String, Rating>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn add(&self, record_id: &str, score: f64) -> Rating {
        let mut ratings = self.ratings.lock();
        let rating = ratings.entry(record_id.to_string()).or_default();
        rating.count += 1;
        rating.sum += score;
        *rating
    }
}
