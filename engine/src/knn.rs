// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::{
    baseline::UserItemBaseline,
    correlation::{CorrelationMatrix, Method},
    error::ErrorKind,
    Recommender, Result,
};
use config::{KnnConfig, RatingsConfig};
use controller::{RatingEvent, Ratings, SparseBooleanMatrix};
use rand::RngCore;
use std::{fmt, str::FromStr};

/// How many neighbors take part in a prediction
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NeighborCount {
    Bounded(usize),
    Unbounded,
}

impl NeighborCount {
    pub fn limit(self) -> Option<usize> {
        match self {
            NeighborCount::Bounded(k) => Some(k),
            NeighborCount::Unbounded => None,
        }
    }
}

impl From<Option<usize>> for NeighborCount {
    fn from(k: Option<usize>) -> Self {
        match k {
            Some(k) => NeighborCount::Bounded(k),
            None => NeighborCount::Unbounded,
        }
    }
}

impl FromStr for NeighborCount {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("inf") {
            return Ok(NeighborCount::Unbounded);
        }

        match s.parse::<usize>() {
            Ok(k) if k > 0 => Ok(NeighborCount::Bounded(k)),
            _ => Err(ErrorKind::InvalidNeighborCount(s.to_owned())),
        }
    }
}

impl fmt::Display for NeighborCount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NeighborCount::Bounded(k) => write!(f, "{}", k),
            NeighborCount::Unbounded => write!(f, "inf"),
        }
    }
}

/// Whether correlations are computed between users or between items
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Orientation {
    Users,
    Items,
}

/// Neighborhood rating predictor on top of a user/item baseline.
///
/// A prediction is the baseline plus the correlation weighted deviations of
/// the neighbors from their own baseline. Correlations are built once by
/// `train` and refreshed row by row when ratings are added afterwards.
pub struct Knn {
    orientation: Orientation,
    method: Method,
    k: NeighborCount,
    reg_u: f64,
    reg_i: f64,
    update_users: bool,
    update_items: bool,
    min_rating: f64,
    max_rating: f64,

    ratings: Ratings,
    data_user: SparseBooleanMatrix,
    data_item: SparseBooleanMatrix,
    baseline: UserItemBaseline,
    correlation: CorrelationMatrix,
}

impl Knn {
    pub fn new(
        orientation: Orientation,
        method: Method,
        knn: &KnnConfig,
        range: &RatingsConfig,
        ratings: Ratings,
    ) -> Self {
        let data_user = ratings.user_items();
        let data_item = ratings.item_users();

        Self {
            orientation,
            method,
            k: knn.k.into(),
            reg_u: knn.reg_u,
            reg_i: knn.reg_i,
            update_users: knn.update_users,
            update_items: knn.update_items,
            min_rating: range.min_rating,
            max_rating: range.max_rating,
            ratings,
            data_user,
            data_item,
            baseline: UserItemBaseline::new(knn.reg_u, knn.reg_i),
            correlation: CorrelationMatrix::new(0, method),
        }
    }

    pub fn with_k(mut self, k: NeighborCount) -> Self {
        self.k = k;
        self
    }

    pub fn k(&self) -> NeighborCount {
        self.k
    }

    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    pub fn ratings(&self) -> &Ratings {
        &self.ratings
    }

    fn rows(&self) -> &SparseBooleanMatrix {
        match self.orientation {
            Orientation::Users => &self.data_user,
            Orientation::Items => &self.data_item,
        }
    }

    pub fn fit(&mut self) -> Result<()> {
        self.baseline.train(&self.ratings)?;
        self.correlation = CorrelationMatrix::create(self.rows(), self.method);

        log::debug!(
            "Correlation matrix over {} {:?} built",
            self.correlation.size(),
            self.orientation
        );
        Ok(())
    }

    /// Refreshes everything derived from `user_id`'s row
    pub fn retrain_user(&mut self, user_id: usize) {
        self.baseline.retrain_user(&self.ratings, user_id);

        if self.orientation == Orientation::Users && self.update_users {
            self.correlation.update_row(&self.data_user, user_id);
        }
    }

    /// Refreshes everything derived from `item_id`'s row
    pub fn retrain_item(&mut self, item_id: usize) {
        self.baseline.retrain_item(&self.ratings, item_id);

        if self.orientation == Orientation::Items && self.update_items {
            self.correlation.update_row(&self.data_item, item_id);
        }
    }

    pub fn add_rating(&mut self, user_id: usize, item_id: usize, rating: f64) {
        self.ratings.add(RatingEvent::new(user_id, item_id, rating));
        self.data_user.set(user_id, item_id, true);
        self.data_item.set(item_id, user_id, true);

        self.retrain_user(user_id);
        self.retrain_item(item_id);
    }

    fn clamp(&self, value: f64) -> f64 {
        value.max(self.min_rating).min(self.max_rating)
    }

    fn neighbor_deviation(&self, user_id: usize, item_id: usize) -> Option<f64> {
        let (row, candidates) = match self.orientation {
            Orientation::Users => (user_id, self.data_item.row(item_id)?),
            Orientation::Items => (item_id, self.data_user.row(user_id)?),
        };

        let neighbors =
            self.correlation
                .neighbors(row, candidates.iter().copied(), self.k.limit());

        let mut sum = 0.0;
        let mut norm = 0.0;
        for neighbor in neighbors {
            let (u, i) = match self.orientation {
                Orientation::Users => (neighbor.id(), item_id),
                Orientation::Items => (user_id, neighbor.id()),
            };

            let rating = self.ratings.get(u, i)?;
            sum += neighbor.score() * (rating - self.baseline.predict(u, i));
            norm += neighbor.score().abs();
        }

        if norm > 0.0 {
            Some(sum / norm)
        } else {
            None
        }
    }
}

impl Recommender for Knn {
    fn train(&mut self, _rng: &mut dyn RngCore) -> Result<()> {
        self.fit()
    }

    fn predict(&self, user_id: usize, item_id: usize) -> f64 {
        let baseline = self.baseline.predict(user_id, item_id);

        let prediction = match self.neighbor_deviation(user_id, item_id) {
            Some(deviation) => baseline + deviation,
            None => baseline,
        };

        self.clamp(prediction)
    }
}

impl fmt::Display for Knn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let prefix = match self.orientation {
            Orientation::Users => "user",
            Orientation::Items => "item",
        };

        write!(
            f,
            "{}-kNN-{} k={} reg_u={} reg_i={}",
            prefix, self.method, self.k, self.reg_u, self.reg_i
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn ratings() -> Ratings {
        vec![
            (0, 0, 5.0),
            (0, 1, 1.0),
            (1, 1, 5.0),
            (1, 2, 1.0),
            (2, 0, 5.0),
            (2, 2, 1.0),
        ]
        .into_iter()
        .collect()
    }

    fn trained(orientation: Orientation, ratings: Ratings) -> Knn {
        let mut knn = Knn::new(
            orientation,
            Method::Cosine,
            &KnnConfig::default(),
            &RatingsConfig::default(),
            ratings,
        );

        knn.train(&mut StdRng::seed_from_u64(0)).unwrap();
        knn
    }

    #[test]
    fn neighbor_count_from_str() {
        assert_eq!("inf".parse::<NeighborCount>(), Ok(NeighborCount::Unbounded));
        assert_eq!("80".parse::<NeighborCount>(), Ok(NeighborCount::Bounded(80)));
        assert!("0".parse::<NeighborCount>().is_err());
        assert!("many".parse::<NeighborCount>().is_err());
    }

    #[test]
    fn retrain_user_matches_full_rebuild() {
        let mut incremental = trained(Orientation::Users, ratings());
        incremental.add_rating(3, 0, 4.0);
        incremental.add_rating(3, 1, 2.0);

        let mut all = ratings();
        all.add(RatingEvent::new(3, 0, 4.0));
        all.add(RatingEvent::new(3, 1, 2.0));
        let rebuilt = trained(Orientation::Users, all);

        assert_eq!(incremental.correlation().size(), rebuilt.correlation().size());
        for v in 0..rebuilt.correlation().size() {
            assert_approx_eq!(
                incremental.correlation().get(3, v),
                rebuilt.correlation().get(3, v)
            );
        }
    }

    #[test]
    fn stale_correlations_without_update_users() {
        let config = KnnConfig {
            update_users: false,
            ..KnnConfig::default()
        };

        let mut knn = Knn::new(
            Orientation::Users,
            Method::Cosine,
            &config,
            &RatingsConfig::default(),
            ratings(),
        );
        knn.fit().unwrap();

        let before = knn.correlation().get(0, 2);
        knn.add_rating(0, 2, 3.0);

        assert_approx_eq!(knn.correlation().get(0, 2), before);
    }

    #[test]
    fn retrain_item_matches_full_rebuild() {
        let mut incremental = trained(Orientation::Items, ratings());
        incremental.add_rating(0, 3, 4.0);
        incremental.add_rating(2, 3, 2.0);

        let mut all = ratings();
        all.add(RatingEvent::new(0, 3, 4.0));
        all.add(RatingEvent::new(2, 3, 2.0));
        let rebuilt = trained(Orientation::Items, all);

        assert_eq!(incremental.correlation().size(), rebuilt.correlation().size());
        for j in 0..rebuilt.correlation().size() {
            assert_approx_eq!(
                incremental.correlation().get(3, j),
                rebuilt.correlation().get(3, j)
            );
        }

        assert!(incremental.correlation().get(3, 0) > 0.0);
    }

    #[test]
    fn stale_correlations_without_update_items() {
        let config = KnnConfig {
            update_items: false,
            ..KnnConfig::default()
        };

        let mut knn = Knn::new(
            Orientation::Items,
            Method::Cosine,
            &config,
            &RatingsConfig::default(),
            ratings(),
        );
        knn.fit().unwrap();

        let before = knn.correlation().get(0, 1);
        knn.add_rating(1, 0, 3.0);

        assert_approx_eq!(knn.correlation().get(0, 1), before);

        let mut rebuilt = ratings();
        rebuilt.add(RatingEvent::new(1, 0, 3.0));
        let rebuilt = trained(Orientation::Items, rebuilt);
        assert!((rebuilt.correlation().get(0, 1) - before).abs() > 1e-9);
    }

    #[test]
    fn predictions_stay_in_range() {
        for &orientation in &[Orientation::Users, Orientation::Items] {
            let knn = trained(orientation, ratings());

            for u in 0..5 {
                for i in 0..5 {
                    let prediction = knn.predict(u, i);
                    assert!(prediction >= 1.0 && prediction <= 5.0);
                }
            }
        }
    }

    #[test]
    fn no_neighbors_falls_back_to_baseline() {
        let knn = trained(Orientation::Users, ratings());

        // Nobody rated item 7, the baseline is just the global average + user bias
        let baseline = knn.baseline.predict(0, 7);
        assert_approx_eq!(knn.predict(0, 7), baseline);
    }

    #[test]
    fn unbounded_k_uses_all_neighbors() {
        let knn = trained(Orientation::Users, ratings()).with_k(NeighborCount::Bounded(100));
        let unbounded = trained(Orientation::Users, ratings()).with_k(NeighborCount::Unbounded);

        assert_approx_eq!(knn.predict(0, 2), unbounded.predict(0, 2));
    }

    #[test]
    fn display_names_orientation() {
        let knn = trained(Orientation::Items, ratings());
        assert_eq!(knn.to_string(), "item-kNN-cosine k=inf reg_u=10 reg_i=5");
    }
}
