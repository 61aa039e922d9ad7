// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use thiserror::Error as DError;

#[derive(Debug, Clone, PartialEq, DError)]
pub enum ErrorKind {
    #[error("Empty ratings, nothing to train on")]
    EmptyRatings,

    #[error("Invalid rating range [{0}, {1}]")]
    InvalidRatingRange(f64, f64),

    #[error("Invalid normal distribution (mean {0}, stdev {1})")]
    InvalidDistribution(f64, f64),

    #[error("Method '{0}' requires a user relation")]
    MissingUserRelation(String),

    #[error("Method '{0}' requires {1} attributes")]
    MissingAttributes(String, &'static str),

    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("Invalid neighbor count '{0}', expected a positive integer or 'inf'")]
    InvalidNeighborCount(String),

    #[error("Non finite value while {0}")]
    NonFinite(&'static str),
}
