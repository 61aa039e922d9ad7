// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use super::EvaluationResult;
use crate::Recommender;
use controller::Ratings;

pub const MEASURES: [&str; 2] = ["RMSE", "MAE"];

/// Prediction accuracy of `model` on held out ratings
pub fn evaluate(model: &dyn Recommender, test: &Ratings) -> EvaluationResult {
    let mut squared = 0.0;
    let mut absolute = 0.0;

    for event in test.all() {
        let error = model.predict(event.user_id, event.item_id) - event.rating;
        squared += error * error;
        absolute += error.abs();
    }

    let (rmse, mae) = if test.is_empty() {
        (0.0, 0.0)
    } else {
        let n = test.len() as f64;
        ((squared / n).sqrt(), absolute / n)
    };

    EvaluationResult::with(vec![("RMSE", rmse), ("MAE", mae)])
}
