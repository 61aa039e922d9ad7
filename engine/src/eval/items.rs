// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use super::EvaluationResult;
use crate::{
    scored::{rank, ScoredId},
    Recommender,
};
use controller::SparseBooleanMatrix;
use std::collections::BTreeSet;

/// Names of the ranking metrics, in output order
pub const MEASURES: [&str; 7] = ["AUC", "prec@5", "prec@10", "MAP", "NDCG", "num_users", "num_items"];

/// Ranking quality of `model` on held out positive feedback.
///
/// For every test user the candidates are the relevant items the user has
/// not seen in training, the correct items are the candidates present in
/// the test data. Users without correct or without incorrect candidates are
/// skipped, the remaining ones are averaged with equal weight.
pub fn evaluate(
    model: &dyn Recommender,
    test: &SparseBooleanMatrix,
    train: &SparseBooleanMatrix,
    relevant_items: &BTreeSet<usize>,
) -> EvaluationResult {
    let mut auc_sum = 0.0;
    let mut prec_5_sum = 0.0;
    let mut prec_10_sum = 0.0;
    let mut map_sum = 0.0;
    let mut ndcg_sum = 0.0;
    let mut num_users = 0;

    for user_id in test.non_empty_row_ids() {
        let candidates: Vec<usize> = relevant_items
            .iter()
            .copied()
            .filter(|&item_id| !train.get(user_id, item_id))
            .collect();

        let correct: BTreeSet<usize> = test
            .row_iter(user_id)
            .filter(|item_id| relevant_items.contains(item_id) && !train.get(user_id, *item_id))
            .collect();

        if correct.is_empty() || correct.len() == candidates.len() {
            continue;
        }

        let mut scored: Vec<_> = candidates
            .into_iter()
            .map(|item_id| ScoredId(item_id, model.predict(user_id, item_id)))
            .collect();
        rank(&mut scored);

        let ranked: Vec<usize> = scored.iter().map(ScoredId::id).collect();

        auc_sum += auc(&ranked, &correct);
        prec_5_sum += precision_at(&ranked, &correct, 5);
        prec_10_sum += precision_at(&ranked, &correct, 10);
        map_sum += average_precision(&ranked, &correct);
        ndcg_sum += ndcg(&ranked, &correct);
        num_users += 1;
    }

    if num_users == 0 {
        log::warn!("No test user could be evaluated");
    }

    let mean = |sum: f64| {
        if num_users > 0 {
            sum / num_users as f64
        } else {
            0.0
        }
    };

    EvaluationResult::with(vec![
        ("AUC", mean(auc_sum)),
        ("prec@5", mean(prec_5_sum)),
        ("prec@10", mean(prec_10_sum)),
        ("MAP", mean(map_sum)),
        ("NDCG", mean(ndcg_sum)),
        ("num_users", num_users as f64),
        ("num_items", relevant_items.len() as f64),
    ])
}

/// Fraction of (correct, incorrect) pairs ranked in the right order
pub fn auc(ranked: &[usize], correct: &BTreeSet<usize>) -> f64 {
    let num_correct = ranked.iter().filter(|item| correct.contains(item)).count();
    let num_eval_pairs = (ranked.len() - num_correct) * num_correct;
    if num_eval_pairs == 0 {
        return 0.0;
    }

    let mut num_correct_pairs = 0;
    let mut hit_count = 0;
    for item in ranked {
        if correct.contains(item) {
            hit_count += 1;
        } else {
            num_correct_pairs += hit_count;
        }
    }

    num_correct_pairs as f64 / num_eval_pairs as f64
}

/// Correct items among the first `n`, divided by `n`
pub fn precision_at(ranked: &[usize], correct: &BTreeSet<usize>, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }

    let hits = ranked.iter().take(n).filter(|item| correct.contains(item)).count();
    hits as f64 / n as f64
}

pub fn average_precision(ranked: &[usize], correct: &BTreeSet<usize>) -> f64 {
    let mut hit_count = 0;
    let mut sum = 0.0;

    for (position, item) in ranked.iter().enumerate() {
        if correct.contains(item) {
            hit_count += 1;
            sum += hit_count as f64 / (position + 1) as f64;
        }
    }

    if hit_count == 0 {
        0.0
    } else {
        sum / correct.len() as f64
    }
}

/// Normalized discounted cumulative gain with binary relevance
pub fn ndcg(ranked: &[usize], correct: &BTreeSet<usize>) -> f64 {
    let dcg: f64 = ranked
        .iter()
        .enumerate()
        .filter(|(_, item)| correct.contains(item))
        .map(|(position, _)| 1.0 / ((position + 2) as f64).log2())
        .sum();

    let num_correct = ranked.iter().filter(|item| correct.contains(item)).count();
    let ideal: f64 = (0..num_correct)
        .map(|position| 1.0 / ((position + 2) as f64).log2())
        .sum();

    if ideal > 0.0 {
        dcg / ideal
    } else {
        0.0
    }
}
