//! Picks the best-matching candidate from a score vector and phrases the result.

use image::DynamicImage;
use ndarray::Array1;
use serde::Serialize;

use crate::core::candidates::LocationCandidate;
use crate::core::scorer::Scorer;
use crate::error::{AppError, Result};

/// Similarity percentage at or below which the low-confidence message is used.
pub const CONFIDENCE_THRESHOLD: f64 = 75.0;

/// Outcome of ranking one image against its candidates.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    /// Index of the winning candidate
    pub index: usize,
    /// Original (untranslated) name of the winning candidate
    pub location: String,
    /// Softmax probability of the winner, in percent
    pub percentage: f64,
    /// Softmax distribution over all candidates, aligned with the input
    pub probabilities: Vec<f64>,
}

impl Ranking {
    /// Whether the winner clears the confidence threshold
    pub fn is_confident(&self) -> bool {
        is_confident(self.percentage)
    }

    /// The message returned to the user
    pub fn message(&self) -> String {
        if self.is_confident() {
            format!(
                "이 이미지는 {}가 가장 유사도가 높습니다. 유사도는 {:.2}%입니다.",
                self.location, self.percentage
            )
        } else {
            format!(
                "입력하신 지역들은 이미지와 유사도가 낮아 정확하게 찾아줄 수는 없습니다.\
                 \n그러나 이 이미지는 현재 입력하신 지역 중 {}가 가장 유사도가 높습니다. \
                 유사도는 {:.2}%입니다.",
                self.location, self.percentage
            )
        }
    }
}

/// Threshold check; the boundary itself counts as low confidence.
pub fn is_confident(percentage: f64) -> bool {
    percentage > CONFIDENCE_THRESHOLD
}

/// Softmax over raw scores, shifted by the maximum for numerical stability.
pub fn softmax(scores: &[f32]) -> Array1<f64> {
    let scores: Array1<f64> = scores.iter().map(|&s| s as f64).collect();
    let max = scores.fold(f64::NEG_INFINITY, |acc, &s| acc.max(s));
    let exp = scores.mapv(|s| (s - max).exp());
    let sum = exp.sum();
    exp / sum
}

/// Index of the largest score. Ties resolve to the first occurrence.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Rank candidates given the raw scores produced for them.
pub fn rank(candidates: &[LocationCandidate], scores: &[f32]) -> Result<Ranking> {
    if candidates.is_empty() {
        return Err(AppError::InvalidInput(
            "at least one location candidate is required".to_string(),
        ));
    }
    if scores.len() != candidates.len() {
        return Err(AppError::Scoring(format!(
            "scorer returned {} scores for {} candidates",
            scores.len(),
            candidates.len()
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(AppError::Scoring(format!("non-finite score {}", bad)));
    }

    let probabilities = softmax(scores);
    let index = argmax(scores)
        .ok_or_else(|| AppError::Scoring("empty score vector".to_string()))?;

    Ok(Ranking {
        index,
        location: candidates[index].original.clone(),
        percentage: probabilities[index] * 100.0,
        probabilities: probabilities.to_vec(),
    })
}

/// Score `image` against the translated candidate names and rank the result.
pub async fn best_match(
    scorer: &dyn Scorer,
    image: &DynamicImage,
    candidates: &[LocationCandidate],
) -> Result<Ranking> {
    if candidates.is_empty() {
        return Err(AppError::InvalidInput(
            "at least one location candidate is required".to_string(),
        ));
    }

    let labels: Vec<String> = candidates.iter().map(|c| c.translated.clone()).collect();
    let scores = scorer.score(image, &labels).await?;
    log::debug!("{} scores from {}: {:?}", scores.len(), scorer.name(), scores);

    rank(candidates, &scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn candidates(names: &[(&str, &str)]) -> Vec<LocationCandidate> {
        names
            .iter()
            .map(|(o, t)| LocationCandidate::new(*o, *t))
            .collect()
    }

    struct FixedScorer(Vec<f32>);

    #[async_trait]
    impl Scorer for FixedScorer {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn score(&self, _image: &DynamicImage, _labels: &[String]) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_seoul_busan_example() {
        let cands = candidates(&[("서울", "Seoul"), ("부산", "Busan")]);
        let ranking = rank(&cands, &[2.0, 8.0]).unwrap();

        assert_eq!(ranking.index, 1);
        assert_eq!(ranking.location, "부산");
        assert!((ranking.probabilities[0] - 0.0025).abs() < 1e-4);
        assert!((ranking.probabilities[1] - 0.9975).abs() < 1e-4);
        assert!((ranking.percentage - 99.75).abs() < 0.01);
        assert!(ranking.is_confident());
        assert_eq!(
            ranking.message(),
            "이 이미지는 부산가 가장 유사도가 높습니다. 유사도는 99.75%입니다."
        );
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let scores = [0.3, -1.2, 4.5, 4.4, 10.0, -20.0];
        let probs = softmax(&scores);
        assert!((probs.sum() - 1.0).abs() < 1e-9);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_softmax_large_logits_do_not_overflow() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-9);
        assert!((probs[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_argmax_first_occurrence_wins() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax(&[-5.0]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_selected_index_matches_raw_argmax() {
        let cands = candidates(&[("a", "a"), ("b", "b"), ("c", "c"), ("d", "d")]);
        for scores in [
            [0.1, 0.2, 0.3, 0.4],
            [9.0, 0.2, 0.3, 0.4],
            [-1.0, -2.0, -0.5, -3.0],
            [2.0, 2.0, 1.0, 1.0],
        ] {
            let ranking = rank(&cands, &scores).unwrap();
            assert_eq!(Some(ranking.index), argmax(&scores));
            assert_eq!(ranking.location, cands[ranking.index].original);
        }
    }

    #[test]
    fn test_threshold_boundary_is_low_confidence() {
        assert!(!is_confident(75.0));
        assert!(is_confident(75.01));
        assert!(!is_confident(12.5));

        let ranking = Ranking {
            index: 0,
            location: "제주".to_string(),
            percentage: 75.0,
            probabilities: vec![0.75, 0.25],
        };
        let message = ranking.message();
        assert!(message.starts_with("입력하신 지역들은 이미지와 유사도가 낮아"));
        assert!(message.contains("\n그러나 이 이미지는 현재 입력하신 지역 중 제주가"));
        assert!(message.ends_with("유사도는 75.00%입니다."));
    }

    #[test]
    fn test_uniform_scores_are_low_confidence() {
        let cands = candidates(&[("서울", "Seoul"), ("부산", "Busan"), ("대구", "Daegu")]);
        let ranking = rank(&cands, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(ranking.location, "서울");
        assert!(!ranking.is_confident());
        assert!(ranking.message().contains("33.33%"));
    }

    #[test]
    fn test_rank_rejects_empty_candidates() {
        let err = rank(&[], &[]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_rank_rejects_misaligned_scores() {
        let cands = candidates(&[("서울", "Seoul"), ("부산", "Busan")]);
        let err = rank(&cands, &[1.0]).unwrap_err();
        assert!(matches!(err, AppError::Scoring(_)));
    }

    #[test]
    fn test_rank_rejects_nan() {
        let cands = candidates(&[("서울", "Seoul"), ("부산", "Busan")]);
        let err = rank(&cands, &[f32::NAN, 1.0]).unwrap_err();
        assert!(matches!(err, AppError::Scoring(_)));
    }

    #[tokio::test]
    async fn test_best_match_uses_scorer_output() {
        let scorer = FixedScorer(vec![2.0, 8.0]);
        let image = DynamicImage::new_rgb8(4, 4);
        let cands = candidates(&[("서울", "Seoul"), ("부산", "Busan")]);

        let ranking = best_match(&scorer, &image, &cands).await.unwrap();
        assert_eq!(ranking.location, "부산");
    }
}
