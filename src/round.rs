// ============================================
// src/round.rs
// 1問ぶんの選択肢と正解を決める
// ============================================

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use thiserror::Error;

use std::collections::HashSet;

use crate::symbols::SymbolCollection;

/// 1問あたりの選択肢の数
pub const CHOICE_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("No symbols left to build a round from")]
    EmptyPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    Correct,
    Incorrect,
}

/// 1問ぶんの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    target_name: String,
    /// 重複なし、必ず `target_name` を含む
    choices: Vec<String>,
}

impl Round {
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }
}

/// 回答の判定 (完全一致のみ正解)
pub fn evaluate_guess(round: &Round, guessed_name: &str) -> GuessOutcome {
    if guessed_name == round.target_name {
        GuessOutcome::Correct
    } else {
        GuessOutcome::Incorrect
    }
}

/// 出題エンジン。乱数は差し替え可能 (テストでは固定シード)
pub struct RoundEngine<R = StdRng> {
    rng: R,
}

impl RoundEngine<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for RoundEngine<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RoundEngine<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// MARK:次の問題を作る
    ///
    /// 直前の正解は (何回出てきても) 全部候補から外す
    pub fn start_round(
        &mut self,
        pool: &SymbolCollection,
        previous_target: Option<&str>,
    ) -> Result<Round, RoundError> {
        let mut seen = HashSet::new();
        let mut candidates: Vec<&str> = pool
            .names()
            .filter(|name| Some(*name) != previous_target)
            .filter(|name| seen.insert(*name))
            .collect();

        candidates.shuffle(&mut self.rng);
        candidates.truncate(CHOICE_COUNT);

        let target_name = candidates
            .choose(&mut self.rng)
            .ok_or(RoundError::EmptyPool)?
            .to_string();

        Ok(Round {
            target_name,
            choices: candidates.into_iter().map(str::to_owned).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::collection_of;

    fn engine(seed: u64) -> RoundEngine {
        RoundEngine::with_rng(StdRng::seed_from_u64(seed))
    }

    fn assert_distinct(choices: &[String]) {
        let unique: HashSet<_> = choices.iter().collect();
        assert_eq!(unique.len(), choices.len(), "duplicate choices: {choices:?}");
    }

    #[test]
    fn excludes_previous_target() {
        let pool = collection_of(&["a", "b", "c", "d", "e", "f"]);
        for seed in 0..50 {
            let round = engine(seed).start_round(&pool, Some("a")).unwrap();
            assert_eq!(round.choices().len(), 5);
            assert!(!round.choices().iter().any(|c| c == "a"));
            assert!(round.choices().iter().any(|c| c == round.target_name()));
            assert_ne!(round.target_name(), "a");
            assert_distinct(round.choices());
        }
    }

    #[test]
    fn only_previous_target_left_is_empty_pool() {
        let pool = collection_of(&["x"]);
        let err = engine(1).start_round(&pool, Some("x")).unwrap_err();
        assert_eq!(err, RoundError::EmptyPool);
    }

    #[test]
    fn empty_pool_is_error() {
        let err = engine(1).start_round(&SymbolCollection::new(), None).unwrap_err();
        assert_eq!(err, RoundError::EmptyPool);
    }

    #[test]
    fn removes_every_copy_of_previous_target() {
        let pool = collection_of(&["x", "y", "x", "x"]);
        for seed in 0..20 {
            let round = engine(seed).start_round(&pool, Some("x")).unwrap();
            assert_eq!(round.choices(), ["y".to_string()]);
            assert_eq!(round.target_name(), "y");
        }
    }

    #[test]
    fn small_pool_gives_fewer_choices() {
        let pool = collection_of(&["a", "b", "c"]);
        let round = engine(7).start_round(&pool, None).unwrap();
        assert_eq!(round.choices().len(), 3);
        assert_distinct(round.choices());
    }

    #[test]
    fn duplicates_in_pool_never_repeat_in_choices() {
        let pool = collection_of(&["a", "b", "a", "c", "b", "d", "a"]);
        for seed in 0..50 {
            let round = engine(seed).start_round(&pool, None).unwrap();
            assert_eq!(round.choices().len(), 4);
            assert_distinct(round.choices());
        }
    }

    #[test]
    fn large_pool_caps_at_five() {
        let names: Vec<String> = (0..40).map(|i| format!("symbol.{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let pool = collection_of(&refs);
        let round = engine(3).start_round(&pool, Some("symbol.0")).unwrap();
        assert_eq!(round.choices().len(), CHOICE_COUNT);
        assert_distinct(round.choices());
    }

    #[test]
    fn unknown_previous_target_changes_nothing() {
        let pool = collection_of(&["a", "b"]);
        let round = engine(5).start_round(&pool, Some("zzz")).unwrap();
        assert_eq!(round.choices().len(), 2);
    }

    #[test]
    fn same_seed_same_round() {
        let pool = collection_of(&["a", "b", "c", "d", "e", "f", "g"]);
        let first = engine(42).start_round(&pool, None).unwrap();
        let second = engine(42).start_round(&pool, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn guess_must_match_exactly() {
        let round = Round {
            target_name: "star.fill".into(),
            choices: vec!["star.fill".into(), "moon".into()],
        };
        assert_eq!(evaluate_guess(&round, "star.fill"), GuessOutcome::Correct);
        assert_eq!(evaluate_guess(&round, "moon"), GuessOutcome::Incorrect);
        assert_eq!(evaluate_guess(&round, "Star.Fill"), GuessOutcome::Incorrect);
        assert_eq!(evaluate_guess(&round, "star.fill "), GuessOutcome::Incorrect);
        assert_eq!(evaluate_guess(&round, "not.a.choice"), GuessOutcome::Incorrect);
    }
}
