//! Pseudo-randomised block and trial structure, built once per session.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use stride_core::Condition;
use tracing::{debug, warn};

use crate::config::DesignConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DesignRow {
    pub block: usize,
    pub trial_in_block: usize,
    pub condition: Condition,
}

/// Ordered trial table; row order is execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDesign {
    rows: Vec<DesignRow>,
    trials_per_block: usize,
}

/// Slow-block count for the non-practice blocks. Ties round to even, so
/// an odd block count with a 0.5 proportion may leave the split uneven
/// by one block; that imbalance is kept.
pub fn slow_block_count(non_practice_blocks: usize, proportion_slow: f32) -> usize {
    let raw = (non_practice_blocks as f32 * proportion_slow).round_ties_even();
    (raw.max(0.0) as usize).min(non_practice_blocks)
}

impl BlockDesign {
    pub fn generate<R: Rng>(cfg: &DesignConfig, rng: &mut R) -> Self {
        let blocks_total = cfg.blocks_total;
        let trials_per_block = cfg.trials_per_block;
        let practice_blocks = if cfg.practice_blocks > blocks_total {
            warn!(
                practice_blocks = cfg.practice_blocks,
                blocks_total, "practice blocks clamped to block count"
            );
            blocks_total
        } else {
            cfg.practice_blocks
        };
        let proportion_slow = if (0.0..=1.0).contains(&cfg.proportion_slow) {
            cfg.proportion_slow
        } else {
            warn!(
                proportion_slow = cfg.proportion_slow,
                "proportion outside [0, 1], clamping"
            );
            if cfg.proportion_slow.is_nan() {
                0.0
            } else {
                cfg.proportion_slow.clamp(0.0, 1.0)
            }
        };
        if cfg.walk_speed_count != 2 {
            warn!(
                walk_speed_count = cfg.walk_speed_count,
                "only slow and natural walking speeds are supported"
            );
        }

        let block_conditions = Self::shuffled_block_conditions(
            blocks_total - practice_blocks,
            if cfg.walk_speed_count < 2 { 0.0 } else { proportion_slow },
            rng,
        );

        let mut rows = Vec::with_capacity(blocks_total * trials_per_block);
        for block in 0..practice_blocks {
            for trial_in_block in 0..trials_per_block {
                let overall = rows.len();
                let condition = if overall < cfg.standing_still_trials {
                    Condition::Stationary
                } else if overall < cfg.standing_still_trials + cfg.practice_slow_trials {
                    Condition::Slow
                } else {
                    Condition::Natural
                };
                rows.push(DesignRow {
                    block,
                    trial_in_block,
                    condition,
                });
            }
        }
        for (offset, &condition) in block_conditions.iter().enumerate() {
            for trial_in_block in 0..trials_per_block {
                rows.push(DesignRow {
                    block: practice_blocks + offset,
                    trial_in_block,
                    condition,
                });
            }
        }

        debug!(
            trials = rows.len(),
            blocks = blocks_total,
            ?block_conditions,
            "block design generated"
        );

        Self {
            rows,
            trials_per_block,
        }
    }

    /// One condition per non-practice block. The first entry is always a
    /// natural block, taken out of the natural allocation before the rest
    /// is shuffled so the overall counts match the rounded split.
    fn shuffled_block_conditions<R: Rng>(
        non_practice: usize,
        proportion_slow: f32,
        rng: &mut R,
    ) -> Vec<Condition> {
        if non_practice == 0 {
            return Vec::new();
        }
        let mut slow = slow_block_count(non_practice, proportion_slow);
        let mut natural = non_practice - slow;
        if natural == 0 {
            // the leading block is always natural, even with an all-slow split
            slow -= 1;
        } else {
            natural -= 1;
        }

        let mut rest: Vec<Condition> = std::iter::repeat_n(Condition::Slow, slow)
            .chain(std::iter::repeat_n(Condition::Natural, natural))
            .collect();
        rest.shuffle(rng);

        let mut out = Vec::with_capacity(non_practice);
        out.push(Condition::Natural);
        out.extend(rest);
        out
    }

    /// Wraps a hand-written table, e.g. one replayed from an earlier session.
    pub fn from_rows(rows: Vec<DesignRow>, trials_per_block: usize) -> Self {
        Self {
            rows,
            trials_per_block,
        }
    }

    pub fn rows(&self) -> &[DesignRow] {
        &self.rows
    }

    pub fn get(&self, trial: usize) -> Option<&DesignRow> {
        self.rows.get(trial)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn trials_per_block(&self) -> usize {
        self.trials_per_block
    }

    /// Condition of each block, taken from its first trial.
    pub fn block_conditions(&self) -> Vec<Condition> {
        self.rows
            .iter()
            .filter(|r| r.trial_in_block == 0)
            .map(|r| r.condition)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cfg(blocks_total: usize, practice_blocks: usize, proportion_slow: f32) -> DesignConfig {
        DesignConfig {
            trials_per_block: 20,
            blocks_total,
            practice_blocks,
            walk_speed_count: 2,
            proportion_slow,
            standing_still_trials: 2,
            practice_slow_trials: 2,
        }
    }

    fn count(conditions: &[Condition], which: Condition) -> usize {
        conditions.iter().filter(|c| **c == which).count()
    }

    #[test]
    fn row_count_covers_every_trial() {
        let mut rng = StdRng::seed_from_u64(1);
        let design = BlockDesign::generate(&cfg(11, 1, 0.5), &mut rng);
        assert_eq!(design.len(), 11 * 20);
        for (i, row) in design.rows().iter().enumerate() {
            assert_eq!(row.block, i / 20);
            assert_eq!(row.trial_in_block, i % 20);
        }
    }

    #[test]
    fn practice_block_opens_stationary_then_slow() {
        let mut rng = StdRng::seed_from_u64(2);
        let design = BlockDesign::generate(&cfg(11, 1, 0.5), &mut rng);
        let practice: Vec<Condition> = design.rows()[..20].iter().map(|r| r.condition).collect();
        assert_eq!(&practice[..2], &[Condition::Stationary; 2]);
        assert_eq!(&practice[2..4], &[Condition::Slow; 2]);
        assert!(practice[4..].iter().all(|c| *c == Condition::Natural));
    }

    #[test]
    fn half_of_ten_blocks_are_slow() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let design = BlockDesign::generate(&cfg(11, 1, 0.5), &mut rng);
            let blocks = design.block_conditions();
            assert_eq!(blocks.len(), 11);
            assert_eq!(count(&blocks[1..], Condition::Slow), 5);
            assert_eq!(count(&blocks[1..], Condition::Natural), 5);
            assert_eq!(blocks[1], Condition::Natural);
        }
    }

    #[test]
    fn odd_block_count_rounds_and_stays_unbalanced() {
        assert_eq!(slow_block_count(3, 0.5), 2);
        assert_eq!(slow_block_count(5, 0.5), 2);
        assert_eq!(slow_block_count(10, 0.5), 5);

        let mut rng = StdRng::seed_from_u64(3);
        let design = BlockDesign::generate(&cfg(4, 1, 0.5), &mut rng);
        let blocks = design.block_conditions();
        assert_eq!(blocks[1], Condition::Natural);
        assert_eq!(count(&blocks[1..], Condition::Slow), 2);
        assert_eq!(count(&blocks[1..], Condition::Natural), 1);
    }

    #[test]
    fn every_trial_in_a_block_shares_its_condition() {
        let mut rng = StdRng::seed_from_u64(4);
        let design = BlockDesign::generate(&cfg(11, 1, 0.5), &mut rng);
        for chunk in design.rows()[20..].chunks(20) {
            assert!(chunk.iter().all(|r| r.condition == chunk[0].condition));
        }
    }

    #[test]
    fn same_seed_same_design() {
        let a = BlockDesign::generate(&cfg(11, 1, 0.5), &mut StdRng::seed_from_u64(9));
        let b = BlockDesign::generate(&cfg(11, 1, 0.5), &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_proportion_is_clamped() {
        let mut rng = StdRng::seed_from_u64(5);
        let design = BlockDesign::generate(&cfg(11, 1, 1.7), &mut rng);
        let blocks = design.block_conditions();
        assert_eq!(blocks[1], Condition::Natural);
        assert_eq!(count(&blocks[1..], Condition::Slow), 9);

        let design = BlockDesign::generate(&cfg(11, 1, -0.3), &mut rng);
        assert_eq!(count(&design.block_conditions()[1..], Condition::Slow), 0);
    }

    #[test]
    fn single_walk_speed_has_no_slow_blocks() {
        let mut c = cfg(6, 1, 0.5);
        c.walk_speed_count = 1;
        let design = BlockDesign::generate(&c, &mut StdRng::seed_from_u64(6));
        assert_eq!(count(&design.block_conditions()[1..], Condition::Slow), 0);
    }

    #[test]
    fn all_practice_has_no_shuffled_blocks() {
        let design = BlockDesign::generate(&cfg(1, 1, 0.5), &mut StdRng::seed_from_u64(7));
        assert_eq!(design.len(), 20);
        assert_eq!(design.block_conditions().len(), 1);
    }

    #[test]
    fn block_order_depends_on_the_seed() {
        let orders: Vec<Vec<Condition>> = (0..20)
            .map(|seed| {
                BlockDesign::generate(&DesignConfig::default(), &mut StdRng::seed_from_u64(seed))
                    .block_conditions()
            })
            .collect();
        assert!(orders.iter().any(|o| o != &orders[0]));
        for order in &orders {
            let slow = order.iter().filter(|&&c| c == Condition::Slow).count();
            assert_eq!(slow, 5);
        }
    }
}
