use ndarray::Array2;

use super::{MineLayout, MinesweeperConfig};
use crate::{Coord2, ToNdIndex};

/// Strategy seam for mine placement, kept separate from the session so
/// tests and replays can inject a fixed layout instead.
pub trait MineLayoutGenerator {
    fn generate(self, config: MinesweeperConfig) -> MineLayout;
}

/// Uniform rejection sampling over `(row, col)` pairs, excluding the first
/// revealed cell and its full 8-neighborhood so the opening is always safe.
///
/// Termination is guaranteed by the configuration check: the mine count
/// never exceeds `size² − 9`, the number of cells left after the exclusion
/// zone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RandomMineLayoutGenerator {
    seed: u64,
    safe_center: Coord2,
}

impl RandomMineLayoutGenerator {
    pub const fn new(seed: u64, safe_center: Coord2) -> Self {
        Self { seed, safe_center }
    }
}

impl MineLayoutGenerator for RandomMineLayoutGenerator {
    fn generate(self, config: MinesweeperConfig) -> MineLayout {
        use rand::prelude::*;

        let size = config.size();
        let (safe_row, safe_col) = self.safe_center;
        let mut mine_mask: Array2<bool> = Array2::default(config.bounds().to_nd_index());
        let mut placed = 0;

        let mut rng = SmallRng::seed_from_u64(self.seed);
        while placed < config.mines() {
            let row = rng.random_range(0..size);
            let col = rng.random_range(0..size);

            if row.abs_diff(safe_row) <= 1 && col.abs_diff(safe_col) <= 1 {
                continue;
            }
            let cell = &mut mine_mask[(row, col).to_nd_index()];
            if *cell {
                continue;
            }
            *cell = true;
            placed += 1;
        }

        MineLayout::from_mine_mask(mine_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NeighborIterExt;

    #[test]
    fn generated_layout_has_exact_mine_count() {
        let config = MinesweeperConfig::new(10, 35).unwrap();
        let layout = RandomMineLayoutGenerator::new(1, (0, 0)).generate(config);
        assert_eq!(layout.mine_count(), 35);
        assert_eq!(layout.total_cells(), 100);
    }

    #[test]
    fn safe_zone_is_never_mined() {
        for seed in 0..16 {
            let config = MinesweeperConfig::new(8, 22).unwrap();
            let generator = RandomMineLayoutGenerator::new(seed, (3, 4));
            let layout = generator.generate(config);

            assert!(!layout.contains_mine((3, 4)));
            let mask: Array2<bool> = Array2::default((8, 8));
            for pos in mask.iter_neighbors((3, 4)) {
                assert!(!layout.contains_mine(pos));
            }
        }
    }

    #[test]
    fn same_seed_reproduces_the_layout() {
        let config = MinesweeperConfig::new(12, 30).unwrap();
        let a = RandomMineLayoutGenerator::new(5, (6, 6)).generate(config);
        let b = RandomMineLayoutGenerator::new(5, (6, 6)).generate(config);
        assert_eq!(a, b);
    }

    #[test]
    fn safe_zone_clips_at_the_border() {
        let config = MinesweeperConfig::new(5, 8).unwrap();
        let layout = RandomMineLayoutGenerator::new(9, (0, 0)).generate(config);
        assert_eq!(layout.mine_count(), 8);
        assert!(!layout.contains_mine((0, 0)));
        assert!(!layout.contains_mine((1, 1)));
    }
}
