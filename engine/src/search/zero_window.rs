//! The null-window probe: "is this position worth at least `value`?"
//!
//! An answer, never a score: the result is either below `value` or not.
//! All the scout searches, verifications and exclusion searches go through
//! here.

use super::SearchRunner;
use crate::evaluate::Score;
use crate::history_tables::pv::PVTable;
use crate::position::Position;

impl SearchRunner<'_> {
    pub(crate) fn zero_window(
        &mut self,
        pos: &Position,
        ply: usize,
        depth: i32,
        value: Score,
        try_null: bool,
        cutnode: bool,
    ) -> Score {
        let mut scratch_pv = PVTable::new();

        self.negamax::<false>(
            pos,
            ply,
            depth,
            value - 1,
            value,
            &mut scratch_pv,
            try_null,
            cutnode,
        )
    }
}
