//! Monte-Carlo tree search over alpha-beta rollouts.
//!
//! An alternative root algorithm: instead of one deep minimax tree, build a
//! statistics tree of (position, move) edges, descend it by UCB, evaluate
//! the leaves with shallow alpha-beta searches, and push the rewards back
//! up. Scores and rewards translate through a logistic, so a +300 eval and
//! a 76% expected score are the same number in two currencies.
//!
//! The tree lives in a process-wide arena keyed by Zobrist hash: nodes are
//! found by open addressing on the full key, verified against the pawn key
//! to shake off collisions, and never move once created. Workers descending
//! concurrently are kept apart by *virtual loss*: an edge's visit count is
//! bumped on the way down and corrected on backup, so a second worker
//! arriving at the same node is steered elsewhere.
//!
//! Locking is deliberately minimal: one spinlock serializes node creation,
//! a per-node spinlock serializes expansion and value writes, and the edge
//! statistics themselves are relaxed atomics. With a single thread the
//! locks disarm and cost nothing.

use crate::evaluate::Score;
use crate::evaluate::ScoreExt;
use crate::history_tables::pv::PVTable;
use crate::position::Position;
use crate::search::params::MAX_DEPTH;
use crate::search::SearchOutcome;
use crate::search::SearchRunner;
use chess::moves::Move;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::AtomicU16;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::OnceLock;

/// Reward space: 0 is a loss, 1/2 a draw, 1 a win, always from the point of
/// view of the side to move at the node.
pub type Reward = f64;

const REWARD_LOSS: Reward = 0.0;
const REWARD_DRAW: Reward = 0.5;

/// The logistic scale tying rewards to centipawns: ±600 maps to roughly a
/// 95% / 5% expected score.
const VALUE_SCALE: f64 = 203.77396313709564;

pub fn value_to_reward(value: Score) -> Reward {
    1.0 / (1.0 + (-(value as f64) / VALUE_SCALE).exp())
}

pub fn reward_to_value(reward: Reward) -> Score {
    if reward > 0.99 {
        return Score::TB_WIN;
    }

    if reward < 0.01 {
        return -Score::TB_WIN;
    }

    (VALUE_SCALE * (reward / (1.0 - reward)).ln()) as Score
}

////////////////////////////////////////////////////////////////////////////////
//
// Parameters
//
////////////////////////////////////////////////////////////////////////////////

/// Runtime-tunable knobs of the tree policy.
#[derive(Debug, Clone)]
pub struct MctsParams {
    /// Iteration budget (practically unbounded by default)
    pub max_descents: u64,

    /// Weight of the minimax-style max-child mixing during backup
    pub backup_minimax: f64,

    /// Rollout depths for prior computation
    pub prior_fast_depth: i32,
    pub prior_slow_depth: i32,

    /// Stand-in mean for edges that were never visited
    pub ucb_unexpanded_node: f64,

    pub ucb_exploration_constant: f64,

    /// 1.0 = divide the prior term by accumulated losses, 0.0 = by visits
    pub ucb_losses_avoidance: f64,

    /// Weight of the classic sqrt(ln N / n) exploration term
    pub ucb_log_term_factor: f64,

    /// Scale the exploration constant by sqrt(parent visits)
    pub ucb_use_father_visits: bool,

    /// Blend between best-visits and best-mean move choice (0..=100)
    pub multi_strategy: i32,

    /// Visits an edge needs before multi_strategy considers its mean
    pub multi_min_visits: u64,
}

impl Default for MctsParams {
    fn default() -> Self {
        Self {
            max_descents: u64::MAX,
            backup_minimax: 1.0,
            prior_fast_depth: 1,
            prior_slow_depth: 1,
            ucb_unexpanded_node: 1.0,
            ucb_exploration_constant: 1.0,
            ucb_losses_avoidance: 1.0,
            ucb_log_term_factor: 0.0,
            ucb_use_father_visits: true,
            multi_strategy: 20,
            multi_min_visits: 5,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Spinlock
//
////////////////////////////////////////////////////////////////////////////////

/// A yielding spinlock guarding critical sections of a few stores each.
/// When `armed` is false (single-threaded search) acquiring is free.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

pub struct SpinGuard<'a> {
    lock: Option<&'a SpinLock>,
}

impl SpinLock {
    fn acquire(&self, armed: bool) -> SpinGuard<'_> {
        if !armed {
            return SpinGuard { lock: None };
        }

        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::thread::yield_now();
        }

        SpinGuard { lock: Some(self) }
    }
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock {
            lock.locked.store(false, Ordering::Release);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Edges
//
////////////////////////////////////////////////////////////////////////////////

/// One (move, statistics) edge out of a node. All fields are atomics so
/// concurrent descents read consistent-enough values without the node lock.
#[derive(Debug, Default)]
pub struct Edge {
    mv: AtomicU16,
    visits: AtomicU64,
    prior: AtomicU64,
    action_value: AtomicU64,
    mean_action_value: AtomicU64,
}

impl Edge {
    pub fn mv(&self) -> Move {
        Move::from_raw(self.mv.load(Ordering::Relaxed))
    }

    pub fn visits(&self) -> f64 {
        f64::from_bits(self.visits.load(Ordering::Relaxed))
    }

    pub fn prior(&self) -> Reward {
        f64::from_bits(self.prior.load(Ordering::Relaxed))
    }

    pub fn action_value(&self) -> Reward {
        f64::from_bits(self.action_value.load(Ordering::Relaxed))
    }

    pub fn mean_action_value(&self) -> Reward {
        f64::from_bits(self.mean_action_value.load(Ordering::Relaxed))
    }

    fn set_visits(&self, visits: f64) {
        self.visits.store(visits.to_bits(), Ordering::Relaxed);
    }

    fn set_action_value(&self, value: Reward) {
        self.action_value.store(value.to_bits(), Ordering::Relaxed);
    }

    fn set_mean(&self, mean: Reward) {
        self.mean_action_value.store(mean.to_bits(), Ordering::Relaxed);
    }

    fn init(&self, mv: Move, prior: Reward) {
        self.mv.store(mv.raw(), Ordering::Relaxed);
        self.prior.store(prior.to_bits(), Ordering::Relaxed);
        self.set_visits(0.0);
        self.set_action_value(0.0);
        self.set_mean(0.0);
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Nodes and the arena
//
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Default)]
pub struct Node {
    lock: SpinLock,

    /// Full Zobrist key; zero marks a free slot
    key1: AtomicU64,

    /// Pawn-structure key, the collision tiebreaker
    key2: AtomicU64,

    visits: AtomicU64,

    /// The move that led into this node (purely diagnostic)
    last_move: AtomicU16,

    /// Latest alpha-beta verdict on this node, NO_SCORE before the first
    tt_value: AtomicI32,

    /// The depth the next AB rollout from this node should use
    deep: AtomicI32,

    /// The edges, allocated once at expansion
    edges: OnceLock<Box<[Edge]>>,
}

impl Node {
    pub fn visits(&self) -> u64 {
        self.visits.load(Ordering::Relaxed)
    }

    fn edges(&self) -> Option<&[Edge]> {
        self.edges.get().map(|edges| edges.as_ref())
    }

    fn tt_value(&self) -> Score {
        self.tt_value.load(Ordering::Relaxed)
    }
}

pub struct MctsTree {
    nodes: Vec<Node>,
    map_lock: SpinLock,

    /// Whether more than one worker is in the tree (locks disarm otherwise)
    armed: AtomicBool,
}

/// Linear-probe window before giving up on a full arena neighborhood.
const PROBE_LIMIT: usize = 16;

impl MctsTree {
    /// Arena capacity; a power of two so indexing is a mask.
    const CAPACITY: usize = 1 << 18;

    pub fn new() -> Self {
        Self {
            nodes: (0..Self::CAPACITY).map(|_| Node::default()).collect(),
            map_lock: SpinLock::default(),
            armed: AtomicBool::new(false),
        }
    }

    /// Drop every node (on `ucinewgame`).
    pub fn clear(&mut self) {
        for node in &mut self.nodes {
            *node = Node::default();
        }
    }

    pub fn set_threads(&self, threads: usize) {
        self.armed.store(threads > 1, Ordering::Relaxed);
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Relaxed)
    }

    fn slot(&self, key1: u64, offset: usize) -> &Node {
        &self.nodes[(key1 as usize + offset) & (Self::CAPACITY - 1)]
    }

    /// Find the node for a position, if it exists.
    fn find(&self, key1: u64, key2: u64) -> Option<&Node> {
        for offset in 0..PROBE_LIMIT {
            let node = self.slot(key1, offset);
            let slot_key = node.key1.load(Ordering::Acquire);

            if slot_key == 0 {
                return None;
            }

            if slot_key == key1 && node.key2.load(Ordering::Relaxed) == key2 {
                return Some(node);
            }
        }

        None
    }

    /// Find or create the node for a position. Creation is serialized by
    /// the arena lock; returns None when the neighborhood is full, in which
    /// case the caller just treats the position as an unstored leaf.
    fn find_or_create(&self, key1: u64, key2: u64, last_move: Move) -> Option<&Node> {
        if let Some(node) = self.find(key1, key2) {
            return Some(node);
        }

        let _guard = self.map_lock.acquire(self.is_armed());

        for offset in 0..PROBE_LIMIT {
            let node = self.slot(key1, offset);
            let slot_key = node.key1.load(Ordering::Relaxed);

            if slot_key == key1 && node.key2.load(Ordering::Relaxed) == key2 {
                return Some(node);
            }

            if slot_key == 0 {
                node.key2.store(key2, Ordering::Relaxed);
                node.last_move.store(last_move.raw(), Ordering::Relaxed);
                node.tt_value.store(Score::NO_SCORE, Ordering::Relaxed);
                node.deep.store(1, Ordering::Relaxed);
                // The full key goes in last: find() takes a nonzero key1 to
                // mean the rest of the node is readable.
                node.key1.store(key1, Ordering::Release);
                return Some(node);
            }
        }

        None
    }
}

impl Default for MctsTree {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// The search proper
//
////////////////////////////////////////////////////////////////////////////////

/// One worker's Monte-Carlo search over the shared tree. Borrows the
/// worker's alpha-beta runner for rollouts and reporting plumbing.
pub struct MctsSearch<'t, 'a, 'r> {
    tree: &'t MctsTree,
    runner: &'r mut SearchRunner<'a>,
    params: MctsParams,
    descents: u64,
}

impl<'t, 'a, 'r> MctsSearch<'t, 'a, 'r> {
    pub fn new(
        tree: &'t MctsTree,
        runner: &'r mut SearchRunner<'a>,
        params: MctsParams,
    ) -> Self {
        Self {
            tree,
            runner,
            params,
            descents: 0,
        }
    }

    /// Run descents until the budget or the stop flag says otherwise.
    pub fn search<const MAIN: bool>(&mut self, root_pos: &Position) -> SearchOutcome {
        let legal_count = root_pos.board.legal_moves().len();

        if legal_count == 0 {
            return SearchOutcome {
                best_move: Move::NULL,
                ponder: None,
                score: if root_pos.board.in_check() {
                    Score::mated_in(0)
                } else {
                    Score::DRAW
                },
                depth: 0,
                pv: Vec::new(),
            };
        }

        let Some(root) = self.lookup_or_expand(root_pos, Move::NULL) else {
            // Arena completely wedged at the root: fall back to alpha-beta
            return self.runner.iterative_deepening::<MAIN>(root_pos);
        };

        while self.descents < self.params.max_descents
            && self.runner.tc.should_continue(self.runner.nodes.local())
        {
            self.descents += 1;
            self.descend(root, root_pos);

            if self.runner.aborted {
                break;
            }

            if MAIN && self.descents % 256 == 0 {
                self.report::<MAIN>(root, root_pos, false);
            }
        }

        self.runner.nodes.flush();

        if MAIN {
            self.report::<MAIN>(root, root_pos, true);
        }

        self.outcome(root, root_pos)
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // One iteration: select down, evaluate, back up
    //
    ////////////////////////////////////////////////////////////////////////////

    fn descend(&mut self, root: &'t Node, root_pos: &Position) {
        let mut pos = root_pos.clone();
        let mut path: Vec<(&'t Node, usize)> = Vec::with_capacity(64);
        let mut node = root;
        let mut ply = 0;

        let reward = loop {
            ////////////////////////////////////////////////////////////////////
            //
            // Terminal / leaf handling
            //
            ////////////////////////////////////////////////////////////////////

            if pos.board.is_rule_draw() || pos.is_repetition() || ply >= MAX_DEPTH - 4 {
                break REWARD_DRAW;
            }

            let edges = match node.edges() {
                Some(edges) => edges,
                None => {
                    // Unexpanded: grow the edges, evaluate, stop descending
                    break self.expand(node, &pos, ply);
                }
            };

            if edges.is_empty() {
                break if pos.board.in_check() {
                    REWARD_LOSS
                } else {
                    REWARD_DRAW
                };
            }

            ////////////////////////////////////////////////////////////////////
            //
            // Periodic AB refresh: revisited interior nodes get re-searched
            // at increasing depth, and the verdict replaces a rollout.
            //
            ////////////////////////////////////////////////////////////////////

            let visits = node.visits();

            if !std::ptr::eq(node, root) && visits > 0 && visits.is_power_of_two() {
                let depth = node
                    .deep
                    .fetch_add(1, Ordering::Relaxed)
                    .min(MAX_DEPTH as i32 - ply as i32 - 2);

                let tt_value = node.tt_value();

                let window = if tt_value != Score::NO_SCORE && !tt_value.is_mate() {
                    Some((tt_value - 18, tt_value + 18))
                } else {
                    None
                };

                let value = self.minimax_value(&pos, ply, depth.max(1), window);

                if self.runner.aborted {
                    break REWARD_DRAW;
                }

                let _guard = node.lock.acquire(self.tree.is_armed());
                node.tt_value.store(value, Ordering::Relaxed);

                break value_to_reward(value);
            }

            ////////////////////////////////////////////////////////////////////
            //
            // Selection: pick the UCB-maximal edge, leave a virtual loss
            //
            ////////////////////////////////////////////////////////////////////

            let choice = self.select_edge(node, edges);
            let edge = &edges[choice];

            {
                let _guard = node.lock.acquire(self.tree.is_armed());
                let visits = edge.visits() + 1.0;
                edge.set_visits(visits);
                edge.set_mean(edge.action_value() / visits);
            }

            node.visits.fetch_add(1, Ordering::Relaxed);
            path.push((node, choice));

            let mv = edge.mv();
            pos = pos.play_move(mv);
            ply += 1;

            node = match self.tree.find_or_create(pos.hash.0, pos.pawn_hash.0, mv) {
                Some(next) => next,
                None => {
                    // No room to store this child: evaluate it on the spot
                    break self.leaf_reward(&pos, ply);
                }
            };
        };

        self.backup(&path, reward);
    }

    /// UCB over a node's edges.
    fn select_edge(&self, node: &Node, edges: &[Edge]) -> usize {
        let father_visits = node.visits().max(1) as f64;

        let c = if self.params.ucb_use_father_visits {
            self.params.ucb_exploration_constant * father_visits.sqrt()
        } else {
            self.params.ucb_exploration_constant
        };

        let mut best = 0;
        let mut best_ucb = f64::NEG_INFINITY;

        for (i, edge) in edges.iter().enumerate() {
            let visits = edge.visits();

            let mut ucb = if visits > 0.0 {
                edge.mean_action_value()
            } else {
                self.params.ucb_unexpanded_node
            };

            let losses = visits - edge.action_value();
            let divisor = losses * self.params.ucb_losses_avoidance
                + visits * (1.0 - self.params.ucb_losses_avoidance);

            ucb += c * edge.prior() / (1.0 + divisor);

            ucb += self.params.ucb_log_term_factor
                * (father_visits.ln() / (1.0 + visits)).sqrt();

            if ucb > best_ucb {
                best_ucb = ucb;
                best = i;
            }
        }

        best
    }

    /// First visit to a node: allocate its edges with priors from shallow
    /// alpha-beta probes, and return this node's own reward.
    fn expand(&mut self, node: &'t Node, pos: &Position, ply: usize) -> Reward {
        let moves = pos.board.legal_moves();

        if moves.is_empty() {
            let _ = node.edges.set(Vec::new().into_boxed_slice());

            return if pos.board.in_check() {
                REWARD_LOSS
            } else {
                REWARD_DRAW
            };
        }

        let _guard = node.lock.acquire(self.tree.is_armed());

        // Someone beat us to the expansion while we waited on the lock
        if let Some(edges) = node.edges() {
            if !edges.is_empty() {
                return self.leaf_reward(pos, ply);
            }
        }

        let count = moves.len().min(128);
        let mut edges = Vec::with_capacity(count);
        let mut best_value = Score::MINUS_INF;

        for &mv in moves.iter().take(count) {
            let depth = if ply <= 2 || mv.is_capture() || pos.board.gives_check(mv) {
                self.params.prior_slow_depth
            } else {
                self.params.prior_fast_depth
            };

            let next = pos.play_move(mv);
            let value = -self.minimax_value(&next, ply + 1, depth, None);

            if self.runner.aborted {
                break;
            }

            best_value = best_value.max(value);

            let edge = Edge::default();
            edge.init(mv, value_to_reward(value));
            edges.push(edge);
        }

        // Highest prior first: ties in the UCB race then favor the better
        // prior by construction
        edges.sort_by(|a, b| b.prior().total_cmp(&a.prior()));

        node.tt_value.store(best_value, Ordering::Relaxed);
        let _ = node.edges.set(edges.into_boxed_slice());

        value_to_reward(best_value)
    }

    /// Evaluate a position we couldn't (or didn't) store a node for.
    fn leaf_reward(&mut self, pos: &Position, ply: usize) -> Reward {
        if pos.board.legal_moves().is_empty() {
            return if pos.board.in_check() {
                REWARD_LOSS
            } else {
                REWARD_DRAW
            };
        }

        let value = self.minimax_value(pos, ply, self.params.prior_fast_depth, None);
        value_to_reward(value)
    }

    /// Walk the path back to the root, undoing virtual losses and mixing the
    /// observed reward into every edge.
    fn backup(&mut self, path: &[(&'t Node, usize)], leaf_reward: Reward) {
        // The leaf reward is from the point of view of the side to move at
        // the leaf; one step up, the perspective flips.
        let mut reward = leaf_reward;

        for &(node, edge_idx) in path.iter().rev() {
            reward = 1.0 - reward;

            let edges = node.edges().expect("nodes on the path are expanded");
            let edge = &edges[edge_idx];

            {
                let _guard = node.lock.acquire(self.tree.is_armed());

                // Compensate the virtual loss, then apply the real result
                let visits = edge.visits(); // virtual loss included
                edge.set_action_value(edge.action_value() + reward);
                edge.set_mean(edge.action_value() / visits.max(1.0));
            }

            // Minimax mixing: drag the propagated reward towards the best
            // child's mean instead of the sampled line's outcome
            if self.params.backup_minimax > 0.0 {
                let best_mean = edges
                    .iter()
                    .filter(|edge| edge.visits() > 0.0)
                    .map(|edge| edge.mean_action_value())
                    .fold(f64::NEG_INFINITY, f64::max);

                if best_mean.is_finite() {
                    reward = (1.0 - self.params.backup_minimax) * reward
                        + self.params.backup_minimax * best_mean;
                }
            }
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Rollouts
    //
    ////////////////////////////////////////////////////////////////////////////

    /// A (usually very shallow) alpha-beta verdict on `pos`.
    fn minimax_value(
        &mut self,
        pos: &Position,
        ply: usize,
        depth: i32,
        window: Option<(Score, Score)>,
    ) -> Score {
        let (alpha, beta) = window.unwrap_or((Score::MINUS_INF + 1, Score::PLUS_INF - 1));
        let ply = ply.min(MAX_DEPTH - 2);
        let mut scratch_pv = PVTable::new();

        self.runner
            .negamax::<false>(pos, ply, depth, alpha, beta, &mut scratch_pv, true, false)
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Results
    //
    ////////////////////////////////////////////////////////////////////////////

    /// The root edge to play: robust choice, visits dominating, prior as
    /// the tiebreaker. `multi_strategy` optionally blends in the mean.
    fn best_edge<'e>(&self, edges: &'e [Edge]) -> Option<&'e Edge> {
        edges.iter().max_by(|a, b| {
            let strategy = self.params.multi_strategy as f64 / 100.0;

            let score = |edge: &Edge| {
                let mut score = 10.0 * edge.visits() + edge.prior();

                if edge.visits() >= self.params.multi_min_visits as f64 {
                    score += strategy * edge.visits() * edge.mean_action_value();
                }

                score
            };

            score(a).total_cmp(&score(b))
        })
    }

    /// Extract the principal variation by walking the most-visited edges.
    fn extract_pv(&self, root: &Node, root_pos: &Position) -> Vec<Move> {
        let mut pv = Vec::new();
        let mut node = root;
        let mut pos = root_pos.clone();

        while pv.len() < 16 {
            let Some(edges) = node.edges() else { break };

            let Some(edge) = self.best_edge(edges) else { break };

            if edge.visits() == 0.0 {
                break;
            }

            let mv = edge.mv();

            if pos.board.find_move(mv.into()).is_none() {
                break;
            }

            pv.push(mv);
            pos = pos.play_move(mv);

            node = match self.tree.find(pos.hash.0, pos.pawn_hash.0) {
                Some(next) => next,
                None => break,
            };
        }

        pv
    }

    fn root_score(&self, root: &Node) -> Score {
        let Some(edges) = root.edges() else {
            return Score::DRAW;
        };

        match self.best_edge(edges) {
            Some(edge) if edge.visits() > 0.0 => reward_to_value(edge.mean_action_value()),
            Some(edge) => reward_to_value(edge.prior()),
            None => Score::DRAW,
        }
    }

    fn lookup_or_expand(&mut self, pos: &Position, last_move: Move) -> Option<&'t Node> {
        let node = self.tree.find_or_create(pos.hash.0, pos.pawn_hash.0, last_move)?;

        if node.edges().is_none() {
            self.expand(node, pos, 0);
        }

        Some(node)
    }

    fn outcome(&mut self, root: &Node, root_pos: &Position) -> SearchOutcome {
        let pv = self.extract_pv(root, root_pos);

        let best_move = pv
            .first()
            .copied()
            .or_else(|| root_pos.board.legal_moves().first().copied())
            .unwrap_or(Move::NULL);

        SearchOutcome {
            best_move,
            ponder: pv.get(1).copied(),
            score: self.root_score(root),
            depth: (root.visits().max(1) as f64).log2() as i32 + 1,
            pv,
        }
    }

    fn report<const MAIN: bool>(&mut self, root: &Node, root_pos: &Position, force: bool) {
        if !MAIN {
            return;
        }

        // Borrow the runner's root-move machinery for the actual line
        let pv = self.extract_pv(root, root_pos);

        if pv.is_empty() {
            return;
        }

        let score = self.root_score(root);
        let depth = (root.visits().max(1) as f64).log2() as i32 + 1;

        self.runner.report_mcts_line(root_pos, depth, score, pv, force);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_value_translation_roundtrips() {
        assert_eq!(reward_to_value(0.5), 0);

        for value in [-600, -150, 0, 150, 600] {
            let reward = value_to_reward(value);
            assert!((0.0..=1.0).contains(&reward));

            let back = reward_to_value(reward);
            assert!((back - value).abs() <= 1, "{value} came back as {back}");
        }

        // Extremes saturate into the winning band instead of mate scores
        assert_eq!(reward_to_value(1.0), Score::TB_WIN);
        assert_eq!(reward_to_value(0.0), -Score::TB_WIN);
    }

    #[test]
    fn rewards_are_monotone_in_value() {
        assert!(value_to_reward(100) > value_to_reward(0));
        assert!(value_to_reward(0) > value_to_reward(-100));
        assert!((value_to_reward(600) - 0.95).abs() < 0.01);
    }

    #[test]
    fn arena_finds_what_it_creates() {
        let tree = MctsTree::new();

        let node = tree.find_or_create(0xDEAD_BEEF, 0x1234, Move::NULL).unwrap();
        node.visits.fetch_add(3, Ordering::Relaxed);

        let found = tree.find(0xDEAD_BEEF, 0x1234).unwrap();
        assert_eq!(found.visits(), 3);

        // A matching key1 with a different key2 is a collision, not a hit
        assert!(tree.find(0xDEAD_BEEF, 0x9999).is_none());
    }

    #[test]
    fn edge_statistics_stay_consistent() {
        use crate::search::NodeCounter;
        use crate::time_control::TimeController;
        use crate::transpositions::TTable;
        use chess::board::Board;
        use chess::piece::Color;
        use std::sync::atomic::AtomicU64;
        use std::time::Duration;
        use uci::time_control::TimeControl;

        let tt = TTable::with_capacity(1, 1);
        let nodes = AtomicU64::new(0);
        let mut runner = SearchRunner::new(0, &tt, NodeCounter::new(&nodes));

        let (tc, _handle) = TimeController::new(
            TimeControl::Nodes(5_000),
            Color::White,
            false,
            Duration::ZERO,
        );
        runner.tc = tc;

        let tree = MctsTree::new();
        let pos = Position::new(Board::default());

        MctsSearch::new(&tree, &mut runner, MctsParams::default()).search::<false>(&pos);

        // At rest, every edge's mean is its value-per-visit, inside [0, 1]
        let root = tree.find(pos.hash.0, pos.pawn_hash.0).expect("root was created");

        let mut visited_edges = 0;

        for edge in root.edges().expect("root was expanded") {
            let visits = edge.visits();
            let mean = edge.mean_action_value();

            assert!((0.0..=1.0).contains(&mean), "mean {mean} out of range");
            assert!((0.0..=1.0).contains(&edge.prior()));

            if visits > 0.0 {
                visited_edges += 1;
                let expected = edge.action_value() / visits;
                assert!((mean - expected).abs() < 1e-9);
            }
        }

        assert!(visited_edges > 0, "the search never descended");
    }

    #[test]
    fn spinlock_roundtrip() {
        let lock = SpinLock::default();

        {
            let _guard = lock.acquire(true);
            assert!(lock.locked.load(Ordering::Relaxed));
        }

        assert!(!lock.locked.load(Ordering::Relaxed));

        // Disarmed locks never even flip the bit
        let _guard = lock.acquire(false);
        assert!(!lock.locked.load(Ordering::Relaxed));
    }
}
