use itertools::Itertools;
use rand::Rng;
use rand::prelude::IndexedRandom;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Represents a 2D coordinate on the minesweeper board, row-major and
/// 0-indexed. The derived order keeps safe-move selection deterministic.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

/// All in-bounds cells within one row and column of `at`, the cell itself
/// excluded. Handles board edges and corners.
pub fn neighbors(height: usize, width: usize, at: Point) -> impl Iterator<Item = Point> {
    (-1isize..=1)
        .cartesian_product(-1isize..=1)
        .filter_map(move |(dr, dc)| {
            if dr == 0 && dc == 0 {
                return None;
            }

            let row = at.row as isize + dr;
            let col = at.col as isize + dc;

            if row >= 0 && row < height as isize && col >= 0 && col < width as isize {
                Some(Point {
                    row: row as usize,
                    col: col as usize,
                })
            } else {
                None
            }
        })
}

// --- Sentence (the knowledge representation) ---

/// A logical statement about the board: exactly `count` of the cells in
/// `cells` are mines.
///
/// A sentence only ever mentions undetermined cells. As cells get resolved it
/// is rewritten in place, so it shrinks over its lifetime while staying true.
/// Equality is structural, which is what duplicate elimination keys on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    cells: HashSet<Point>,
    count: usize,
}

impl Sentence {
    pub fn new(cells: impl IntoIterator<Item = Point>, count: usize) -> Self {
        Sentence {
            cells: cells.into_iter().collect(),
            count,
        }
    }

    /// The cells certain to be mines: all of them, when the count fills the
    /// whole set. The `count != 0` guard keeps an exhausted sentence from
    /// vacuously claiming its (empty) cell set.
    pub fn known_mines(&self) -> HashSet<Point> {
        if self.cells.len() == self.count && self.count != 0 {
            self.cells.clone()
        } else {
            HashSet::new()
        }
    }

    /// The cells certain to be safe: all of them, when the count is zero.
    pub fn known_safes(&self) -> HashSet<Point> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            HashSet::new()
        }
    }

    /// Rewrites the sentence given that `cell` is a mine: it stops being an
    /// unknown and accounts for one of the counted mines. No-op when the
    /// sentence does not mention `cell`.
    pub fn mark_mine(&mut self, cell: Point) {
        if self.cells.remove(&cell) {
            debug_assert!(self.count > 0, "mine resolved against a zero-count sentence");
            self.count -= 1;
        }
    }

    /// Rewrites the sentence given that `cell` is safe. The count is
    /// untouched. No-op when the sentence does not mention `cell`.
    pub fn mark_safe(&mut self, cell: Point) {
        self.cells.remove(&cell);
    }
}

// --- KnowledgeBase (certainty sets + deductive closure) ---

/// Everything the agent believes about one game in progress: the proven-safe
/// and proven-mine sets, the move history, and the open sentences. Owns the
/// deduction loop that grows the certainty sets after every observation.
#[derive(Debug)]
pub struct KnowledgeBase {
    height: usize,
    width: usize,
    moves_made: HashSet<Point>,
    safes: HashSet<Point>,
    mines: HashSet<Point>,
    sentences: Vec<Sentence>,
}

impl KnowledgeBase {
    pub fn new(height: usize, width: usize) -> Self {
        KnowledgeBase {
            height,
            width,
            moves_made: HashSet::new(),
            safes: HashSet::new(),
            mines: HashSet::new(),
            sentences: Vec::new(),
        }
    }

    pub fn safes(&self) -> &HashSet<Point> {
        &self.safes
    }

    pub fn mines(&self) -> &HashSet<Point> {
        &self.mines
    }

    pub fn moves_made(&self) -> &HashSet<Point> {
        &self.moves_made
    }

    /// Records that `cell` is a mine and propagates the fact into every open
    /// sentence. Idempotent.
    pub fn mark_mine(&mut self, cell: Point) {
        self.mines.insert(cell);
        for sentence in &mut self.sentences {
            sentence.mark_mine(cell);
        }
    }

    /// Records that `cell` is safe and propagates the fact into every open
    /// sentence. Idempotent.
    pub fn mark_safe(&mut self, cell: Point) {
        self.safes.insert(cell);
        for sentence in &mut self.sentences {
            sentence.mark_safe(cell);
        }
    }

    /// Digests one oracle report: `cell` was revealed and carries `count`
    /// mines among its neighbors.
    ///
    /// Builds a sentence over the still-undetermined neighbors. Neighbors
    /// already proven to be mines account for part of the reported count, so
    /// the sentence count is reduced by their number. A repeated report for a
    /// cell already played is ignored.
    pub fn observe(&mut self, cell: Point, count: u8) {
        if !self.moves_made.insert(cell) {
            return;
        }
        self.mark_safe(cell);

        let mut mine_neighbors = 0usize;
        let mut undetermined = HashSet::new();
        for neighbor in neighbors(self.height, self.width, cell) {
            if self.mines.contains(&neighbor) {
                mine_neighbors += 1;
            } else if !self.safes.contains(&neighbor) {
                undetermined.insert(neighbor);
            }
        }

        debug_assert!(
            mine_neighbors <= count as usize,
            "oracle reported fewer mines than are already proven adjacent"
        );
        let sentence = Sentence {
            cells: undetermined,
            count: count as usize - mine_neighbors,
        };
        debug!(?cell, count, remaining = sentence.count, "observation recorded");

        self.sentences.push(sentence);
        self.deduce();
    }

    /// Runs resolution and subset inference to a fixed point.
    ///
    /// Each round extracts every certainty the open sentences currently
    /// yield, feeds the certainties back through `mark_safe`/`mark_mine`
    /// (which rewrite every sentence in place), compacts the sentence list,
    /// and derives difference sentences from subset pairs. The loop exits on
    /// the first round that neither resolves a cell nor adds a sentence, so
    /// a fresh observation always gets at least one inference round.
    fn deduce(&mut self) {
        loop {
            let mut new_safes: HashSet<Point> = HashSet::new();
            let mut new_mines: HashSet<Point> = HashSet::new();
            for sentence in &self.sentences {
                new_safes.extend(sentence.known_safes());
                new_mines.extend(sentence.known_mines());
            }

            let resolved = new_safes.len() + new_mines.len();
            trace!(
                safes = new_safes.len(),
                mines = new_mines.len(),
                open = self.sentences.len(),
                "deduction round"
            );

            for cell in new_safes {
                self.mark_safe(cell);
            }
            for cell in new_mines {
                self.mark_mine(cell);
            }
            self.compact();

            let derived = self.infer_subset_sentences();
            if resolved == 0 && derived == 0 {
                break;
            }
        }

        debug!(
            safes = self.safes.len(),
            mines = self.mines.len(),
            open = self.sentences.len(),
            "deduction fixed point"
        );
    }

    /// Drops exhausted sentences and collapses duplicates, keeping first
    /// occurrences. In-place resolution can leave two sentences with
    /// identical content, and only one may be retained.
    fn compact(&mut self) {
        let mut kept: Vec<Sentence> = Vec::with_capacity(self.sentences.len());
        for sentence in self.sentences.drain(..) {
            if !sentence.cells.is_empty() && !kept.contains(&sentence) {
                kept.push(sentence);
            }
        }
        self.sentences = kept;
    }

    /// Derives new sentences from subset pairs: when one sentence's cells are
    /// contained in another's, the difference set must hold exactly the
    /// difference of the counts. Each structurally-new, nonempty candidate is
    /// appended. Returns how many sentences were added.
    fn infer_subset_sentences(&mut self) -> usize {
        let mut derived: Vec<Sentence> = Vec::new();
        for (a, b) in self.sentences.iter().tuple_combinations() {
            // The pair walk is unordered, so check containment both ways.
            for (sup, sub) in [(a, b), (b, a)] {
                if !sub.cells.is_subset(&sup.cells) {
                    continue;
                }
                let cells: HashSet<Point> = sup.cells.difference(&sub.cells).copied().collect();
                if cells.is_empty() {
                    continue;
                }
                debug_assert!(
                    sub.count <= sup.count,
                    "subset sentence claims more mines than its superset"
                );
                let candidate = Sentence {
                    cells,
                    count: sup.count - sub.count,
                };
                if !self.sentences.contains(&candidate) && !derived.contains(&candidate) {
                    derived.push(candidate);
                }
            }
        }

        let added = derived.len();
        if added > 0 {
            trace!(added, "subset inference derived new sentences");
        }
        self.sentences.extend(derived);
        added
    }

    /// A cell proven safe and not yet played, if any. Read-only; among
    /// multiple candidates the smallest by `Point` order wins, so repeated
    /// calls agree.
    pub fn choose_safe_move(&self) -> Option<Point> {
        self.safes
            .iter()
            .filter(|cell| !self.moves_made.contains(cell))
            .min()
            .copied()
    }

    /// A uniformly random cell that is neither a proven mine nor already
    /// played. Read-only; `None` once the exclusions cover the board.
    pub fn choose_random_move(&self) -> Option<Point> {
        let candidates: Vec<Point> = (0..self.height)
            .cartesian_product(0..self.width)
            .map(|(row, col)| Point { row, col })
            .filter(|cell| !self.mines.contains(cell) && !self.moves_made.contains(cell))
            .collect();
        candidates.choose(&mut rand::rng()).copied()
    }
}

// --- Agent (the façade the game loop drives) ---

/// The playing agent: board dimensions plus one [`KnowledgeBase`], exposed
/// through the surface the game loop drives. All reasoning lives in the
/// knowledge base.
#[derive(Debug)]
pub struct Agent {
    knowledge: KnowledgeBase,
}

impl Agent {
    pub fn new(height: usize, width: usize) -> Self {
        Agent {
            knowledge: KnowledgeBase::new(height, width),
        }
    }

    /// Feeds one revealed cell and its adjacent-mine count to the knowledge
    /// base, which deduces everything that now follows.
    pub fn observe(&mut self, cell: Point, count: u8) {
        self.knowledge.observe(cell, count);
    }

    pub fn choose_safe_move(&self) -> Option<Point> {
        self.knowledge.choose_safe_move()
    }

    pub fn choose_random_move(&self) -> Option<Point> {
        self.knowledge.choose_random_move()
    }

    /// The cells proven to be mines so far.
    pub fn known_mines(&self) -> &HashSet<Point> {
        self.knowledge.mines()
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }
}

// --- Game (the board the agent plays against) ---

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// The board itself: mine placement, reveal bookkeeping, and the win and
/// loss rules. The agent never reads the mine set; the game loop relays
/// adjacent-mine counts one reveal at a time.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Game {
    height: usize,
    width: usize,
    mines: HashSet<Point>,
    revealed: HashSet<Point>,
    flagged: HashSet<Point>,
    pub game_state: GameState,
}

impl Game {
    /// Creates a board with `total_mines` mines placed uniformly at random,
    /// re-drawing collisions until the count is reached.
    pub fn new(height: usize, width: usize, total_mines: usize) -> Self {
        if total_mines >= height * width {
            panic!("Total mines must be less than the number of cells on the board.");
        }

        let mut rng = rand::rng();
        let mut mines = HashSet::with_capacity(total_mines);
        while mines.len() != total_mines {
            mines.insert(Point {
                row: rng.random_range(0..height),
                col: rng.random_range(0..width),
            });
        }

        Game {
            height,
            width,
            mines,
            revealed: HashSet::new(),
            flagged: HashSet::new(),
            game_state: GameState::Playing,
        }
    }

    /// Creates a board with a fixed mine layout.
    pub fn with_mines(height: usize, width: usize, mines: HashSet<Point>) -> Self {
        assert!(
            mines.len() < height * width,
            "Total mines must be less than the number of cells on the board."
        );
        assert!(
            mines.iter().all(|m| m.row < height && m.col < width),
            "mine placed out of bounds"
        );

        Game {
            height,
            width,
            mines,
            revealed: HashSet::new(),
            flagged: HashSet::new(),
            game_state: GameState::Playing,
        }
    }

    /// Deserializes a game state from bytes.
    pub fn deserialize(bts: &[u8]) -> Self {
        bcs::from_bytes(bts).unwrap()
    }

    /// Serializes the game state to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        bcs::to_bytes(self).unwrap()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn is_mine(&self, at: Point) -> bool {
        self.mines.contains(&at)
    }

    pub fn revealed(&self) -> &HashSet<Point> {
        &self.revealed
    }

    pub fn flagged(&self) -> &HashSet<Point> {
        &self.flagged
    }

    /// The number of mines within one row and column of `at`, the cell
    /// itself excluded.
    pub fn adjacent_mines(&self, at: Point) -> u8 {
        neighbors(self.height, self.width, at)
            .filter(|neighbor| self.mines.contains(neighbor))
            .count() as u8
    }

    /// Reveals `at`. Returns the adjacent-mine count, or `None` when the
    /// cell was a mine and the game is lost. Revealing a cell that is
    /// already open just returns its count again; revealing after the game
    /// has ended is an error.
    pub fn reveal(&mut self, at: Point) -> anyhow::Result<Option<u8>> {
        if self.game_state != GameState::Playing {
            anyhow::bail!("game_ended");
        }
        if self.revealed.contains(&at) {
            return Ok(Some(self.adjacent_mines(at)));
        }
        if self.mines.contains(&at) {
            self.game_state = GameState::Lost;
            return Ok(None);
        }

        self.revealed.insert(at);
        Ok(Some(self.adjacent_mines(at)))
    }

    /// Flags `at` as a found mine. The game is won once the flag set
    /// matches the mine set exactly. Flagging an open cell is a no-op.
    pub fn flag(&mut self, at: Point) {
        if self.game_state != GameState::Playing || self.revealed.contains(&at) {
            return;
        }

        self.flagged.insert(at);
        if self.flagged == self.mines {
            self.game_state = GameState::Won;
        }
    }
}
