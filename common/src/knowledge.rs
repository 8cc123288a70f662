use crate::error::{InvariantViolation, Result};
use crate::point::Point;
use crate::sentence::Sentence;
use itertools::{Itertools, iproduct};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, trace};

/// Decides the order in which a closure pass works through its pending marks and
/// candidate sentence pairs.
///
/// Every derivation rule only adds knowledge, so the fixpoint does not depend on the
/// order chosen here. Only the path to it does.
pub trait ScanOrder {
    fn arrange<T>(&mut self, items: &mut [T]);
}

/// Work through items in the order they were collected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl ScanOrder for Sequential {
    fn arrange<T>(&mut self, _items: &mut [T]) {}
}

/// Work through items in a random order drawn from the wrapped RNG.
#[derive(Debug, Clone)]
pub struct Shuffled<R>(pub R);

impl<R: Rng> ScanOrder for Shuffled<R> {
    fn arrange<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verdict {
    Mine,
    Safe,
}

/// Everything known about a board: sentences plus the cells proven to be mines or safe.
///
/// `mines` and `safes` never overlap and only ever grow. Sentences are kept reduced:
/// no sentence mentions a cell that is already proven, no two sentences are equal, and
/// no sentence is empty.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct KnowledgeBase {
    height: usize,
    width: usize,
    sentences: Vec<Sentence>,
    mines: HashSet<Point>,
    safes: HashSet<Point>,
}

impl KnowledgeBase {
    pub fn new(height: usize, width: usize) -> Self {
        KnowledgeBase {
            height,
            width,
            sentences: Vec::new(),
            mines: HashSet::new(),
            safes: HashSet::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn mines(&self) -> &HashSet<Point> {
        &self.mines
    }

    pub fn safes(&self) -> &HashSet<Point> {
        &self.safes
    }

    pub fn is_mine(&self, cell: Point) -> bool {
        self.mines.contains(&cell)
    }

    pub fn is_safe(&self, cell: Point) -> bool {
        self.safes.contains(&cell)
    }

    /// Records `cell` as a mine and removes it from every sentence.
    /// Returns `false` if the cell was already a known mine.
    pub fn mark_mine(&mut self, cell: Point) -> Result<bool> {
        let changed = self.apply(cell, Verdict::Mine)?;
        if changed {
            self.tidy();
        }
        Ok(changed)
    }

    /// Records `cell` as safe and removes it from every sentence.
    /// Returns `false` if the cell was already known safe.
    pub fn mark_safe(&mut self, cell: Point) -> Result<bool> {
        let changed = self.apply(cell, Verdict::Safe)?;
        if changed {
            self.tidy();
        }
        Ok(changed)
    }

    /// Takes in the mine count the board reported for a revealed `cell` and runs
    /// inference until nothing new can be concluded.
    pub fn add_knowledge(&mut self, cell: Point, count: usize) -> Result<()> {
        self.add_knowledge_with(cell, count, &mut Sequential)
    }

    /// Same as [`KnowledgeBase::add_knowledge`], with closure passes processed in the
    /// order picked by `order`.
    pub fn add_knowledge_with<O: ScanOrder>(
        &mut self,
        cell: Point,
        count: usize,
        order: &mut O,
    ) -> Result<()> {
        self.check_bounds(cell)?;
        if self.mines.contains(&cell) {
            return Err(InvariantViolation::MineAndSafe(cell));
        }
        // `cell` is not its own neighbor, so the sentence is the same before and
        // after it is marked safe.
        let sentence = self.sentence_for(cell, count)?;

        // Closure can still hit a contradiction halfway, so it runs on a copy that
        // only replaces `self` once it succeeds.
        let mut staged = self.clone();
        staged.apply(cell, Verdict::Safe)?;
        trace!(%cell, %sentence, "new sentence");
        staged.insert(sentence);
        staged.tidy();
        staged.close(order)?;

        *self = staged;
        Ok(())
    }

    /// Builds the sentence for a revealed cell over its still undetermined neighbors.
    fn sentence_for(&self, cell: Point, count: usize) -> Result<Sentence> {
        let mut cells = BTreeSet::new();
        let mut remaining = count as isize;

        for neighbor in cell.neighbors(self.height, self.width) {
            if self.safes.contains(&neighbor) {
                continue;
            }
            if self.mines.contains(&neighbor) {
                remaining -= 1;
                continue;
            }
            cells.insert(neighbor);
        }

        if remaining < 0 {
            return Err(InvariantViolation::CountOutOfRange {
                cells: cells.len(),
                count: remaining,
            });
        }
        Sentence::new(cells, remaining as usize)
    }

    /// Runs closure passes until one of them neither marks a cell nor adds a sentence.
    fn close<O: ScanOrder>(&mut self, order: &mut O) -> Result<()> {
        for pass in 1usize.. {
            let mut verdicts: Vec<(Point, Verdict)> = self
                .sentences
                .iter()
                .flat_map(|s| {
                    let mines = s.known_mines().into_iter().map(|c| (c, Verdict::Mine));
                    let safes = s.known_safes().into_iter().map(|c| (c, Verdict::Safe));
                    mines.chain(safes)
                })
                .unique()
                .collect();
            order.arrange(&mut verdicts);

            let mut marked = 0;
            for &(cell, verdict) in &verdicts {
                if self.apply(cell, verdict)? {
                    marked += 1;
                }
            }
            if marked > 0 {
                self.tidy();
            }

            let derived = self.derive(order)?;
            let mut inserted = 0;
            for sentence in derived {
                if self.insert(sentence) {
                    inserted += 1;
                }
            }

            debug!(
                pass,
                marked,
                inserted,
                sentences = self.sentences.len(),
                mines = self.mines.len(),
                safes = self.safes.len(),
                "closure pass"
            );

            if marked == 0 && inserted == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Subset elimination over every ordered pair of sentences. Nothing is inserted
    /// until the scan is over.
    fn derive<O: ScanOrder>(&self, order: &mut O) -> Result<Vec<Sentence>> {
        let n = self.sentences.len();
        let mut pairs: Vec<(usize, usize)> = iproduct!(0..n, 0..n).filter(|(a, b)| a != b).collect();
        order.arrange(&mut pairs);

        let known: HashSet<&Sentence> = self.sentences.iter().collect();
        let mut derived = Vec::new();
        let mut seen = HashSet::new();

        for (a, b) in pairs {
            let (small, big) = (&self.sentences[a], &self.sentences[b]);
            if !small.is_subset(big) {
                continue;
            }
            let sentence = big.subtract(small)?;
            if sentence.is_empty() || known.contains(&sentence) || !seen.insert(sentence.clone()) {
                continue;
            }
            derived.push(sentence);
        }

        Ok(derived)
    }

    /// Inserts a sentence unless it is empty or already known.
    fn insert(&mut self, sentence: Sentence) -> bool {
        if sentence.is_empty() || self.sentences.contains(&sentence) {
            return false;
        }
        trace!(%sentence, "inserted");
        self.sentences.push(sentence);
        true
    }

    /// Adds `cell` to the matching global set and cascades into every sentence.
    /// Nothing changes unless every sentence accepts the verdict.
    fn apply(&mut self, cell: Point, verdict: Verdict) -> Result<bool> {
        self.check_bounds(cell)?;

        let (own, other) = match verdict {
            Verdict::Mine => (&self.mines, &self.safes),
            Verdict::Safe => (&self.safes, &self.mines),
        };
        if other.contains(&cell) {
            return Err(InvariantViolation::MineAndSafe(cell));
        }
        if own.contains(&cell) {
            return Ok(false);
        }
        for sentence in &self.sentences {
            match verdict {
                Verdict::Mine => sentence.check_mine(cell)?,
                Verdict::Safe => sentence.check_safe(cell)?,
            }
        }

        match verdict {
            Verdict::Mine => self.mines.insert(cell),
            Verdict::Safe => self.safes.insert(cell),
        };
        for sentence in &mut self.sentences {
            match verdict {
                Verdict::Mine => sentence.mark_mine(cell)?,
                Verdict::Safe => sentence.mark_safe(cell)?,
            };
        }
        Ok(true)
    }

    /// Drops sentences that reduction emptied or made equal to another one.
    fn tidy(&mut self) {
        self.sentences = std::mem::take(&mut self.sentences)
            .into_iter()
            .filter(|s| !s.is_empty())
            .unique()
            .collect();
    }

    fn check_bounds(&self, cell: Point) -> Result<()> {
        if cell.in_bounds(self.height, self.width) {
            Ok(())
        } else {
            Err(InvariantViolation::OutOfBounds {
                cell,
                height: self.height,
                width: self.width,
            })
        }
    }

    /// An ordered copy of the current knowledge, for diagnostics and comparisons.
    pub fn snapshot(&self) -> KnowledgeSnapshot {
        KnowledgeSnapshot {
            sentences: self
                .sentences
                .iter()
                .map(|s| (s.cells().iter().copied().collect(), s.count()))
                .sorted()
                .collect(),
            mines: self.mines.iter().copied().sorted().collect(),
            safes: self.safes.iter().copied().sorted().collect(),
        }
    }
}

/// Ordered, comparable view of a [`KnowledgeBase`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KnowledgeSnapshot {
    pub sentences: Vec<(Vec<Point>, usize)>,
    pub mines: Vec<Point>,
    pub safes: Vec<Point>,
}

impl fmt::Display for KnowledgeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mines: {}", self.mines.iter().join(" "))?;
        writeln!(f, "safes: {}", self.safes.iter().join(" "))?;
        writeln!(f, "sentences ({}):", self.sentences.len())?;
        for (cells, count) in &self.sentences {
            writeln!(f, "  {{{}}} = {}", cells.iter().join(", "), count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn p(row: usize, col: usize) -> Point {
        Point::new(row, col)
    }

    fn assert_reduced(kb: &KnowledgeBase) {
        let unique: HashSet<&Sentence> = kb.sentences().iter().collect();
        assert_eq!(unique.len(), kb.sentences().len(), "duplicate sentences");
        for s in kb.sentences() {
            assert!(!s.is_empty());
            assert!(s.count() <= s.cells().len());
            for c in s.cells() {
                assert!(!kb.is_mine(*c) && !kb.is_safe(*c));
            }
        }
        assert!(kb.mines().is_disjoint(kb.safes()));
    }

    #[test]
    fn test_first_reveal_builds_neighborhood_sentence() {
        // Test that the first reveal becomes one sentence over all eight neighbors
        let mut kb = KnowledgeBase::new(3, 3);
        kb.add_knowledge(p(1, 1), 1).unwrap();

        assert_eq!(kb.safes(), &HashSet::from([p(1, 1)]));
        assert_eq!(kb.sentences().len(), 1);
        let s = &kb.sentences()[0];
        assert_eq!(s.count(), 1);
        assert_eq!(s.cells().len(), 8);
        assert!(!s.cells().contains(&p(1, 1)));
    }

    #[test]
    fn test_known_cells_are_left_out_of_new_sentence() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.mark_mine(p(0, 0)).unwrap();
        kb.mark_safe(p(0, 1)).unwrap();
        kb.add_knowledge(p(1, 1), 2).unwrap();

        assert_eq!(kb.sentences().len(), 1);
        let s = &kb.sentences()[0];
        assert_eq!(s.count(), 1);
        assert_eq!(s.cells().len(), 6);
        assert!(!s.cells().contains(&p(0, 0)));
        assert!(!s.cells().contains(&p(0, 1)));
    }

    #[test]
    fn test_zero_count_marks_neighbors_safe() {
        // Test that a zero clears every neighbor and leaves no sentence behind
        let mut kb = KnowledgeBase::new(3, 3);
        kb.add_knowledge(p(2, 2), 0).unwrap();

        assert_eq!(
            kb.safes(),
            &HashSet::from([p(2, 2), p(1, 1), p(1, 2), p(2, 1)])
        );
        assert!(kb.sentences().is_empty());
    }

    #[test]
    fn test_subset_elimination() {
        // 3x3 board with a single mine at (1, 0)
        let mut kb = KnowledgeBase::new(3, 3);
        kb.add_knowledge(p(0, 0), 1).unwrap();
        kb.add_knowledge(p(0, 1), 1).unwrap();

        // {(0,2), (1,0), (1,1), (1,2)} = 1 minus {(1,0), (1,1)} = 1 proves the rest safe
        assert!(kb.is_safe(p(0, 2)));
        assert!(kb.is_safe(p(1, 2)));
        assert!(kb.mines().is_empty());
        assert_eq!(
            kb.sentences(),
            &[Sentence::new([p(1, 0), p(1, 1)], 1).unwrap()]
        );
        assert_reduced(&kb);
    }

    #[test]
    fn test_single_mine_scenario() {
        // 3x3 board with a single mine at (0, 0)
        let mut kb = KnowledgeBase::new(3, 3);
        kb.add_knowledge(p(1, 1), 1).unwrap();
        kb.add_knowledge(p(2, 2), 0).unwrap();
        assert!(kb.mines().is_empty());

        kb.add_knowledge(p(0, 2), 0).unwrap();
        kb.add_knowledge(p(2, 0), 0).unwrap();

        assert_eq!(kb.mines(), &HashSet::from([p(0, 0)]));
        let expected_safes: HashSet<Point> = Point::all(3, 3).filter(|&c| c != p(0, 0)).collect();
        assert_eq!(kb.safes(), &expected_safes);
        assert!(kb.sentences().is_empty());
    }

    #[test]
    fn test_empty_sentence_is_not_knowledge() {
        // 1x2 board, mine at (0, 1) already flagged
        let mut kb = KnowledgeBase::new(1, 2);
        kb.mark_mine(p(0, 1)).unwrap();
        kb.add_knowledge(p(0, 0), 1).unwrap();

        assert!(kb.sentences().is_empty());
        assert_eq!(kb.mines(), &HashSet::from([p(0, 1)]));
        assert_eq!(kb.safes(), &HashSet::from([p(0, 0)]));
    }

    #[test]
    fn test_repeat_marks_are_no_ops() {
        // Test that marking a known cell again changes nothing
        let mut kb = KnowledgeBase::new(3, 3);
        kb.add_knowledge(p(1, 1), 2).unwrap();
        assert!(kb.mark_mine(p(0, 0)).unwrap());
        let before = kb.snapshot();

        assert!(!kb.mark_mine(p(0, 0)).unwrap());
        assert!(!kb.mark_safe(p(1, 1)).unwrap());
        assert_eq!(kb.snapshot(), before);
    }

    #[test]
    fn test_mine_and_safe_is_a_violation() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.mark_safe(p(0, 0)).unwrap();
        assert_eq!(
            kb.mark_mine(p(0, 0)),
            Err(InvariantViolation::MineAndSafe(p(0, 0)))
        );
        assert!(!kb.is_mine(p(0, 0)));
    }

    #[test]
    fn test_impossible_counts_are_violations() {
        // A corner has only three neighbors
        let mut kb = KnowledgeBase::new(3, 3);
        assert!(matches!(
            kb.add_knowledge(p(0, 0), 4),
            Err(InvariantViolation::CountOutOfRange { .. })
        ));

        // Fewer mines reported than are already known around the cell
        let mut kb = KnowledgeBase::new(3, 3);
        kb.mark_mine(p(0, 0)).unwrap();
        kb.mark_mine(p(0, 1)).unwrap();
        assert!(matches!(
            kb.add_knowledge(p(1, 1), 1),
            Err(InvariantViolation::CountOutOfRange { cells: 6, count: -1 })
        ));
    }

    #[test]
    fn test_reveal_contradicting_known_mine() {
        let mut kb = KnowledgeBase::new(1, 3);
        kb.add_knowledge(p(0, 0), 1).unwrap();
        assert!(kb.is_mine(p(0, 1)));

        // (0, 2) claims no mines, but (0, 1) is one
        assert!(kb.add_knowledge(p(0, 2), 0).is_err());
    }

    #[test]
    fn test_rejected_reveal_leaves_no_trace() {
        // Test that a contradiction found during closure rolls back every mark made before it
        let mut kb = KnowledgeBase::new(2, 3);
        kb.add_knowledge(p(0, 0), 1).unwrap();
        let before = kb.snapshot();

        // {(1,0), (1,1)} = 1 after (0,1) is marked safe, but the new sentence clears both
        assert!(matches!(
            kb.add_knowledge(p(0, 1), 0),
            Err(InvariantViolation::CountOutOfRange { .. })
        ));
        assert_eq!(kb.snapshot(), before);
        assert!(!kb.is_safe(p(0, 1)));

        let mut kb = KnowledgeBase::new(3, 3);
        let before = kb.snapshot();
        assert!(kb.add_knowledge(p(0, 0), 5).is_err());
        assert_eq!(kb.snapshot(), before);
    }

    #[test]
    fn test_rejected_mark_leaves_no_trace() {
        let mut kb = KnowledgeBase::new(1, 3);
        kb.add_knowledge(p(0, 1), 1).unwrap();
        kb.mark_safe(p(0, 0)).unwrap();
        let before = kb.snapshot();

        // {(0,2)} = 1 proves (0,2) a mine
        assert!(kb.mark_safe(p(0, 2)).is_err());
        assert_eq!(kb.snapshot(), before);
        assert!(!kb.is_safe(p(0, 2)));
    }

    #[test]
    fn test_out_of_bounds() {
        // Test that cells off the grid are rejected
        let mut kb = KnowledgeBase::new(2, 2);
        assert_eq!(
            kb.add_knowledge(p(2, 0), 0),
            Err(InvariantViolation::OutOfBounds {
                cell: p(2, 0),
                height: 2,
                width: 2
            })
        );
        assert!(kb.mark_mine(p(0, 5)).is_err());
    }

    #[test]
    fn test_knowledge_is_sound_and_reduced_on_random_boards() {
        // Test that revealing every safe cell only ever produces true facts
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let board = Board::random(6, 6, 7, &mut rng).unwrap();
            let mut kb = KnowledgeBase::new(6, 6);

            for cell in Point::all(6, 6).filter(|&c| !board.is_mine(c)) {
                kb.add_knowledge(cell, board.nearby_mines(cell) as usize)
                    .unwrap();
                assert_reduced(&kb);
                for mine in kb.mines() {
                    assert!(board.is_mine(*mine), "seed {seed}: {mine} is not a mine");
                }
                for safe in kb.safes() {
                    assert!(!board.is_mine(*safe), "seed {seed}: {safe} is a mine");
                }
            }

            // With every safe cell revealed, every safe cell is known
            assert_eq!(kb.safes().len(), 36 - 7);
        }
    }

    #[test]
    fn test_closure_is_confluent() {
        // Test that shuffling the scan order never changes what is known
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let board = Board::random(7, 7, 10, &mut rng).unwrap();
            let reveals: Vec<(Point, usize)> = Point::all(7, 7)
                .filter(|&c| !board.is_mine(c))
                .map(|c| (c, board.nearby_mines(c) as usize))
                .collect();

            let mut reference = KnowledgeBase::new(7, 7);
            let mut shuffled: Vec<(KnowledgeBase, Shuffled<StdRng>)> = (0..4)
                .map(|k| {
                    (
                        KnowledgeBase::new(7, 7),
                        Shuffled(StdRng::seed_from_u64(seed * 100 + k)),
                    )
                })
                .collect();

            for &(cell, count) in &reveals {
                reference.add_knowledge(cell, count).unwrap();
                let expected = reference.snapshot();

                for (kb, order) in &mut shuffled {
                    kb.add_knowledge_with(cell, count, order).unwrap();
                    assert_eq!(kb.snapshot(), expected, "seed {seed}, after {cell}");
                }
            }
        }
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.add_knowledge(p(1, 1), 1).unwrap();
        kb.mark_safe(p(2, 2)).unwrap();
        kb.mark_safe(p(0, 2)).unwrap();

        let snapshot = kb.snapshot();
        assert_eq!(snapshot.safes, vec![p(0, 2), p(1, 1), p(2, 2)]);
        assert_eq!(snapshot.sentences.len(), 1);
        assert_eq!(snapshot.sentences[0].0.first(), Some(&p(0, 0)));
        assert!(snapshot.to_string().contains("sentences (1):"));
    }
}
