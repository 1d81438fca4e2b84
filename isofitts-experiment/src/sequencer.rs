/// Picks successive goal targets on the ring, alternating hops of `count/2`
/// and `count/2 + 1` so each goal sits roughly opposite the last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSequencer {
    count: usize,
    current: usize,
    previous: Option<usize>,
    next_hop: usize,
    parity: u8,
}

impl TargetSequencer {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            current: 0,
            previous: None,
            next_hop: count / 2,
            parity: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    pub fn next_hop(&self) -> usize {
        self.next_hop
    }

    /// Moves to the next goal and returns its index.
    pub fn advance(&mut self) -> usize {
        self.previous = Some(self.current);
        self.current = (self.current + self.next_hop) % self.count;
        if self.parity == 0 {
            self.next_hop = self.count / 2 + 1;
            self.parity = 1;
        } else {
            self.next_hop = self.count / 2;
            self.parity = 0;
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(count: usize, len: usize) -> Vec<usize> {
        let mut seq = TargetSequencer::new(count);
        std::iter::once(seq.current())
            .chain((1..len).map(|_| seq.advance()))
            .collect()
    }

    fn adjacent(a: usize, b: usize, count: usize) -> bool {
        let d = (a + count - b) % count;
        d == 1 || d == count - 1
    }

    #[test]
    fn follows_alternating_hop_rule_for_eight() {
        let mut seq = TargetSequencer::new(8);
        assert_eq!(seq.current(), 0);
        assert_eq!(seq.previous(), None);
        assert_eq!(seq.next_hop(), 4);

        // hop 4, then 5, then 4
        assert_eq!(seq.advance(), 4);
        assert_eq!(seq.next_hop(), 5);
        assert_eq!(seq.advance(), 1);
        assert_eq!(seq.next_hop(), 4);
        assert_eq!(seq.advance(), 5);
        assert_eq!(seq.previous(), Some(1));
    }

    #[test]
    fn consecutive_goals_never_adjacent_from_six_up() {
        for count in 6..=40 {
            let seq = sequence(count, 3 * count);
            for pair in seq.windows(2) {
                assert!(
                    !adjacent(pair[0], pair[1], count),
                    "count {count}: {} -> {}",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn even_counts_visit_every_target_before_repeating() {
        for count in [4, 6, 8, 16, 30] {
            let mut seen = sequence(count, count);
            seen.sort_unstable();
            assert_eq!(seen, (0..count).collect::<Vec<_>>(), "count {count}");
        }
    }

    #[test]
    fn odd_counts_alternate_between_two_targets() {
        // hops of count/2 and count/2 + 1 sum to count
        assert_eq!(sequence(7, 5), vec![0, 3, 0, 3, 0]);
    }

    #[test]
    fn two_targets_alternate() {
        assert_eq!(sequence(2, 4), vec![0, 1, 1, 0]);
    }
}
