use crate::fingerprint::HashTriple;

/// Fixed-capacity Bloom filter keyed by [`HashTriple`]s.
///
/// Bits are only ever set between two calls to [`BloomIndex::clear`]; there is no removal.
#[derive(Debug, Clone)]
pub struct BloomIndex {
    words: Vec<u64>,
    capacity_bits: usize,
    inserted: usize,
}

impl BloomIndex {
    /// A zero capacity is rounded up to one bit; options validation rejects it earlier.
    pub fn new(capacity_bits: usize) -> Self {
        let capacity_bits = capacity_bits.max(1);
        Self {
            words: vec![0; capacity_bits.div_ceil(64)],
            capacity_bits,
            inserted: 0,
        }
    }

    pub fn capacity_bits(&self) -> usize {
        self.capacity_bits
    }

    /// Triples inserted since the last clear (duplicates included).
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    pub fn insert(&mut self, triple: &HashTriple) {
        for hash in triple.values() {
            let (word, mask) = self.slot(hash);
            self.words[word] |= mask;
        }
        self.inserted = self.inserted.saturating_add(1);
    }

    pub fn query(&self, triple: &HashTriple) -> bool {
        triple.values().into_iter().all(|hash| {
            let (word, mask) = self.slot(hash);
            self.words[word] & mask != 0
        })
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
        self.inserted = 0;
    }

    /// `(1 - e^(-k*n/m))^k` for the current load, with `k = 3`.
    pub fn expected_false_positive_rate(&self) -> f64 {
        let k = 3.0f64;
        let n = self.inserted as f64;
        let m = self.capacity_bits as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    fn slot(&self, hash: u32) -> (usize, u64) {
        let bit = (hash as usize) % self.capacity_bits;
        (bit / 64, 1u64 << (bit % 64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn inserted_triples_query_true_until_cleared() {
        let mut bloom = BloomIndex::new(1024);
        let a = HashTriple::of("alpha");
        let b = HashTriple::of("beta");
        assert!(!bloom.query(&a));
        bloom.insert(&a);
        assert!(bloom.query(&a));
        bloom.insert(&b);
        assert!(bloom.query(&a));
        assert!(bloom.query(&b));
        assert_eq!(bloom.inserted(), 2);

        bloom.clear();
        assert_eq!(bloom.inserted(), 0);
        assert!(!bloom.query(&a));
        assert!(!bloom.query(&b));
    }

    #[test]
    fn capacity_that_is_not_a_word_multiple_still_works() {
        let mut bloom = BloomIndex::new(65);
        let triple = HashTriple([64, 129, 0]);
        bloom.insert(&triple);
        assert!(bloom.query(&triple));
        assert!(!bloom.query(&HashTriple([1, 1, 1])));
    }

    #[test]
    fn zero_capacity_is_rounded_up() {
        let mut bloom = BloomIndex::new(0);
        assert_eq!(bloom.capacity_bits(), 1);
        bloom.insert(&HashTriple::of("x"));
        assert!(bloom.query(&HashTriple::of("anything")));
    }

    #[test]
    fn false_positive_rate_tracks_theory() {
        const CAPACITY: usize = 65_521;
        const PROBES: usize = 20_000;

        for load in [CAPACITY / 64, CAPACITY / 16, CAPACITY / 4, CAPACITY / 2] {
            let mut bloom = BloomIndex::new(CAPACITY);
            for i in 0..load {
                bloom.insert(&HashTriple::of(&format!("member {i} {}", i * 7919)));
            }
            let theoretical = bloom.expected_false_positive_rate();
            let hits = (0..PROBES)
                .filter(|i| bloom.query(&HashTriple::of(&format!("probe {i}:{}", i * 104_729))))
                .count();
            let empirical = hits as f64 / PROBES as f64;
            assert!(
                empirical <= theoretical * 2.0 + 0.02,
                "load {load}: empirical {empirical} vs theoretical {theoretical}"
            );
            assert!(
                empirical >= theoretical / 2.0 - 0.02,
                "load {load}: empirical {empirical} vs theoretical {theoretical}"
            );
        }
    }

    proptest! {
        #[test]
        fn no_false_negatives_within_a_batch(
            grams in prop::collection::vec("[a-z ]{1,12}", 1..200),
            capacity in 1usize..4096,
        ) {
            let mut bloom = BloomIndex::new(capacity);
            let triples: Vec<HashTriple> = grams.iter().map(|g| HashTriple::of(g)).collect();
            for (i, triple) in triples.iter().enumerate() {
                bloom.insert(triple);
                prop_assert!(bloom.query(triple));
                for earlier in &triples[..i] {
                    prop_assert!(bloom.query(earlier));
                }
            }
        }
    }
}
