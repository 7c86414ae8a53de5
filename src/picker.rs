use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Uniform random choice over slices, reproducible when seeded.
#[derive(Debug, Clone)]
pub struct Picker {
    rng: StdRng,
}

impl Picker {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_gives_same_sequence() {
        let items = ["a", "b", "c", "d", "e"];
        let mut first = Picker::seeded(42);
        let mut second = Picker::seeded(42);
        for _ in 0..20 {
            assert_eq!(first.pick(&items), second.pick(&items));
        }
    }

    #[test]
    fn empty_slice_yields_none() {
        let mut picker = Picker::seeded(1);
        let empty: [u8; 0] = [];
        assert!(picker.pick(&empty).is_none());
    }
}
