#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        (out as f64 / 4_294_967_296.0) as f32
    }

    pub fn bool(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for idx in (1..items.len()).rev() {
            let other = self.pick_index(idx + 1);
            items.swap(idx, other);
        }
    }

    pub fn permutation<const N: usize>(&mut self) -> [usize; N] {
        let mut out = [0; N];
        for (idx, slot) in out.iter_mut().enumerate() {
            *slot = idx;
        }
        self.shuffle(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_contains_every_slot_once() {
        for seed in 0..500u32 {
            let mut rng = Rng::new(seed);
            let mut perm: [usize; 5] = rng.permutation();
            perm.sort_unstable();
            assert_eq!(perm, [0, 1, 2, 3, 4]);
        }
    }

    #[test]
    fn permutation_is_not_constant() {
        let mut seen_pacman_slot = [false; 5];
        for seed in 0..500u32 {
            let mut rng = Rng::new(seed);
            let perm: [usize; 5] = rng.permutation();
            seen_pacman_slot[perm[0]] = true;
        }
        assert!(seen_pacman_slot.iter().all(|seen| *seen));
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
        }
    }
}
