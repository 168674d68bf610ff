use super::{letter_index, ALPHABET_SIZE};

const BLANK: usize = ALPHABET_SIZE;

/// Tile distribution and letter values used for point values and probability order
#[derive(Debug, Clone)]
pub struct LetterBag {
    /// Number of tiles of each letter, blanks last
    amts: [u32; ALPHABET_SIZE + 1],
    /// Score associated with each
    values: [u32; ALPHABET_SIZE + 1],
    /// Pascal's triangle, `combos[n][k]` is n choose k
    combos: Vec<Vec<f64>>,
}

impl LetterBag {
    pub fn new(amts: [u32; ALPHABET_SIZE + 1], values: [u32; ALPHABET_SIZE + 1]) -> Self {
        let max = amts.iter().copied().max().unwrap_or(0).max(2) as usize;
        let mut combos: Vec<Vec<f64>> = Vec::with_capacity(max + 1);
        for n in 0..=max {
            let mut row = vec![1.0; n + 1];
            for k in 1..n {
                row[k] = combos[n - 1][k - 1] + combos[n - 1][k];
            }
            combos.push(row);
        }
        Self {
            amts,
            values,
            combos,
        }
    }

    pub fn score(&self, letter: char) -> u32 {
        letter_index(letter).map(|i| self.values[i]).unwrap_or(0)
    }

    pub fn word_value(&self, word: &str) -> u32 {
        word.chars().map(|c| self.score(c)).sum()
    }

    fn choose(&self, n: u32, k: u32) -> f64 {
        if k > n {
            0.0
        } else {
            self.combos[n as usize][k as usize]
        }
    }

    /// Number of distinct draws from a full bag that spell the word, counting up to two
    /// blanks standing in for any of its letters.
    pub fn num_combinations(&self, word: &str, blanks: u8) -> f64 {
        let blanks = blanks.min(2);
        let mut letters: Vec<usize> = Vec::new();
        let mut counts: Vec<u32> = Vec::new();
        for i in word.chars().filter_map(letter_index) {
            match letters.iter().position(|&l| l == i) {
                Some(j) => counts[j] += 1,
                None => {
                    letters.push(i);
                    counts.push(1);
                }
            }
        }
        let product = |counts: &[u32]| -> f64 {
            letters
                .iter()
                .zip(counts.iter())
                .map(|(&l, &c)| self.choose(self.amts[l], c))
                .product()
        };

        let mut total = product(&counts);
        if blanks == 0 {
            return total;
        }

        let one_blank = self.choose(self.amts[BLANK], 1);
        for i in 0..letters.len() {
            counts[i] -= 1;
            total += one_blank * product(&counts);
            counts[i] += 1;
        }
        if blanks == 1 {
            return total;
        }

        let two_blanks = self.choose(self.amts[BLANK], 2);
        for i in 0..letters.len() {
            counts[i] -= 1;
            for j in i..letters.len() {
                if counts[j] == 0 {
                    continue;
                }
                counts[j] -= 1;
                total += two_blanks * product(&counts);
                counts[j] += 1;
            }
            counts[i] += 1;
        }
        total
    }
}

impl Default for LetterBag {
    fn default() -> Self {
        Self::new(
            [
                9, 2, 2, 4, 12, 2, 3, 2, 9, 1, 1, 4, 2, 6, 8, 2, 1, 6, 4, 6, 4, 2, 2, 1, 2, 1, 2,
            ],
            [
                1, 3, 3, 2, 1, 4, 2, 4, 1, 8, 5, 1, 3, 1, 1, 3, 10, 1, 1, 1, 1, 4, 4, 8, 4, 10, 0,
            ],
        )
    }
}
