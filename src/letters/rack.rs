use super::{letter_from_index, letter_index, LetterSet, ALPHABET_SIZE};

/// Multiset of letters available to build a word from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rack {
    /// Histogram count of each letter in the rack
    pub letters: [u8; ALPHABET_SIZE],
    /// Character classes, each standing in for one letter from its set
    pub classes: Vec<LetterSet>,
    /// Number of blanks in the rack
    pub n_blanks: u8,
    /// Any number of additional letters may be used on top of the rack
    pub unlimited: bool,
    /// The total number of remaining letters+classes+blanks
    pub n_total: u32,
}

impl Rack {
    pub fn new(letters: [u8; ALPHABET_SIZE], n_blanks: u8) -> Self {
        let n_total = letters.iter().map(|&i| i as u32).sum::<u32>() + n_blanks as u32;
        Self {
            letters,
            classes: Vec::new(),
            n_blanks,
            unlimited: false,
            n_total,
        }
    }

    pub fn empty() -> Self {
        Self::new([0; ALPHABET_SIZE], 0)
    }

    pub fn add_class(&mut self, class: LetterSet) {
        self.classes.push(class);
        self.n_total += 1;
    }

    pub fn is_exhausted(&self) -> bool {
        self.n_total == 0
    }

    /// Used for graph traversal
    pub fn remove(&self, letter: char) -> Option<Self> {
        let i = letter_index(letter)?;
        if self.letters[i] > 0 {
            let mut tmp = self.clone();
            tmp.letters[i] -= 1;
            tmp.n_total -= 1;
            Some(tmp)
        } else {
            None
        }
    }

    /// One rack per distinct class able to stand in for the letter
    pub fn remove_class(&self, letter: char) -> Vec<Self> {
        let mut seen: Vec<LetterSet> = Vec::new();
        let mut out = Vec::new();
        for (i, class) in self.classes.iter().enumerate() {
            if !class.contains(letter) || seen.contains(class) {
                continue;
            }
            seen.push(*class);
            let mut tmp = self.clone();
            tmp.classes.remove(i);
            tmp.n_total -= 1;
            out.push(tmp);
        }
        out
    }

    /// Used for graph traversal
    pub fn remove_wildcard(&self) -> Option<Self> {
        if self.n_blanks > 0 {
            let mut tmp = self.clone();
            tmp.n_blanks -= 1;
            tmp.n_total -= 1;
            Some(tmp)
        } else {
            None
        }
    }

    /// Letters that can possibly be consumed from this rack
    pub fn allowed_letters(&self) -> LetterSet {
        if self.n_blanks > 0 || self.unlimited {
            return LetterSet::any();
        }
        let mut set = self
            .letters
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .map(|(i, _)| letter_from_index(i))
            .collect::<LetterSet>();
        for class in self.classes.iter() {
            set = set.union(class);
        }
        set
    }

    pub fn count_letters(&self) -> u32 {
        self.letters.iter().map(|&i| i as u32).sum()
    }
}

/// `?` is a blank and `*` allows any number of extra letters. Counts past 255 are clamped.
impl std::iter::FromIterator<char> for Rack {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        let mut chars = [0u8; ALPHABET_SIZE];
        let mut n_blanks = 0u8;
        let mut unlimited = false;
        iter.into_iter().for_each(|x| match x {
            '?' => n_blanks = n_blanks.saturating_add(1),
            '*' => unlimited = true,
            x => {
                if let Some(i) = letter_index(x.to_ascii_uppercase()) {
                    chars[i] = chars[i].saturating_add(1)
                }
            }
        });
        let mut rack = Self::new(chars, n_blanks);
        rack.unlimited = unlimited;
        rack
    }
}
