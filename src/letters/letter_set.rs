use std::fmt;

use serde::{Deserialize, Serialize};

use super::{letter_from_index, letter_index, ALPHABET_SIZE};

const ALL_LETTERS: u32 = (1 << ALPHABET_SIZE) - 1;

/// Set of letters A-Z
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LetterSet {
    // bit is one if letter is in it
    accepted: u32,
}

impl LetterSet {
    pub fn empty() -> Self {
        Self { accepted: 0 }
    }
    pub fn any() -> Self {
        Self {
            accepted: ALL_LETTERS,
        }
    }
    pub fn contains(&self, letter: char) -> bool {
        match letter_index(letter) {
            Some(i) => (self.accepted & (1 << i)) != 0,
            None => false,
        }
    }
    /// Characters outside A-Z are ignored
    pub fn insert(&mut self, letter: char) {
        if let Some(i) = letter_index(letter) {
            self.accepted |= 1 << i
        }
    }
    pub fn remove(&mut self, letter: char) {
        if let Some(i) = letter_index(letter) {
            self.accepted &= !(1 << i)
        }
    }
    pub fn from_many(iter: impl Iterator<Item = char>) -> Self {
        let mut tmp = Self::empty();
        iter.for_each(|l| tmp.insert(l));
        tmp
    }
    pub fn is_empty(&self) -> bool {
        self.accepted == 0
    }
    pub fn is_any(&self) -> bool {
        self.accepted == ALL_LETTERS
    }
    pub fn len(&self) -> usize {
        self.accepted.count_ones() as usize
    }
    pub fn complement(&self) -> Self {
        Self {
            accepted: !self.accepted & ALL_LETTERS,
        }
    }
    pub fn union(&self, other: &Self) -> Self {
        Self {
            accepted: self.accepted | other.accepted,
        }
    }
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            accepted: self.accepted & other.accepted,
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        (0..ALPHABET_SIZE)
            .filter(move |i| self.accepted & (1 << i) != 0)
            .map(letter_from_index)
    }
}

impl Default for LetterSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::iter::FromIterator<char> for LetterSet {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = char>,
    {
        let mut tmp = Self::default();
        iter.into_iter().for_each(|l| tmp.insert(l));
        tmp
    }
}

impl fmt::Debug for LetterSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_any() {
            write!(f, ".")
        } else {
            write!(f, "[")?;
            for l in self.iter() {
                write!(f, "{}", l)?;
            }
            write!(f, "]")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let set: LetterSet = "CAB".chars().collect();
        assert!(set.contains('A'));
        assert!(set.contains('C'));
        assert!(!set.contains('D'));
        assert!(!set.contains('?'));
        assert_eq!(set.len(), 3);
        assert_eq!(format!("{:?}", set), "[ABC]");
    }

    #[test]
    fn test_complement() {
        let set: LetterSet = "AEIOU".chars().collect();
        let consonants = set.complement();
        assert_eq!(consonants.len(), 21);
        assert!(!consonants.contains('E'));
        assert!(set.union(&consonants).is_any());
        assert!(set.intersection(&consonants).is_empty());
        assert_eq!(format!("{:?}", LetterSet::any()), ".");
    }
}
