pub mod bag;
pub mod letter_set;
pub mod rack;

pub use self::bag::LetterBag;
pub use self::letter_set::LetterSet;
pub use self::rack::Rack;

pub const ALPHABET_SIZE: usize = 26;

/// Index of an upper case letter in the alphabet
pub fn letter_index(c: char) -> Option<usize> {
    if c.is_ascii_uppercase() {
        Some((c as u8 - b'A') as usize)
    } else {
        None
    }
}

pub fn letter_from_index(i: usize) -> char {
    (b'A' + i as u8) as char
}

/// Upper cases a word, rejecting it if anything outside A-Z remains.
pub fn normalize_word(word: &str) -> Option<String> {
    let word = word.trim().to_ascii_uppercase();
    if !word.is_empty() && word.bytes().all(|b| b.is_ascii_uppercase()) {
        Some(word)
    } else {
        None
    }
}

/// Y is never counted as a vowel
pub fn is_vowel(c: char) -> bool {
    matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
}

pub fn count_vowels(word: &str) -> usize {
    word.chars().filter(|&c| is_vowel(c)).count()
}

/// Letters of the word in alphabetical order
pub fn alphagram(word: &str) -> String {
    let mut chars = word.chars().collect::<Vec<_>>();
    chars.sort_unstable();
    chars.into_iter().collect()
}

pub fn count_unique_letters(word: &str) -> usize {
    word.chars().collect::<LetterSet>().len()
}

/// Histogram of the letters in a word. Non-letters are ignored.
pub fn letter_counts(word: &str) -> [u8; ALPHABET_SIZE] {
    let mut counts = [0u8; ALPHABET_SIZE];
    for i in word.chars().filter_map(letter_index) {
        counts[i] = counts[i].saturating_add(1);
    }
    counts
}

/// Whether every letter of `needle` can be taken from `haystack`, both given as alphagrams.
/// Returns the number of letters of `needle` that were missing.
pub fn missing_letters(needle: &str, haystack: &str) -> usize {
    let have = letter_counts(haystack);
    let want = letter_counts(needle);
    want.iter()
        .zip(have.iter())
        .map(|(&w, &h)| w.saturating_sub(h) as usize)
        .sum()
}
