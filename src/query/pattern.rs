use crate::error::PatternError;
use crate::graph::Token;
use crate::letters::{LetterSet, Rack};

/// Longest rack accepted, so every per-letter count fits in a byte
pub const MAX_RACK_LEN: usize = u8::MAX as usize;

/// One parsed pattern element, before it is turned into a token or a rack entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Letter(char),
    Blank,
    Gap,
    Class(LetterSet),
}

fn parse_elements(input: &str) -> Result<Vec<Element>, PatternError> {
    let chars: Vec<char> = input.trim().chars().map(|c| c.to_ascii_uppercase()).collect();
    if chars.is_empty() {
        return Err(PatternError::Empty);
    }
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            c @ 'A'..='Z' => out.push(Element::Letter(c)),
            '?' => out.push(Element::Blank),
            '*' => out.push(Element::Gap),
            '[' => {
                let start = i;
                let negated = chars.get(i + 1) == Some(&'^');
                if negated {
                    i += 1;
                }
                let mut set = LetterSet::empty();
                loop {
                    i += 1;
                    match chars.get(i) {
                        None => return Err(PatternError::UnterminatedClass(start)),
                        Some(']') => break,
                        Some(&c) if c.is_ascii_uppercase() => set.insert(c),
                        Some(&found) => {
                            return Err(PatternError::InvalidCharacter { found, position: i })
                        }
                    }
                }
                let set = if negated { set.complement() } else { set };
                if set.is_empty() {
                    return Err(PatternError::EmptyClass(start));
                }
                out.push(Element::Class(set));
            }
            found => return Err(PatternError::InvalidCharacter { found, position: i }),
        }
        i += 1;
    }
    Ok(out)
}

/// Parses a positional pattern such as `C?T`, `*ING` or `[AEIOU]*[^S]`
pub fn parse_pattern(pattern: &str) -> Result<Vec<Token>, PatternError> {
    Ok(parse_elements(pattern)?
        .into_iter()
        .map(|e| match e {
            Element::Letter(c) => Token::Literal(c),
            Element::Blank => Token::Any,
            Element::Gap => Token::Gap,
            Element::Class(set) => Token::Class(set),
        })
        .collect())
}

/// Parses anagram letters, where `?` is a blank, `*` allows extra letters and a
/// class stands in for one of its letters
pub fn parse_rack(letters: &str) -> Result<Rack, PatternError> {
    let elements = parse_elements(letters)?;
    let len = elements.iter().filter(|e| **e != Element::Gap).count();
    if len > MAX_RACK_LEN {
        return Err(PatternError::RackTooLong {
            len,
            max: MAX_RACK_LEN,
        });
    }
    let mut rack: Rack = elements
        .iter()
        .filter_map(|e| match e {
            Element::Letter(c) => Some(*c),
            Element::Blank => Some('?'),
            Element::Gap => Some('*'),
            Element::Class(_) => None,
        })
        .collect();
    for e in elements {
        if let Element::Class(set) = e {
            rack.add_class(set);
        }
    }
    Ok(rack)
}

/// Plain letters only, upper cased
pub fn parse_letters(letters: &str) -> Result<String, PatternError> {
    let mut out = String::new();
    for (position, c) in letters.trim().chars().enumerate() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return Err(PatternError::InvalidCharacter { found: c, position });
        }
        out.push(c);
    }
    if out.is_empty() {
        return Err(PatternError::Empty);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern() {
        let tokens = parse_pattern("c?t*").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Literal('C'), Token::Any, Token::Literal('T'), Token::Gap]
        );
    }

    #[test]
    fn test_parse_classes() {
        let tokens = parse_pattern("[AE][^AEIOU]").unwrap();
        match (&tokens[0], &tokens[1]) {
            (Token::Class(a), Token::Class(b)) => {
                assert_eq!(a.len(), 2);
                assert_eq!(b.len(), 21);
                assert!(!b.contains('E'));
            }
            _ => panic!("expected classes, got {:?}", tokens),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_pattern(""), Err(PatternError::Empty));
        assert_eq!(parse_pattern("C[AT"), Err(PatternError::UnterminatedClass(1)));
        assert_eq!(parse_pattern("[]"), Err(PatternError::EmptyClass(0)));
        assert_eq!(
            parse_pattern("C#T"),
            Err(PatternError::InvalidCharacter { found: '#', position: 1 })
        );
        assert!(parse_letters("AB?").is_err());
    }

    #[test]
    fn test_rack_length_limit() {
        let rack = parse_rack(&"A".repeat(MAX_RACK_LEN)).unwrap();
        assert_eq!(rack.letters[0] as usize, MAX_RACK_LEN);
        assert_eq!(
            parse_rack(&"A".repeat(256)),
            Err(PatternError::RackTooLong { len: 256, max: MAX_RACK_LEN })
        );
        assert!(parse_rack(&"?".repeat(300)).is_err());
        assert!(parse_rack(&format!("{}*", "B".repeat(255))).is_ok());
    }

    #[test]
    fn test_parse_rack() {
        let rack = parse_rack("AEINST?[RL]*").unwrap();
        assert_eq!(rack.count_letters(), 6);
        assert_eq!(rack.n_blanks, 1);
        assert_eq!(rack.classes.len(), 1);
        assert!(rack.unlimited);
        assert_eq!(rack.n_total, 8);
    }
}
