use std::fs;
use std::path::{Path, PathBuf};

use super::{Node, WordGraph, NULL, ROOT};
use crate::error::{LoadError, LoadWarning};

/*
    Binary layout: a u32 record count followed by that many records of three u32
    words each, `letter | eow << 8`, `next`, `child`. Record 0 is the null record.
    The byte order is not recorded in the file and is detected on load.
*/

const HEADER_SIZE: usize = 4;
const RECORD_SIZE: usize = 12;
const EOW_BIT: u32 = 1 << 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn read_u32(self, bytes: &[u8], at: usize) -> u32 {
        let word = [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
        match self {
            ByteOrder::Little => u32::from_le_bytes(word),
            ByteOrder::Big => u32::from_be_bytes(word),
        }
    }

    fn write_u32(self, out: &mut Vec<u8>, value: u32) {
        match self {
            ByteOrder::Little => out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => out.extend_from_slice(&value.to_be_bytes()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// The file stores words back to front
    pub reversed: bool,
    /// Companion file holding the expected checksum as a decimal number
    pub checksum_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: WordGraph,
    pub byte_order: ByteOrder,
    /// Checksum computed over the whole file
    pub checksum: u16,
    pub warnings: Vec<LoadWarning>,
}

/// CRC-32 of the data folded down to 16 bits
pub fn checksum16(bytes: &[u8]) -> u16 {
    let crc = crc32fast::hash(bytes);
    ((crc >> 16) as u16) ^ (crc as u16)
}

/// Parses the decimal checksum stored in a companion file
pub fn read_checksum_file<P: AsRef<Path>>(path: P) -> Result<u16, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    text.trim()
        .parse::<u16>()
        .map_err(|e| format!("{:?} is not a checksum: {}", text.trim(), e))
}

pub fn write_checksum_file<P: AsRef<Path>>(path: P, checksum: u16) -> std::io::Result<()> {
    fs::write(path, format!("{}\n", checksum))
}

pub fn write_graph<P: AsRef<Path>>(
    graph: &WordGraph,
    path: P,
    order: ByteOrder,
) -> std::io::Result<u16> {
    let bytes = graph.to_bytes(order);
    fs::write(path, &bytes)?;
    Ok(checksum16(&bytes))
}

/// Reads a graph file, verifying its structure. A bad or missing checksum only
/// produces a warning.
pub fn load_graph<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<LoadedGraph, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (graph, byte_order) = WordGraph::from_bytes(&bytes, options.reversed)?;
    let checksum = checksum16(&bytes);

    let mut warnings = Vec::new();
    if let Some(checksum_path) = &options.checksum_path {
        match read_checksum_file(checksum_path) {
            Ok(expected) if expected != checksum => warnings.push(LoadWarning::ChecksumMismatch {
                path: path.to_path_buf(),
                expected,
                actual: checksum,
            }),
            Ok(_) => {}
            Err(reason) => warnings.push(LoadWarning::ChecksumUnavailable {
                path: checksum_path.clone(),
                reason,
            }),
        }
    }
    for w in warnings.iter() {
        log::warn!("{}", w);
    }
    log::info!(
        "loaded {} words ({} nodes, {:?} endian) from {}",
        graph.len(),
        graph.node_count(),
        byte_order,
        path.display()
    );

    Ok(LoadedGraph {
        graph,
        byte_order,
        checksum,
        warnings,
    })
}

impl WordGraph {
    pub fn to_bytes(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + RECORD_SIZE * self.nodes.len());
        order.write_u32(&mut out, self.nodes.len() as u32);
        for node in self.nodes.iter() {
            let mut first = node.letter as u32;
            if node.eow {
                first |= EOW_BIT;
            }
            order.write_u32(&mut out, first);
            order.write_u32(&mut out, node.next);
            order.write_u32(&mut out, node.child);
        }
        out
    }

    /// Detects the byte order, then validates every record
    pub fn from_bytes(bytes: &[u8], reversed: bool) -> Result<(Self, ByteOrder), LoadError> {
        if bytes.len() < HEADER_SIZE {
            return Err(LoadError::Truncated { len: bytes.len() });
        }
        let mut size_matched = false;
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let count = order.read_u32(bytes, 0) as usize;
            let expected_len = count
                .checked_mul(RECORD_SIZE)
                .and_then(|n| n.checked_add(HEADER_SIZE));
            if expected_len != Some(bytes.len()) || count == 0 {
                continue;
            }
            size_matched = true;
            if count > ROOT as usize {
                let at = HEADER_SIZE + RECORD_SIZE * ROOT as usize;
                let next = order.read_u32(bytes, at + 4) as usize;
                let child = order.read_u32(bytes, at + 8) as usize;
                if next >= count || child >= count {
                    continue;
                }
            }
            let nodes = decode_records(bytes, count, order)?;
            validate_acyclic(&nodes)?;
            return Ok((WordGraph::from_nodes(nodes, reversed), order));
        }
        if size_matched {
            Err(LoadError::InvalidRoot)
        } else {
            Err(LoadError::Truncated { len: bytes.len() })
        }
    }
}

fn decode_records(bytes: &[u8], count: usize, order: ByteOrder) -> Result<Vec<Node>, LoadError> {
    let mut nodes = Vec::with_capacity(count);
    for i in 0..count {
        let at = HEADER_SIZE + RECORD_SIZE * i;
        let first = order.read_u32(bytes, at);
        let next = order.read_u32(bytes, at + 4);
        let child = order.read_u32(bytes, at + 8);
        if first >> 9 != 0 {
            return Err(LoadError::Corrupt(format!("record {} has unknown flag bits", i)));
        }
        let node = Node {
            letter: (first & 0xFF) as u8,
            eow: first & EOW_BIT != 0,
            next,
            child,
        };
        if i == 0 {
            if node != Node::NULL {
                return Err(LoadError::Corrupt("record 0 is not the null record".into()));
            }
        } else if !node.letter.is_ascii_uppercase() {
            return Err(LoadError::Corrupt(format!(
                "record {} has invalid letter {:#x}",
                i, node.letter
            )));
        }
        if next as usize >= count || child as usize >= count {
            return Err(LoadError::Corrupt(format!("record {} links out of range", i)));
        }
        nodes.push(node);
    }
    Ok(nodes)
}

/// Depth-first colouring over sibling and child links
fn validate_acyclic(nodes: &[Node]) -> Result<(), LoadError> {
    const WHITE: u8 = 0;
    const GREY: u8 = 1;
    const BLACK: u8 = 2;
    let mut color = vec![WHITE; nodes.len()];
    color[NULL as usize] = BLACK;
    for start in 1..nodes.len() {
        if color[start] != WHITE {
            continue;
        }
        color[start] = GREY;
        let mut stack: Vec<(usize, u8)> = vec![(start, 0)];
        while let Some(top) = stack.last_mut() {
            let (v, edge) = *top;
            if edge < 2 {
                top.1 += 1;
                let to = (if edge == 0 { nodes[v].next } else { nodes[v].child }) as usize;
                match color[to] {
                    WHITE => {
                        color[to] = GREY;
                        stack.push((to, 0));
                    }
                    GREY => {
                        return Err(LoadError::Corrupt(format!("cycle through record {}", to)))
                    }
                    _ => {}
                }
            } else {
                color[v] = BLACK;
                stack.pop();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::NamedTempFile;

    const WORDS: [&str; 8] = ["CAT", "CATS", "ACT", "DOG", "DOGS", "GOD", "ZA", "QI"];

    fn graph() -> WordGraph {
        WordGraph::from_words(WORDS)
    }

    #[test]
    fn test_round_trip_both_byte_orders() {
        let graph = graph();
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let (loaded, detected) = WordGraph::from_bytes(&graph.to_bytes(order), false).unwrap();
            assert_eq!(detected, order);
            assert_eq!(loaded, graph);
            for w in WORDS {
                assert!(loaded.contains(w));
            }
        }
    }

    #[test]
    fn test_load_from_disk_with_checksum() {
        let graph = graph();
        let file = NamedTempFile::new().unwrap();
        let checksum = write_graph(&graph, file.path(), ByteOrder::Big).unwrap();
        let sum_file = NamedTempFile::new().unwrap();
        write_checksum_file(sum_file.path(), checksum).unwrap();

        let options = LoadOptions {
            reversed: false,
            checksum_path: Some(sum_file.path().to_path_buf()),
        };
        let loaded = load_graph(file.path(), &options).unwrap();
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.byte_order, ByteOrder::Big);
        assert_eq!(loaded.checksum, checksum);
        assert_eq!(loaded.graph.len(), WORDS.len());
    }

    #[test]
    fn test_checksum_mismatch_is_a_warning() {
        let graph = graph();
        let file = NamedTempFile::new().unwrap();
        let checksum = write_graph(&graph, file.path(), ByteOrder::Little).unwrap();
        let mut sum_file = NamedTempFile::new().unwrap();
        writeln!(sum_file, "{}", checksum.wrapping_add(1)).unwrap();

        let options = LoadOptions {
            reversed: false,
            checksum_path: Some(sum_file.path().to_path_buf()),
        };
        let loaded = load_graph(file.path(), &options).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(matches!(
            loaded.warnings[0],
            LoadWarning::ChecksumMismatch { expected, actual, .. }
                if expected == checksum.wrapping_add(1) && actual == checksum
        ));
        assert!(loaded.graph.contains("QI"));
    }

    #[test]
    fn test_unreadable_checksum_is_a_warning() {
        let file = NamedTempFile::new().unwrap();
        write_graph(&graph(), file.path(), ByteOrder::Little).unwrap();
        let mut sum_file = NamedTempFile::new().unwrap();
        writeln!(sum_file, "not a number").unwrap();
        let options = LoadOptions {
            reversed: false,
            checksum_path: Some(sum_file.path().to_path_buf()),
        };
        let loaded = load_graph(file.path(), &options).unwrap();
        assert!(matches!(
            loaded.warnings[0],
            LoadWarning::ChecksumUnavailable { .. }
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_graph("/nonexistent/lexicon.dwg", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_truncated_file() {
        let bytes = graph().to_bytes(ByteOrder::Little);
        let err = WordGraph::from_bytes(&bytes[..bytes.len() - 5], false).unwrap_err();
        assert!(matches!(err, LoadError::Truncated { .. }));
        let err = WordGraph::from_bytes(&bytes[..2], false).unwrap_err();
        assert!(matches!(err, LoadError::Truncated { len: 2 }));
    }

    #[test]
    fn test_invalid_root() {
        let mut bytes = graph().to_bytes(ByteOrder::Little);
        let at = HEADER_SIZE + RECORD_SIZE + 8;
        bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = WordGraph::from_bytes(&bytes, false).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRoot));
    }

    #[test]
    fn test_corrupt_letter_and_cycle() {
        let graph = graph();
        let mut bytes = graph.to_bytes(ByteOrder::Little);
        let at = HEADER_SIZE + RECORD_SIZE * 2;
        bytes[at] = b'!';
        assert!(matches!(
            WordGraph::from_bytes(&bytes, false).unwrap_err(),
            LoadError::Corrupt(_)
        ));

        // Point the first root child's child link back at the root
        let mut bytes = graph.to_bytes(ByteOrder::Little);
        let child = graph.node(ROOT).child as usize;
        let at = HEADER_SIZE + RECORD_SIZE * child + 8;
        bytes[at..at + 4].copy_from_slice(&ROOT.to_le_bytes());
        assert!(matches!(
            WordGraph::from_bytes(&bytes, false).unwrap_err(),
            LoadError::Corrupt(_)
        ));
    }

    #[test]
    fn test_reversed_file() {
        let reverse = WordGraph::from_words_reversed(WORDS);
        let (loaded, _) = WordGraph::from_bytes(&reverse.to_bytes(ByteOrder::Little), true).unwrap();
        assert!(loaded.is_reversed());
        assert!(loaded.contains("DOGS"));
        assert!(!loaded.contains("SGOD"));
    }

    #[test]
    fn test_checksum16_folds_crc() {
        let crc = crc32fast::hash(b"lexicon");
        assert_eq!(checksum16(b"lexicon"), ((crc >> 16) as u16) ^ (crc as u16));
    }
}
