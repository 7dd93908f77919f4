// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Trie node model and its wire encoding.
//!
//! Nodes are RLP lists. Paths are nibble sequences in hex-prefix compact
//! form; the low flag bit marks odd length, the high flag bit marks a leaf.
//! Child references are always 32-byte node hashes.

use rlp::{DecoderError, Rlp, RlpStream};
use vetra_types::Bytes32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Node {
    /// Terminal node: remaining path and the stored value.
    Leaf { path: Vec<u8>, value: Vec<u8> },
    /// Shared-prefix shortcut to a single child.
    Extension { path: Vec<u8>, child: Bytes32 },
    /// 16-way fanout. The slot value is only populated for keys terminating
    /// here, which fixed-length secure keys never do.
    Branch {
        children: Box<[Option<Bytes32>; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl Node {
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut s = RlpStream::new();
        match self {
            Node::Leaf { path, value } => {
                s.begin_list(2);
                s.append(&compact_encode(path, true));
                s.append(value);
            }
            Node::Extension { path, child } => {
                s.begin_list(2);
                s.append(&compact_encode(path, false));
                s.append(child);
            }
            Node::Branch { children, value } => {
                s.begin_list(17);
                for child in children.iter() {
                    match child {
                        Some(hash) => s.append(hash),
                        None => s.append_empty_data(),
                    };
                }
                match value {
                    Some(v) => s.append(v),
                    None => s.append_empty_data(),
                };
            }
        }
        s.out().to_vec()
    }

    pub(crate) fn decode(data: &[u8]) -> Result<Node, DecoderError> {
        let rlp = Rlp::new(data);
        match rlp.item_count()? {
            2 => {
                let encoded_path: Vec<u8> = rlp.val_at(0)?;
                let (path, is_leaf) = compact_decode(&encoded_path)?;
                if is_leaf {
                    Ok(Node::Leaf {
                        path,
                        value: rlp.val_at(1)?,
                    })
                } else {
                    Ok(Node::Extension {
                        path,
                        child: rlp.val_at(1)?,
                    })
                }
            }
            17 => {
                let mut children: [Option<Bytes32>; 16] = Default::default();
                for (i, slot) in children.iter_mut().enumerate() {
                    let item = rlp.at(i)?;
                    if !item.is_empty() {
                        *slot = Some(item.as_val()?);
                    }
                }
                let value: Vec<u8> = rlp.val_at(16)?;
                Ok(Node::Branch {
                    children: Box::new(children),
                    value: if value.is_empty() { None } else { Some(value) },
                })
            }
            _ => Err(DecoderError::RlpIncorrectListLen),
        }
    }
}

/// Expands bytes into their nibble sequence.
pub(crate) fn to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for b in bytes {
        nibbles.push(b >> 4);
        nibbles.push(b & 0x0f);
    }
    nibbles
}

/// Length of the longest shared prefix of two nibble sequences.
pub(crate) fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn compact_encode(nibbles: &[u8], leaf: bool) -> Vec<u8> {
    let flag: u8 = if leaf { 2 } else { 0 };
    let mut out;
    let rest;
    if nibbles.len() % 2 == 1 {
        out = Vec::with_capacity(nibbles.len() / 2 + 1);
        out.push((flag | 1) << 4 | nibbles[0]);
        rest = &nibbles[1..];
    } else {
        out = Vec::with_capacity(nibbles.len() / 2 + 1);
        out.push(flag << 4);
        rest = nibbles;
    }
    for pair in rest.chunks(2) {
        out.push(pair[0] << 4 | pair[1]);
    }
    out
}

fn compact_decode(data: &[u8]) -> Result<(Vec<u8>, bool), DecoderError> {
    let first = *data
        .first()
        .ok_or(DecoderError::Custom("empty compact path"))?;
    let flag = first >> 4;
    if flag > 3 {
        return Err(DecoderError::Custom("invalid compact path flag"));
    }
    let mut nibbles = Vec::with_capacity(data.len() * 2);
    if flag & 1 == 1 {
        nibbles.push(first & 0x0f);
    }
    for b in &data[1..] {
        nibbles.push(b >> 4);
        nibbles.push(b & 0x0f);
    }
    Ok((nibbles, flag & 2 == 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_path_round_trip() {
        for (nibbles, leaf) in [
            (vec![], true),
            (vec![0x1], false),
            (vec![0x1, 0x2], true),
            (vec![0xf, 0x0, 0xa], false),
        ] {
            let (decoded, decoded_leaf) =
                compact_decode(&compact_encode(&nibbles, leaf)).unwrap();
            assert_eq!(decoded, nibbles);
            assert_eq!(decoded_leaf, leaf);
        }
    }

    #[test]
    fn node_codec_round_trip() {
        let leaf = Node::Leaf {
            path: vec![0x1, 0x2, 0x3],
            value: b"value".to_vec(),
        };
        assert_eq!(Node::decode(&leaf.encode()).unwrap(), leaf);

        let ext = Node::Extension {
            path: vec![0xa, 0xb],
            child: Bytes32::repeat_byte(7),
        };
        assert_eq!(Node::decode(&ext.encode()).unwrap(), ext);

        let mut children: [Option<Bytes32>; 16] = Default::default();
        children[3] = Some(Bytes32::repeat_byte(1));
        children[15] = Some(Bytes32::repeat_byte(2));
        let branch = Node::Branch {
            children: Box::new(children),
            value: None,
        };
        assert_eq!(Node::decode(&branch.encode()).unwrap(), branch);
    }
}
