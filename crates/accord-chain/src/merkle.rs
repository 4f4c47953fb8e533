//! Binary Merkle tree over hex leaf hashes.
//!
//! Leaf counts that are not a power of two are padded by duplicating the
//! last leaf, so every level pairs cleanly. Proofs are the sibling path
//! from a leaf to the root.

use serde::{Deserialize, Serialize};

use crate::signer::sha256_hex;
use crate::ChainError;

/// Full tree, level 0 = padded leaves, last level = root.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    levels: Vec<Vec<String>>,
    leaf_count: usize,
}

/// Sibling path from one leaf to the root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_hash: String,
    pub leaf_index: usize,
    pub siblings: Vec<String>,
    pub root: String,
}

impl MerkleTree {
    /// Build a tree from leaf hashes. Fails on an empty leaf set.
    pub fn build(leaves: &[String]) -> Result<Self, ChainError> {
        if leaves.is_empty() {
            return Err(ChainError::EmptyTree);
        }
        let leaf_count = leaves.len();
        let mut level: Vec<String> = leaves.to_vec();
        let target = leaf_count.next_power_of_two();
        while level.len() < target {
            let last = level[level.len() - 1].clone();
            level.push(last);
        }

        let mut levels = vec![level];
        while levels[levels.len() - 1].len() > 1 {
            let below = &levels[levels.len() - 1];
            let mut above = Vec::with_capacity(below.len() / 2);
            for pair in below.chunks(2) {
                above.push(hash_pair(&pair[0], &pair[1]));
            }
            levels.push(above);
        }

        Ok(Self { levels, leaf_count })
    }

    pub fn root(&self) -> &str {
        &self.levels[self.levels.len() - 1][0]
    }

    /// Number of real (unpadded) leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Proof for the leaf at `index`, counted over real leaves.
    pub fn generate_proof(&self, index: usize) -> Result<MerkleProof, ChainError> {
        if index >= self.leaf_count {
            return Err(ChainError::LeafOutOfRange {
                index,
                leaf_count: self.leaf_count,
            });
        }
        let mut siblings = Vec::with_capacity(self.levels.len() - 1);
        let mut pos = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = if pos % 2 == 0 { pos + 1 } else { pos - 1 };
            siblings.push(level[sibling].clone());
            pos /= 2;
        }
        Ok(MerkleProof {
            leaf_hash: self.levels[0][index].clone(),
            leaf_index: index,
            siblings,
            root: self.root().to_string(),
        })
    }
}

impl MerkleProof {
    /// Recompute the root from the sibling path and compare.
    pub fn verify(&self) -> bool {
        let mut hash = self.leaf_hash.clone();
        let mut pos = self.leaf_index;
        for sibling in &self.siblings {
            hash = if pos % 2 == 0 {
                hash_pair(&hash, sibling)
            } else {
                hash_pair(sibling, &hash)
            };
            pos /= 2;
        }
        hash == self.root
    }
}

fn hash_pair(left: &str, right: &str) -> String {
    let mut data = Vec::with_capacity(left.len() + right.len());
    data.extend_from_slice(left.as_bytes());
    data.extend_from_slice(right.as_bytes());
    sha256_hex(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaves(n: usize) -> Vec<String> {
        (0..n).map(|i| sha256_hex(format!("leaf-{i}").as_bytes())).collect()
    }

    #[test]
    fn single_leaf_tree_root_is_the_leaf() {
        let leaves = leaves(1);
        let tree = MerkleTree::build(&leaves).unwrap();
        assert_eq!(tree.root(), leaves[0]);
    }

    #[test]
    fn empty_leaf_set_is_rejected() {
        assert!(matches!(MerkleTree::build(&[]), Err(ChainError::EmptyTree)));
    }

    #[test]
    fn odd_leaf_count_pads_with_last_leaf() {
        let three = leaves(3);
        let mut four = three.clone();
        four.push(three[2].clone());
        let tree_three = MerkleTree::build(&three).unwrap();
        let tree_four = MerkleTree::build(&four).unwrap();
        assert_eq!(tree_three.root(), tree_four.root());
        assert_eq!(tree_three.leaf_count(), 3);
    }

    #[test]
    fn tampered_proof_fails() {
        let leaves = leaves(5);
        let tree = MerkleTree::build(&leaves).unwrap();
        let mut proof = tree.generate_proof(2).unwrap();
        proof.leaf_hash = sha256_hex(b"forged");
        assert!(!proof.verify());
    }

    #[test]
    fn proof_index_out_of_range_is_rejected() {
        let tree = MerkleTree::build(&leaves(3)).unwrap();
        assert!(tree.generate_proof(3).is_err());
    }

    proptest! {
        #[test]
        fn every_leaf_has_a_valid_proof(n in 1usize..40, pick in 0usize..40) {
            let leaves = leaves(n);
            let tree = MerkleTree::build(&leaves).unwrap();
            let index = pick % n;
            let proof = tree.generate_proof(index).unwrap();
            prop_assert!(proof.verify());
            prop_assert_eq!(&proof.leaf_hash, &leaves[index]);
            prop_assert_eq!(&proof.root, tree.root());
        }
    }
}
