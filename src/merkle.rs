use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sha2::{Digest, Sha256};

/// Authentication path of one leaf. `position[k]` is true when the node on
/// level `k` is a right child, i.e. its sibling sits on the left.
#[derive(Debug, Clone, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct MerkleProof {
    pub path: Vec<Vec<u8>>,
    pub position: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct MerkleTree {
    pub leaves: Vec<Vec<u8>>,
    pub levels: Vec<Vec<Vec<u8>>>,
}

impl MerkleTree {
    /// Builds a tree over already-hashed leaves.
    pub fn new(leaves: Vec<Vec<u8>>) -> Self {
        let mut tree = MerkleTree {
            leaves,
            levels: Vec::new(),
        };
        tree.build_tree();
        tree
    }

    /// Builds a tree whose leaves are the hashes of `data`.
    pub fn from_data<T: AsRef<[u8]>>(data: &[T]) -> Self {
        Self::new(data.iter().map(|d| sha_digest(d.as_ref())).collect())
    }

    fn build_tree(&mut self) {
        let mut current_level = self.leaves.clone();
        self.levels.push(current_level.clone());

        while current_level.len() > 1 {
            let next_level: Vec<Vec<u8>> = current_level
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    // Duplicate last node if odd number
                    let right = pair.get(1).unwrap_or(left);
                    hash_children(left, right)
                })
                .collect();
            current_level = next_level;
            self.levels.push(current_level.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn get_proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaves.len() {
            return None;
        }

        let mut path = Vec::new();
        let mut position = Vec::new();
        let mut current_index = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = current_index ^ 1;
            // If we're at the last node in an odd-sized level, the node is its own sibling
            let sibling = level.get(sibling_index).unwrap_or(&level[current_index]);
            path.push(sibling.clone());
            position.push(current_index % 2 == 1);
            current_index /= 2;
        }

        Some(MerkleProof { path, position })
    }

    pub fn root(&self) -> Option<Vec<u8>> {
        self.levels.last().and_then(|level| level.first()).cloned()
    }
}

/// Checks that `leaf` sits at `index` under `root`.
///
/// The left/right order at every level is taken from the bits of `index`,
/// never from the proof, and must agree with `proof.position`.
pub fn verify_merkle_proof(leaf: &[u8], index: usize, proof: &MerkleProof, root: &[u8]) -> bool {
    if proof.path.len() != proof.position.len() || proof.path.len() >= usize::BITS as usize {
        return false;
    }
    if index >> proof.path.len() != 0 {
        return false;
    }

    let mut current_hash = leaf.to_vec();
    for (level, (sibling, is_right)) in proof.path.iter().zip(&proof.position).enumerate() {
        let bit = (index >> level) & 1 == 1;
        if bit != *is_right {
            return false;
        }
        current_hash = if bit {
            hash_children(sibling, &current_hash)
        } else {
            hash_children(&current_hash, sibling)
        };
    }

    current_hash == root
}

/// Hash of a leaf's raw content.
pub fn sha_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

fn hash_children(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u64) -> Vec<Vec<u8>> {
        (1..=n).map(|i| sha_digest(&i.to_le_bytes())).collect()
    }

    #[test]
    fn test_merkle_proof_verification() {
        let tree = MerkleTree::new(leaves(4));
        let root = tree.root().unwrap();

        for i in 0..4 {
            let proof = tree.get_proof(i).unwrap();
            let leaf = sha_digest(&(i as u64 + 1).to_le_bytes());
            assert!(verify_merkle_proof(&leaf, i, &proof, &root));
        }
    }

    #[test]
    fn test_merkle_proof_odd_leaves() {
        let tree = MerkleTree::new(leaves(3));
        let root = tree.root().unwrap();

        for i in 0..3 {
            let proof = tree.get_proof(i).unwrap();
            let leaf = sha_digest(&(i as u64 + 1).to_le_bytes());
            assert!(verify_merkle_proof(&leaf, i, &proof, &root));
        }
    }

    #[test]
    fn test_merkle_proof_single_leaf() {
        let tree = MerkleTree::new(leaves(1));
        let root = tree.root().unwrap();

        let proof = tree.get_proof(0).unwrap();
        assert!(proof.path.is_empty());
        assert!(verify_merkle_proof(&leaves(1)[0], 0, &proof, &root));
        assert!(!verify_merkle_proof(&leaves(1)[0], 1, &proof, &root));
    }

    #[test]
    fn proof_is_bound_to_its_index() {
        let tree = MerkleTree::new(leaves(8));
        let root = tree.root().unwrap();
        let proof = tree.get_proof(5).unwrap();
        let leaf = &leaves(8)[5];

        assert!(verify_merkle_proof(leaf, 5, &proof, &root));
        assert!(!verify_merkle_proof(leaf, 4, &proof, &root));
        assert!(!verify_merkle_proof(leaf, 13, &proof, &root));

        let mut flipped = proof.clone();
        flipped.position[0] = !flipped.position[0];
        assert!(!verify_merkle_proof(leaf, 5, &flipped, &root));
    }

    #[test]
    fn proofs_survive_serialization() {
        let tree = MerkleTree::from_data(&[b"a", b"b", b"c"]);
        let proof = tree.get_proof(2).unwrap();
        let mut bytes = Vec::new();
        proof.serialize_compressed(&mut bytes).unwrap();
        let decoded = MerkleProof::deserialize_compressed(&bytes[..]).unwrap();
        assert_eq!(decoded, proof);
    }
}
