//! Execution plans for the fast Walsh-Hadamard transform
//!
//! A plan factors the transform of size 2^n into a tree of butterfly
//! codelets, so that applying it to a vector costs O(n · 2^n) additions and
//! subtractions and no multiplications.
//!
//! Mathematical Foundation:
//! The unnormalized Walsh-Hadamard matrix of order 2^n is the n-fold
//! Kronecker power of H_2 = [[1, 1], [1, -1]]. For any composition
//! n = n_1 + n_2 + ... + n_t it factors as
//!
//!   WHT_{2^n} = Π_{i=1}^{t} (I_{2^{n_1 + ... + n_{i-1}}} ⊗ WHT_{2^{n_i}} ⊗ I_{2^{n_{i+1} + ... + n_t}})
//!
//! and the factors commute, because each one only mixes a disjoint group of
//! index bits. Recursing on every WHT_{2^{n_i}} gives a split tree whose
//! leaves are straight-line codelets.
//!
//! Tree Notation:
//! - `small[k]`: codelet of size 2^k performing k butterfly stages
//! - `split[t1,t2,...,tm]`: factorization into the children's sizes
//!
//! For example `split[small[2],small[3]]` is a plan of size 2^5.

use std::fmt;
use std::str::FromStr;

use num_traits::Num;

use crate::error::{Result, WhtError};

/// Largest codelet supported by [`PlanNode::Small`], as a base-2 logarithm.
pub const MAX_CODELET_LOG2: u32 = 8;

/// Largest transform size a plan can describe, as a base-2 logarithm.
pub const MAX_PLAN_LOG2: u32 = usize::BITS - 1;

/// Node of a split tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PlanNode {
    /// Straight-line codelet over 2^k elements.
    Small(u32),
    /// Tensor factorization into the children, left to right from the most
    /// significant index bits to the least significant ones.
    Split(Vec<PlanNode>),
}

impl PlanNode {
    /// Base-2 logarithm of the transform size this node covers.
    pub fn log2_len(&self) -> u32 {
        match self {
            PlanNode::Small(k) => *k,
            PlanNode::Split(children) => children.iter().map(PlanNode::log2_len).sum(),
        }
    }

    /// Checks the structural rules of a split tree
    ///
    /// # Rules
    /// - A codelet covers at most 2^[`MAX_CODELET_LOG2`] elements
    /// - A split has at least two children
    /// - Every child of a split covers at least two elements
    /// - The whole tree covers at most 2^[`MAX_PLAN_LOG2`] elements
    /// - The tree is at most [`MAX_PLAN_LOG2`] splits deep
    pub fn validate(&self) -> Result<()> {
        let total = self.validate_node(0)?;
        if total > MAX_PLAN_LOG2 {
            return Err(WhtError::InvalidPlan(format!(
                "plan size 2^{} exceeds the maximum of 2^{}",
                total, MAX_PLAN_LOG2
            )));
        }
        Ok(())
    }

    // Returns the node's log2 size. Every split child covers at least one
    // bit, so a valid tree is never deeper than MAX_PLAN_LOG2.
    fn validate_node(&self, depth: u32) -> Result<u32> {
        match self {
            PlanNode::Small(k) => {
                if *k > MAX_CODELET_LOG2 {
                    return Err(WhtError::InvalidPlan(format!(
                        "codelet small[{}] exceeds the largest codelet small[{}]",
                        k, MAX_CODELET_LOG2
                    )));
                }
                Ok(*k)
            }
            PlanNode::Split(children) => {
                if depth >= MAX_PLAN_LOG2 {
                    return Err(WhtError::InvalidPlan(format!(
                        "split tree deeper than {} levels",
                        MAX_PLAN_LOG2
                    )));
                }
                if children.len() < 2 {
                    return Err(WhtError::InvalidPlan(format!(
                        "split needs at least two children, got {}",
                        children.len()
                    )));
                }
                children.iter().try_fold(0u32, |acc, child| {
                    let child_log2 = child.validate_node(depth + 1)?;
                    if child_log2 == 0 {
                        return Err(WhtError::InvalidPlan(
                            "split child must cover at least two elements".to_string(),
                        ));
                    }
                    acc.checked_add(child_log2)
                        .ok_or_else(|| WhtError::InvalidPlan("plan size overflows".to_string()))
                })
            }
        }
    }

    /// Default factorization of a transform of size 2^`log2_len`
    ///
    /// Sizes up to the codelet limit become a single `small[log2_len]`.
    /// Larger sizes become a flat split of `small[max_codelet_log2]` codelets,
    /// with the remainder as the last child.
    ///
    /// # Error Conditions
    /// - `max_codelet_log2` is zero or above [`MAX_CODELET_LOG2`]
    /// - `log2_len` above [`MAX_PLAN_LOG2`]
    pub fn factorize(log2_len: u32, max_codelet_log2: u32) -> Result<Self> {
        if max_codelet_log2 == 0 || max_codelet_log2 > MAX_CODELET_LOG2 {
            return Err(WhtError::InvalidPlan(format!(
                "codelet size 2^{} outside supported range 2^1..=2^{}",
                max_codelet_log2, MAX_CODELET_LOG2
            )));
        }
        if log2_len > MAX_PLAN_LOG2 {
            return Err(WhtError::InvalidPlan(format!(
                "plan size 2^{} exceeds the maximum of 2^{}",
                log2_len, MAX_PLAN_LOG2
            )));
        }

        if log2_len <= max_codelet_log2 {
            return Ok(PlanNode::Small(log2_len));
        }

        let full = log2_len / max_codelet_log2;
        let remainder = log2_len % max_codelet_log2;
        let mut children = vec![PlanNode::Small(max_codelet_log2); full as usize];
        if remainder > 0 {
            children.push(PlanNode::Small(remainder));
        }
        Ok(PlanNode::Split(children))
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNode::Small(k) => write!(f, "small[{}]", k),
            PlanNode::Split(children) => {
                write!(f, "split[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl FromStr for PlanNode {
    type Err = WhtError;

    /// Parses tree notation such as `split[small[4], small[4]]`.
    ///
    /// Whitespace between tokens is ignored. The parsed tree is validated.
    fn from_str(s: &str) -> Result<Self> {
        let mut parser = TreeParser {
            input: s.as_bytes(),
            pos: 0,
            depth: 0,
        };
        let node = parser.parse_node()?;
        parser.skip_whitespace();
        if parser.pos != parser.input.len() {
            return Err(parser.error("trailing input"));
        }
        node.validate()?;
        Ok(node)
    }
}

struct TreeParser<'a> {
    input: &'a [u8],
    pos: usize,
    /// Number of enclosing `split[` at the current position
    depth: u32,
}

impl TreeParser<'_> {
    fn parse_node(&mut self) -> Result<PlanNode> {
        self.skip_whitespace();
        if self.eat_keyword("small") {
            self.expect(b'[')?;
            let k = self.parse_number()?;
            self.expect(b']')?;
            Ok(PlanNode::Small(k))
        } else if self.eat_keyword("split") {
            // Same bound as PlanNode::validate; checked before recursing.
            if self.depth >= MAX_PLAN_LOG2 {
                return Err(self.error("split tree nested too deeply"));
            }
            self.depth += 1;
            self.expect(b'[')?;
            let mut children = vec![self.parse_node()?];
            loop {
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => {
                        self.pos += 1;
                        children.push(self.parse_node()?);
                    }
                    Some(b']') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error("expected ',' or ']'")),
                }
            }
            self.depth -= 1;
            Ok(PlanNode::Split(children))
        } else {
            Err(self.error("expected 'small' or 'split'"))
        }
    }

    fn parse_number(&mut self) -> Result<u32> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a number"));
        }
        // Only ASCII digits were consumed.
        let digits = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid number"))?;
        digits.parse().map_err(|_| self.error("number out of range"))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.input[self.pos..].starts_with(keyword.as_bytes()) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> WhtError {
        WhtError::InvalidPlan(format!("{} at offset {}", message, self.pos))
    }
}

/// Ready-to-apply transform plan for vectors of length 2^d
///
/// This is the execution context the binding acquires once per call and
/// shares across every column. It is immutable after construction, so one
/// plan can be applied from several threads at once.
///
/// Performance Characteristics:
/// - Time Complexity: d · 2^(d-1) butterflies per application
/// - Space Complexity: in place, no scratch beyond the caller's buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhtPlan {
    /// Split tree describing the factorization
    tree: PlanNode,

    /// Base-2 logarithm d of the transform length
    log2_len: u32,

    /// Transform length 2^d
    len: usize,
}

impl WhtPlan {
    /// Creates the default plan for vectors of length 2^`log2_len`
    ///
    /// # Arguments
    /// * `log2_len` - Base-2 logarithm of the vector length
    /// * `max_codelet_log2` - Largest codelet the factorization may use
    pub fn new(log2_len: u32, max_codelet_log2: u32) -> Result<Self> {
        Self::from_tree(PlanNode::factorize(log2_len, max_codelet_log2)?)
    }

    /// Creates a plan from an explicit split tree.
    pub fn from_tree(tree: PlanNode) -> Result<Self> {
        tree.validate()?;
        let log2_len = tree.log2_len();
        Ok(Self {
            tree,
            log2_len,
            len: 1usize << log2_len,
        })
    }

    pub fn log2_len(&self) -> u32 {
        self.log2_len
    }

    /// Length of the vectors this plan transforms.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: the smallest plan, `small[0]`, covers one element.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn tree(&self) -> &PlanNode {
        &self.tree
    }

    /// Applies the unnormalized Walsh-Hadamard transform in place
    ///
    /// # Arguments
    /// * `data` - Vector of exactly [`len`](Self::len) elements (modified in place)
    ///
    /// # Mathematical Details
    /// Stage s combines the elements whose indices differ only in bit s,
    /// replacing each pair (a, b) with (a + b, a - b). After all d stages
    /// `data[i] = Σ_j (-1)^{popcount(i & j)} · x[j]`. Applying the plan twice
    /// multiplies the input by 2^d.
    ///
    /// # Error Conditions
    /// - `data.len()` differs from the plan length
    pub fn apply<T: Num + Copy>(&self, data: &mut [T]) -> Result<()> {
        if data.len() != self.len {
            return Err(WhtError::InvalidDimension {
                expected: self.len,
                got: data.len(),
            });
        }

        apply_node(&self.tree, data, 0, 1);
        Ok(())
    }
}

fn apply_node<T: Num + Copy>(node: &PlanNode, data: &mut [T], base: usize, stride: usize) {
    match node {
        PlanNode::Small(k) => apply_codelet(*k, data, base, stride),
        PlanNode::Split(children) => {
            let total = node.log2_len();
            // log2 of the identity factor to the right of the current child
            let mut right = 0u32;

            for child in children.iter().rev() {
                let child_log2 = child.log2_len();
                let left = total - right - child_log2;

                let right_len = 1usize << right;
                let left_len = 1usize << left;
                let child_span = (1usize << child_log2) * right_len;

                // I_left ⊗ WHT_child ⊗ I_right
                for j in 0..left_len {
                    for k in 0..right_len {
                        let offset = base + (j * child_span + k) * stride;
                        apply_node(child, data, offset, right_len * stride);
                    }
                }

                right += child_log2;
            }
        }
    }
}

#[inline]
fn apply_codelet<T: Num + Copy>(log2_len: u32, data: &mut [T], base: usize, stride: usize) {
    let len = 1usize << log2_len;
    let mut half = 1usize;

    while half < len {
        for block in (0..len).step_by(half << 1) {
            for i in block..block + half {
                let a = base + i * stride;
                let b = a + half * stride;
                let (x, y) = (data[a], data[b]);
                data[a] = x + y;
                data[b] = x - y;
            }
        }
        half <<= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::reference_transform;

    fn sample(len: usize) -> Vec<f64> {
        (0..len).map(|i| ((i * 7 + 3) % 11) as f64 - 5.0).collect()
    }

    /// Test default factorization shapes
    #[test]
    fn test_factorize() {
        assert_eq!(PlanNode::factorize(0, 8).unwrap(), PlanNode::Small(0));
        assert_eq!(PlanNode::factorize(5, 8).unwrap(), PlanNode::Small(5));
        assert_eq!(
            PlanNode::factorize(8, 3).unwrap(),
            PlanNode::Split(vec![PlanNode::Small(3), PlanNode::Small(3), PlanNode::Small(2)])
        );
        assert_eq!(
            PlanNode::factorize(6, 3).unwrap(),
            PlanNode::Split(vec![PlanNode::Small(3), PlanNode::Small(3)])
        );
        assert_eq!(PlanNode::factorize(20, 8).unwrap().log2_len(), 20);

        assert!(PlanNode::factorize(4, 0).is_err());
        assert!(PlanNode::factorize(4, MAX_CODELET_LOG2 + 1).is_err());
        assert!(PlanNode::factorize(MAX_PLAN_LOG2 + 1, 8).is_err());
    }

    /// Test tree notation round trip and whitespace tolerance
    #[test]
    fn test_parse_and_display() {
        let tree: PlanNode = "split[small[1], split[ small[2] ,small[1]],small[3]]".parse().unwrap();
        assert_eq!(tree.log2_len(), 7);
        assert_eq!(tree.to_string(), "split[small[1],split[small[2],small[1]],small[3]]");
        assert_eq!(tree.to_string().parse::<PlanNode>().unwrap(), tree);
    }

    /// Test rejection of malformed trees
    #[test]
    fn test_parse_errors() {
        for bad in [
            "",
            "small",
            "small[]",
            "small[2",
            "small[9]",
            "split[small[2]]",
            "split[small[2],small[0]]",
            "split[small[2];small[1]]",
            "small[2] extra",
            "tiny[2]",
            "small[99999999999]",
        ] {
            let err = bad.parse::<PlanNode>().unwrap_err();
            assert!(matches!(err, WhtError::InvalidPlan(_)), "{:?} gave {:?}", bad, err);
        }
    }

    /// Test deeply nested tree text is rejected without recursing per level
    #[test]
    fn test_parse_rejects_deep_nesting() {
        let depth = 200_000;
        let text = format!("{}small[1]{}", "split[small[1],".repeat(depth), "]".repeat(depth));
        let err = text.parse::<PlanNode>().unwrap_err();
        assert!(matches!(err, WhtError::InvalidPlan(_)), "{:?}", err);

        // The deepest tree that still fits is accepted.
        let levels = MAX_PLAN_LOG2 as usize - 1;
        let text = format!("{}small[1]{}", "split[small[1],".repeat(levels), "]".repeat(levels));
        let tree: PlanNode = text.parse().unwrap();
        assert_eq!(tree.log2_len(), MAX_PLAN_LOG2);
    }

    /// Test depth limit on trees built in code
    #[test]
    fn test_validate_rejects_deep_tree() {
        let mut tree = PlanNode::Small(1);
        for _ in 0..200 {
            tree = PlanNode::Split(vec![PlanNode::Small(1), tree]);
        }
        assert!(matches!(tree.validate(), Err(WhtError::InvalidPlan(_))));
        assert!(WhtPlan::from_tree(tree).is_err());
    }

    /// Test the order-4 Hadamard rows and constant vector
    #[test]
    fn test_small_sizes() {
        let plan = WhtPlan::new(2, 8).unwrap();

        let mut ones = vec![1.0; 4];
        plan.apply(&mut ones).unwrap();
        assert_eq!(ones, vec![4.0, 0.0, 0.0, 0.0]);

        let mut e1 = vec![0.0, 1.0, 0.0, 0.0];
        plan.apply(&mut e1).unwrap();
        assert_eq!(e1, vec![1.0, -1.0, 1.0, -1.0]);

        let mut x = vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        WhtPlan::new(3, 8).unwrap().apply(&mut x).unwrap();
        assert_eq!(x, vec![4.0, 2.0, 0.0, -2.0, 0.0, 2.0, 0.0, 2.0]);
    }

    /// Test that every factorization of a size computes the same transform
    #[test]
    fn test_trees_agree_with_reference() {
        let trees = [
            "small[6]",
            "split[small[3],small[3]]",
            "split[small[1],small[5]]",
            "split[small[5],small[1]]",
            "split[small[2],split[small[1],small[2]],small[1]]",
            "split[small[1],small[1],small[1],small[1],small[1],small[1]]",
        ];
        let input = sample(64);
        let expected = reference_transform(&input);

        for text in trees {
            let plan = WhtPlan::from_tree(text.parse().unwrap()).unwrap();
            let mut data = input.clone();
            plan.apply(&mut data).unwrap();
            assert_eq!(data, expected, "tree {}", text);
        }
    }

    /// Test FWHT(FWHT(x)) == N * x on integer data
    #[test]
    fn test_self_inverse_i64() {
        let plan = WhtPlan::new(10, 4).unwrap();
        let original: Vec<i64> = (0..1024).map(|i| (i * 31 % 17) - 8).collect();
        let mut data = original.clone();

        plan.apply(&mut data).unwrap();
        plan.apply(&mut data).unwrap();

        for (got, want) in data.iter().zip(&original) {
            assert_eq!(*got, want * 1024);
        }
    }

    /// Test f32 data against the f64 result
    #[test]
    fn test_apply_f32() {
        let plan = WhtPlan::new(4, 2).unwrap();
        let mut single: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
        let mut double: Vec<f64> = (0..16).map(|i| i as f64 * 0.5).collect();
        plan.apply(&mut single).unwrap();
        plan.apply(&mut double).unwrap();
        for (s, d) in single.iter().zip(&double) {
            assert!((*s as f64 - d).abs() < 1e-4);
        }
    }

    /// Test length validation and the trivial plan
    #[test]
    fn test_apply_length_mismatch() {
        let plan = WhtPlan::new(3, 8).unwrap();
        let mut short = vec![0.0; 4];
        assert_eq!(
            plan.apply(&mut short).unwrap_err(),
            WhtError::InvalidDimension { expected: 8, got: 4 }
        );

        let identity = WhtPlan::new(0, 8).unwrap();
        let mut one = vec![3.5];
        identity.apply(&mut one).unwrap();
        assert_eq!(one, vec![3.5]);
        assert_eq!(identity.len(), 1);
        assert!(!identity.is_empty());
    }
}
