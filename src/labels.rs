//! Categorical label assignment over points.
//!
//! Labels are stored once as sorted distinct categories; each point carries a
//! dense `u32` code into that list. Permutations replace the whole code vector
//! and never touch the categories, so the label multiset is preserved.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use log::debug;

use crate::error::{Result, SpatialError};

#[derive(Debug, Clone, PartialEq)]
pub struct LabelAssignment<L> {
    categories: Vec<L>,
    codes: Vec<u32>,
}

impl<L> LabelAssignment<L>
where
    L: Clone + Ord + Hash + Debug,
{
    /// Encode one label per point.
    pub fn new(labels: &[L]) -> Result<Self> {
        if labels.is_empty() {
            return Err(SpatialError::InvalidParameter(
                "label assignment must contain at least one point".to_string(),
            ));
        }
        let mut categories: Vec<L> = labels.to_vec();
        categories.sort();
        categories.dedup();

        let lookup: HashMap<&L, u32> = categories
            .iter()
            .enumerate()
            .map(|(c, l)| (l, c as u32))
            .collect();
        let codes = labels.iter().map(|l| lookup[l]).collect();

        debug!(
            "Encoded {} labels into {} categories",
            labels.len(),
            categories.len()
        );
        Ok(Self { categories, codes })
    }

    /// Same categories, different code vector (a permutation of this one).
    pub fn with_codes(&self, codes: Vec<u32>) -> Result<Self> {
        if codes.len() != self.codes.len() {
            return Err(SpatialError::InvalidParameter(format!(
                "expected {} codes, got {}",
                self.codes.len(),
                codes.len()
            )));
        }
        if let Some(&bad) = codes.iter().find(|&&c| c as usize >= self.categories.len()) {
            return Err(SpatialError::InvalidParameter(format!(
                "code {} out of range for {} categories",
                bad,
                self.categories.len()
            )));
        }
        Ok(Self {
            categories: self.categories.clone(),
            codes,
        })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> &[L] {
        &self.categories
    }

    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    pub fn category(&self, code: u32) -> &L {
        &self.categories[code as usize]
    }

    /// Label of point `i`.
    pub fn label(&self, i: usize) -> &L {
        self.category(self.codes[i])
    }

    /// Number of points per category, indexed by code.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.categories.len()];
        for &c in &self.codes {
            counts[c as usize] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_is_sorted_and_dense() {
        let labels = LabelAssignment::new(&["b", "a", "c", "a"]).unwrap();
        assert_eq!(labels.categories(), &["a", "b", "c"]);
        assert_eq!(labels.codes(), &[1, 0, 2, 0]);
        assert_eq!(labels.counts(), vec![2, 1, 1]);
        assert_eq!(*labels.label(2), "c");
    }

    #[test]
    fn test_with_codes_validates() {
        let labels = LabelAssignment::new(&[1u32, 2, 2]).unwrap();
        assert!(labels.with_codes(vec![1, 1, 0]).is_ok());
        assert!(labels.with_codes(vec![0, 1]).is_err());
        assert!(labels.with_codes(vec![0, 1, 2]).is_err());
    }

    #[test]
    fn test_empty_rejected() {
        assert!(LabelAssignment::<u32>::new(&[]).is_err());
    }
}
