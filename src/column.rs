//! Categorical columns
//!
//! A categorical column stores each row as a small integer code that indexes
//! into a list of category labels. Code `-1` marks a missing row.
//!
//! ```text
//! categories: [10, 20, 30]
//! values:     [20, 20, 30, 10, <NA>]
//! codes:      [ 1,  1,  2,  0,   -1]
//! ```

use crate::error::EngineError;
use crate::workload::tile;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Code reserved for missing rows
pub const MISSING_CODE: i32 = -1;

/// Storage type of category labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelType {
    Int64,
    Float32,
    Float64,
}

impl LabelType {
    /// Whether labels of this type compare as floating point
    pub fn is_float(self) -> bool {
        !matches!(self, LabelType::Int64)
    }

    /// Width of one label in bytes
    pub fn width(self) -> u64 {
        match self {
            LabelType::Int64 | LabelType::Float64 => 8,
            LabelType::Float32 => 4,
        }
    }
}

/// A typed vector of labels (category lists or raw values to encode)
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl Labels {
    /// Integer range `[start, end)`
    pub fn arange_i64(start: i64, end: i64) -> Self {
        Labels::Int64((start..end).collect())
    }

    /// Integer range `[start, end)` stored as `f32`
    pub fn arange_f32(start: i64, end: i64) -> Self {
        Labels::Float32((start..end).map(|v| v as f32).collect())
    }

    /// Integer range `[start, end)` stored as `f64`
    pub fn arange_f64(start: i64, end: i64) -> Self {
        Labels::Float64((start..end).map(|v| v as f64).collect())
    }

    /// Storage type of these labels
    pub fn label_type(&self) -> LabelType {
        match self {
            Labels::Int64(_) => LabelType::Int64,
            Labels::Float32(_) => LabelType::Float32,
            Labels::Float64(_) => LabelType::Float64,
        }
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        match self {
            Labels::Int64(v) => v.len(),
            Labels::Float32(v) => v.len(),
            Labels::Float64(v) => v.len(),
        }
    }

    /// Check if there are no labels
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes occupied by the label storage
    pub fn size_bytes(&self) -> u64 {
        self.len() as u64 * self.label_type().width()
    }

    /// Repeat these labels end-to-end up to `len` elements
    pub fn tile(&self, len: usize) -> Self {
        match self {
            Labels::Int64(v) => Labels::Int64(tile(v, len)),
            Labels::Float32(v) => Labels::Float32(tile(v, len)),
            Labels::Float64(v) => Labels::Float64(tile(v, len)),
        }
    }

    /// Lookup keys for matching labels across lists.
    ///
    /// With `as_float` set, integers are widened to `f64` so that `3` and
    /// `3.0` produce the same key. NaN never produces a key.
    fn lookup_keys(&self, as_float: bool) -> Vec<Option<u64>> {
        match self {
            Labels::Int64(v) if !as_float => v.iter().map(|&x| Some(x as u64)).collect(),
            Labels::Int64(v) => v.iter().map(|&x| float_key(x as f64)).collect(),
            Labels::Float32(v) => v.iter().map(|&x| float_key(f64::from(x))).collect(),
            Labels::Float64(v) => v.iter().map(|&x| float_key(x)).collect(),
        }
    }

    /// Map each label key to its position, rejecting duplicates
    fn position_map(&self, as_float: bool) -> Result<HashMap<u64, i32>, EngineError> {
        let keys = self.lookup_keys(as_float);
        let mut positions = HashMap::with_capacity(keys.len());
        for (pos, key) in keys.into_iter().enumerate() {
            if let Some(key) = key {
                if positions.insert(key, pos as i32).is_some() {
                    return Err(EngineError::DuplicateCategories(pos));
                }
            }
        }
        Ok(positions)
    }

    /// First position of every distinct key, plus the positions kept.
    ///
    /// Later labels equal to an earlier one are dropped, and the map holds
    /// positions in the deduplicated list. Labels without a key (NaN) are
    /// kept but never matched.
    fn first_positions(&self, as_float: bool) -> (HashMap<u64, i32>, Vec<usize>) {
        let keys = self.lookup_keys(as_float);
        let mut positions = HashMap::with_capacity(keys.len());
        let mut kept = Vec::with_capacity(keys.len());
        for (pos, key) in keys.into_iter().enumerate() {
            match key {
                Some(key) if positions.contains_key(&key) => continue,
                Some(key) => {
                    positions.insert(key, kept.len() as i32);
                }
                None => {}
            }
            kept.push(pos);
        }
        (positions, kept)
    }

    /// The labels at `positions`, in that order
    fn select(&self, positions: &[usize]) -> Self {
        match self {
            Labels::Int64(v) => Labels::Int64(positions.iter().map(|&p| v[p]).collect()),
            Labels::Float32(v) => Labels::Float32(positions.iter().map(|&p| v[p]).collect()),
            Labels::Float64(v) => Labels::Float64(positions.iter().map(|&p| v[p]).collect()),
        }
    }

    /// Append the labels of `other` found at `positions`
    fn extend_selected(&mut self, other: &Labels, positions: &[usize]) -> Result<(), EngineError> {
        let left = self.label_type();
        match (self, other) {
            (Labels::Int64(a), Labels::Int64(b)) => a.extend(positions.iter().map(|&p| b[p])),
            (Labels::Float32(a), Labels::Float32(b)) => a.extend(positions.iter().map(|&p| b[p])),
            (Labels::Float64(a), Labels::Float64(b)) => a.extend(positions.iter().map(|&p| b[p])),
            (_, other) => {
                return Err(EngineError::LabelTypeMismatch {
                    left,
                    right: other.label_type(),
                })
            }
        }
        Ok(())
    }
}

fn float_key(v: f64) -> Option<u64> {
    if v.is_nan() {
        None
    } else if v == 0.0 {
        // -0.0 and 0.0 are the same label
        Some(0.0f64.to_bits())
    } else {
        Some(v.to_bits())
    }
}

/// Sorted unique labels plus the code of every value
fn encode_sorted<T: Copy + PartialOrd>(values: &[T]) -> (Vec<T>, Vec<i32>) {
    let mut categories: Vec<T> = values
        .iter()
        .copied()
        .filter(|v| v.partial_cmp(v).is_some())
        .collect();
    categories.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    categories.dedup();

    let codes = values
        .iter()
        .map(|v| {
            categories
                .binary_search_by(|c| c.partial_cmp(v).unwrap_or(Ordering::Less))
                .map_or(MISSING_CODE, |pos| pos as i32)
        })
        .collect();

    (categories, codes)
}

#[inline]
fn remap(code: i32, lookup: &[i32]) -> i32 {
    if code < 0 {
        MISSING_CODE
    } else {
        lookup[code as usize]
    }
}

fn check_cardinality(cardinality: usize) -> Result<(), EngineError> {
    if cardinality > i32::MAX as usize {
        return Err(EngineError::TooManyCategories(cardinality));
    }
    Ok(())
}

/// A column of category codes over a typed category list
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalColumn {
    categories: Labels,
    codes: Vec<i32>,
}

impl CategoricalColumn {
    /// Encode raw values: categories become the sorted distinct values
    pub fn encode(values: &Labels) -> Result<Self, EngineError> {
        let (categories, codes) = match values {
            Labels::Int64(v) => {
                let (cats, codes) = encode_sorted(v);
                (Labels::Int64(cats), codes)
            }
            Labels::Float32(v) => {
                let (cats, codes) = encode_sorted(v);
                (Labels::Float32(cats), codes)
            }
            Labels::Float64(v) => {
                let (cats, codes) = encode_sorted(v);
                (Labels::Float64(cats), codes)
            }
        };
        check_cardinality(categories.len())?;
        Ok(Self { categories, codes })
    }

    /// Build a column from an existing category list and codes
    pub fn from_codes(categories: Labels, codes: Vec<i32>) -> Result<Self, EngineError> {
        let cardinality = categories.len();
        check_cardinality(cardinality)?;
        if let Some(&code) = codes
            .iter()
            .find(|&&c| c != MISSING_CODE && (c < 0 || c as usize >= cardinality))
        {
            return Err(EngineError::InvalidCode { code, cardinality });
        }
        Ok(Self { categories, codes })
    }

    /// Category labels
    pub fn categories(&self) -> &Labels {
        &self.categories
    }

    /// Per-row codes
    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Check if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Size of the category list
    pub fn cardinality(&self) -> usize {
        self.categories.len()
    }

    /// Number of missing rows
    pub fn null_count(&self) -> usize {
        self.codes.iter().filter(|&&c| c == MISSING_CODE).count()
    }

    /// Number of distinct non-missing codes actually used
    pub fn distinct_codes(&self) -> usize {
        let mut seen = vec![false; self.cardinality()];
        let mut distinct = 0;
        for &code in self.codes.iter().filter(|&&c| c >= 0) {
            let slot = &mut seen[code as usize];
            if !*slot {
                *slot = true;
                distinct += 1;
            }
        }
        distinct
    }

    /// Bytes occupied by codes and categories
    pub fn size_bytes(&self) -> u64 {
        self.codes.len() as u64 * 4 + self.categories.size_bytes()
    }

    /// Replace the category list.
    ///
    /// Rows whose label is present in `new_categories` get that label's new
    /// position; all other rows become missing. Integer and floating point
    /// labels are matched numerically, and the result takes the type of
    /// `new_categories`. Repeated new labels (for example integers that
    /// collapse to one `f32`) are dropped, keeping the first.
    pub fn set_categories(&self, new_categories: &Labels) -> Result<Self, EngineError> {
        let as_float = self.categories.label_type().is_float()
            || new_categories.label_type().is_float();

        let (positions, kept) = new_categories.first_positions(as_float);
        let categories = if kept.len() == new_categories.len() {
            new_categories.clone()
        } else {
            new_categories.select(&kept)
        };
        check_cardinality(categories.len())?;

        let lookup: Vec<i32> = self
            .categories
            .lookup_keys(as_float)
            .into_iter()
            .map(|key| {
                key.and_then(|k| positions.get(&k).copied())
                    .unwrap_or(MISSING_CODE)
            })
            .collect();

        let codes = self.codes.iter().map(|&c| remap(c, &lookup)).collect();
        Ok(Self { categories, codes })
    }

    /// Append `other` below this column.
    ///
    /// Identical category lists are kept as is. Otherwise the result's
    /// categories are this column's followed by the labels only `other` has.
    pub fn concat(&self, other: &Self) -> Result<Self, EngineError> {
        let (left, right) = (self.categories.label_type(), other.categories.label_type());
        if left != right {
            return Err(EngineError::LabelTypeMismatch { left, right });
        }

        let mut codes = Vec::with_capacity(self.len() + other.len());
        codes.extend_from_slice(&self.codes);

        if self.categories == other.categories {
            codes.extend_from_slice(&other.codes);
            return Ok(Self {
                categories: self.categories.clone(),
                codes,
            });
        }

        let as_float = left.is_float();
        let mut known = self.categories.position_map(as_float)?;
        let mut appended = Vec::new();
        let mut lookup = Vec::with_capacity(other.cardinality());
        for (pos, key) in other.categories.lookup_keys(as_float).into_iter().enumerate() {
            let code = match key.and_then(|k| known.get(&k).copied()) {
                Some(code) => code,
                None => {
                    let code = (self.cardinality() + appended.len()) as i32;
                    if let Some(k) = key {
                        known.insert(k, code);
                    }
                    appended.push(pos);
                    code
                }
            };
            lookup.push(code);
        }

        let mut categories = self.categories.clone();
        categories.extend_selected(&other.categories, &appended)?;
        check_cardinality(categories.len())?;

        codes.extend(other.codes.iter().map(|&c| remap(c, &lookup)));
        Ok(Self { categories, codes })
    }

    /// Rows ordered by category position, missing rows last
    pub fn sort_values(&self) -> Self {
        let mut codes = self.codes.clone();
        // -1 reinterpreted as u32::MAX sorts after every valid code
        codes.sort_unstable_by_key(|&c| c as u32);
        Self {
            categories: self.categories.clone(),
            codes,
        }
    }

    /// Replace missing rows with the code `replacement` holds at that row
    pub fn fillna(&self, replacement: &Self) -> Result<Self, EngineError> {
        if self.len() != replacement.len() {
            return Err(EngineError::LengthMismatch {
                left: self.len(),
                right: replacement.len(),
            });
        }
        if self.categories != replacement.categories {
            return Err(EngineError::CategoriesMismatch);
        }

        let codes = self
            .codes
            .iter()
            .zip(&replacement.codes)
            .map(|(&c, &fill)| if c == MISSING_CODE { fill } else { c })
            .collect();
        Ok(Self {
            categories: self.categories.clone(),
            codes,
        })
    }

    /// Same rows in reverse order
    pub fn reversed(&self) -> Self {
        Self {
            categories: self.categories.clone(),
            codes: self.codes.iter().rev().copied().collect(),
        }
    }

    /// Pick rows by position; `None` yields a missing row
    pub(crate) fn gather(&self, rows: &[Option<usize>]) -> Self {
        let codes = rows
            .iter()
            .map(|row| row.map_or(MISSING_CODE, |r| self.codes[r]))
            .collect();
        Self {
            categories: self.categories.clone(),
            codes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(cardinality: i64, n_rows: usize) -> CategoricalColumn {
        CategoricalColumn::encode(&Labels::arange_i64(0, cardinality).tile(n_rows)).unwrap()
    }

    #[test]
    fn test_encode_sorts_categories() {
        let col = CategoricalColumn::encode(&Labels::Int64(vec![30, 10, 20, 10])).unwrap();
        assert_eq!(col.categories(), &Labels::Int64(vec![10, 20, 30]));
        assert_eq!(col.codes(), &[2, 0, 1, 0]);
        assert_eq!(col.null_count(), 0);
    }

    #[test]
    fn test_encode_nan_is_missing() {
        let col = CategoricalColumn::encode(&Labels::Float64(vec![1.5, f64::NAN, 0.5])).unwrap();
        assert_eq!(col.categories(), &Labels::Float64(vec![0.5, 1.5]));
        assert_eq!(col.codes(), &[1, MISSING_CODE, 0]);
    }

    #[test]
    fn test_from_codes_rejects_out_of_range() {
        let result = CategoricalColumn::from_codes(Labels::arange_i64(0, 3), vec![0, 3]);
        assert_eq!(
            result,
            Err(EngineError::InvalidCode {
                code: 3,
                cardinality: 3
            })
        );
        assert!(CategoricalColumn::from_codes(Labels::arange_i64(0, 3), vec![-1, 2]).is_ok());
    }

    #[test]
    fn test_set_categories_with_promotion() {
        // old [0..5) -> new [2.0..7.0)
        let col = column(5, 5);
        let new = col.set_categories(&Labels::arange_f32(2, 7)).unwrap();
        assert_eq!(new.codes(), &[-1, -1, 0, 1, 2]);
        assert_eq!(new.categories().label_type(), LabelType::Float32);
    }

    #[test]
    fn test_set_categories_same_type() {
        let col = column(5, 10);
        let new = col.set_categories(&Labels::arange_i64(2, 7)).unwrap();
        assert_eq!(new.codes(), &[-1, -1, 0, 1, 2, -1, -1, 0, 1, 2]);
        assert_eq!(new.null_count(), 4);
    }

    #[test]
    fn test_set_categories_keeps_missing() {
        let col = CategoricalColumn::from_codes(Labels::arange_i64(0, 2), vec![1, -1, 0]).unwrap();
        let new = col.set_categories(&Labels::Int64(vec![1, 0])).unwrap();
        assert_eq!(new.codes(), &[0, -1, 1]);
    }

    #[test]
    fn test_set_categories_drops_repeated_labels() {
        let col = column(3, 3);
        let new = col.set_categories(&Labels::Int64(vec![2, 1, 1, 0, 2])).unwrap();
        assert_eq!(new.categories(), &Labels::Int64(vec![2, 1, 0]));
        assert_eq!(new.codes(), &[2, 1, 0]);
    }

    #[test]
    fn test_set_categories_past_f32_precision() {
        // Above 2^24 consecutive integers collapse onto the same f32
        let col = CategoricalColumn::encode(&Labels::Int64(vec![0, 1, 2])).unwrap();
        let new = col
            .set_categories(&Labels::arange_f32(50_000_000, 50_001_000))
            .unwrap();
        // f32 spacing is 4 here
        assert_eq!(new.cardinality(), 251);
        assert_eq!(new.null_count(), 3);

        let base = 1 << 24;
        let col = CategoricalColumn::encode(&Labels::arange_i64(base, base + 4)).unwrap();
        let new = col.set_categories(&Labels::arange_f32(base, base + 4)).unwrap();
        assert_eq!(
            new.categories(),
            &Labels::Float32(vec![16_777_216.0, 16_777_218.0, 16_777_220.0])
        );
        // 2^24 + 1 and 2^24 + 3 have no exact f32 label
        assert_eq!(new.codes(), &[0, -1, 1, -1]);
    }

    #[test]
    fn test_concat_identical_categories() {
        let a = column(4, 8);
        let b = column(4, 8);
        let joined = a.concat(&b).unwrap();
        assert_eq!(joined.len(), 16);
        assert_eq!(joined.cardinality(), 4);
        assert_eq!(&joined.codes()[8..], b.codes());
    }

    #[test]
    fn test_concat_unions_categories() {
        let a = CategoricalColumn::encode(&Labels::Int64(vec![1, 2])).unwrap();
        let b = CategoricalColumn::encode(&Labels::Int64(vec![3, 2])).unwrap();
        let joined = a.concat(&b).unwrap();
        assert_eq!(joined.categories(), &Labels::Int64(vec![1, 2, 3]));
        assert_eq!(joined.codes(), &[0, 1, 2, 1]);
    }

    #[test]
    fn test_concat_type_mismatch() {
        let a = column(2, 2);
        let b = CategoricalColumn::encode(&Labels::arange_f64(0, 2)).unwrap();
        assert!(matches!(
            a.concat(&b),
            Err(EngineError::LabelTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_sort_values_missing_last() {
        let col =
            CategoricalColumn::from_codes(Labels::arange_i64(0, 3), vec![2, -1, 0, 1, 0]).unwrap();
        assert_eq!(col.sort_values().codes(), &[0, 0, 1, 2, -1]);
    }

    #[test]
    fn test_fillna_replaces_only_missing() {
        let col = CategoricalColumn::from_codes(Labels::arange_i64(0, 3), vec![2, -1, -1]).unwrap();
        let fill = CategoricalColumn::from_codes(Labels::arange_i64(0, 3), vec![0, 1, 0]).unwrap();
        let filled = col.fillna(&fill).unwrap();
        assert_eq!(filled.codes(), &[2, 1, 0]);
        assert_eq!(filled.null_count(), 0);
    }

    #[test]
    fn test_fillna_requires_matching_operands() {
        let col = column(3, 3);
        let short = column(3, 6);
        assert!(matches!(
            col.fillna(&short),
            Err(EngineError::LengthMismatch { left: 3, right: 6 })
        ));

        let other = column(2, 3);
        assert_eq!(col.fillna(&other), Err(EngineError::CategoriesMismatch));
    }

    #[test]
    fn test_distinct_codes() {
        let col = column(7, 70);
        assert_eq!(col.distinct_codes(), 7);
        let narrowed = col.set_categories(&Labels::arange_i64(0, 3)).unwrap();
        assert_eq!(narrowed.distinct_codes(), 3);
    }

    #[test]
    fn test_reversed_and_gather() {
        let col = column(3, 3);
        assert_eq!(col.reversed().codes(), &[2, 1, 0]);
        assert_eq!(col.gather(&[Some(2), None, Some(0)]).codes(), &[2, -1, 0]);
    }
}
