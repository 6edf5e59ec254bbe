//! Minimal dataframe: an `i64` row index plus named columns

use crate::column::CategoricalColumn;
use crate::error::EngineError;
use std::collections::HashMap;

/// A single frame column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Categorical(CategoricalColumn),
    /// Nullable 64-bit integers
    Int64(Vec<Option<i64>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Categorical(c) => c.len(),
            Column::Int64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes one row of this column occupies
    pub fn row_width(&self) -> u64 {
        match self {
            Column::Categorical(_) => 4,
            Column::Int64(_) => std::mem::size_of::<Option<i64>>() as u64,
        }
    }

    /// Number of missing rows
    pub fn null_count(&self) -> usize {
        match self {
            Column::Categorical(c) => c.null_count(),
            Column::Int64(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    fn gather(&self, rows: &[Option<usize>]) -> Column {
        match self {
            Column::Categorical(c) => Column::Categorical(c.gather(rows)),
            Column::Int64(v) => {
                Column::Int64(rows.iter().map(|row| row.and_then(|r| v[r])).collect())
            }
        }
    }
}

/// Row positions produced by a join
#[derive(Debug, Default)]
pub(crate) struct JoinPlan {
    pub left: Vec<Option<usize>>,
    pub right: Vec<Option<usize>>,
}

impl JoinPlan {
    pub fn len(&self) -> usize {
        self.left.len()
    }
}

/// Named columns sharing one row index
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: Vec<i64>,
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Frame {
    /// Empty frame over the given index labels
    pub fn new(index: Vec<i64>) -> Self {
        Self {
            index,
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Empty frame indexed `0..len`
    pub fn with_range_index(len: usize) -> Self {
        Self::new((0..len as i64).collect())
    }

    /// Add a column; its length must match the index
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<Self, EngineError> {
        let name = name.into();
        if column.len() != self.index.len() {
            return Err(EngineError::LengthMismatch {
                left: self.index.len(),
                right: column.len(),
            });
        }
        if self.names.contains(&name) {
            return Err(EngineError::ColumnNameCollision(name));
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|pos| &self.columns[pos])
    }

    /// Bytes per output row of a join between `self` and `other`
    pub(crate) fn joined_row_width(&self, other: &Frame) -> u64 {
        let index_width = std::mem::size_of::<i64>() as u64;
        index_width
            + self
                .columns
                .iter()
                .chain(&other.columns)
                .map(Column::row_width)
                .sum::<u64>()
    }

    /// Match every left row against the right rows carrying the same index label
    pub(crate) fn plan_left_join(&self, other: &Frame) -> JoinPlan {
        let mut by_label: HashMap<i64, Vec<usize>> = HashMap::with_capacity(other.len());
        for (row, &label) in other.index.iter().enumerate() {
            by_label.entry(label).or_default().push(row);
        }

        let mut plan = JoinPlan {
            left: Vec::with_capacity(self.len()),
            right: Vec::with_capacity(self.len()),
        };
        for (row, label) in self.index.iter().enumerate() {
            match by_label.get(label) {
                Some(matches) => {
                    for &r in matches {
                        plan.left.push(Some(row));
                        plan.right.push(Some(r));
                    }
                }
                None => {
                    plan.left.push(Some(row));
                    plan.right.push(None);
                }
            }
        }
        plan
    }

    /// Materialize a planned join.
    ///
    /// Right columns whose name already exists on the left get `rsuffix`.
    pub(crate) fn materialize_join(
        &self,
        other: &Frame,
        plan: &JoinPlan,
        rsuffix: &str,
    ) -> Result<Frame, EngineError> {
        let index = plan
            .left
            .iter()
            .map(|row| row.map_or(0, |r| self.index[r]))
            .collect();
        let mut joined = Frame::new(index);

        for (name, column) in self.names.iter().zip(&self.columns) {
            joined = joined.with_column(name.clone(), column.gather(&plan.left))?;
        }
        for (name, column) in other.names.iter().zip(&other.columns) {
            let name = if self.names.contains(name) {
                if rsuffix.is_empty() {
                    return Err(EngineError::ColumnNameCollision(name.clone()));
                }
                format!("{name}{rsuffix}")
            } else {
                name.clone()
            };
            joined = joined.with_column(name, column.gather(&plan.right))?;
        }
        Ok(joined)
    }

    /// Left join on the row index
    pub fn join(&self, other: &Frame, rsuffix: &str) -> Result<Frame, EngineError> {
        let plan = self.plan_left_join(other);
        self.materialize_join(other, &plan, rsuffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Labels;

    fn key(values: Vec<i64>) -> Column {
        Column::Categorical(CategoricalColumn::encode(&Labels::Int64(values)).unwrap())
    }

    #[test]
    fn test_with_column_length_check() {
        let result = Frame::with_range_index(3).with_column("a", Column::Int64(vec![Some(1)]));
        assert_eq!(
            result,
            Err(EngineError::LengthMismatch { left: 3, right: 1 })
        );
    }

    #[test]
    fn test_with_column_rejects_duplicate_name() {
        let result = Frame::with_range_index(1)
            .with_column("a", Column::Int64(vec![Some(1)]))
            .and_then(|f| f.with_column("a", Column::Int64(vec![Some(2)])));
        assert_eq!(result, Err(EngineError::ColumnNameCollision("a".into())));
    }

    #[test]
    fn test_join_suffixes_collisions() {
        let lhs = Frame::with_range_index(3)
            .with_column("key", key(vec![0, 1, 2]))
            .unwrap();
        let rhs = Frame::with_range_index(3)
            .with_column("key", key(vec![2, 1, 0]))
            .unwrap()
            .with_column("rpayload", Column::Int64(vec![Some(7), Some(8), Some(9)]))
            .unwrap();

        let joined = lhs.join(&rhs, "_r").unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.column_names(), vec!["key", "key_r", "rpayload"]);
        let Some(Column::Categorical(key_r)) = joined.column("key_r") else {
            panic!("key_r missing");
        };
        assert_eq!(key_r.codes(), &[2, 1, 0]);
    }

    #[test]
    fn test_join_unmatched_rows_are_null() {
        let lhs = Frame::new(vec![0, 5])
            .with_column("a", Column::Int64(vec![Some(1), Some(2)]))
            .unwrap();
        let rhs = Frame::new(vec![5])
            .with_column("b", Column::Int64(vec![Some(50)]))
            .unwrap();

        let joined = lhs.join(&rhs, "_r").unwrap();
        assert_eq!(joined.index(), &[0, 5]);
        assert_eq!(joined.column("b"), Some(&Column::Int64(vec![None, Some(50)])));
        assert_eq!(joined.column("b").map(Column::null_count), Some(1));
    }

    #[test]
    fn test_join_repeats_left_row_for_duplicate_labels() {
        let lhs = Frame::new(vec![1])
            .with_column("a", Column::Int64(vec![Some(1)]))
            .unwrap();
        let rhs = Frame::new(vec![1, 1])
            .with_column("b", Column::Int64(vec![Some(10), Some(11)]))
            .unwrap();
        let joined = lhs.join(&rhs, "").unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.column("a"), Some(&Column::Int64(vec![Some(1), Some(1)])));
    }

    #[test]
    fn test_join_collision_without_suffix() {
        let lhs = Frame::with_range_index(1)
            .with_column("a", Column::Int64(vec![Some(1)]))
            .unwrap();
        let result = lhs.join(&lhs, "");
        assert_eq!(result, Err(EngineError::ColumnNameCollision("a".into())));
    }
}
