use starload_storage::ColumnValue;

/// Split rows into consecutive batches of at most `size` rows
///
/// A zero size is treated as one row per batch.
pub fn into_batches(rows: Vec<Vec<ColumnValue>>, size: usize) -> Vec<Vec<Vec<ColumnValue>>> {
    let size = size.max(1);
    let mut batches = Vec::with_capacity(rows.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(rows.len()));
    for row in rows {
        current.push(row);
        if current.len() == size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: i64) -> Vec<Vec<ColumnValue>> {
        (0..n).map(|i| vec![ColumnValue::Integer(i)]).collect()
    }

    #[test]
    fn test_exact_and_remainder() {
        let sizes: Vec<usize> = into_batches(rows(2500), 1000).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);

        let sizes: Vec<usize> = into_batches(rows(6), 3).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3]);
    }

    #[test]
    fn test_order_is_preserved() {
        let batches = into_batches(rows(5), 2);
        let flat: Vec<i64> = batches
            .into_iter()
            .flatten()
            .filter_map(|r| r[0].as_i64())
            .collect();
        assert_eq!(flat, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_and_zero_size() {
        assert!(into_batches(Vec::new(), 10).is_empty());
        assert_eq!(into_batches(rows(3), 0).len(), 3);
    }
}
