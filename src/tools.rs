/// Splits a sorted slice into runs of equal keys.
pub struct GroupBy<'a, T, F, K>
where
    T: 'a,
    F: FnMut(&T) -> K,
    K: PartialEq,
{
    slice: &'a [T],
    key: F,
}

impl<'a, T, F, K> GroupBy<'a, T, F, K>
where
    T: 'a,
    F: FnMut(&T) -> K,
    K: PartialEq,
{
    pub fn new(slice: &'a [T], key: F) -> Self {
        GroupBy { slice, key }
    }
}

impl<'a, T, F, K> Iterator for GroupBy<'a, T, F, K>
where
    T: 'a,
    F: FnMut(&T) -> K,
    K: PartialEq,
{
    type Item = (K, &'a [T]);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let slice = self.slice;
        let (first, rest) = slice.split_first()?;
        let key = (self.key)(first);
        let len = 1 + rest
            .iter()
            .position(|x| (self.key)(x) != key)
            .unwrap_or(rest.len());
        let (head, tail) = slice.split_at(len);
        self.slice = tail;
        Some((key, head))
    }
}

/// Turns a list of sizes into `sizes.len() + 1` offsets starting at zero.
pub fn exclusive_sum(sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    offsets.push(0);
    let mut acc = 0;
    for &size in sizes {
        acc += size;
        offsets.push(acc);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by() {
        let edges = [(1, 2), (1, 3), (2, 1), (4, 1), (4, 2)];
        let groups: Vec<_> = GroupBy::new(&edges, |e| e.0)
            .map(|(k, g)| (k, g.len()))
            .collect();
        assert_eq!(groups, vec![(1, 2), (2, 1), (4, 2)]);
        assert_eq!(GroupBy::new(&[] as &[(i32, i32)], |e| e.0).count(), 0);
    }

    #[test]
    fn test_exclusive_sum() {
        assert_eq!(exclusive_sum(&[]), vec![0]);
        assert_eq!(exclusive_sum(&[2, 0, 3]), vec![0, 2, 2, 5]);
    }
}
