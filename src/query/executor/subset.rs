// Lazy k-subset enumeration.

/// Yields every `size`-element subset of a sequence.
///
/// The recursion follows Pascal's rule: the subsets of size k either skip
/// the head element (C(n-1, k) of them) or contain it (C(n-1, k-1)).
pub struct SubsetIterator<T: Clone> {
    vals: Vec<T>,
    size: usize,
    done: bool,
    pos: usize,
    without_head: Option<Box<SubsetIterator<T>>>,
    with_head: Option<Box<SubsetIterator<T>>>,
}

impl<T: Clone> SubsetIterator<T> {
    /// Panics if `size` exceeds the number of elements.
    pub fn new(vals: Vec<T>, size: usize) -> Self {
        assert!(size <= vals.len(), "illegal subset size");
        let (mut without_head, mut with_head) = (None, None);
        if size > 1 && size < vals.len() {
            let tail: Vec<T> = vals[1..].to_vec();
            without_head = Some(Box::new(SubsetIterator::new(tail.clone(), size)));
            with_head = Some(Box::new(SubsetIterator::new(tail, size - 1)));
        }
        Self {
            vals,
            size,
            done: false,
            pos: 0,
            without_head,
            with_head,
        }
    }
}

impl<T: Clone> Iterator for SubsetIterator<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        // The empty and the full subset are single-shot.
        if self.size == 0 || self.size == self.vals.len() {
            if self.done {
                return None;
            }
            self.done = true;
            return Some(if self.size == 0 {
                Vec::new()
            } else {
                self.vals.clone()
            });
        }
        if self.size == 1 {
            let item = self.vals.get(self.pos)?;
            self.pos += 1;
            return Some(vec![item.clone()]);
        }
        if let Some(sub) = self.without_head.as_mut() {
            if let Some(subset) = sub.next() {
                return Some(subset);
            }
        }
        if let Some(sub) = self.with_head.as_mut() {
            if let Some(mut subset) = sub.next() {
                subset.push(self.vals[0].clone());
                return Some(subset);
            }
        }
        None
    }
}
