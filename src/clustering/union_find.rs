// src/clustering/union_find.rs

/// Disjoint-set forest over dense indices `0..n`, sign-encoded.
///
/// `ptr[x] < 0` marks a root and `-ptr[x]` is the size of its tree. Any other
/// value is the index of the parent. Union is by size; on equal sizes the
/// root of the first argument absorbs the second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisjointForest {
    ptr: Vec<isize>,
}

impl DisjointForest {
    /// `n` singleton trees.
    pub fn new(n: usize) -> Self {
        Self { ptr: vec![-1; n] }
    }

    pub fn len(&self) -> usize {
        self.ptr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_empty()
    }

    pub fn is_root(&self, x: usize) -> bool {
        self.ptr[x] < 0
    }

    /// Root of `x` without modifying the forest.
    pub fn root_of(&self, x: usize) -> usize {
        let mut root = x;
        while self.ptr[root] >= 0 {
            root = self.ptr[root] as usize;
        }
        root
    }

    /// Root of `x`, pointing every node on the path straight at it.
    pub fn find(&mut self, x: usize) -> usize {
        let root = self.root_of(x);
        let mut cur = x;
        while self.ptr[cur] >= 0 {
            let next = self.ptr[cur] as usize;
            self.ptr[cur] = root as isize;
            cur = next;
        }
        root
    }

    /// Merges the trees of `a` and `b`. Returns false when they were already
    /// one tree.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        // more negative means larger
        let (keep, absorbed) = if self.ptr[rb] < self.ptr[ra] {
            (rb, ra)
        } else {
            (ra, rb)
        };
        self.ptr[keep] += self.ptr[absorbed];
        self.ptr[absorbed] = keep as isize;
        true
    }

    /// Number of elements in the tree containing `x`.
    pub fn size(&self, x: usize) -> usize {
        (-self.ptr[self.root_of(x)]) as usize
    }

    /// Root of every element, compressing paths on the way.
    pub fn roots(&mut self) -> Vec<usize> {
        (0..self.len()).map(|x| self.find(x)).collect()
    }
}
