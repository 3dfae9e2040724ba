//! Connected components over the thresholded similarity graph.

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let (px, py) = (self.find(x), self.find(y));
        if px != py {
            self.parent[px] = py;
        }
    }
}

/// Components with two or more members, ordered by their lowest member index.
/// Members are listed in ascending index order.
pub(crate) fn components(matrix: &[Vec<f64>], threshold: f64) -> Vec<Vec<usize>> {
    let n = matrix.len();
    let mut uf = UnionFind::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if matrix[i][j] >= threshold {
                uf.union(i, j);
            }
        }
    }

    let mut order: Vec<usize> = Vec::new();
    let mut members: std::collections::HashMap<usize, Vec<usize>> = std::collections::HashMap::new();
    for i in 0..n {
        let root = uf.find(i);
        members
            .entry(root)
            .or_insert_with(|| {
                order.push(root);
                Vec::new()
            })
            .push(i);
    }

    order.into_iter().filter_map(|root| members.remove(&root)).filter(|c| c.len() >= 2).collect()
}

/// Highest similarity between any two members.
pub(crate) fn max_pairwise(matrix: &[Vec<f64>], members: &[usize]) -> f64 {
    let mut max = 0.0_f64;
    for (k, &a) in members.iter().enumerate() {
        for &b in &members[k + 1..] {
            max = max.max(matrix[a][b]);
        }
    }
    max
}

/// Mean similarity of `member` to the other members.
pub(crate) fn mean_to_others(matrix: &[Vec<f64>], members: &[usize], member: usize) -> f64 {
    let others: Vec<f64> = members.iter().filter(|&&o| o != member).map(|&o| matrix[member][o]).collect();
    if others.is_empty() { 1.0 } else { others.iter().sum::<f64>() / others.len() as f64 }
}
