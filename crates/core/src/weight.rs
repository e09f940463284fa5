/// Weight of a rank position. A pivot of 0 gives the unweighted test; otherwise
/// ranks at or before the pivot get the triangular weight `h (h + 1) / 2` with
/// `h = pivot - rank`, and ranks past it get 1.
pub fn weight(rank: usize, pivot: u32) -> f64 {
    if pivot == 0 {
        return 1.0;
    }
    let h = f64::from(pivot) - rank as f64;
    if h < 0.0 {
        1.0
    } else {
        h * (h + 1.0) / 2.0
    }
}

/// Per-rank weights for one universe size, plus their sum.
#[derive(Debug, Clone)]
pub struct WeightTable {
    pivot: u32,
    weights: Vec<f64>,
    total: f64,
}

impl WeightTable {
    pub fn new(num_genes: usize, pivot: u32) -> Self {
        let weights: Vec<f64> = (0..num_genes).map(|r| weight(r, pivot)).collect();
        let total = weights.iter().sum();
        Self {
            pivot,
            weights,
            total,
        }
    }

    #[inline]
    pub fn at(&self, rank: usize) -> f64 {
        self.weights[rank]
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn pivot(&self) -> u32 {
        self.pivot
    }

    pub fn num_genes(&self) -> usize {
        self.weights.len()
    }
}
