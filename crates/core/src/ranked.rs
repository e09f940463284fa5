use crate::error::{R2ksError, Result};

/// A permutation of the gene universe `[0, n)`.
///
/// The scorer walks it front to back; entry `k` is the gene visited at step `k`.
/// Construction rejects anything that is not a permutation, so every lookup
/// derived from a `RankedList` is a bijection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedList {
    order: Vec<u32>,
}

impl RankedList {
    pub fn new(order: Vec<u32>) -> Result<Self> {
        Self::for_list(0, order)
    }

    pub(crate) fn for_list(list: usize, order: Vec<u32>) -> Result<Self> {
        let num_genes = order.len();
        let mut seen = vec![false; num_genes];
        for &gene in &order {
            let slot = seen
                .get_mut(gene as usize)
                .ok_or(R2ksError::GeneOutOfRange {
                    list,
                    gene: u64::from(gene),
                    num_genes,
                })?;
            if *slot {
                return Err(R2ksError::DuplicateGene { list, gene });
            }
            *slot = true;
        }
        Ok(Self { order })
    }

    /// Builds the gene -> rank-position vector from genes listed in rank order,
    /// which is how a line of the rank file is laid out.
    pub fn from_rank_order(list: usize, genes: &[u64]) -> Result<Self> {
        let num_genes = genes.len();
        let mut ranks = vec![u32::MAX; num_genes];
        for (position, &gene) in genes.iter().enumerate() {
            if gene >= num_genes as u64 {
                return Err(R2ksError::GeneOutOfRange {
                    list,
                    gene,
                    num_genes,
                });
            }
            let slot = &mut ranks[gene as usize];
            if *slot != u32::MAX {
                return Err(R2ksError::DuplicateGene {
                    list,
                    gene: gene as u32,
                });
            }
            *slot = position as u32;
        }
        Ok(Self { order: ranks })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.order
    }

    pub fn reversed(&self) -> Self {
        let mut order = self.order.clone();
        order.reverse();
        Self { order }
    }

    /// The inverse permutation: `inverse()[order[k]] == k`.
    pub fn inverse(&self) -> Self {
        Self {
            order: RankLookup::new(self).positions,
        }
    }
}

/// Maps a gene to its position in a reference list.
pub struct RankLookup {
    positions: Vec<u32>,
}

impl RankLookup {
    pub fn new(list: &RankedList) -> Self {
        let mut positions = vec![0u32; list.len()];
        for (position, &gene) in list.order.iter().enumerate() {
            positions[gene as usize] = position as u32;
        }
        Self { positions }
    }

    #[inline]
    pub fn position(&self, gene: u32) -> u32 {
        self.positions[gene as usize]
    }
}
