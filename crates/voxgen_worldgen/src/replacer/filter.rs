use crate::block::BlockId;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Whitelist,
    #[default]
    Blacklist,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Blocks {
    Single(BlockId),
    Set(FxHashSet<BlockId>),
}

/// Decides whether a replacer may act on the previous block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockFilter {
    blocks: Blocks,
    filter_type: FilterType,
}

impl BlockFilter {
    /// `None` when the filter lets every block through.
    ///
    /// An empty whitelist is kept; it rejects everything.
    pub fn new(blocks: &[BlockId], filter_type: FilterType) -> Option<BlockFilter> {
        let blocks = match blocks {
            [] if filter_type == FilterType::Blacklist => return None,
            [single] => Blocks::Single(*single),
            many => Blocks::Set(many.iter().copied().collect()),
        };
        Some(BlockFilter {
            blocks,
            filter_type,
        })
    }

    /// True when no block can pass.
    pub fn rejects_all(&self) -> bool {
        matches!(&self.blocks, Blocks::Set(set) if set.is_empty())
            && self.filter_type == FilterType::Whitelist
    }

    #[inline]
    pub fn test(&self, block: BlockId) -> bool {
        let listed = match &self.blocks {
            Blocks::Single(single) => *single == block,
            Blocks::Set(set) => set.contains(&block),
        };
        listed == (self.filter_type == FilterType::Whitelist)
    }
}
