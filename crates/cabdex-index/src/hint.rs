//! External ordering of container files.
//!
//! Container files are named by a numeric id (`31.blk`). A sort hint ranks
//! those ids; it is used to pick between duplicate locations and to order
//! the final read list.

use std::fs;
use std::num::ParseIntError;
use std::path::Path;
use std::str::FromStr;

use rustc_hash::FxHashMap;

/// Ranks numeric container ids. Lower ranks come first.
pub trait SortHint: Send + Sync {
    fn rank(&self, id: u32) -> Option<usize>;
}

/// Numeric id of a container path: its base name without extension.
pub fn file_id(path: &str) -> Option<u32> {
    let name = cabdex_common::file_name(path);
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    };
    stem.parse().ok()
}

/// Rank of a container path under `hint`, if its id is ranked.
pub fn rank_path(hint: &dyn SortHint, path: &str) -> Option<usize> {
    file_id(path).and_then(|id| hint.rank(id))
}

/// Stable sort of paths by hint rank; unranked paths go last in their
/// original relative order.
pub fn sort_paths(hint: &dyn SortHint, paths: &mut [String]) {
    paths.sort_by_cached_key(|path| rank_path(hint, path).unwrap_or(usize::MAX));
}

/// An explicit list of container ids in preferred order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSortList {
    order: Vec<u32>,
    ranks: FxHashMap<u32, usize>,
}

impl BlockSortList {
    pub fn new(order: Vec<u32>) -> Self {
        let mut ranks = FxHashMap::default();
        for (rank, &id) in order.iter().enumerate() {
            ranks.entry(id).or_insert(rank);
        }
        Self { order, ranks }
    }

    /// Read a whitespace-separated id list from a file.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        text.parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Ids in preferred order.
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromStr for BlockSortList {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let order = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<u32>, _>>()?;
        Ok(Self::new(order))
    }
}

impl SortHint for BlockSortList {
    fn rank(&self, id: u32) -> Option<usize> {
        self.ranks.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id() {
        assert_eq!(file_id("blocks/00/31.blk"), Some(31));
        assert_eq!(file_id("C:\\game\\0007.blk"), Some(7));
        assert_eq!(file_id("12"), Some(12));
        assert_eq!(file_id("data.unity3d"), None);
        assert_eq!(file_id("blocks/.blk"), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let hint = BlockSortList::new(vec![5, 3, 5]);
        assert_eq!(hint.rank(5), Some(0));
        assert_eq!(hint.rank(3), Some(1));
        assert_eq!(hint.rank(4), None);
    }

    #[test]
    fn test_sort_paths_keeps_unranked_order() {
        let hint = BlockSortList::new(vec![30, 10]);
        let mut paths = vec![
            "x.blk".to_string(),
            "10.blk".to_string(),
            "99.blk".to_string(),
            "30.blk".to_string(),
        ];

        sort_paths(&hint, &mut paths);
        assert_eq!(paths, ["30.blk", "10.blk", "x.blk", "99.blk"]);
    }

    #[test]
    fn test_parse_list() {
        let hint: BlockSortList = "3 1\n2, 7".parse().unwrap();
        assert_eq!(hint.order(), [3, 1, 2, 7]);
        assert!("3 x".parse::<BlockSortList>().is_err());
        assert!("".parse::<BlockSortList>().unwrap().is_empty());
    }
}
