use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identity of a voxel's content.
///
/// Ids below [`BlockId::NAMED`] have a canonical name; any other id is
/// accepted as an opaque value owned by the chunk layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u16);

const NAMES: &[&str] = &[
    "air",
    "stone",
    "grass",
    "dirt",
    "bedrock",
    "water",
    "lava",
    "sand",
    "gravel",
    "sandstone",
    "clay",
    "snow",
    "ice",
    "red_sand",
    "red_sandstone",
    "obsidian",
    "hardened_clay",
    "mycelium",
    "podzol",
    "coarse_dirt",
    "white_stained_hardened_clay",
    "orange_stained_hardened_clay",
    "yellow_stained_hardened_clay",
    "brown_stained_hardened_clay",
    "red_stained_hardened_clay",
    "light_gray_stained_hardened_clay",
];

impl BlockId {
    pub const AIR: BlockId = BlockId(0);
    pub const STONE: BlockId = BlockId(1);
    pub const GRASS: BlockId = BlockId(2);
    pub const DIRT: BlockId = BlockId(3);
    pub const BEDROCK: BlockId = BlockId(4);
    pub const WATER: BlockId = BlockId(5);
    pub const LAVA: BlockId = BlockId(6);
    pub const SAND: BlockId = BlockId(7);
    pub const GRAVEL: BlockId = BlockId(8);
    pub const SANDSTONE: BlockId = BlockId(9);
    pub const CLAY: BlockId = BlockId(10);
    pub const SNOW: BlockId = BlockId(11);
    pub const ICE: BlockId = BlockId(12);
    pub const RED_SAND: BlockId = BlockId(13);
    pub const RED_SANDSTONE: BlockId = BlockId(14);
    pub const OBSIDIAN: BlockId = BlockId(15);
    pub const HARDENED_CLAY: BlockId = BlockId(16);
    pub const MYCELIUM: BlockId = BlockId(17);
    pub const PODZOL: BlockId = BlockId(18);
    pub const COARSE_DIRT: BlockId = BlockId(19);
    pub const WHITE_CLAY: BlockId = BlockId(20);
    pub const ORANGE_CLAY: BlockId = BlockId(21);
    pub const YELLOW_CLAY: BlockId = BlockId(22);
    pub const BROWN_CLAY: BlockId = BlockId(23);
    pub const RED_CLAY: BlockId = BlockId(24);
    pub const LIGHT_GRAY_CLAY: BlockId = BlockId(25);

    pub const NAMED: u16 = NAMES.len() as u16;

    pub fn from_name(name: &str) -> Option<BlockId> {
        let name = name.strip_prefix("minecraft:").unwrap_or(name);
        NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| BlockId(i as u16))
    }

    pub fn name(self) -> Option<&'static str> {
        NAMES.get(self.0 as usize).copied()
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self == BlockId::AIR
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "#{}", self.0),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BlockRef {
    Id(u16),
    Name(String),
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match BlockRef::deserialize(deserializer)? {
            BlockRef::Id(id) => Ok(BlockId(id)),
            BlockRef::Name(name) => BlockId::from_name(&name)
                .ok_or_else(|| D::Error::custom(format!("unknown block `{name}`"))),
        }
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.name() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_u16(self.0),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::block::BlockId;

    #[test]
    fn names_resolve_both_ways() {
        assert_eq!(BlockId::from_name("sandstone"), Some(BlockId::SANDSTONE));
        assert_eq!(BlockId::from_name("minecraft:gravel"), Some(BlockId::GRAVEL));
        assert_eq!(BlockId::from_name("nope"), None);
        assert_eq!(BlockId::RED_SAND.name(), Some("red_sand"));
        assert_eq!(BlockId(900).to_string(), "#900");
    }

    #[test]
    fn json_accepts_names_and_ids() {
        let blocks: Vec<BlockId> = serde_json::from_str(r#"["stone", 5, "minecraft:air", 700]"#).unwrap();
        assert_eq!(
            blocks,
            [BlockId::STONE, BlockId::WATER, BlockId::AIR, BlockId(700)]
        );
        assert!(serde_json::from_str::<BlockId>(r#""cheese""#).is_err());
        assert_eq!(serde_json::to_string(&BlockId::DIRT).unwrap(), r#""dirt""#);
        assert_eq!(serde_json::to_string(&BlockId(700)).unwrap(), "700");
    }
}
