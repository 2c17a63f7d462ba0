//! Object class identifiers.

/// Object classes the probe cares about.
///
/// Only a handful of engine classes matter for dependency indexing; every
/// other id is carried through as [`ClassId::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassId {
    GameObject,
    Material,
    Texture2D,
    Mesh,
    Shader,
    TextAsset,
    AudioClip,
    MonoBehaviour,
    AssetBundle,
    ResourceManager,
    Sprite,
    Other(i32),
}

impl ClassId {
    /// Raw numeric id as stored in the object table.
    pub const fn raw(self) -> i32 {
        match self {
            Self::GameObject => 1,
            Self::Material => 21,
            Self::Texture2D => 28,
            Self::Mesh => 43,
            Self::Shader => 48,
            Self::TextAsset => 49,
            Self::AudioClip => 83,
            Self::MonoBehaviour => 114,
            Self::AssetBundle => 142,
            Self::ResourceManager => 147,
            Self::Sprite => 213,
            Self::Other(id) => id,
        }
    }

    /// Whether objects of this class carry the bundle manifest.
    pub const fn is_manifest(self) -> bool {
        matches!(self, Self::AssetBundle)
    }
}

impl From<i32> for ClassId {
    fn from(id: i32) -> Self {
        match id {
            1 => Self::GameObject,
            21 => Self::Material,
            28 => Self::Texture2D,
            43 => Self::Mesh,
            48 => Self::Shader,
            49 => Self::TextAsset,
            83 => Self::AudioClip,
            114 => Self::MonoBehaviour,
            142 => Self::AssetBundle,
            147 => Self::ResourceManager,
            213 => Self::Sprite,
            other => Self::Other(other),
        }
    }
}

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other(id) => write!(f, "Class{id}"),
            known => write!(f, "{known:?}"),
        }
    }
}
