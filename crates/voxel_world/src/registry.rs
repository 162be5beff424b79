//! Voxel type registry: one-byte type ids mapped to material records
//!
//! The registry is populated once at startup with the baseline set and
//! then treated as an immutable snapshot; the manager and the mesher
//! share it through an `Arc`. Lookup never fails: unknown ids resolve
//! to a shared "unknown" record.

/// Voxel type identifier (8-bit, 0 reserved for AIR)
pub type VoxelId = u8;

pub const AIR: VoxelId = 0;
pub const STONE: VoxelId = 1;
pub const DIRT: VoxelId = 2;
pub const GRASS: VoxelId = 3;
pub const SAND: VoxelId = 4;
pub const WATER: VoxelId = 5;
pub const GRAVEL: VoxelId = 6;
pub const WOOD: VoxelId = 7;
pub const LEAVES: VoxelId = 8;
pub const COAL_ORE: VoxelId = 9;
pub const IRON_ORE: VoxelId = 10;
pub const GOLD_ORE: VoxelId = 11;
pub const DIAMOND_ORE: VoxelId = 12;
pub const BEDROCK: VoxelId = 13;
pub const TORCH: VoxelId = 14;
pub const GLASS: VoxelId = 15;

/// Material record for one voxel type
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelType {
    pub name: String,

    /// Linear RGBA; alpha below 1.0 implies the transparent flag
    pub color: [f32; 4],

    /// Relative break resistance (unbreakable types use `f32::INFINITY`)
    pub hardness: f32,

    pub transparent: bool,

    pub solid: bool,

    /// Emitted light level, 0..=15
    pub light_emission: u8,
}

impl VoxelType {
    /// Convenience constructor for an opaque solid block
    pub fn opaque(name: &str, color: [f32; 3], hardness: f32) -> Self {
        Self {
            name: name.to_string(),
            color: [color[0], color[1], color[2], 1.0],
            hardness,
            transparent: false,
            solid: true,
            light_emission: 0,
        }
    }
}

/// Immutable-after-init table of all 256 possible type ids
pub struct VoxelTypeRegistry {
    types: Vec<Option<VoxelType>>,
    unknown: VoxelType,
}

impl VoxelTypeRegistry {
    /// Empty registry; only the unknown fallback record exists
    pub fn new() -> Self {
        Self {
            types: vec![None; 256],
            unknown: VoxelType {
                name: "unknown".to_string(),
                color: [1.0, 0.0, 1.0, 1.0],
                hardness: 1.0,
                transparent: false,
                solid: true,
                light_emission: 0,
            },
        }
    }

    /// Registry pre-populated with the baseline block set
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(
            AIR,
            VoxelType {
                name: "air".to_string(),
                color: [0.0, 0.0, 0.0, 0.0],
                hardness: 0.0,
                transparent: true,
                solid: false,
                light_emission: 0,
            },
        );
        registry.register(STONE, VoxelType::opaque("stone", [0.5, 0.5, 0.5], 1.5));
        registry.register(DIRT, VoxelType::opaque("dirt", [0.45, 0.3, 0.15], 0.5));
        registry.register(GRASS, VoxelType::opaque("grass", [0.25, 0.6, 0.2], 0.6));
        registry.register(SAND, VoxelType::opaque("sand", [0.85, 0.8, 0.55], 0.5));
        registry.register(
            WATER,
            VoxelType {
                name: "water".to_string(),
                color: [0.2, 0.4, 0.8, 0.6],
                hardness: 0.0,
                transparent: true,
                solid: false,
                light_emission: 0,
            },
        );
        registry.register(GRAVEL, VoxelType::opaque("gravel", [0.55, 0.52, 0.5], 0.6));
        registry.register(WOOD, VoxelType::opaque("wood", [0.4, 0.28, 0.12], 2.0));
        registry.register(
            LEAVES,
            VoxelType {
                name: "leaves".to_string(),
                color: [0.2, 0.5, 0.15, 0.9],
                hardness: 0.2,
                transparent: true,
                solid: true,
                light_emission: 0,
            },
        );
        registry.register(COAL_ORE, VoxelType::opaque("coal_ore", [0.35, 0.35, 0.35], 3.0));
        registry.register(IRON_ORE, VoxelType::opaque("iron_ore", [0.6, 0.5, 0.42], 3.0));
        registry.register(GOLD_ORE, VoxelType::opaque("gold_ore", [0.7, 0.6, 0.25], 3.0));
        registry.register(
            DIAMOND_ORE,
            VoxelType::opaque("diamond_ore", [0.45, 0.75, 0.75], 3.0),
        );
        registry.register(
            BEDROCK,
            VoxelType {
                name: "bedrock".to_string(),
                color: [0.2, 0.2, 0.2, 1.0],
                hardness: f32::INFINITY,
                transparent: false,
                solid: true,
                light_emission: 0,
            },
        );
        registry.register(
            TORCH,
            VoxelType {
                name: "torch".to_string(),
                color: [0.9, 0.7, 0.3, 1.0],
                hardness: 0.1,
                transparent: true,
                solid: false,
                light_emission: 14,
            },
        );
        registry.register(
            GLASS,
            VoxelType {
                name: "glass".to_string(),
                color: [0.85, 0.9, 0.95, 0.3],
                hardness: 0.3,
                transparent: true,
                solid: true,
                light_emission: 0,
            },
        );

        registry
    }

    /// Register (or overwrite) the record for an id
    pub fn register(&mut self, id: VoxelId, voxel_type: VoxelType) {
        self.types[id as usize] = Some(voxel_type);
    }

    /// Record for an id; unknown ids yield the shared fallback record
    pub fn get(&self, id: VoxelId) -> &VoxelType {
        self.types[id as usize].as_ref().unwrap_or(&self.unknown)
    }

    pub fn is_transparent(&self, id: VoxelId) -> bool {
        self.get(id).transparent
    }

    pub fn is_solid(&self, id: VoxelId) -> bool {
        self.get(id).solid
    }

    pub fn light_emission(&self, id: VoxelId) -> u8 {
        self.get(id).light_emission
    }

    pub fn color(&self, id: VoxelId) -> [f32; 4] {
        self.get(id).color
    }

    pub fn hardness(&self, id: VoxelId) -> f32 {
        self.get(id).hardness
    }

    pub fn name(&self, id: VoxelId) -> &str {
        &self.get(id).name
    }
}

impl Default for VoxelTypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
