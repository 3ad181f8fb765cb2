//! Runtime world data model - the static side of a loaded map.
//!
//! Everything here is immutable after [`setup::load_level`] returns; the
//! simulation and renderer reference entries through plain indices.

pub mod blockmap;
pub mod bsp;
pub mod setup;

pub use blockmap::{Blockmap, MAPBLOCKSHIFT, MAPBLOCKSIZE, MAPBLOCKUNITS};
pub use bsp::NF_SUBSECTOR;
pub use setup::{LevelError, LoadOptions, load_level};

use crate::fixed::Fixed;
use crate::render::textures::TextureId;
use crate::tables::Angle;
use crate::wad::MapThing;
use bitflags::bitflags;

pub type VertexId = u16;
pub type LinedefId = u16;
pub type SidedefId = u16;
pub type SectorId = u16;
pub type SubsectorId = u16;
pub type SegId = u16;

/// Box component order shared by every bounding box in the engine.
pub const BOXTOP: usize = 0;
pub const BOXBOTTOM: usize = 1;
pub const BOXLEFT: usize = 2;
pub const BOXRIGHT: usize = 3;

/// A map vertex.  `(rx, ry)` are the render-only coordinates produced by
/// slime-trail correction; physics always reads `(x, y)`.
#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub x: Fixed,
    pub y: Fixed,
    pub rx: Fixed,
    pub ry: Fixed,
    pub moved: bool,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinedefFlags: u16 {
        const BLOCKING        = 0x0001;
        const BLOCK_MONSTERS  = 0x0002;
        const TWO_SIDED       = 0x0004;
        const UPPER_UNPEGGED  = 0x0008;
        const LOWER_UNPEGGED  = 0x0010;
        const SECRET          = 0x0020;
        const BLOCK_SOUND     = 0x0040;
        const NOT_ON_MAP      = 0x0080;
        const ALREADY_ON_MAP  = 0x0100;
    }
}

/// Orientation class used by the slide/step logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlopeType {
    Horizontal,
    Vertical,
    Positive,
    Negative,
}

#[derive(Clone, Debug)]
pub struct Linedef {
    pub v1: VertexId,
    pub v2: VertexId,
    pub dx: Fixed,
    pub dy: Fixed,
    pub flags: LinedefFlags,
    pub special: i16,
    pub tag: i16,
    pub right_sidedef: Option<SidedefId>,
    pub left_sidedef: Option<SidedefId>,
    pub front_sector: SectorId,
    pub back_sector: Option<SectorId>,
    /// [top, bottom, left, right] in fixed units.
    pub bbox: [Fixed; 4],
    pub slope: SlopeType,
}

#[derive(Clone, Debug)]
pub struct Sidedef {
    pub texoffset: Fixed,
    pub rowoffset: Fixed,
    pub top: TextureId,
    pub bottom: TextureId,
    pub mid: TextureId,
    pub sector: SectorId,
}

#[derive(Clone, Debug)]
pub struct Sector {
    pub floorh: Fixed,
    pub ceilh: Fixed,
    /// Pre-move heights kept for render interpolation.
    pub old_floorh: Fixed,
    pub old_ceilh: Fixed,
    pub floorpic: TextureId,
    pub ceilpic: TextureId,
    pub light: i16,
    pub special: i16,
    pub tag: i16,
    /// Centre of the world bbox; positional sector sounds come from here.
    pub sound_org: (Fixed, Fixed),
    /// Block-unit bbox clamped to the blockmap, [top, bottom, left, right].
    pub blockbox: [i32; 4],
    /// Ids of every linedef touching this sector.
    pub lines: Vec<LinedefId>,
}

#[derive(Clone, Copy, Debug)]
pub struct Subsector {
    pub sector: SectorId,
    pub first_seg: u16,
    pub num_segs: u16,
}

#[derive(Clone, Copy, Debug)]
pub struct Seg {
    pub v1: VertexId,
    pub v2: VertexId,
    pub offset: Fixed,
    pub angle: Angle,
    pub linedef: LinedefId,
    /// 0 = runs along the right side of its linedef.
    pub side: u8,
    pub front_sector: SectorId,
    pub back_sector: Option<SectorId>,
    /// Half the seg length, in whole fixed units.
    pub length: u32,
    /// Recomputed angle used for rendering long walls stably.
    pub r_angle: Angle,
    /// Light-index delta from wall orientation.
    pub fakecontrast: i16,
}

#[derive(Clone, Copy, Debug)]
pub struct Node {
    pub x: Fixed,
    pub y: Fixed,
    pub dx: Fixed,
    pub dy: Fixed,
    /// front/back child boxes, [top, bottom, left, right].
    pub bbox: [[Fixed; 4]; 2],
    /// Children with [`NF_SUBSECTOR`] marking leaves; -1 = degenerate leaf 0.
    pub children: [i32; 2],
}

/// Packed sector-to-sector visibility denial matrix.
#[derive(Clone, Debug, Default)]
pub struct Reject {
    bytes: Vec<u8>,
    sectors: usize,
}

impl Reject {
    pub fn new(bytes: Vec<u8>, sectors: usize) -> Self {
        Self { bytes, sectors }
    }

    /// True when `s2` is marked invisible from `s1`.
    #[inline]
    pub fn is_hidden(&self, s1: SectorId, s2: SectorId) -> bool {
        let bit = s1 as usize * self.sectors + s2 as usize;
        match self.bytes.get(bit >> 3) {
            Some(b) => b & (1 << (bit & 7)) != 0,
            None => false,
        }
    }
}

/// Runtime snapshot of one map (immutable after load).
#[derive(Debug)]
pub struct Level {
    pub name: String,
    pub things: Vec<MapThing>,
    pub vertices: Vec<Vertex>,
    pub linedefs: Vec<Linedef>,
    pub sidedefs: Vec<Sidedef>,
    pub sectors: Vec<Sector>,
    pub subsectors: Vec<Subsector>,
    pub segs: Vec<Seg>,
    pub nodes: Vec<Node>,
    pub blockmap: Blockmap,
    pub reject: Reject,
    /// Flat id that triggers column-wise sky drawing.
    pub sky_flat: TextureId,
}

impl Level {
    /// Sector owning the subsector that contains `(x, y)`.
    #[inline]
    pub fn sector_at(&self, x: Fixed, y: Fixed) -> SectorId {
        self.subsectors[self.locate_subsector(x, y) as usize].sector
    }
}
