mod raw;
mod wad;

pub use raw::{
    MapLinedef, MapNode, MapSector, MapSeg, MapSidedef, MapSubsector, MapThing, MapVertex,
    ML_BLOCKMAP, ML_LINEDEFS, ML_NODES, ML_REJECT, ML_SECTORS, ML_SEGS, ML_SIDEDEFS, ML_SSECTORS,
    ML_THINGS, ML_VERTEXES, NO_INDEX,
};
pub use wad::{LumpInfo, Wad, WadError};

#[cfg(test)]
pub use wad::fixture;
