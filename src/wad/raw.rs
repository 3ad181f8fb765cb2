//! On-disk map records and the typed lump decoder.
//!
//! The record layouts are frozen little-endian packed structs; they decode
//! with **bincode 2** in fixed-int little-endian mode, one record at a time.
//! Map markers (`E#M#`, `MAP##`) are zero-length lumps followed by the data
//! lumps in a fixed order.

use crate::wad::wad::{Wad, WadError};
use bincode::{Decode, config, decode_from_slice};
use once_cell::sync::Lazy;
use regex::Regex;
use std::mem;

/* ─────────────────── lump order behind a map marker ─────────────────── */

pub const ML_THINGS: usize = 1;
pub const ML_LINEDEFS: usize = 2;
pub const ML_SIDEDEFS: usize = 3;
pub const ML_VERTEXES: usize = 4;
pub const ML_SEGS: usize = 5;
pub const ML_SSECTORS: usize = 6;
pub const ML_NODES: usize = 7;
pub const ML_SECTORS: usize = 8;
pub const ML_REJECT: usize = 9;
pub const ML_BLOCKMAP: usize = 10;

/// Sentinel for "no sidedef" in a linedef record.
pub const NO_INDEX: u16 = 0xFFFF;

/* ───────────────────────── packed map records ────────────────────────── */

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Decode)]
pub struct MapVertex {
    pub x: i16,
    pub y: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Decode)]
pub struct MapLinedef {
    pub v1: u16,
    pub v2: u16,
    pub flags: u16,
    pub special: u16,
    pub tag: u16,
    /// right then left; `NO_INDEX` = absent
    pub side: [u16; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Decode)]
pub struct MapSidedef {
    pub texoffset: i16,
    pub rowoffset: i16,
    pub top: [u8; 8],
    pub bottom: [u8; 8],
    pub mid: [u8; 8],
    pub sector: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Decode)]
pub struct MapSector {
    pub floorh: i16,
    pub ceilh: i16,
    pub floorpic: [u8; 8],
    pub ceilpic: [u8; 8],
    pub light: i16,
    pub special: i16,
    pub tag: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Decode)]
pub struct MapSubsector {
    pub numsegs: u16,
    pub firstseg: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Decode)]
pub struct MapSeg {
    pub v1: u16,
    pub v2: u16,
    pub angle: i16,
    pub linedef: u16,
    pub side: i16,
    pub offset: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Decode)]
pub struct MapNode {
    pub x: i16,
    pub y: i16,
    pub dx: i16,
    pub dy: i16,
    /// front/back child boxes as [top, bottom, left, right]
    pub bbox: [[i16; 4]; 2],
    /// bit 15 set = child is a subsector
    pub children: [u16; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Decode)]
pub struct MapThing {
    pub x: i16,
    pub y: i16,
    pub angle: i16,
    pub kind: i16,
    pub options: i16,
}

impl Default for MapThing {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            angle: 0,
            kind: 0,
            options: 0,
        }
    }
}

/* ─────────────────────────── decode helpers ──────────────────────────── */

impl Wad {
    /// Decode lump `idx` as a tightly packed array of `T`.
    pub fn lump_to_vec<T>(&self, idx: usize) -> Result<Vec<T>, WadError>
    where
        T: Decode<()>,
    {
        let bytes = self.lump_bytes(idx)?;
        let elem = mem::size_of::<T>();

        if bytes.len() % elem != 0 {
            return Err(WadError::BadLumpSize {
                index: idx,
                name: Self::lump_name(&self.lumps[idx].name).into(),
                size: bytes.len(),
                elem_size: elem,
            });
        }

        let cfg = config::standard()
            .with_fixed_int_encoding()
            .with_little_endian();
        let mut out = Vec::with_capacity(bytes.len() / elem);
        let mut slice = bytes;

        while !slice.is_empty() {
            let (val, read) =
                decode_from_slice::<T, _>(slice, cfg).map_err(|e| WadError::BadElement {
                    index: idx,
                    name: Self::lump_name(&self.lumps[idx].name).into(),
                    elem: out.len(),
                    source: e,
                })?;
            out.push(val);
            slice = &slice[read..];
        }
        Ok(out)
    }

    /// Directory indices of every map marker (`E#M#`, `MAP##`).
    pub fn level_indices(&self) -> Vec<usize> {
        static RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^(E[1-9]M[1-9]|MAP[0-9][0-9])$").unwrap());

        self.lumps
            .iter()
            .enumerate()
            .filter(|(_, l)| l.size == 0 && RE.is_match(Wad::lump_name(&l.name)))
            .map(|(i, _)| i)
            .collect()
    }
}

/* ────────────────────────────── tests ────────────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wad::wad::fixture::build_wad;

    #[test]
    fn record_sizes_match_disk_layout() {
        assert_eq!(mem::size_of::<MapVertex>(), 4);
        assert_eq!(mem::size_of::<MapLinedef>(), 14);
        assert_eq!(mem::size_of::<MapSidedef>(), 30);
        assert_eq!(mem::size_of::<MapSector>(), 26);
        assert_eq!(mem::size_of::<MapSubsector>(), 4);
        assert_eq!(mem::size_of::<MapSeg>(), 12);
        assert_eq!(mem::size_of::<MapNode>(), 28);
        assert_eq!(mem::size_of::<MapThing>(), 10);
    }

    #[test]
    fn vertex_lump_round_trip() {
        let bytes: Vec<u8> = [1i16, 2, -3, 4]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let wad = Wad::from_bytes(build_wad(&[("VERTEXES", bytes)])).unwrap();
        let v: Vec<MapVertex> = wad.lump_to_vec(0).unwrap();
        assert_eq!(
            v,
            vec![MapVertex { x: 1, y: 2 }, MapVertex { x: -3, y: 4 }]
        );
    }

    #[test]
    fn ragged_lump_is_rejected() {
        let wad = Wad::from_bytes(build_wad(&[("VERTEXES", vec![0u8; 5])])).unwrap();
        let err = wad.lump_to_vec::<MapVertex>(0).unwrap_err();
        assert!(matches!(err, WadError::BadLumpSize { .. }));
    }

    #[test]
    fn marker_discovery() {
        let wad = Wad::from_bytes(build_wad(&[
            ("E1M1", vec![]),
            ("THINGS", vec![]),
            ("MAP01", vec![]),
            ("MAP1X", vec![]),
            ("E1M1X", vec![]),
        ]))
        .unwrap();
        assert_eq!(wad.level_indices(), vec![0, 2]);
    }
}
