//! Runtime "thing" index - blockmap cells plus per-sector lists.
//!
//! * One cell covers 128x128 map units, matching the static blockmap.
//! * Each cell keeps a `SmallVec`; live mobjs per block stay in the single
//!   digits on real maps, so lookups are allocation-free in the common case.
//!
//! The index is **write-through** from the movement code:
//! [`unset_position`] removes the stub from its old cell and sector list,
//! [`set_position`] reinserts it at the new coordinates.  Iteration order is
//! insertion order, which keeps collision resolution deterministic.

use crate::defs::flags::MobjFlags;
use crate::defs::mobjinfo::MobjType;
use crate::fixed::Fixed;
use crate::level::{Level, MAPBLOCKSHIFT, SectorId};
use hecs::Entity;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Pre-baked data collision and rendering need without touching the world.
#[derive(Clone, Copy, Debug)]
pub struct ThingStub {
    pub ent: Entity,
    pub kind: MobjType,
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub radius: Fixed,
    pub height: Fixed,
    pub flags: MobjFlags,
}

type Cell = SmallVec<[ThingStub; 8]>;

/// Sparse block grid plus dense per-sector membership lists.
pub struct ThingGrid {
    origin_x: Fixed,
    origin_y: Fixed,
    cells: HashMap<(i32, i32), Cell>,
    sector_things: Vec<SmallVec<[Entity; 8]>>,
}

impl ThingGrid {
    pub fn new(level: &Level) -> ThingGrid {
        ThingGrid {
            origin_x: level.blockmap.origin_x,
            origin_y: level.blockmap.origin_y,
            cells: HashMap::new(),
            sector_things: vec![SmallVec::new(); level.sectors.len()],
        }
    }

    #[inline]
    fn block(&self, x: Fixed, y: Fixed) -> (i32, i32) {
        (
            ((x as i64 - self.origin_x as i64) >> MAPBLOCKSHIFT) as i32,
            ((y as i64 - self.origin_y as i64) >> MAPBLOCKSHIFT) as i32,
        )
    }

    /// Link a stub into its block cell (unless NOBLOCKMAP) and sector list
    /// (unless NOSECTOR).
    pub fn set_position(&mut self, stub: ThingStub, sector: SectorId) {
        if !stub.flags.contains(MobjFlags::NOBLOCKMAP) {
            let key = self.block(stub.x, stub.y);
            self.cells.entry(key).or_default().push(stub);
        }
        if !stub.flags.contains(MobjFlags::NOSECTOR) {
            self.sector_things[sector as usize].push(stub.ent);
        }
    }

    /// Remove the stub from the cell and sector list it occupied.
    /// Call **before** moving the actor, with its old coordinates.
    pub fn unset_position(&mut self, stub: &ThingStub, sector: SectorId) {
        if !stub.flags.contains(MobjFlags::NOBLOCKMAP) {
            let key = self.block(stub.x, stub.y);
            if let Some(cell) = self.cells.get_mut(&key) {
                if let Some(i) = cell.iter().position(|s| s.ent == stub.ent) {
                    cell.remove(i);
                }
            }
        }
        if !stub.flags.contains(MobjFlags::NOSECTOR) {
            let list = &mut self.sector_things[sector as usize];
            if let Some(i) = list.iter().position(|&e| e == stub.ent) {
                list.remove(i);
            }
        }
    }

    /// Entities currently linked into `sector`, in insertion order.
    pub fn things_in_sector(&self, sector: SectorId) -> &[Entity] {
        &self.sector_things[sector as usize]
    }

    /// Visit every stub in block `(bx, by)`; stops early on `false`.
    pub fn for_each_in_block<F>(&self, bx: i32, by: i32, mut f: F) -> bool
    where
        F: FnMut(&ThingStub) -> bool,
    {
        if let Some(cell) = self.cells.get(&(bx, by)) {
            for stub in cell {
                if !f(stub) {
                    return false;
                }
            }
        }
        true
    }

    /// Visit every stub whose **origin block** overlaps the given world box,
    /// expanded the way the collision code expects (caller pre-expands).
    pub fn for_each_in_bbox<F>(
        &self,
        min_x: Fixed,
        min_y: Fixed,
        max_x: Fixed,
        max_y: Fixed,
        mut f: F,
    ) -> bool
    where
        F: FnMut(&ThingStub) -> bool,
    {
        let (xl, yl) = self.block(min_x, min_y);
        let (xh, yh) = self.block(max_x, max_y);
        for bx in xl..=xh {
            for by in yl..=yh {
                if !self.for_each_in_block(bx, by, &mut f) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FRACUNIT;
    use crate::level::setup::fixture::load_square;

    fn stub(world: &mut hecs::World, x: i32, y: i32) -> ThingStub {
        ThingStub {
            ent: world.spawn(()),
            kind: MobjType::TROOP,
            x: x * FRACUNIT,
            y: y * FRACUNIT,
            z: 0,
            radius: 20 * FRACUNIT,
            height: 56 * FRACUNIT,
            flags: MobjFlags::SOLID,
        }
    }

    #[test]
    fn set_and_unset_round_trip() {
        let level = load_square();
        let mut world = hecs::World::new();
        let mut grid = ThingGrid::new(&level);

        let s = stub(&mut world, 100, 100);
        grid.set_position(s, 0);
        assert_eq!(grid.things_in_sector(0), &[s.ent]);

        let mut seen = 0;
        grid.for_each_in_bbox(0, 0, 256 * FRACUNIT, 256 * FRACUNIT, |_| {
            seen += 1;
            true
        });
        assert_eq!(seen, 1);

        grid.unset_position(&s, 0);
        assert!(grid.things_in_sector(0).is_empty());
    }

    #[test]
    fn early_exit_stops_iteration() {
        let level = load_square();
        let mut world = hecs::World::new();
        let mut grid = ThingGrid::new(&level);
        grid.set_position(stub(&mut world, 10, 10), 0);
        grid.set_position(stub(&mut world, 12, 12), 0);

        let mut seen = 0;
        let completed = grid.for_each_in_bbox(0, 0, 64 * FRACUNIT, 64 * FRACUNIT, |_| {
            seen += 1;
            false
        });
        assert!(!completed);
        assert_eq!(seen, 1);
    }

    #[test]
    fn noblockmap_things_skip_cells_but_keep_sector() {
        let level = load_square();
        let mut world = hecs::World::new();
        let mut grid = ThingGrid::new(&level);

        let mut s = stub(&mut world, 50, 50);
        s.flags = MobjFlags::NOBLOCKMAP;
        grid.set_position(s, 0);

        let mut seen = 0;
        grid.for_each_in_bbox(0, 0, 256 * FRACUNIT, 256 * FRACUNIT, |_| {
            seen += 1;
            true
        });
        assert_eq!(seen, 0);
        assert_eq!(grid.things_in_sector(0).len(), 1);
    }
}
