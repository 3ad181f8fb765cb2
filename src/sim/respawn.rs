//! Respawning: the deathmatch item queue and nightmare monster rebirth.

use crate::defs::flags::{MobjFlags, ThingOptions};
use crate::defs::sound::Sfx;
use crate::fixed::{FRACBITS, Fixed};
use crate::game::TICRATE;
use crate::level::Level;
use crate::sim::mobj::{find_doomed_num, remove_mobj, spawn_mobj};
use crate::sim::movement::check_position;
use crate::sim::tic::{Sim, SoundOrigin};
use crate::sim::{MobjActions, ONCEILINGZ, ONFLOORZ};
use crate::tables::ANG45;
use crate::wad::MapThing;
use hecs::Entity;
use log::warn;

/// Ring capacity; the oldest entry is evicted when full.
pub const ITEM_QUEUE_SIZE: usize = 128;

/// Seconds between pickup and reappearance in deathmatch 2/3.
const RESPAWN_DELAY: u32 = 30 * TICRATE;

/// FIFO ring of picked-up map specials waiting to come back.
#[derive(Clone, Debug)]
pub struct RespawnQueue {
    slots: [(MapThing, u32); ITEM_QUEUE_SIZE],
    head: usize,
    tail: usize,
}

impl Default for RespawnQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RespawnQueue {
    pub fn new() -> Self {
        Self {
            slots: [(MapThing::default(), 0); ITEM_QUEUE_SIZE],
            head: 0,
            tail: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.head.wrapping_sub(self.tail) % ITEM_QUEUE_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Enqueue; a full ring silently forgets its oldest entry.
    pub fn push(&mut self, thing: MapThing, time: u32) {
        self.slots[self.head] = (thing, time);
        self.head = (self.head + 1) & (ITEM_QUEUE_SIZE - 1);
        if self.head == self.tail {
            self.tail = (self.tail + 1) & (ITEM_QUEUE_SIZE - 1);
        }
    }

    fn front(&self) -> Option<(MapThing, u32)> {
        if self.is_empty() {
            None
        } else {
            Some(self.slots[self.tail])
        }
    }

    fn pop(&mut self) {
        if !self.is_empty() {
            self.tail = (self.tail + 1) & (ITEM_QUEUE_SIZE - 1);
        }
    }
}

/// End-of-tick queue evaluation; only deathmatch 2/3 resurrect items.
pub(crate) fn run_respawns(sim: &mut Sim, level: &Level) {
    if sim.opts.deathmatch < 2 {
        return;
    }
    let Some((thing, added)) = sim.respawn_queue.front() else {
        return;
    };
    if sim.leveltime.wrapping_sub(added) < RESPAWN_DELAY {
        return;
    }

    let x = (thing.x as Fixed) << FRACBITS;
    let y = (thing.y as Fixed) << FRACBITS;

    /* fog on the spot */
    let ss = level.locate_subsector(x, y);
    let z = level.sectors[level.subsectors[ss as usize].sector as usize].floorh;
    let fog = spawn_mobj(sim, level, crate::defs::MobjType::IFOG, x, y, z);
    sim.sfx(SoundOrigin::Mobj(fog), Sfx::itmbk);

    match find_doomed_num(thing.kind as i32) {
        Some(kind) => {
            let z = if kind.info().flags.contains(MobjFlags::SPAWNCEILING) {
                ONCEILINGZ
            } else {
                ONFLOORZ
            };
            let ent = spawn_mobj(sim, level, kind, x, y, z);
            let mut m = sim.mobj(ent).expect("freshly spawned");
            m.spawnpoint = thing;
            m.angle = ANG45.wrapping_mul((thing.angle as u32) / 45);
            sim.put_mobj(ent, m);
        }
        None => warn!("respawn queue held unknown thing type {}", thing.kind),
    }

    sim.respawn_queue.pop();
}

/// Monster rebirth on nightmare / -respawn: fog both ends, re-spawn from
/// the original map record, retire the corpse.
pub(crate) fn nightmare_respawn(sim: &mut Sim, level: &Level, ent: Entity) {
    let Some(m) = sim.mobj(ent) else { return };

    let x = (m.spawnpoint.x as Fixed) << FRACBITS;
    let y = (m.spawnpoint.y as Fixed) << FRACBITS;

    /* somebody else may occupy the spot */
    let mut fx = MobjActions::new();
    let res = check_position(sim, level, ent, &m, x, y, &mut fx);
    if res.blocked {
        return; // no respawn this time
    }

    /* fog at the corpse */
    let old_floor = level.sectors[level.subsectors[m.subsector as usize].sector as usize].floorh;
    let fog = spawn_mobj(sim, level, crate::defs::MobjType::TFOG, m.x, m.y, old_floor);
    sim.sfx(SoundOrigin::Mobj(fog), Sfx::telept);

    /* fog at the birth place */
    let ss = level.locate_subsector(x, y);
    let new_floor = level.sectors[level.subsectors[ss as usize].sector as usize].floorh;
    let fog = spawn_mobj(sim, level, crate::defs::MobjType::TFOG, x, y, new_floor);
    sim.sfx(SoundOrigin::Mobj(fog), Sfx::telept);

    /* the replacement inherits the map record */
    let z = if m.info.flags.contains(MobjFlags::SPAWNCEILING) {
        ONCEILINGZ
    } else {
        ONFLOORZ
    };
    let new_ent = spawn_mobj(sim, level, m.kind, x, y, z);
    let mut nm = sim.mobj(new_ent).expect("freshly spawned");
    nm.spawnpoint = m.spawnpoint;
    nm.angle = ANG45.wrapping_mul((m.spawnpoint.angle as u32) / 45);
    if ThingOptions::from_bits_truncate(m.spawnpoint.options as u16)
        .contains(ThingOptions::AMBUSH)
    {
        nm.flags |= MobjFlags::AMBUSH;
    }
    nm.reactiontime = 18;
    sim.put_mobj(new_ent, nm);

    /* remove the old monster */
    remove_mobj(sim, level, ent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::mobjinfo::MobjType;
    use crate::fixed::FRACUNIT;
    use crate::level::setup::fixture::load_square;
    use crate::sim::mobj::touch_special;
    use crate::sim::tic::{Sim, SimOptions};
    use crate::sim::TicCmd;

    #[test]
    fn ring_evicts_oldest_when_full() {
        let mut q = RespawnQueue::new();
        for i in 0..(ITEM_QUEUE_SIZE as u32 + 10) {
            q.push(MapThing::default(), i);
        }
        // ring keeps the most recent SIZE-1 live entries
        assert_eq!(q.len(), ITEM_QUEUE_SIZE - 1);
        assert_eq!(q.front().unwrap().1, 11);
    }

    #[test]
    fn deathmatch_item_respawns_after_thirty_seconds() {
        let level = load_square();
        let mut sim = Sim::new(
            &level,
            SimOptions {
                deathmatch: 2,
                ..SimOptions::default()
            },
        );
        sim.spawn_map_things(&level);
        // deathmatch skips coop starts; place the player by hand
        crate::sim::mobj::spawn_player(&mut sim, &level, level.things[0], 0);

        // drop a medikit with a spawnpoint and pick it up at leveltime 100
        let item = crate::sim::mobj::spawn_mobj(
            &mut sim,
            &level,
            MobjType::MEDIKIT,
            64 * FRACUNIT,
            64 * FRACUNIT,
            crate::sim::ONFLOORZ,
        );
        {
            let mut m = sim.mobj(item).unwrap();
            m.spawnpoint = MapThing {
                x: 64,
                y: 64,
                angle: 0,
                kind: 2012,
                options: 7,
            };
            sim.put_mobj(item, m);
        }

        for _ in 0..100 {
            sim.ticker(&level, &[TicCmd::default()]);
        }
        let player = sim.players[0].mo.unwrap();
        sim.players[0].health = 50; // so the medikit is consumable
        touch_special(&mut sim, &level, item, player);
        assert!(sim.mobj(item).is_none(), "pickup must remove the item");
        assert_eq!(sim.respawn_queue.len(), 1);

        // not yet at 100 + 30*35 tics
        for _ in 0..RESPAWN_DELAY - 1 {
            sim.ticker(&level, &[TicCmd::default()]);
        }
        assert_eq!(sim.respawn_queue.len(), 1);

        sim.ticker(&level, &[TicCmd::default()]);
        assert!(sim.respawn_queue.is_empty(), "item back on the map");

        // a fresh medikit must exist at the spawn spot
        let found = sim
            .thinkers
            .iter()
            .filter_map(|&e| sim.mobj(e))
            .any(|m| m.kind == MobjType::MEDIKIT && m.x == 64 * FRACUNIT);
        assert!(found);
    }

    #[test]
    fn single_player_items_stay_gone() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        sim.spawn_map_things(&level);
        let item = crate::sim::mobj::spawn_mobj(
            &mut sim,
            &level,
            MobjType::MEDIKIT,
            64 * FRACUNIT,
            64 * FRACUNIT,
            crate::sim::ONFLOORZ,
        );
        let player = sim.players[0].mo.unwrap();
        sim.players[0].health = 50;
        touch_special(&mut sim, &level, item, player);
        for _ in 0..(RESPAWN_DELAY + 10) {
            sim.ticker(&level, &[TicCmd::default()]);
        }
        let medikits = sim
            .thinkers
            .iter()
            .filter_map(|&e| sim.mobj(e))
            .filter(|m| m.kind == MobjType::MEDIKIT)
            .count();
        assert_eq!(medikits, 0);
    }
}
