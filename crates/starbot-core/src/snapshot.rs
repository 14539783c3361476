//! Entity snapshot - tick-scoped index of everything the player owns
//!
//! Rebuilt from host queries at the start of every tick and never persisted.
//! All maps are ordered by id so that iteration (and therefore ship binding)
//! is stable from tick to tick.

use std::collections::BTreeMap;

use crate::host::{Galaxy, GalaxyId, Host, Ship, ShipId, Structure, StructureId};

#[derive(Debug, Clone, Default)]
pub struct EntitySnapshot {
    /// Tick the snapshot was taken on
    pub tick: u64,
    pub ships: BTreeMap<ShipId, Ship>,
    pub structures: BTreeMap<StructureId, Structure>,
    /// Galaxies containing at least one owned ship
    pub galaxies: BTreeMap<GalaxyId, Galaxy>,
}

impl EntitySnapshot {
    /// Query the host for owned ships and structures and the galaxies they occupy.
    pub fn capture<H: Host + ?Sized>(host: &H) -> Self {
        let mut snapshot = Self {
            tick: host.time(),
            ..Self::default()
        };

        for ship in host.my_ships() {
            if !snapshot.galaxies.contains_key(&ship.galaxy_id) {
                match host.galaxy(ship.galaxy_id) {
                    Some(galaxy) => {
                        snapshot.galaxies.insert(ship.galaxy_id, galaxy);
                    }
                    None => log::warn!(
                        "Ship {} is in galaxy {} which the host cannot resolve",
                        ship.id,
                        ship.galaxy_id
                    ),
                }
            }
            snapshot.ships.insert(ship.id, ship);
        }

        for structure in host.my_structures() {
            snapshot.structures.insert(structure.id, structure);
        }

        snapshot
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(&id)
    }

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(&id)
    }

    pub fn galaxy(&self, id: GalaxyId) -> Option<&Galaxy> {
        self.galaxies.get(&id)
    }

    /// Owned ships in a galaxy, in id order
    pub fn ships_in(&self, galaxy_id: GalaxyId) -> impl Iterator<Item = &Ship> + '_ {
        self.ships.values().filter(move |s| s.galaxy_id == galaxy_id)
    }

    /// Owned structures in a galaxy, in id order
    pub fn structures_in(&self, galaxy_id: GalaxyId) -> impl Iterator<Item = &Structure> + '_ {
        self.structures
            .values()
            .filter(move |s| s.galaxy_id == galaxy_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{galaxy, planet, ship, structure, ScriptedHost};

    #[test]
    fn test_capture_indexes_owned_entities() {
        let host = ScriptedHost::new()
            .with_galaxy(galaxy(1, "Sol", vec![planet("Terra", 1, (0, 0))]))
            .with_galaxy(galaxy(2, "Vega", vec![]))
            .with_galaxy(galaxy(3, "Empty", vec![]))
            .with_ship(ship(10, 1, (0, 0)))
            .with_ship(ship(11, 2, (0, 0)))
            .with_structure(structure(20, "factory", 1, "Terra"));

        let snapshot = EntitySnapshot::capture(&host);

        assert_eq!(snapshot.ships.len(), 2);
        assert_eq!(snapshot.structures.len(), 1);
        // Galaxy 3 has no owned ship, so it is not indexed
        assert_eq!(snapshot.galaxies.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(snapshot.ships_in(1).count(), 1);
        assert_eq!(snapshot.structures_in(2).count(), 0);
    }

    #[test]
    fn test_every_ship_galaxy_is_indexed() {
        let host = ScriptedHost::new()
            .with_galaxy(galaxy(1, "Sol", vec![]))
            .with_ship(ship(10, 1, (0, 0)))
            .with_ship(ship(11, 1, (2, 2)));

        let snapshot = EntitySnapshot::capture(&host);
        for ship in snapshot.ships.values() {
            assert!(snapshot.galaxy(ship.galaxy_id).is_some());
        }
    }

    #[test]
    fn test_unresolvable_galaxy_is_skipped() {
        let host = ScriptedHost::new().with_ship(ship(10, 99, (0, 0)));

        let snapshot = EntitySnapshot::capture(&host);
        assert!(snapshot.ship(10).is_some());
        assert!(snapshot.galaxies.is_empty());
    }
}
