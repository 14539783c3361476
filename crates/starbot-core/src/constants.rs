//! Game constants: resource, structure and component type names
//!
//! The host identifies all of these by plain strings; the names below are
//! the ones the simulation understands.

pub mod resources {
    pub const IRON_ORE: &str = "iron_ore";
    pub const CRYSTAL: &str = "crystal";
    pub const DEUTERIUM: &str = "deuterium";
    pub const METAL: &str = "metal";
    pub const ENERGY: &str = "energy";
    pub const ALLOY: &str = "alloy";
    pub const MISSILE: &str = "missile";
}

pub mod structures {
    pub const MINING_FACILITY: &str = "mining_facility";
    pub const IRON_EXTRACTOR: &str = "iron_extractor";
    pub const CRYSTAL_HARVESTER: &str = "crystal_harvester";
    pub const DEUTERIUM_COLLECTOR: &str = "deuterium_collector";
    pub const FACTORY: &str = "factory";
    pub const COMPONENT_FACTORY: &str = "component_factory";
    pub const STORAGE: &str = "storage";
    pub const WAREHOUSE: &str = "warehouse";
    pub const SHIPYARD: &str = "shipyard";
    pub const DEFENSE_TOWER: &str = "defense_tower";
    pub const SHIELD_GENERATOR: &str = "shield_generator";
    pub const TRADE_TERMINAL: &str = "trade_terminal";
    pub const ENERGY_PLANT: &str = "energy_plant";
    pub const LAB: &str = "lab";
}

pub mod components {
    pub const BASIC_ENGINE: &str = "basic_engine";
    pub const WARP_DRIVE: &str = "warp_drive";
    pub const ADVANCED_ENGINE: &str = "advanced_engine";
    pub const MINING_LASER: &str = "mining_laser";
    pub const STORAGE: &str = "storage";
    pub const RESOURCE_SCANNER: &str = "resource_scanner";
    pub const CONSTRUCTION_ARM: &str = "construction_arm";
    pub const REPAIR_DRONE: &str = "repair_drone";
    pub const WEAPON_SYSTEM: &str = "weapon_system";
    pub const SHIELD_GENERATOR: &str = "shield_generator_component";
    pub const ARMOR_PLATING: &str = "armor_plating";
    pub const TARGETING_SYSTEM: &str = "targeting_system";
    pub const MISSILE_LAUNCHER: &str = "missile_launcher";
    pub const LASER_WEAPON: &str = "laser_weapon";
    pub const POWER_CORE: &str = "power_core";
    pub const SENSOR_ARRAY: &str = "sensor_array";
    pub const CLOAKING_DEVICE: &str = "cloaking_device";
}

/// Length of generated task ids.
pub const TASK_ID_LENGTH: usize = 8;

/// Chebyshev distance at which a ship can act on a target.
pub const INTERACT_RANGE: u32 = 1;

/// Construction progress at which a structure is complete.
pub const COMPLETE_PROGRESS: u32 = 100;
