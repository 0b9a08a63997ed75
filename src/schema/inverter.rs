//! Built-in register table for the supported solar inverter family.
//!
//! Input registers are the live measurement bank; holding registers carry
//! identity, the device clock, and the battery charge/discharge controls.

use crate::schema::{RegisterDefinition, RegisterKind, RegisterSchema, RegisterSpace, Scale};
use crate::types::UnitId;

/// Unit id these inverters respond on
pub const DEFAULT_UNIT_ID: UnitId = UnitId::new(0x32);

const fn input(
    name: &'static str,
    address: u16,
    kind: RegisterKind,
    scale: Scale,
) -> RegisterDefinition {
    RegisterDefinition {
        name,
        space: RegisterSpace::Input,
        address,
        kind,
        scale,
        writable: false,
    }
}

const fn holding(
    name: &'static str,
    address: u16,
    kind: RegisterKind,
    scale: Scale,
) -> RegisterDefinition {
    RegisterDefinition {
        name,
        space: RegisterSpace::Holding,
        address,
        kind,
        scale,
        writable: false,
    }
}

const fn holding_rw(name: &'static str, address: u16) -> RegisterDefinition {
    RegisterDefinition {
        name,
        space: RegisterSpace::Holding,
        address,
        kind: RegisterKind::U16,
        scale: Scale::Unit,
        writable: true,
    }
}

const DEFINITIONS: &[RegisterDefinition] = &[
    // measurement bank
    input("inverter_status", 0, RegisterKind::U16, Scale::Unit),
    input("v_pv1", 1, RegisterKind::U16, Scale::Deci),
    input("v_pv2", 2, RegisterKind::U16, Scale::Deci),
    input("v_p_bus", 3, RegisterKind::U16, Scale::Deci),
    input("v_n_bus", 4, RegisterKind::U16, Scale::Deci),
    input("v_ac1", 5, RegisterKind::U16, Scale::Deci),
    input("e_battery_throughput_total", 6, RegisterKind::U32, Scale::Deci),
    input("i_pv1", 8, RegisterKind::U16, Scale::Centi),
    input("i_pv2", 9, RegisterKind::U16, Scale::Centi),
    input("i_ac1", 10, RegisterKind::U16, Scale::Centi),
    input("f_ac1", 13, RegisterKind::U16, Scale::Centi),
    input("v_highbrigh_bus", 20, RegisterKind::U16, Scale::Deci),
    input("p_inverter_out", 24, RegisterKind::I16, Scale::Unit),
    input("p_grid_out", 30, RegisterKind::I16, Scale::Unit),
    input("p_load_demand", 42, RegisterKind::U16, Scale::Unit),
    input("temp_inverter_heatsink", 58, RegisterKind::U16, Scale::Deci),
    // battery bank
    input("v_battery_cell_01", 60, RegisterKind::U16, Scale::Milli),
    input("v_battery_cell_02", 61, RegisterKind::U16, Scale::Milli),
    input("v_battery_cell_03", 62, RegisterKind::U16, Scale::Milli),
    input("v_battery_cell_04", 63, RegisterKind::U16, Scale::Milli),
    input("battery_soc", 104, RegisterKind::U16, Scale::Unit),
    input("battery_serial_number", 110, RegisterKind::Ascii(5), Scale::Unit),
    // identity
    holding("device_type_code", 0, RegisterKind::U16, Scale::Unit),
    holding("battery_firmware_version", 1, RegisterKind::U16, Scale::Unit),
    holding("inverter_serial_number", 13, RegisterKind::Ascii(5), Scale::Unit),
    // controls
    holding_rw("enable_charge_target", 20),
    holding_rw("battery_power_mode", 27),
    holding_rw("system_time_year", 35),
    holding_rw("system_time_month", 36),
    holding_rw("system_time_day", 37),
    holding_rw("system_time_hour", 38),
    holding_rw("system_time_minute", 39),
    holding_rw("system_time_second", 40),
    holding_rw("discharge_slot_1_start", 56),
    holding_rw("discharge_slot_1_end", 57),
    holding_rw("enable_discharge", 59),
    holding_rw("charge_slot_1_start", 94),
    holding_rw("charge_slot_1_end", 95),
    holding_rw("enable_charge", 96),
    holding_rw("battery_soc_reserve", 110),
    holding_rw("charge_target_soc", 116),
];

static SCHEMA: RegisterSchema = RegisterSchema::new(DEFINITIONS);

/// The built-in inverter schema
pub fn schema() -> &'static RegisterSchema {
    &SCHEMA
}
