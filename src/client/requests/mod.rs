pub(crate) mod read_registers;
pub(crate) mod write_multiple;
pub(crate) mod write_single;
