/// Limits defined in the Modbus specification
pub(crate) mod limits {
    /// Maximum count allowed in a read registers request
    pub(crate) const MAX_READ_REGISTERS_COUNT: u16 = 0x7D;
    /// Maximum count allowed in a write multiple registers request
    pub(crate) const MAX_WRITE_REGISTERS_COUNT: u16 = 0x7B;
}

/// Wire representation of coil states
pub(crate) mod coil {
    pub(crate) const ON: u16 = 0xFF00;
    pub(crate) const OFF: u16 = 0x0000;
}
