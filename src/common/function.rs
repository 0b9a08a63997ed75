use std::fmt::{Display, Formatter};

mod constants {
    pub(crate) const READ_HOLDING_REGISTERS: u8 = 3;
    pub(crate) const READ_INPUT_REGISTERS: u8 = 4;
    pub(crate) const WRITE_SINGLE_COIL: u8 = 5;
    pub(crate) const WRITE_SINGLE_REGISTER: u8 = 6;
    pub(crate) const WRITE_MULTIPLE_REGISTERS: u8 = 16;
    pub(crate) const ERROR_DELIMITER: u8 = 0x80;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum FunctionCode {
    ReadHoldingRegisters = constants::READ_HOLDING_REGISTERS as isize,
    ReadInputRegisters = constants::READ_INPUT_REGISTERS as isize,
    WriteSingleCoil = constants::WRITE_SINGLE_COIL as isize,
    WriteSingleRegister = constants::WRITE_SINGLE_REGISTER as isize,
    WriteMultipleRegisters = constants::WRITE_MULTIPLE_REGISTERS as isize,
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            FunctionCode::ReadHoldingRegisters => {
                write!(f, "READ HOLDING REGISTERS ({:#04X})", self.get_value())
            }
            FunctionCode::ReadInputRegisters => {
                write!(f, "READ INPUT REGISTERS ({:#04X})", self.get_value())
            }
            FunctionCode::WriteSingleCoil => {
                write!(f, "WRITE SINGLE COIL ({:#04X})", self.get_value())
            }
            FunctionCode::WriteSingleRegister => {
                write!(f, "WRITE SINGLE REGISTER ({:#04X})", self.get_value())
            }
            FunctionCode::WriteMultipleRegisters => {
                write!(f, "WRITE MULTIPLE REGISTERS ({:#04X})", self.get_value())
            }
        }
    }
}

impl FunctionCode {
    pub(crate) const fn get_value(self) -> u8 {
        self as u8
    }

    pub(crate) const fn as_error(self) -> u8 {
        self.get_value() | constants::ERROR_DELIMITER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_sets_high_bit() {
        assert_eq!(FunctionCode::ReadHoldingRegisters.as_error(), 0x83);
        assert_eq!(FunctionCode::WriteMultipleRegisters.as_error(), 0x90);
    }
}
