use crate::memory::Byte;

/// Fixed-size set of 8-bit registers. Register 0 doubles as the condition
/// register of `JZ`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisterFile {
    values: Vec<Byte>,
}

impl RegisterFile {
    /// Creates `count` registers, all zero
    pub fn new(count: usize) -> Self {
        Self {
            values: vec![0; count],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: Byte) -> Option<Byte> {
        self.values.get(index as usize).copied()
    }

    pub fn get_mut(&mut self, index: Byte) -> Option<&mut Byte> {
        self.values.get_mut(index as usize)
    }

    /// Sets a register. Returns `false` if there is no register `index`.
    pub fn set(&mut self, index: Byte, value: Byte) -> bool {
        match self.get_mut(index) {
            Some(register) => {
                *register = value;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[Byte] {
        &self.values
    }
}
