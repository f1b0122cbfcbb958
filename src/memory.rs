use crate::config::RuntimeConfig;
use crate::program::Program;

pub type Byte = u8;

/// Glyph printed for memory cells that hold zero
pub const PLACEHOLDER: Byte = b'.';

/// Character table seeded into system memory on boot, so `PRNTCH` can print
/// glyphs by index.
pub const CHARSET: &[Byte] = b"\0QWERTYUIOPASDFGHJKLZXCVBNM1234567890!@#$%^&*()-_=+[]{}\\|;:'\",<.>/?`~qwertyuiopasdfghjklzxcvbnm\n ";

/// The buffer a combined address resolved to, with the offset inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    System(usize),
    Video(usize),
}

/// System memory and video memory of the machine.
///
/// Both buffers are addressed independently by most instructions. Only
/// `STORE` sees them as one combined range, with video memory placed right
/// after system memory (see [`AddressSpace::resolve`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressSpace {
    system: Vec<Byte>,
    video: Vec<Byte>,
    screen_width: usize,
    screen_height: usize,
}

impl AddressSpace {
    /// Allocates zeroed buffers sized by `config`, which must have passed
    /// [`RuntimeConfig::validate`]
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            system: vec![0; config.mem_size],
            video: vec![0; config.video_len()],
            screen_width: config.screen_width,
            screen_height: config.screen_height,
        }
    }

    pub fn system(&self) -> &[Byte] {
        &self.system
    }

    pub fn video(&self) -> &[Byte] {
        &self.video
    }

    pub fn mem_size(&self) -> usize {
        self.system.len()
    }

    pub fn screen_width(&self) -> usize {
        self.screen_width
    }

    /// Reads a byte from system memory
    pub fn read_byte(&self, position: usize) -> Option<Byte> {
        self.system.get(position).copied()
    }

    /// Writes a byte to system memory. Returns `false` if `position` is out of range.
    pub fn write_byte(&mut self, position: usize, value: Byte) -> bool {
        match self.system.get_mut(position) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Writes an array of bytes to system memory, dropping whatever does not
    /// fit. Returns the number of bytes written.
    pub fn write_array(&mut self, position: usize, data: &[Byte]) -> usize {
        let start = position.min(self.system.len());
        let len = data.len().min(self.system.len() - start);
        self.system[start..start + len].copy_from_slice(&data[..len]);
        len
    }

    /// Copies `program` to the low end of system memory. A program longer
    /// than system memory is silently truncated.
    pub fn load_program(&mut self, program: &Program) -> usize {
        let loaded = self.write_array(0, program);
        if loaded < program.len() {
            log::debug!(
                "Program truncated from {} to {} bytes while loading",
                program.len(),
                loaded
            );
        }
        loaded
    }

    /// Fills the start of system memory with [`CHARSET`]
    pub fn seed_charset(&mut self) {
        self.write_array(0, CHARSET);
    }

    /// Maps an address of the combined range onto one of the two buffers.
    ///
    /// `0..mem_size` is system memory, `mem_size..mem_size + video_len` is
    /// video memory.
    pub fn resolve(&self, addr: usize) -> Option<Region> {
        if addr < self.system.len() {
            Some(Region::System(addr))
        } else if addr - self.system.len() < self.video.len() {
            Some(Region::Video(addr - self.system.len()))
        } else {
            None
        }
    }

    /// Writes `value` at a combined address
    pub fn store(&mut self, addr: usize, value: Byte) -> Option<Region> {
        let region = self.resolve(addr)?;
        match region {
            Region::System(offset) => self.system[offset] = value,
            Region::Video(offset) => self.video[offset] = value,
        }
        Some(region)
    }

    /// Index into video memory of the cell at `(x, y)`
    pub fn video_index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.screen_width && y < self.screen_height {
            Some(y * self.screen_width + x)
        } else {
            None
        }
    }

    pub fn read_video(&self, x: usize, y: usize) -> Option<Byte> {
        self.video_index(x, y).map(|index| self.video[index])
    }

    /// Writes `value` to the video cell at `(x, y)`. Returns `false` if the
    /// coordinates are off screen.
    pub fn write_video(&mut self, x: usize, y: usize, value: Byte) -> bool {
        match self.video_index(x, y) {
            Some(index) => {
                self.video[index] = value;
                true
            }
            None => false,
        }
    }

    /// Zeroes system memory. Video memory is left alone.
    pub fn clear_system(&mut self) {
        self.system.iter_mut().for_each(|cell| *cell = 0);
    }

    /// Number of zero bytes in system memory
    pub fn free_system(&self) -> usize {
        self.system.iter().filter(|&&cell| cell == 0).count()
    }

    /// Number of zero bytes in video memory
    pub fn free_video(&self) -> usize {
        self.video.iter().filter(|&&cell| cell == 0).count()
    }
}

/// Writes a block of instructions directly into system memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:expr ; $pos:expr => $( $byte:expr ),+ $(,)? ) => {
        $mem.write_array($pos, &[
            $(
                $byte as $crate::memory::Byte,
            )+
        ])
    };
}
