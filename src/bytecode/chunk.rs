use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::op::{Instruction, Opcode};

/// Leading bytes of a serialized bytecode image.
pub const IMAGE_MAGIC: [u8; 4] = *b"LMXB";
pub const IMAGE_VERSION: u16 = 1;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("instruction index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("instruction {index} ({opcode}) has no jump target")]
    NotAJump { index: usize, opcode: Opcode },
    #[error("not a bytecode image")]
    BadMagic,
    #[error("unsupported image version {0}")]
    UnsupportedVersion(u16),
    #[error("image encoding: {0}")]
    Encoding(#[from] postcard::Error),
}

/// Append-only instruction buffer.
///
/// Instructions never change after being pushed, with one exception:
/// `patch_jump_target` fills in a forward jump once its destination is known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    instructions: Vec<Instruction>,
}

#[derive(Serialize, Deserialize)]
struct Image {
    magic: [u8; 4],
    version: u16,
    chunk: Chunk,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Appends an instruction and returns its index.
    pub fn push(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    /// Overwrites the jump target of the jump-carrying instruction at
    /// `index`. Any other opcode is refused.
    pub fn patch_jump_target(&mut self, index: usize, target: usize) -> Result<(), ChunkError> {
        let len = self.instructions.len();
        let instruction = self
            .instructions
            .get_mut(index)
            .ok_or(ChunkError::OutOfRange { index, len })?;
        let offset = instruction
            .opcode
            .target_offset()
            .ok_or(ChunkError::NotAJump {
                index,
                opcode: instruction.opcode,
            })?;
        instruction.set_imm(offset, target as i64);
        Ok(())
    }

    pub fn ends_with_halt(&self) -> bool {
        self.instructions
            .last()
            .is_some_and(|i| i.opcode == Opcode::Halt)
    }

    /// Removes a trailing `HALT` so that further code can be appended and
    /// reached by a VM that stopped on it.
    pub fn strip_halt(&mut self) -> bool {
        if self.ends_with_halt() {
            self.instructions.pop();
            true
        } else {
            false
        }
    }

    /// Drops every instruction at or after `len`. Used to roll back a
    /// partially generated input.
    pub fn truncate(&mut self, len: usize) {
        self.instructions.truncate(len);
    }

    /// Serializes the chunk into a versioned postcard image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChunkError> {
        let image = Image {
            magic: IMAGE_MAGIC,
            version: IMAGE_VERSION,
            chunk: self.clone(),
        };
        Ok(postcard::to_allocvec(&image)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Chunk, ChunkError> {
        let image: Image = postcard::from_bytes(bytes)?;
        if image.magic != IMAGE_MAGIC {
            return Err(ChunkError::BadMagic);
        }
        if image.version != IMAGE_VERSION {
            return Err(ChunkError::UnsupportedVersion(image.version));
        }
        Ok(image.chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::emit;

    #[test]
    fn test_patch_jump_targets() {
        let mut chunk = Chunk::new();
        let jmp = emit::jmp(&mut chunk, 0);
        let branch = emit::if_true(&mut chunk, 3, 0);
        let call = emit::fcall(&mut chunk, 0);
        let beq = emit::branch(&mut chunk, Opcode::Beq, 1, 2, 0);

        chunk.patch_jump_target(jmp, 10).unwrap();
        chunk.patch_jump_target(branch, 11).unwrap();
        chunk.patch_jump_target(call, 12).unwrap();
        chunk.patch_jump_target(beq, 13).unwrap();

        assert_eq!(chunk.get(jmp).unwrap().target(), Some(10));
        assert_eq!(chunk.get(branch).unwrap().target(), Some(11));
        assert_eq!(chunk.get(branch).unwrap().reg(0), 3);
        assert_eq!(chunk.get(call).unwrap().target(), Some(12));
        assert_eq!(chunk.get(beq).unwrap().target(), Some(13));
        assert_eq!(chunk.get(beq).unwrap().reg(1), 2);
    }

    #[test]
    fn test_patch_refuses_non_jumps() {
        let mut chunk = Chunk::new();
        let mov = emit::mov_ri(&mut chunk, 1, 42);
        let err = chunk.patch_jump_target(mov, 5).unwrap_err();
        assert!(matches!(err, ChunkError::NotAJump { index: 0, .. }));
        assert_eq!(chunk.get(mov).unwrap().imm(1), 42);

        let err = chunk.patch_jump_target(9, 5).unwrap_err();
        assert!(matches!(err, ChunkError::OutOfRange { index: 9, len: 1 }));
    }

    #[test]
    fn test_strip_halt() {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, 1);
        assert!(!chunk.strip_halt());
        emit::halt(&mut chunk);
        assert!(chunk.ends_with_halt());
        assert!(chunk.strip_halt());
        assert_eq!(chunk.len(), 1);
    }

    #[test]
    fn test_image_round_trip() {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, -7);
        emit::arith(&mut chunk, Opcode::Add, 2, 1, 1);
        emit::halt(&mut chunk);

        let bytes = chunk.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &IMAGE_MAGIC);
        assert_eq!(Chunk::from_bytes(&bytes).unwrap(), chunk);
    }

    #[test]
    fn test_image_rejects_foreign_bytes() {
        let image = Image {
            magic: *b"NOPE",
            version: IMAGE_VERSION,
            chunk: Chunk::new(),
        };
        let bytes = postcard::to_allocvec(&image).unwrap();
        assert!(matches!(
            Chunk::from_bytes(&bytes),
            Err(ChunkError::BadMagic)
        ));
        assert!(Chunk::from_bytes(&[]).is_err());
    }
}
