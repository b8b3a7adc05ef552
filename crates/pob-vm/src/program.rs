//! Bytecode decoding

use crate::error::{VmError, VmResult};
use crate::opcode::Opcode;
use std::collections::HashMap;

/// Decoded instruction. Jump targets are instruction indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Instr {
    /// Opcode without immediates
    Plain(Opcode),
    PushInt(i128),
    PushStr(String),
    Jump(usize),
    JumpIf(usize),
    Call { target: usize, argc: u8 },
    Arg(u8),
}

impl Instr {
    pub(crate) fn opcode(&self) -> Opcode {
        match self {
            Instr::Plain(op) => *op,
            Instr::PushInt(_) => Opcode::PushInt,
            Instr::PushStr(_) => Opcode::PushStr,
            Instr::Jump(_) => Opcode::Jump,
            Instr::JumpIf(_) => Opcode::JumpIf,
            Instr::Call { .. } => Opcode::Call,
            Instr::Arg(_) => Opcode::Arg,
        }
    }
}

/// Code decoded up front, so malformed bytecode fails before any state is
/// touched and jumps cannot land inside an immediate.
#[derive(Clone, Debug, Default)]
pub(crate) struct Program {
    instrs: Vec<Instr>,
}

/// Instruction with its target still a byte offset
enum Raw {
    Done(Instr),
    Jump(u32),
    JumpIf(u32),
    Call(u32, u8),
}

struct Reader<'a> {
    code: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, at: usize) -> VmResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.code.len());
        let end = end.ok_or(VmError::TruncatedCode(at))?;
        let bytes = &self.code[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self, at: usize) -> VmResult<u8> {
        Ok(self.take(1, at)?[0])
    }

    fn u16(&mut self, at: usize) -> VmResult<u16> {
        let b = self.take(2, at)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, at: usize) -> VmResult<u32> {
        let b = self.take(4, at)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i128(&mut self, at: usize) -> VmResult<i128> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.take(16, at)?);
        Ok(i128::from_be_bytes(buf))
    }
}

impl Program {
    /// Decode `code`. A target equal to the code length is allowed and halts.
    pub(crate) fn decode(code: &[u8]) -> VmResult<Self> {
        let mut reader = Reader { code, pos: 0 };
        let mut raw = Vec::new();
        let mut index_of = HashMap::new();

        while reader.pos < code.len() {
            let at = reader.pos;
            index_of.insert(at, raw.len());
            let byte = reader.u8(at)?;
            let op = Opcode::from_byte(byte).ok_or(VmError::InvalidOpcode(byte))?;
            raw.push(match op {
                Opcode::PushInt => Raw::Done(Instr::PushInt(reader.i128(at)?)),
                Opcode::PushStr => {
                    let len = reader.u16(at)? as usize;
                    let bytes = reader.take(len, at)?;
                    let s = std::str::from_utf8(bytes).map_err(|_| VmError::InvalidString(at))?;
                    Raw::Done(Instr::PushStr(s.to_string()))
                }
                Opcode::Jump => Raw::Jump(reader.u32(at)?),
                Opcode::JumpIf => Raw::JumpIf(reader.u32(at)?),
                Opcode::Call => {
                    let target = reader.u32(at)?;
                    Raw::Call(target, reader.u8(at)?)
                }
                Opcode::Arg => Raw::Done(Instr::Arg(reader.u8(at)?)),
                op => Raw::Done(Instr::Plain(op)),
            });
        }
        index_of.insert(code.len(), raw.len());

        let resolve = |target: u32| -> VmResult<usize> {
            let target = target as usize;
            index_of.get(&target).copied().ok_or(VmError::InvalidJump(target))
        };
        let instrs = raw
            .into_iter()
            .map(|r| {
                Ok(match r {
                    Raw::Done(instr) => instr,
                    Raw::Jump(t) => Instr::Jump(resolve(t)?),
                    Raw::JumpIf(t) => Instr::JumpIf(resolve(t)?),
                    Raw::Call(t, argc) => Instr::Call { target: resolve(t)?, argc },
                })
            })
            .collect::<VmResult<Vec<_>>>()?;

        Ok(Self { instrs })
    }

    pub(crate) fn get(&self, pc: usize) -> Option<&Instr> {
        self.instrs.get(pc)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.instrs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_immediates() {
        let mut code = vec![Opcode::PushInt as u8];
        code.extend_from_slice(&(-5i128).to_be_bytes());
        code.extend_from_slice(&[Opcode::PushStr as u8, 0, 2, b'h', b'i']);
        code.extend_from_slice(&[Opcode::Jump as u8, 0, 0, 0, 0]);
        let program = Program::decode(&code).unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.get(0), Some(&Instr::PushInt(-5)));
        assert_eq!(program.get(1), Some(&Instr::PushStr("hi".into())));
        assert_eq!(program.get(2), Some(&Instr::Jump(0)));
    }

    #[test]
    fn test_jump_into_immediate_is_rejected() {
        let mut code = vec![Opcode::PushInt as u8];
        code.extend_from_slice(&1i128.to_be_bytes());
        code.extend_from_slice(&[Opcode::Jump as u8, 0, 0, 0, 3]);
        assert_eq!(Program::decode(&code).unwrap_err(), VmError::InvalidJump(3));
    }

    #[test]
    fn test_jump_to_end_is_allowed() {
        let code = [Opcode::Jump as u8, 0, 0, 0, 5];
        assert_eq!(Program::decode(&code).unwrap().get(0), Some(&Instr::Jump(1)));
    }

    #[test]
    fn test_malformed_code() {
        assert_eq!(Program::decode(&[0xEE]).unwrap_err(), VmError::InvalidOpcode(0xEE));
        assert_eq!(
            Program::decode(&[Opcode::PushInt as u8, 1, 2]).unwrap_err(),
            VmError::TruncatedCode(0)
        );
        assert_eq!(
            Program::decode(&[Opcode::Pop as u8, Opcode::PushStr as u8, 0, 1, 0xFF]).unwrap_err(),
            VmError::InvalidString(1)
        );
    }
}
