//! Bytecode assembler

use crate::opcode::Opcode;
use std::collections::HashMap;
use thiserror::Error;

/// Assembly errors, reported by [`Assembler::finish`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// Jump or call to a label never defined
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// Label defined twice
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    /// String literal longer than a u16 length prefix allows
    #[error("string literal too long: {0} bytes")]
    StringTooLong(usize),

    /// Opcode passed to [`Assembler::op`] takes an immediate
    #[error("{0:?} needs an immediate operand")]
    NeedsImmediate(Opcode),

    /// Code offsets no longer fit in u32
    #[error("code too large")]
    CodeTooLarge,
}

/// Builds contract bytecode with named labels.
///
/// ```
/// use pob_vm::{Assembler, Opcode};
///
/// let code = Assembler::new()
///     .push_int(2)
///     .push_int(3)
///     .op(Opcode::Add)
///     .op(Opcode::Return)
///     .finish()
///     .unwrap();
/// assert_eq!(code[0], Opcode::PushInt as u8);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Assembler {
    code: Vec<u8>,
    labels: HashMap<String, usize>,
    fixups: Vec<(usize, String)>,
    error: Option<AsmError>,
}

impl Assembler {
    /// Empty program
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, err: AsmError) {
        self.error.get_or_insert(err);
    }

    /// Opcode without immediates
    pub fn op(&mut self, op: Opcode) -> &mut Self {
        match op {
            Opcode::PushInt | Opcode::PushStr | Opcode::Jump | Opcode::JumpIf | Opcode::Call | Opcode::Arg => {
                self.fail(AsmError::NeedsImmediate(op))
            }
            _ => self.code.push(op as u8),
        }
        self
    }

    /// Push an integer
    pub fn push_int(&mut self, value: i128) -> &mut Self {
        self.code.push(Opcode::PushInt as u8);
        self.code.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Push a string
    pub fn push_str(&mut self, value: &str) -> &mut Self {
        let Ok(len) = u16::try_from(value.len()) else {
            self.fail(AsmError::StringTooLong(value.len()));
            return self;
        };
        self.code.push(Opcode::PushStr as u8);
        self.code.extend_from_slice(&len.to_be_bytes());
        self.code.extend_from_slice(value.as_bytes());
        self
    }

    /// Push a boolean
    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.op(if value { Opcode::PushTrue } else { Opcode::PushFalse })
    }

    /// Mark the current offset
    pub fn label(&mut self, name: &str) -> &mut Self {
        if self.labels.insert(name.to_string(), self.code.len()).is_some() {
            self.fail(AsmError::DuplicateLabel(name.to_string()));
        }
        self
    }

    fn target(&mut self, label: &str) {
        self.fixups.push((self.code.len(), label.to_string()));
        self.code.extend_from_slice(&[0; 4]);
    }

    /// Jump to `label`
    pub fn jump(&mut self, label: &str) -> &mut Self {
        self.code.push(Opcode::Jump as u8);
        self.target(label);
        self
    }

    /// Pop a condition, jump to `label` when truthy
    pub fn jump_if(&mut self, label: &str) -> &mut Self {
        self.code.push(Opcode::JumpIf as u8);
        self.target(label);
        self
    }

    /// Call the function at `label` with `argc` arguments from the stack
    pub fn call(&mut self, label: &str, argc: u8) -> &mut Self {
        self.code.push(Opcode::Call as u8);
        self.target(label);
        self.code.push(argc);
        self
    }

    /// Push argument `index` of the current function
    pub fn arg(&mut self, index: u8) -> &mut Self {
        self.code.push(Opcode::Arg as u8);
        self.code.push(index);
        self
    }

    /// Resolve labels and return the bytecode
    pub fn finish(&self) -> Result<Vec<u8>, AsmError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let mut code = self.code.clone();
        for (pos, label) in &self.fixups {
            let offset = *self.labels.get(label).ok_or_else(|| AsmError::UnknownLabel(label.clone()))?;
            let offset = u32::try_from(offset).map_err(|_| AsmError::CodeTooLarge)?;
            code[*pos..*pos + 4].copy_from_slice(&offset.to_be_bytes());
        }
        Ok(code)
    }
}
