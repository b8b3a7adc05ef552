//! Instruction set

/// Opcodes. Immediates follow the opcode byte:
///
/// | opcode | immediate |
/// |---|---|
/// | `PushInt` | i128, 16 bytes big endian |
/// | `PushStr` | u16 length (BE) + UTF-8 bytes |
/// | `Jump`, `JumpIf` | u32 target byte offset (BE) |
/// | `Call` | u32 target byte offset (BE) + u8 argument count |
/// | `Arg` | u8 argument index |
///
/// Stack effects list operands deepest first; `a b -> c` pops `b` then `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Halt with nil
    Stop = 0x00,
    /// `-> int`
    PushInt = 0x01,
    /// `-> str`
    PushStr = 0x02,
    /// `-> true`
    PushTrue = 0x03,
    /// `-> false`
    PushFalse = 0x04,
    /// `-> nil`
    PushNil = 0x05,
    /// `a ->`
    Pop = 0x06,
    /// `a -> a a`
    Dup = 0x07,
    /// `a b -> b a`
    Swap = 0x08,
    /// `a b -> a b a`
    Over = 0x09,

    /// `a b -> a+b`
    Add = 0x10,
    /// `a b -> a-b`
    Sub = 0x11,
    /// `a b -> a*b`
    Mul = 0x12,
    /// `a b -> a/b`
    Div = 0x13,
    /// `a b -> a%b`
    Mod = 0x14,
    /// `a b -> a<b`
    Lt = 0x15,
    /// `a b -> a>b`
    Gt = 0x16,
    /// `a b -> a==b`
    Eq = 0x17,
    /// `a -> !a`
    Not = 0x18,
    /// `a b -> "ab"`
    Concat = 0x19,

    /// Unconditional jump
    Jump = 0x20,
    /// `cond ->`, jump when truthy
    JumpIf = 0x21,
    /// `args.. ->`, enter a function frame
    Call = 0x22,
    /// `ret ->`, leave the frame and push `ret` in the caller
    Ret = 0x23,
    /// `-> args[i]` of the current frame
    Arg = 0x24,
    /// `v ->`, halt returning `v`
    Return = 0x26,
    /// `msg ->`, fail the transaction
    Abort = 0x27,
    /// `cond ->`, abort when falsy
    Assert = 0x28,

    /// `key -> value` in the contract's own scope
    Get = 0x30,
    /// `key value ->` in the contract's own scope
    Put = 0x31,
    /// `scope key -> value`
    GetAt = 0x32,
    /// `scope key value ->`; scope must be the contract or the publisher
    PutAt = 0x33,
    /// `account -> balance`
    Balance = 0x34,
    /// `from to amount ->`; from must be the publisher or the contract
    Transfer = 0x35,
    /// `from amount ->`, publisher funds the contract
    Deposit = 0x36,
    /// `to amount ->`, contract pays out
    Withdraw = 0x37,
    /// `ppm -> bool`, true with probability ppm / 1_000_000
    Random = 0x38,
    /// `-> unix seconds` of the block
    Now = 0x39,
    /// `-> block height`
    Height = 0x3A,
    /// `v ->`, append to the receipt log
    Log = 0x3B,
    /// `-> publisher id`
    Publisher = 0x3C,
    /// `-> contract id`
    ContractId = 0x3D,
}

impl Opcode {
    /// Decode an opcode byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        use Opcode::*;
        Some(match byte {
            0x00 => Stop,
            0x01 => PushInt,
            0x02 => PushStr,
            0x03 => PushTrue,
            0x04 => PushFalse,
            0x05 => PushNil,
            0x06 => Pop,
            0x07 => Dup,
            0x08 => Swap,
            0x09 => Over,
            0x10 => Add,
            0x11 => Sub,
            0x12 => Mul,
            0x13 => Div,
            0x14 => Mod,
            0x15 => Lt,
            0x16 => Gt,
            0x17 => Eq,
            0x18 => Not,
            0x19 => Concat,
            0x20 => Jump,
            0x21 => JumpIf,
            0x22 => Call,
            0x23 => Ret,
            0x24 => Arg,
            0x26 => Return,
            0x27 => Abort,
            0x28 => Assert,
            0x30 => Get,
            0x31 => Put,
            0x32 => GetAt,
            0x33 => PutAt,
            0x34 => Balance,
            0x35 => Transfer,
            0x36 => Deposit,
            0x37 => Withdraw,
            0x38 => Random,
            0x39 => Now,
            0x3A => Height,
            0x3B => Log,
            0x3C => Publisher,
            0x3D => ContractId,
            _ => return None,
        })
    }

    /// Mnemonic, used in type errors
    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            Stop => "STOP",
            PushInt => "PUSH_INT",
            PushStr => "PUSH_STR",
            PushTrue => "PUSH_TRUE",
            PushFalse => "PUSH_FALSE",
            PushNil => "PUSH_NIL",
            Pop => "POP",
            Dup => "DUP",
            Swap => "SWAP",
            Over => "OVER",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            Lt => "LT",
            Gt => "GT",
            Eq => "EQ",
            Not => "NOT",
            Concat => "CONCAT",
            Jump => "JUMP",
            JumpIf => "JUMPIF",
            Call => "CALL",
            Ret => "RET",
            Arg => "ARG",
            Return => "RETURN",
            Abort => "ABORT",
            Assert => "ASSERT",
            Get => "GET",
            Put => "PUT",
            GetAt => "GET_AT",
            PutAt => "PUT_AT",
            Balance => "BALANCE",
            Transfer => "TRANSFER",
            Deposit => "DEPOSIT",
            Withdraw => "WITHDRAW",
            Random => "RANDOM",
            Now => "NOW",
            Height => "HEIGHT",
            Log => "LOG",
            Publisher => "PUBLISHER",
            ContractId => "CONTRACT_ID",
        }
    }
}
