//! Bytecode interpreter

use crate::context::{CallContext, ExecutionContext, Limits};
use crate::error::{TimeoutReason, VmError, VmResult};
use crate::executor::{ExecOutput, Executor};
use crate::gas;
use crate::host::Host;
use crate::opcode::Opcode;
use crate::program::{Instr, Program};
use crate::random::{draw, RANDOM_SCALE};
use pob_primitives::{AccountId, Amount, Gas};
use pob_state::{Value, BALANCE_CATEGORY};
use pob_types::Contract;
use tracing::debug;

/// Default [`Executor`]: decodes the contract code and runs it on a value
/// stack. Stateless, so one instance serves every verification.
#[derive(Clone, Copy, Debug, Default)]
pub struct Interpreter;

impl Interpreter {
    /// Create an interpreter
    pub fn new() -> Self {
        Self
    }
}

impl Executor for Interpreter {
    fn run(
        &self,
        contract: &Contract,
        call: &CallContext,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        limits: &Limits,
    ) -> VmResult<ExecOutput> {
        let program = Program::decode(&contract.code)?;
        let mut machine = Machine {
            program: &program,
            host,
            call,
            ctx,
            limits,
            stack: Vec::new(),
            frames: Vec::new(),
            gas_used: 0,
            steps: 0,
            draws: 0,
            logs: Vec::new(),
        };
        let result = machine.execute();
        debug!(
            contract = %call.contract,
            gas_used = machine.gas_used,
            steps = machine.steps,
            ok = result.is_ok(),
            "contract run finished"
        );
        let return_value = result?;
        Ok(ExecOutput {
            gas_used: machine.gas_used,
            return_value,
            logs: machine.logs,
        })
    }
}

/// Active function call
struct Frame {
    /// Instruction to resume at
    ret: usize,
    /// Stack height below the arguments
    base: usize,
    args: Vec<Value>,
}

struct Machine<'a> {
    program: &'a Program,
    host: &'a mut dyn Host,
    call: &'a CallContext,
    ctx: &'a ExecutionContext,
    limits: &'a Limits,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    gas_used: Gas,
    steps: u64,
    draws: u64,
    logs: Vec<String>,
}

impl Machine<'_> {
    fn execute(&mut self) -> VmResult<Value> {
        let program = self.program;
        let mut pc = 0;
        loop {
            if self.limits.expired() {
                return Err(VmError::Timeout(TimeoutReason::WallClock));
            }
            if self.steps >= self.limits.max_steps {
                return Err(VmError::Timeout(TimeoutReason::StepLimit(self.limits.max_steps)));
            }
            self.steps += 1;

            // Running off the end halts like STOP
            let Some(instr) = program.get(pc) else {
                return Ok(Value::Nil);
            };
            let op = instr.opcode();
            self.use_gas(gas::static_gas(op))?;
            pc += 1;

            match instr {
                Instr::PushInt(v) => self.push(Value::Int(*v))?,
                Instr::PushStr(s) => {
                    self.use_gas(gas::byte_gas(s.len()))?;
                    self.push(Value::Str(s.clone()))?;
                }
                Instr::Jump(target) => pc = *target,
                Instr::JumpIf(target) => {
                    if self.pop()?.is_truthy() {
                        pc = *target;
                    }
                }
                Instr::Call { target, argc } => {
                    if self.frames.len() >= self.limits.max_call_depth {
                        return Err(VmError::Timeout(TimeoutReason::CallDepth(self.limits.max_call_depth)));
                    }
                    let base = self
                        .stack
                        .len()
                        .checked_sub(*argc as usize)
                        .ok_or(VmError::StackUnderflow)?;
                    let args = self.stack.split_off(base);
                    self.frames.push(Frame { ret: pc, base, args });
                    pc = *target;
                }
                Instr::Arg(i) => {
                    let value = self
                        .frames
                        .last()
                        .and_then(|f| f.args.get(*i as usize))
                        .cloned()
                        .ok_or(VmError::BadArgument(*i))?;
                    self.push(value)?;
                }
                Instr::Plain(Opcode::Stop) => return Ok(Value::Nil),
                Instr::Plain(Opcode::Return) => return self.pop(),
                Instr::Plain(Opcode::Ret) => {
                    let value = self.pop()?;
                    let frame = self.frames.pop().ok_or(VmError::ReturnOutsideCall)?;
                    self.stack.truncate(frame.base);
                    self.push(value)?;
                    pc = frame.ret;
                }
                Instr::Plain(op) => self.step(*op)?,
            }
        }
    }

    /// Instructions that neither branch nor halt
    fn step(&mut self, op: Opcode) -> VmResult<()> {
        match op {
            Opcode::PushTrue => self.push(Value::Bool(true)),
            Opcode::PushFalse => self.push(Value::Bool(false)),
            Opcode::PushNil => self.push(Value::Nil),
            Opcode::Pop => self.pop().map(drop),
            Opcode::Dup => {
                let top = self.peek(0)?;
                self.push(top)
            }
            Opcode::Over => {
                let second = self.peek(1)?;
                self.push(second)
            }
            Opcode::Swap => {
                let len = self.stack.len();
                if len < 2 {
                    return Err(VmError::StackUnderflow);
                }
                self.stack.swap(len - 1, len - 2);
                Ok(())
            }

            Opcode::Add => self.arith(op, i128::checked_add),
            Opcode::Sub => self.arith(op, i128::checked_sub),
            Opcode::Mul => self.arith(op, i128::checked_mul),
            Opcode::Div | Opcode::Mod => {
                let b = self.pop_int(op)?;
                let a = self.pop_int(op)?;
                if b == 0 {
                    return Err(VmError::DivisionByZero);
                }
                let r = if op == Opcode::Div { a.checked_div(b) } else { a.checked_rem(b) };
                self.push(Value::Int(r.ok_or(VmError::Overflow)?))
            }
            Opcode::Lt | Opcode::Gt => {
                let b = self.pop_int(op)?;
                let a = self.pop_int(op)?;
                self.push(Value::Bool(if op == Opcode::Lt { a < b } else { a > b }))
            }
            Opcode::Eq => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(a == b))
            }
            Opcode::Not => {
                let a = self.pop()?;
                self.push(Value::Bool(!a.is_truthy()))
            }
            Opcode::Concat => {
                let b = self.pop()?;
                let a = self.pop()?;
                let len = rendered_len(op, &a)?.saturating_add(rendered_len(op, &b)?);
                self.use_gas(gas::byte_gas(len))?;
                let s = render(op, &a)? + &render(op, &b)?;
                self.push(Value::Str(s))
            }

            Opcode::Abort => {
                let msg = self.pop()?;
                Err(VmError::Abort(describe(&msg)))
            }
            Opcode::Assert => {
                if self.pop()?.is_truthy() {
                    Ok(())
                } else {
                    Err(VmError::Abort("assertion failed".into()))
                }
            }

            Opcode::Get => {
                let key = self.pop_key(op)?;
                let value = self.host.get(self.call.contract.as_str(), &key)?;
                self.push(value)
            }
            Opcode::Put => {
                let value = self.pop()?;
                let key = self.pop_key(op)?;
                let scope = self.call.contract.clone();
                self.write(&scope, &key, value)
            }
            Opcode::GetAt => {
                let key = self.pop_key(op)?;
                let scope = self.pop_key(op)?;
                let value = self.host.get(&scope, &key)?;
                self.push(value)
            }
            Opcode::PutAt => {
                let value = self.pop()?;
                let key = self.pop_key(op)?;
                let scope = self.pop_account(op)?;
                self.write(&scope, &key, value)
            }
            Opcode::Balance => {
                let account = self.pop_account(op)?;
                let balance = self.host.balance(&account)?;
                self.push(Value::Int(balance))
            }
            Opcode::Transfer => {
                let amount = self.pop_int(op)?;
                let to = self.pop_account(op)?;
                let from = self.pop_account(op)?;
                if from != self.call.publisher && from != self.call.contract {
                    return Err(VmError::Unauthorized(format!("transfer from {from}")));
                }
                self.host.transfer(&from, &to, amount)
            }
            Opcode::Deposit => {
                let amount = self.pop_int(op)?;
                let from = self.pop_account(op)?;
                if from != self.call.publisher {
                    return Err(VmError::Unauthorized(format!("deposit from {from}")));
                }
                let contract = self.call.contract.clone();
                self.host.transfer(&from, &contract, amount)
            }
            Opcode::Withdraw => {
                let amount = self.pop_int(op)?;
                let to = self.pop_account(op)?;
                let contract = self.call.contract.clone();
                self.host.transfer(&contract, &to, amount)
            }
            Opcode::Random => {
                let ppm = self.pop_int(op)?;
                let value = draw(&self.ctx.parent_hash, &self.call.tx_hash, self.draws);
                self.draws += 1;
                let hit = ppm > 0 && (ppm >= RANDOM_SCALE as i128 || (value as i128) < ppm);
                self.push(Value::Bool(hit))
            }
            Opcode::Now => self.push(Value::Int(self.ctx.timestamp as i128)),
            Opcode::Height => self.push(Value::Int(self.ctx.block_height as i128)),
            Opcode::Log => {
                let entry = describe(&self.pop()?);
                self.use_gas(gas::log_gas(entry.len()))?;
                self.logs.push(entry);
                Ok(())
            }
            Opcode::Publisher => self.push(Value::Str(self.call.publisher.to_string())),
            Opcode::ContractId => self.push(Value::Str(self.call.contract.to_string())),

            // Carry immediates or control flow; decoded into other `Instr`s
            Opcode::Stop
            | Opcode::Return
            | Opcode::Ret
            | Opcode::PushInt
            | Opcode::PushStr
            | Opcode::Jump
            | Opcode::JumpIf
            | Opcode::Call
            | Opcode::Arg => Err(VmError::InvalidOpcode(op as u8)),
        }
    }

    /// Write into a scope the contract may modify: its own or the publisher's
    fn write(&mut self, scope: &AccountId, key: &str, value: Value) -> VmResult<()> {
        if scope.as_str() == BALANCE_CATEGORY {
            return Err(VmError::Unauthorized("balances are only changed by transfers".into()));
        }
        if *scope != self.call.contract && *scope != self.call.publisher {
            return Err(VmError::Unauthorized(format!("write to scope {scope}")));
        }
        self.use_gas(gas::write_gas(value.to_bytes().len()))?;
        self.host.put(scope.as_str(), key, value)
    }

    fn use_gas(&mut self, amount: Gas) -> VmResult<()> {
        let used = self.gas_used.saturating_add(amount);
        if used > self.limits.gas_limit {
            self.gas_used = self.limits.gas_limit;
            return Err(VmError::OutOfGas { limit: self.limits.gas_limit });
        }
        self.gas_used = used;
        Ok(())
    }

    fn push(&mut self, value: Value) -> VmResult<()> {
        if self.stack.len() >= self.limits.max_stack {
            return Err(VmError::Timeout(TimeoutReason::StackDepth(self.limits.max_stack)));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> VmResult<Value> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    fn peek(&self, depth: usize) -> VmResult<Value> {
        let len = self.stack.len();
        if depth >= len {
            return Err(VmError::StackUnderflow);
        }
        Ok(self.stack[len - 1 - depth].clone())
    }

    fn pop_int(&mut self, op: Opcode) -> VmResult<Amount> {
        match self.pop()? {
            Value::Int(v) => Ok(v),
            other => Err(mismatch(op, "int", &other)),
        }
    }

    fn pop_key(&mut self, op: Opcode) -> VmResult<String> {
        match self.pop()? {
            Value::Str(s) => Ok(s),
            Value::Int(v) => Ok(v.to_string()),
            other => Err(mismatch(op, "str", &other)),
        }
    }

    fn pop_account(&mut self, op: Opcode) -> VmResult<AccountId> {
        let id = match self.pop()? {
            Value::Str(s) => s,
            other => return Err(mismatch(op, "str", &other)),
        };
        AccountId::parse(&id).map_err(|e| VmError::InvalidAccount(e.to_string()))
    }

    fn arith(&mut self, op: Opcode, f: fn(i128, i128) -> Option<i128>) -> VmResult<()> {
        let b = self.pop_int(op)?;
        let a = self.pop_int(op)?;
        self.push(Value::Int(f(a, b).ok_or(VmError::Overflow)?))
    }
}

fn mismatch(op: Opcode, expected: &'static str, found: &Value) -> VmError {
    VmError::TypeMismatch {
        op: op.name(),
        expected,
        found: found.type_name(),
    }
}

/// String form used by `CONCAT`
fn render(op: Opcode, value: &Value) -> VmResult<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Int(v) => Ok(v.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(mismatch(op, "str", other)),
    }
}

/// Length of [`render`]'s output, without building it
fn rendered_len(op: Opcode, value: &Value) -> VmResult<usize> {
    match value {
        Value::Str(s) => Ok(s.len()),
        Value::Int(v) => Ok(v.to_string().len()),
        Value::Bool(b) => Ok(if *b { 4 } else { 5 }),
        other => Err(mismatch(op, "str", other)),
    }
}

/// String form used by `LOG` and `ABORT`
fn describe(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Int(v) => v.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}
