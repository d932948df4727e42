use crate::bytecode::{
    chunk::Chunk,
    emit::Reg,
    generator::REG_COUNT,
    op::{Instruction, Opcode},
};
use crate::lang::{
    op::{ArithError, BinaryOp},
    value::Value,
};
use crate::runtime::runtime_error::RuntimeError;

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub max_call_depth: usize,
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 1000,
            max_steps: None,
        }
    }
}

/// Register machine executing a `Chunk`.
///
/// Registers, the program counter and the return stack survive between
/// `run` calls: the interactive driver appends code to the same chunk and
/// resumes from where the previous `HALT` stopped.
#[derive(Debug)]
pub struct VirtualCore {
    registers: [Value; REG_COUNT],
    pc: usize,
    return_stack: Vec<usize>,
    // Safety limits
    config: VmConfig,
    steps: usize,
}

impl Default for VirtualCore {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualCore {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            registers: [Value::default(); REG_COUNT],
            pc: 0,
            return_stack: Vec::new(),
            config,
            steps: 0,
        }
    }

    /// Clears registers, program counter and return stack.
    pub fn reset(&mut self) {
        self.registers = [Value::default(); REG_COUNT];
        self.pc = 0;
        self.return_stack.clear();
        self.steps = 0;
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Moves the program counter, dropping any pending returns.
    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
        self.return_stack.clear();
    }

    /// Integer view of register `reg`. Out-of-range indices read as 0.
    pub fn look_register(&self, reg: Reg) -> i64 {
        self.registers.get(reg as usize).map_or(0, Value::as_i64)
    }

    pub fn register(&self, reg: Reg) -> Option<&Value> {
        self.registers.get(reg as usize)
    }

    pub fn return_depth(&self) -> usize {
        self.return_stack.len()
    }

    /// Executes from the current program counter until `HALT`.
    ///
    /// `HALT` leaves the program counter on itself.
    pub fn run(&mut self, chunk: &Chunk) -> Result<(), RuntimeError> {
        self.steps = 0;
        log::trace!("vm: run from {:04} ({} instructions)", self.pc, chunk.len());

        loop {
            let pc = self.pc;
            let ins = *chunk.get(pc).ok_or(RuntimeError::PcOutOfRange {
                pc,
                len: chunk.len(),
            })?;
            self.check_limits()?;

            match ins.opcode {
                Opcode::Halt => return Ok(()),

                Opcode::MovRi => {
                    let dst = self.reg_index(pc, ins.reg(0))?;
                    self.registers[dst] = Value::Integer(ins.imm(1));
                    self.pc += 1;
                }
                Opcode::MovRr => {
                    let dst = self.reg_index(pc, ins.reg(0))?;
                    let src = self.reg_index(pc, ins.reg(1))?;
                    self.registers[dst] = self.registers[src];
                    self.pc += 1;
                }

                Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Pow
                | Opcode::CmpGe
                | Opcode::CmpLt
                | Opcode::CmpLe
                | Opcode::CmpGt
                | Opcode::CmpEq
                | Opcode::CmpNe => {
                    let dst = self.reg_index(pc, ins.reg(0))?;
                    let value = self.apply(pc, &ins, ins.reg(1), ins.reg(2))?;
                    self.registers[dst] = Value::Integer(value);
                    self.pc += 1;
                }

                Opcode::Blt
                | Opcode::Ble
                | Opcode::Bgt
                | Opcode::Bge
                | Opcode::Beq
                | Opcode::Bne => {
                    if self.apply(pc, &ins, ins.reg(0), ins.reg(1))? != 0 {
                        self.jump(pc, ins.imm(2))?;
                    } else {
                        self.pc += 1;
                    }
                }

                Opcode::Jmp => self.jump(pc, ins.imm(0))?,

                Opcode::IfTrue | Opcode::IfFalse => {
                    let cond = self.reg_index(pc, ins.reg(0))?;
                    let truthy = self.registers[cond].is_truthy();
                    if truthy == (ins.opcode == Opcode::IfTrue) {
                        self.jump(pc, ins.imm(1))?;
                    } else {
                        self.pc += 1;
                    }
                }

                Opcode::FCall => {
                    if self.return_stack.len() >= self.config.max_call_depth {
                        return Err(RuntimeError::CallDepthExceeded {
                            pc,
                            limit: self.config.max_call_depth,
                        });
                    }
                    self.return_stack.push(pc + 1);
                    self.jump(pc, ins.imm(0))?;
                }
                Opcode::FRet => {
                    self.pc = self
                        .return_stack
                        .pop()
                        .ok_or(RuntimeError::ReturnStackUnderflow { pc })?;
                }

                Opcode::DebugLog => {
                    let raw = ins.imm(0);
                    let value = usize::try_from(raw)
                        .ok()
                        .and_then(|r| self.registers.get(r))
                        .ok_or(RuntimeError::BadRegister { pc, reg: raw })?;
                    log::debug!("r{} = {}", raw, value);
                    self.pc += 1;
                }

                Opcode::MovRm
                | Opcode::MovRc
                | Opcode::MovMi
                | Opcode::MovMm
                | Opcode::MovMr
                | Opcode::MovMc => {
                    return Err(RuntimeError::ReservedOpcode {
                        pc,
                        opcode: ins.opcode,
                    });
                }
            }
        }
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps
            && self.steps > max
        {
            return Err(RuntimeError::StepLimitExceeded { limit: max });
        }

        Ok(())
    }

    fn reg_index(&self, pc: usize, reg: Reg) -> Result<usize, RuntimeError> {
        let index = reg as usize;
        if index < REG_COUNT {
            Ok(index)
        } else {
            Err(RuntimeError::BadRegister {
                pc,
                reg: i64::from(reg),
            })
        }
    }

    fn jump(&mut self, pc: usize, target: i64) -> Result<(), RuntimeError> {
        self.pc = usize::try_from(target).map_err(|_| RuntimeError::BadJumpTarget { pc, target })?;
        Ok(())
    }

    /// Applies the operator behind `ins.opcode` to two registers.
    fn apply(&self, pc: usize, ins: &Instruction, lhs: Reg, rhs: Reg) -> Result<i64, RuntimeError> {
        let a = self.registers[self.reg_index(pc, lhs)?].as_i64();
        let b = self.registers[self.reg_index(pc, rhs)?].as_i64();
        let op = binary_op(ins.opcode).ok_or(RuntimeError::ReservedOpcode {
            pc,
            opcode: ins.opcode,
        })?;
        op.apply(a, b).map_err(|err| match err {
            ArithError::DivisionByZero => RuntimeError::DivisionByZero { pc },
            ArithError::ModuloByZero => RuntimeError::ModuloByZero { pc },
            ArithError::ZeroToNegativePower => RuntimeError::ZeroToNegativePower { pc },
        })
    }
}

/// Operator computed by an arithmetic, comparison or compare-and-branch
/// opcode.
fn binary_op(opcode: Opcode) -> Option<BinaryOp> {
    let op = match opcode {
        Opcode::Add => BinaryOp::Add,
        Opcode::Sub => BinaryOp::Sub,
        Opcode::Mul => BinaryOp::Mul,
        Opcode::Div => BinaryOp::Div,
        Opcode::Mod => BinaryOp::Mod,
        Opcode::Pow => BinaryOp::Pow,
        Opcode::CmpLt | Opcode::Blt => BinaryOp::Lt,
        Opcode::CmpLe | Opcode::Ble => BinaryOp::Le,
        Opcode::CmpGt | Opcode::Bgt => BinaryOp::Gt,
        Opcode::CmpGe | Opcode::Bge => BinaryOp::Ge,
        Opcode::CmpEq | Opcode::Beq => BinaryOp::Eq,
        Opcode::CmpNe | Opcode::Bne => BinaryOp::Ne,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::emit;

    fn run_chunk(chunk: &Chunk) -> Result<VirtualCore, RuntimeError> {
        let mut vm = VirtualCore::new();
        vm.run(chunk)?;
        Ok(vm)
    }

    fn arith_chunk(opcode: Opcode, a: i64, b: i64) -> Chunk {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, a);
        emit::mov_ri(&mut chunk, 2, b);
        emit::arith(&mut chunk, opcode, 3, 1, 2);
        emit::halt(&mut chunk);
        chunk
    }

    fn eval_op(opcode: Opcode, a: i64, b: i64) -> Result<i64, RuntimeError> {
        Ok(run_chunk(&arith_chunk(opcode, a, b))?.look_register(3))
    }

    #[test]
    fn test_mov() {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 5, -42);
        emit::mov_rr(&mut chunk, 6, 5);
        emit::halt(&mut chunk);
        let vm = run_chunk(&chunk).unwrap();
        assert_eq!(vm.look_register(5), -42);
        assert_eq!(vm.look_register(6), -42);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_op(Opcode::Add, 2, 3).unwrap(), 5);
        assert_eq!(eval_op(Opcode::Sub, 2, 3).unwrap(), -1);
        assert_eq!(eval_op(Opcode::Mul, 6, 7).unwrap(), 42);
        assert_eq!(eval_op(Opcode::Div, 7, 2).unwrap(), 3);
        assert_eq!(eval_op(Opcode::Div, -7, 2).unwrap(), -3);
        assert_eq!(eval_op(Opcode::Mod, 7, 2).unwrap(), 1);
        assert_eq!(eval_op(Opcode::Pow, 2, 10).unwrap(), 1024);
    }

    #[test]
    fn test_wrapping_add() {
        assert_eq!(eval_op(Opcode::Add, i64::MAX, 1).unwrap(), i64::MIN);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval_op(Opcode::CmpLt, 1, 2).unwrap(), 1);
        assert_eq!(eval_op(Opcode::CmpLt, 2, 1).unwrap(), 0);
        assert_eq!(eval_op(Opcode::CmpLe, 2, 2).unwrap(), 1);
        assert_eq!(eval_op(Opcode::CmpGt, 3, 2).unwrap(), 1);
        assert_eq!(eval_op(Opcode::CmpGe, 1, 2).unwrap(), 0);
        assert_eq!(eval_op(Opcode::CmpEq, 4, 4).unwrap(), 1);
        assert_eq!(eval_op(Opcode::CmpNe, 4, 4).unwrap(), 0);
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(
            eval_op(Opcode::Div, 1, 0),
            Err(RuntimeError::DivisionByZero { pc: 2 })
        );
        assert_eq!(
            eval_op(Opcode::Mod, 1, 0),
            Err(RuntimeError::ModuloByZero { pc: 2 })
        );
    }

    #[test]
    fn test_halt_keeps_pc() {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, 1);
        emit::halt(&mut chunk);
        let mut vm = VirtualCore::new();
        vm.run(&chunk).unwrap();
        assert_eq!(vm.pc(), 1);

        // Resume after replacing the halt with more code.
        chunk.strip_halt();
        emit::mov_ri(&mut chunk, 2, 2);
        emit::halt(&mut chunk);
        vm.run(&chunk).unwrap();
        assert_eq!(vm.look_register(1), 1);
        assert_eq!(vm.look_register(2), 2);
        assert_eq!(vm.pc(), 2);
    }

    #[test]
    fn test_if_true_and_if_false() {
        // r1 = 1; IF_TRUE r1 -> 3; r2 = 10; r3 = 20; IF_FALSE r1 -> 6; r4 = 30; HALT
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, 1);
        emit::if_true(&mut chunk, 1, 3);
        emit::mov_ri(&mut chunk, 2, 10);
        emit::mov_ri(&mut chunk, 3, 20);
        emit::if_false(&mut chunk, 1, 6);
        emit::mov_ri(&mut chunk, 4, 30);
        emit::halt(&mut chunk);

        let vm = run_chunk(&chunk).unwrap();
        assert_eq!(vm.look_register(2), 0);
        assert_eq!(vm.look_register(3), 20);
        assert_eq!(vm.look_register(4), 30);
    }

    #[test]
    fn test_compare_and_branch() {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, 1);
        emit::mov_ri(&mut chunk, 2, 2);
        emit::branch(&mut chunk, Opcode::Blt, 1, 2, 5);
        emit::mov_ri(&mut chunk, 3, 99);
        emit::halt(&mut chunk);
        emit::branch(&mut chunk, Opcode::Beq, 1, 2, 3);
        emit::mov_ri(&mut chunk, 4, 7);
        emit::halt(&mut chunk);

        let vm = run_chunk(&chunk).unwrap();
        assert_eq!(vm.look_register(3), 0);
        assert_eq!(vm.look_register(4), 7);
    }

    #[test]
    fn test_call_and_return() {
        // JMP 4; [1] r0 = r254 * r254; FRET; FRET; [4] r254 = 9; FCALL 1; HALT
        let mut chunk = Chunk::new();
        emit::jmp(&mut chunk, 4);
        emit::mul(&mut chunk, 0, 254, 254);
        emit::fret(&mut chunk);
        emit::fret(&mut chunk);
        emit::mov_ri(&mut chunk, 254, 9);
        emit::fcall(&mut chunk, 1);
        emit::halt(&mut chunk);

        let vm = run_chunk(&chunk).unwrap();
        assert_eq!(vm.look_register(0), 81);
        assert_eq!(vm.return_depth(), 0);
    }

    #[test]
    fn test_return_stack_underflow() {
        let mut chunk = Chunk::new();
        emit::fret(&mut chunk);
        assert_eq!(
            run_chunk(&chunk).err(),
            Some(RuntimeError::ReturnStackUnderflow { pc: 0 })
        );
    }

    #[test]
    fn test_pc_out_of_range() {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, 1);
        assert_eq!(
            run_chunk(&chunk).err(),
            Some(RuntimeError::PcOutOfRange { pc: 1, len: 1 })
        );
    }

    #[test]
    fn test_negative_jump_target() {
        let mut chunk = Chunk::new();
        emit::jmp(&mut chunk, -1);
        assert_eq!(
            run_chunk(&chunk).err(),
            Some(RuntimeError::BadJumpTarget { pc: 0, target: -1 })
        );
    }

    #[test]
    fn test_bad_register() {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 255, 1);
        assert!(matches!(
            run_chunk(&chunk),
            Err(RuntimeError::BadRegister { pc: 0, reg: 255 })
        ));

        let mut ins = Instruction::new(Opcode::DebugLog);
        ins.set_imm(0, 1000);
        let mut chunk = Chunk::new();
        chunk.push(ins);
        assert!(matches!(
            run_chunk(&chunk),
            Err(RuntimeError::BadRegister { reg: 1000, .. })
        ));
    }

    #[test]
    fn test_debug_log_continues() {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, 5);
        emit::debug_log(&mut chunk, 1);
        emit::halt(&mut chunk);
        let vm = run_chunk(&chunk).unwrap();
        assert_eq!(vm.pc(), 2);
    }

    #[test]
    fn test_reserved_opcode_rejected() {
        let mut chunk = Chunk::new();
        chunk.push(Instruction::new(Opcode::MovRm));
        assert_eq!(
            run_chunk(&chunk).err(),
            Some(RuntimeError::ReservedOpcode {
                pc: 0,
                opcode: Opcode::MovRm
            })
        );
    }

    #[test]
    fn test_call_depth_limit() {
        // [0] FCALL 0
        let mut chunk = Chunk::new();
        emit::fcall(&mut chunk, 0);
        let mut vm = VirtualCore::with_config(VmConfig {
            max_call_depth: 16,
            max_steps: None,
        });
        assert_eq!(
            vm.run(&chunk).err(),
            Some(RuntimeError::CallDepthExceeded { pc: 0, limit: 16 })
        );
    }

    #[test]
    fn test_step_limit() {
        let mut chunk = Chunk::new();
        emit::jmp(&mut chunk, 0);
        let mut vm = VirtualCore::with_config(VmConfig {
            max_steps: Some(100),
            ..VmConfig::default()
        });
        assert_eq!(
            vm.run(&chunk).err(),
            Some(RuntimeError::StepLimitExceeded { limit: 100 })
        );
    }

    #[test]
    fn test_reset() {
        let mut vm = run_chunk(&arith_chunk(Opcode::Add, 1, 2)).unwrap();
        vm.reset();
        assert_eq!(vm.pc(), 0);
        assert_eq!(vm.look_register(3), 0);
    }
}
