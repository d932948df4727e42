use crate::{
    bytecode::{
        compile_error::CompileError,
        emit::{self, Reg},
        generator::{FuncEntry, Generator, RETURN_REG, VarBinding, window_reg},
    },
    lang::{
        node::{Block, Node},
        op::{BinaryOp, UnaryOp},
    },
};

/// Lowers `node` into `g`'s instruction buffer.
///
/// Returns the register holding the node's value, or `None` for statements
/// and for nodes that failed to generate. Failures are recorded in the
/// generator and generation carries on with the next node.
pub fn generate(node: &Node, g: &mut Generator) -> Option<Reg> {
    match node {
        Node::Program(children) => generate_program(children, g),

        Node::NumberLiteral(value) => {
            let reg = g.alloc_reg()?;
            emit::mov_ri(&mut g.chunk, reg, *value);
            Some(reg)
        }

        Node::Unary { op, operand } => generate_unary(op, operand, g),

        Node::Binary { op, left, right } => generate_binary(op, left, right, g),

        Node::VarDecl {
            name,
            value,
            mutable,
        } => generate_var_decl(name, value, *mutable, g),

        Node::VarRef(name) => match g.lookup_var(name) {
            Some(binding) => Some(binding.reg),
            None => {
                let qualified = g.qualify(name);
                g.report(CompileError::UndefinedVariable(qualified));
                None
            }
        },

        Node::FuncCall { name, args } => generate_call(name, args, g),

        Node::Return(expr) => {
            let reg = generate(expr, g)?;
            emit::mov_rr(&mut g.chunk, RETURN_REG, reg);
            release(expr, reg, g);
            emit::fret(&mut g.chunk);
            Some(RETURN_REG)
        }

        Node::Block(block) => {
            generate_block(block, g);
            None
        }

        Node::FuncDecl { name, params, body } => {
            generate_func_decl(name, params, body, g);
            None
        }

        Node::If {
            condition,
            then_block,
            else_block,
        } => {
            generate_if(condition, then_block, else_block.as_ref(), g);
            None
        }

        Node::RpnExpr(_) => None,
    }
}

/// Generates every statement of `block` and returns the buffer length
/// afterwards, i.e. the address right after the block.
pub fn generate_block(block: &Block, g: &mut Generator) -> usize {
    for stmt in &block.stmts {
        if let Some(reg) = generate(stmt, g) {
            release(stmt, reg, g);
        }
    }
    g.chunk.len()
}

/// Frees a temporary. Registers owned by a variable binding are left alone.
fn release(node: &Node, reg: Reg, g: &mut Generator) {
    if !node.holds_binding() {
        g.regs.free(reg);
    }
}

/// Moves a call result out of register 0 so the next call cannot clobber it.
fn stash_return(reg: Reg, g: &mut Generator) -> Option<Reg> {
    if reg != RETURN_REG {
        return Some(reg);
    }
    let fresh = g.alloc_reg()?;
    emit::mov_rr(&mut g.chunk, fresh, RETURN_REG);
    Some(fresh)
}

fn generate_program(children: &[Node], g: &mut Generator) -> Option<Reg> {
    let mut last = None;
    for (i, child) in children.iter().enumerate() {
        let reg = generate(child, g);
        if i + 1 == children.len() {
            last = reg;
        } else if let Some(reg) = reg {
            release(child, reg, g);
        }
    }
    last
}

fn generate_unary(op: &str, operand: &Node, g: &mut Generator) -> Option<Reg> {
    let Some(op) = UnaryOp::from_text(op) else {
        g.report(CompileError::UnknownOperator(op.to_string()));
        return None;
    };
    let src = generate(operand, g)?;

    match op {
        UnaryOp::Plus => Some(src),
        UnaryOp::Neg => {
            let result = g.alloc_reg()?;
            emit::mov_ri(&mut g.chunk, result, 0);
            emit::sub(&mut g.chunk, result, result, src);
            release(operand, src, g);
            Some(result)
        }
        UnaryOp::Not => {
            let result = g.alloc_reg()?;
            emit::mov_ri(&mut g.chunk, result, 0);
            emit::cmp_eq(&mut g.chunk, result, src, result);
            release(operand, src, g);
            Some(result)
        }
    }
}

fn generate_binary(op: &str, left: &Node, right: &Node, g: &mut Generator) -> Option<Reg> {
    let result = g.alloc_reg()?;

    let lhs = generate(left, g).and_then(|r| stash_return(r, g));
    let rhs = generate(right, g);

    let decoded = BinaryOp::from_text(op);
    if decoded.is_none() {
        g.report(CompileError::UnknownOperator(op.to_string()));
    }

    // A stashed call result is a plain temporary: `release` frees it.
    if let Some(r) = lhs {
        release(left, r, g);
    }
    if let Some(r) = rhs {
        release(right, r, g);
    }

    match (decoded, lhs, rhs) {
        (Some(op), Some(lhs), Some(rhs)) => {
            emit::arith(&mut g.chunk, emit::opcode_for(op), result, lhs, rhs);
            Some(result)
        }
        _ => {
            g.regs.free(result);
            None
        }
    }
}

fn generate_var_decl(name: &str, value: &Node, mutable: bool, g: &mut Generator) -> Option<Reg> {
    let qualified = g.qualify(name);
    if let Some(existing) = g.var(&qualified)
        && !existing.mutable
    {
        g.report(CompileError::ImmutableVariable(qualified));
        return None;
    }

    let reg = generate(value, g)?;
    let reg = stash_return(reg, g)?;
    g.bind_var(qualified, VarBinding { mutable, reg });
    Some(reg)
}

fn generate_call(name: &str, args: &[Node], g: &mut Generator) -> Option<Reg> {
    let Some((qualified, entry)) = g.lookup_func(name) else {
        g.report(CompileError::UndefinedFunction(name.to_string()));
        return None;
    };
    if entry.arity != args.len() {
        g.report(CompileError::ArityMismatch {
            name: qualified,
            expected: entry.arity,
            found: args.len(),
        });
        return None;
    }

    // Evaluate every argument before filling the window, so a nested call
    // cannot overwrite arguments already placed.
    let mut temps = Vec::with_capacity(args.len());
    for arg in args {
        let reg = generate(arg, g).and_then(|r| stash_return(r, g));
        temps.push(reg);
    }
    if temps.iter().any(Option::is_none) {
        for (arg, reg) in args.iter().zip(&temps) {
            if let Some(reg) = reg {
                release(arg, *reg, g);
            }
        }
        return None;
    }

    let Some(slots) = (0..args.len()).map(window_reg).collect::<Option<Vec<Reg>>>() else {
        g.report(CompileError::RegistersExhausted);
        return None;
    };

    // Window moves run in order, so a source sitting in a slot written by an
    // earlier move (a caller's own parameter) is copied out first.
    let mut sources = Vec::with_capacity(args.len());
    let mut copied = Vec::new();
    for (i, (arg, reg)) in args.iter().zip(temps).enumerate() {
        let reg = reg?;
        if slots[..i].contains(&reg) {
            let fresh = g.alloc_reg()?;
            emit::mov_rr(&mut g.chunk, fresh, reg);
            copied.push((arg, reg));
            sources.push((fresh, true));
        } else {
            sources.push((reg, !arg.holds_binding()));
        }
    }

    for (slot, (reg, temporary)) in slots.into_iter().zip(sources) {
        emit::mov_rr(&mut g.chunk, slot, reg);
        if temporary {
            g.regs.free(reg);
        }
    }
    for (arg, reg) in copied {
        release(arg, reg, g);
    }

    emit::fcall(&mut g.chunk, entry.entry as i64);
    Some(RETURN_REG)
}

fn generate_func_decl(name: &str, params: &[String], body: &Block, g: &mut Generator) {
    let skip = emit::jmp(&mut g.chunk, 0);

    let qualified = g.qualify(name);
    if g.func(&qualified).is_some() {
        g.report(CompileError::DuplicateFunction(qualified));
        g.patch(skip, skip + 1);
        return;
    }
    if window_reg(params.len().saturating_sub(1)).is_none() {
        g.report(CompileError::RegistersExhausted);
        g.patch(skip, skip + 1);
        return;
    }

    let saved_scope = g.enter_scope(name);
    g.define_func(
        qualified,
        FuncEntry {
            arity: params.len(),
            entry: skip + 1,
        },
    );
    log::trace!("function {} at {}", g.current_scope(), skip + 1);

    let frame = g.regs.begin_frame();
    let mut bound = Vec::with_capacity(params.len());
    for (i, param) in params.iter().enumerate() {
        if let Some(reg) = window_reg(i) {
            g.regs.reserve(reg);
            let qualified = g.qualify(param);
            g.bind_var(qualified, VarBinding { mutable: true, reg });
            bound.push(reg);
        }
    }

    generate_block(body, g);
    emit::fret(&mut g.chunk);
    let end = g.chunk.len();
    g.patch(skip, end);

    for reg in bound {
        g.regs.free(reg);
    }
    // Body locals go out of scope; their registers stay reserved by the frame.
    let scope = g.current_scope().to_string();
    g.unbind_scope(&scope);
    g.regs.end_frame(frame);
    g.leave_scope(saved_scope);
}

fn generate_if(condition: &Node, then_block: &Block, else_block: Option<&Block>, g: &mut Generator) {
    let Some(cond) = generate(condition, g) else {
        return;
    };
    let branch = emit::if_true(&mut g.chunk, cond, 0);
    release(condition, cond, g);
    let skip = emit::jmp(&mut g.chunk, 0);

    let then_start = g.chunk.len();
    g.patch(branch, then_start);

    let then_end = generate_block(then_block, g);
    g.patch(skip, then_end);

    if else_block.is_some() {
        log::warn!("else branch is not compiled; it never runs under the VM");
    }
}
