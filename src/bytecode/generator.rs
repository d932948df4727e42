use std::collections::HashMap;

use crate::bytecode::{
    chunk::Chunk,
    compile_error::CompileError,
    emit::{self, Reg},
};

/// Number of addressable registers.
pub const REG_COUNT: usize = 255;
/// Call results are left here by convention. Never handed out by `alloc`.
pub const RETURN_REG: Reg = 0;
/// Highest register; the argument window counts down from here.
pub const LAST_REG: Reg = (REG_COUNT - 1) as Reg;

/// Root scope every name is qualified under.
pub const GLOBAL_SCOPE: &str = "global";

/// Argument register `index` of a call or declaration: 254, 253, ...
pub fn window_reg(index: usize) -> Option<Reg> {
    (index < LAST_REG as usize).then(|| LAST_REG - index as Reg)
}

// =============================================================================
// Register file
// =============================================================================

/// Fixed-size register bit-set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegSet([u64; 4]);

impl RegSet {
    pub fn contains(&self, reg: Reg) -> bool {
        self.0[reg as usize / 64] & (1 << (reg % 64)) != 0
    }

    fn insert(&mut self, reg: Reg) {
        self.0[reg as usize / 64] |= 1 << (reg % 64);
    }

    fn remove(&mut self, reg: Reg) {
        self.0[reg as usize / 64] &= !(1 << (reg % 64));
    }

    fn union(self, other: RegSet) -> RegSet {
        let mut out = self;
        for (word, o) in out.0.iter_mut().zip(other.0) {
            *word |= o;
        }
        out
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Reg> + '_ {
        (0..REG_COUNT as u16)
            .map(|r| r as Reg)
            .filter(|r| self.contains(*r))
    }
}

/// Register allocator.
///
/// Register 0 is permanently taken. Besides the live set, the file records
/// every register handed out since the innermost `begin_frame`, so a
/// function declaration can keep its body's registers reserved: the body
/// writes them on every call, long after generation moved on.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    live: RegSet,
    touched: RegSet,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        let mut live = RegSet::default();
        live.insert(RETURN_REG);
        RegisterFile {
            live,
            touched: RegSet::default(),
        }
    }

    /// Lowest free register, marked live.
    pub fn alloc(&mut self) -> Option<Reg> {
        let reg = (1..=LAST_REG).find(|r| !self.live.contains(*r))?;
        self.live.insert(reg);
        self.touched.insert(reg);
        Some(reg)
    }

    /// Marks a specific register live.
    pub fn reserve(&mut self, reg: Reg) {
        self.live.insert(reg);
    }

    pub fn free(&mut self, reg: Reg) {
        if reg != RETURN_REG {
            self.live.remove(reg);
        }
    }

    pub fn is_free(&self, reg: Reg) -> bool {
        !self.live.contains(reg)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Starts recording allocations. Returns the enclosing frame's record.
    pub fn begin_frame(&mut self) -> RegSet {
        std::mem::take(&mut self.touched)
    }

    /// Re-reserves everything allocated since `begin_frame` and hands the
    /// record back to the enclosing frame.
    pub fn end_frame(&mut self, saved: RegSet) {
        self.live = self.live.union(self.touched);
        self.touched = saved.union(self.touched);
    }
}

// =============================================================================
// Generator
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarBinding {
    pub mutable: bool,
    pub reg: Reg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncEntry {
    pub arity: usize,
    /// Address of the function's first instruction.
    pub entry: usize,
}

/// Generator state captured before an input, so a failed input can be
/// undone without leaving dangling bindings or truncated functions behind.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    vars: HashMap<String, VarBinding>,
    funcs: HashMap<String, FuncEntry>,
    regs: RegisterFile,
    chunk_len: usize,
}

impl Checkpoint {
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }
}

/// Shared state of one compilation unit.
///
/// The interactive driver keeps a single generator alive across inputs, so
/// names declared on one line resolve on the next.
#[derive(Debug)]
pub struct Generator {
    vars: HashMap<String, VarBinding>,
    funcs: HashMap<String, FuncEntry>,
    current_scope: String,
    enclosing_scope: String,
    pub regs: RegisterFile,
    pub chunk: Chunk,
    errors: Vec<CompileError>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Generator {
            vars: HashMap::new(),
            funcs: HashMap::new(),
            current_scope: GLOBAL_SCOPE.to_string(),
            enclosing_scope: GLOBAL_SCOPE.to_string(),
            regs: RegisterFile::new(),
            chunk: Chunk::new(),
            errors: Vec::new(),
        }
    }

    // Scopes

    pub fn current_scope(&self) -> &str {
        &self.current_scope
    }

    pub fn enclosing_scope(&self) -> &str {
        &self.enclosing_scope
    }

    /// `name` qualified under the current scope.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}@{}", self.current_scope, name)
    }

    /// Opens the scope of function `name`. Returns the enclosing scope to
    /// hand back to `leave_scope`.
    pub fn enter_scope(&mut self, name: &str) -> String {
        let inner = self.qualify(name);
        let outer = std::mem::replace(&mut self.current_scope, inner);
        std::mem::replace(&mut self.enclosing_scope, outer)
    }

    pub fn leave_scope(&mut self, saved: String) {
        let outer = std::mem::replace(&mut self.enclosing_scope, saved);
        self.current_scope = outer;
    }

    // Variables

    pub fn var(&self, qualified: &str) -> Option<VarBinding> {
        self.vars.get(qualified).copied()
    }

    /// Looks `name` up in the current scope.
    pub fn lookup_var(&self, name: &str) -> Option<VarBinding> {
        self.var(&self.qualify(name))
    }

    pub fn bind_var(&mut self, qualified: String, binding: VarBinding) {
        self.vars.insert(qualified, binding);
    }

    pub fn unbind_var(&mut self, qualified: &str) -> Option<VarBinding> {
        self.vars.remove(qualified)
    }

    /// Drops every binding qualified under `scope`, nested scopes included.
    /// Returns how many were removed.
    pub fn unbind_scope(&mut self, scope: &str) -> usize {
        let prefix = format!("{}@", scope);
        let before = self.vars.len();
        self.vars.retain(|name, _| !name.starts_with(&prefix));
        before - self.vars.len()
    }

    /// True if some variable currently lives in `reg`.
    pub fn is_bound(&self, reg: Reg) -> bool {
        self.vars.values().any(|b| b.reg == reg)
    }

    /// Every binding, sorted by qualified name.
    pub fn vars(&self) -> Vec<(&str, VarBinding)> {
        let mut vars: Vec<_> = self.vars.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        vars.sort_by(|a, b| a.0.cmp(b.0));
        vars
    }

    // Functions

    pub fn func(&self, qualified: &str) -> Option<FuncEntry> {
        self.funcs.get(qualified).copied()
    }

    pub fn define_func(&mut self, qualified: String, entry: FuncEntry) {
        self.funcs.insert(qualified, entry);
    }

    /// Resolves a callee in the current scope, then in the enclosing one.
    pub fn lookup_func(&self, name: &str) -> Option<(String, FuncEntry)> {
        let local = self.qualify(name);
        if let Some(entry) = self.func(&local) {
            return Some((local, entry));
        }
        let outer = format!("{}@{}", self.enclosing_scope, name);
        self.func(&outer).map(|entry| (outer, entry))
    }

    // Registers

    /// Allocates a register, reporting exhaustion.
    pub fn alloc_reg(&mut self) -> Option<Reg> {
        let reg = self.regs.alloc();
        if reg.is_none() {
            self.report(CompileError::RegistersExhausted);
        }
        reg
    }

    // Code

    /// Backpatches a forward jump.
    pub fn patch(&mut self, index: usize, target: usize) {
        if let Err(err) = self.chunk.patch_jump_target(index, target) {
            self.report(err.into());
        }
    }

    /// Terminates the buffer with `HALT` unless it already is.
    pub fn finish(&mut self) {
        if !self.chunk.ends_with_halt() {
            emit::halt(&mut self.chunk);
        }
    }

    pub fn strip_halt(&mut self) -> bool {
        self.chunk.strip_halt()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            vars: self.vars.clone(),
            funcs: self.funcs.clone(),
            regs: self.regs.clone(),
            chunk_len: self.chunk.len(),
        }
    }

    /// Restores tables and registers and drops the code emitted since
    /// `checkpoint`. Scopes are always back at the root between inputs.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.vars = checkpoint.vars;
        self.funcs = checkpoint.funcs;
        self.regs = checkpoint.regs;
        self.chunk.truncate(checkpoint.chunk_len);
        self.current_scope = GLOBAL_SCOPE.to_string();
        self.enclosing_scope = GLOBAL_SCOPE.to_string();
    }

    // Diagnostics

    pub fn report(&mut self, err: CompileError) {
        log::error!("generate error: {}", err);
        self.errors.push(err);
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<CompileError> {
        std::mem::take(&mut self.errors)
    }
}
