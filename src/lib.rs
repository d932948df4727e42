//! # LMX
//!
//! A small expression language compiled to register bytecode:
//!
//! ```text
//! source ─► tokenize ─► Parser ─► Node ─► generate ─► Chunk ─► VirtualCore
//! ```
//!
//! `run_source` drives the whole pipeline once; `repl::Session` keeps the
//! generator and VM alive across inputs.

pub mod bytecode;
pub mod error;
pub mod frontend;
pub mod lang;
pub mod repl;
pub mod runtime;

use log::trace;

use crate::bytecode::{
    chunk::Chunk,
    compile::generate,
    emit::Reg,
    generator::{Generator, RETURN_REG},
};
use crate::frontend::{lexer::tokenize, parser::Parser};
use crate::lang::node::Node;
use crate::runtime::vm::{VirtualCore, VmConfig};

pub use crate::error::Error;

/// Tokenizes and parses a whole program.
pub fn parse_source(source: &str) -> Result<Node, Error> {
    let tokens = tokenize(source);
    trace!("lexed {} tokens", tokens.len());

    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    if parser.has_error() {
        return Err(Error::Parse(parser.into_errors()));
    }
    trace!("parsed program");
    Ok(program)
}

/// A generated program, terminated by `HALT`.
#[derive(Debug)]
pub struct Compiled {
    pub generator: Generator,
    /// Register holding the value of the last top-level statement.
    pub result: Option<Reg>,
}

impl Compiled {
    pub fn chunk(&self) -> &Chunk {
        &self.generator.chunk
    }
}

/// Lowers a parsed program to bytecode.
pub fn compile_program(program: &Node) -> Result<Compiled, Error> {
    if matches!(program, Node::Program(stmts) if stmts.is_empty()) {
        return Err(Error::EmptyProgram);
    }

    let mut generator = Generator::new();
    let result = generate(program, &mut generator);
    if generator.has_error() {
        return Err(Error::Compile(generator.take_errors()));
    }
    generator.finish();
    trace!("generated {} instructions", generator.chunk.len());

    Ok(Compiled { generator, result })
}

pub fn compile_source(source: &str) -> Result<Compiled, Error> {
    compile_program(&parse_source(source)?)
}

/// State left behind by a finished run.
#[derive(Debug)]
pub struct Execution {
    pub compiled: Compiled,
    pub vm: VirtualCore,
}

impl Execution {
    /// Value of the last top-level statement, or of register 0 when that
    /// statement produced no register.
    pub fn value(&self) -> i64 {
        self.vm
            .look_register(self.compiled.result.unwrap_or(RETURN_REG))
    }

    /// Current value of a top-level variable.
    pub fn var(&self, name: &str) -> Option<i64> {
        self.compiled
            .generator
            .lookup_var(name)
            .map(|binding| self.vm.look_register(binding.reg))
    }
}

pub fn run_compiled(compiled: Compiled, config: VmConfig) -> Result<Execution, Error> {
    let mut vm = VirtualCore::with_config(config);
    vm.run(compiled.chunk())?;
    trace!("halted at {:04}", vm.pc());
    Ok(Execution { compiled, vm })
}

/// Parses, generates and runs `source` from a fresh generator and VM.
pub fn run_source(source: &str) -> Result<Execution, Error> {
    run_compiled(compile_source(source)?, VmConfig::default())
}
