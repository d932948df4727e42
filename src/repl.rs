use std::time::{Duration, Instant};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::bytecode::{
    compile::generate,
    generator::{Generator, RETURN_REG},
};
use crate::error::Error;
use crate::frontend::{lexer::tokenize, parser::Parser};
use crate::lang::node::Node;
use crate::runtime::vm::{VirtualCore, VmConfig};

/// What a line of input produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Blank line or a statement with nothing to show.
    Empty,
    /// Result of running a statement.
    Value { value: i64, elapsed: Duration },
    /// Output of a meta-command.
    Text(String),
    Exit,
}

/// One interactive session: a generator and a VM shared by every line.
///
/// Each statement is appended to the same instruction buffer, followed by a
/// `HALT` that is stripped again once the VM stopped on it, so the next line
/// continues right where this one ended.
pub struct Session {
    generator: Generator,
    vm: VirtualCore,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Session {
            generator: Generator::new(),
            vm: VirtualCore::with_config(config),
        }
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn vm(&self) -> &VirtualCore {
        &self.vm
    }

    pub fn eval_line(&mut self, line: &str) -> Result<Reply, Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Reply::Empty);
        }
        if line.starts_with(':') {
            return self.meta_command(line);
        }
        self.execute(line)
    }

    fn meta_command(&self, line: &str) -> Result<Reply, Error> {
        match line {
            ":exit" => Ok(Reply::Exit),
            ":vars" => {
                let lines: Vec<String> = self
                    .generator
                    .vars()
                    .into_iter()
                    .map(|(name, binding)| {
                        format!("{} = {}", name, self.vm.look_register(binding.reg))
                    })
                    .collect();
                Ok(Reply::Text(lines.join("\n")))
            }
            ":lastret" => Ok(Reply::Text(self.vm.look_register(RETURN_REG).to_string())),
            ":scope" => Ok(Reply::Text(self.generator.current_scope().to_string())),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }

    fn execute(&mut self, line: &str) -> Result<Reply, Error> {
        let mut parser = Parser::new(tokenize(line));
        let program = parser.parse_program();
        if parser.has_error() {
            return Err(Error::Parse(parser.into_errors()));
        }
        let Node::Program(stmts) = &program else {
            return Ok(Reply::Empty);
        };
        let Some(last) = stmts.last() else {
            return Ok(Reply::Empty);
        };

        let checkpoint = self.generator.checkpoint();
        let start_pc = checkpoint.chunk_len();
        let result = generate(&program, &mut self.generator);
        if self.generator.has_error() {
            let errors = self.generator.take_errors();
            self.generator.rollback(checkpoint);
            return Err(Error::Compile(errors));
        }
        self.generator.finish();

        let started = Instant::now();
        if let Err(err) = self.vm.run(&self.generator.chunk) {
            self.generator.rollback(checkpoint);
            self.vm.set_pc(start_pc);
            return Err(err.into());
        }
        let elapsed = started.elapsed();

        let reg = result.unwrap_or(RETURN_REG);
        let value = self.vm.look_register(reg);
        if !last.holds_binding() && !self.generator.is_bound(reg) {
            self.generator.regs.free(reg);
        }
        self.generator.strip_halt();

        Ok(Reply::Value { value, elapsed })
    }
}

/// Interactive loop on the terminal.
pub fn run() {
    println!("LMX - interactive mode");
    println!("Commands: :vars :lastret :scope :exit\n");

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Error: cannot open line editor: {}", e);
            return;
        }
    };
    let mut session = Session::new();

    loop {
        match rl.readline(">>> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match session.eval_line(&line) {
                    Ok(Reply::Empty) => {}
                    Ok(Reply::Value { value, elapsed }) => {
                        println!("{}", value);
                        println!("({:.3} ms)", elapsed.as_secs_f64() * 1000.0);
                    }
                    Ok(Reply::Text(text)) => {
                        if !text.is_empty() {
                            println!("{}", text);
                        }
                    }
                    Ok(Reply::Exit) => break,
                    Err(e) => eprintln!("{}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }
}
