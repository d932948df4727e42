use std::{env, fs, process};

use lmx::bytecode::chunk::Chunk;
use lmx::bytecode::disasm::{print_chunk, print_chunk_stats};
use lmx::frontend::lexer::tokenize;
use lmx::frontend::token_dumper::TokenDumper;
use lmx::runtime::vm::{VirtualCore, VmConfig};
use lmx::{Error, compile_program, parse_source, repl, run_compiled};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let tokens_only = args.contains(&"--tokens".to_string());
    let no_color = args.contains(&"--no-color".to_string());
    let pretty = args.contains(&"--pretty".to_string());
    let ast = args.contains(&"--ast".to_string());
    let bytecode = args.contains(&"--bc".to_string()) || args.contains(&"--bytecode".to_string());
    let stats = args.contains(&"--stats".to_string());
    let help = args.contains(&"--help".to_string()) || args.contains(&"-h".to_string());
    let emit = flag_value(&args, "--emit");
    let image = flag_value(&args, "--image");

    if help {
        print_usage();
        return;
    }

    let result = if let Some(image) = image {
        run_image(image, bytecode, stats)
    } else {
        // first non-flag argument that isn't a flag's value is the filename
        match find_filename(&args) {
            Some(filename) => match fs::read_to_string(filename) {
                Ok(source) if tokens_only => {
                    dump_tokens(&source, no_color, pretty);
                    Ok(())
                }
                Ok(source) => run_program(&source, ast, bytecode, stats, emit),
                Err(e) => {
                    eprintln!("Failed to read '{}': {}", filename, e);
                    process::exit(1);
                }
            },
            None if args.len() == 1 => {
                repl::run();
                Ok(())
            }
            None => {
                print_usage();
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(e.exit_code());
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn find_filename(args: &[String]) -> Option<&str> {
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--emit" || arg == "--image" {
            skip_next = true;
            continue;
        }
        if !arg.starts_with('-') {
            return Some(arg);
        }
    }
    None
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) {
    let tokens = tokenize(source);

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if pretty {
        dumper = dumper.pretty();
    }

    dumper.dump(&tokens);
}

fn print_usage() {
    println!("LMX - register bytecode language");
    println!();
    println!("Usage:");
    println!("  lmx                          Start interactive mode");
    println!("  lmx <file>                   Run a program");
    println!("  lmx --tokens <file>          Show tokens only (--no-color, --pretty)");
    println!("  lmx --ast <file>             Print the syntax tree");
    println!("  lmx --bc <file>              Print bytecode before running (--stats)");
    println!("  lmx <file> --emit <out>      Write a bytecode image instead of running");
    println!("  lmx --image <file>           Run a bytecode image");
    println!("  lmx --help, -h               Show this help");
}

fn run_program(
    source: &str,
    ast: bool,
    bytecode: bool,
    stats: bool,
    emit: Option<&str>,
) -> Result<(), Error> {
    let program = parse_source(source)?;

    // AST printing mode (does not run)
    if ast {
        println!("{:#?}", program);
        return Ok(());
    }

    let compiled = compile_program(&program)?;

    if bytecode {
        print_chunk(compiled.chunk());
    }
    if stats {
        print_chunk_stats(compiled.chunk());
    }

    if let Some(out) = emit {
        fs::write(out, compiled.chunk().to_bytes()?)?;
        println!("wrote {} instructions to {}", compiled.chunk().len(), out);
        return Ok(());
    }

    run_compiled(compiled, VmConfig::default())?;
    Ok(())
}

fn run_image(path: &str, bytecode: bool, stats: bool) -> Result<(), Error> {
    let chunk = Chunk::from_bytes(&fs::read(path)?)?;

    if bytecode {
        print_chunk(&chunk);
    }
    if stats {
        print_chunk_stats(&chunk);
    }

    let mut vm = VirtualCore::new();
    vm.run(&chunk)?;
    Ok(())
}
