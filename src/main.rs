//! Mano Emulator - CLI Entry Point
//!
//! Commands:
//! - `mano-emu run <source>` - Assemble and run a program until it halts
//! - `mano-emu asm <source>` - Assemble and print the symbol table and listing
//! - `mano-emu disasm <word>...` - Decode raw hex words

use clap::{ArgAction, Parser, Subcommand};
use mano::asm::{disassemble_word, listing};
use mano::{assemble, Cpu, Program, Register};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mano-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A cycle-accurate emulator of the Mano basic computer")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a program and run it until it halts
    Run {
        /// Path to the assembly source
        source: String,
        /// Maximum number of cycles to run
        #[arg(short, long, default_value = "100000")]
        max_cycles: u64,
        /// Print every cycle
        #[arg(short, long)]
        trace: bool,
        /// Characters fed to the input device, one per INP
        #[arg(short, long, default_value = "")]
        input: String,
        /// Preset a register before running, e.g. AC=00FF (hex)
        #[arg(long = "set", value_name = "REG=VALUE")]
        presets: Vec<String>,
        /// After halting, print 16 memory words starting at this hex address
        #[arg(long, value_name = "ADDR")]
        dump: Option<String>,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assemble a program and print its symbol table and listing
    Asm {
        /// Path to the assembly source
        source: String,
    },
    /// Decode hex words to instructions
    Disasm {
        /// Words to decode, e.g. 2010 or 0x7001
        #[arg(required = true)]
        words: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { source, max_cycles, trace, input, presets, dump, json } => {
            let options = RunOptions { max_cycles, trace, input, presets, dump, json };
            run_program(&source, &options);
        }
        Commands::Asm { source } => {
            assemble_file(&source);
        }
        Commands::Disasm { words } => {
            disassemble_words(&words);
        }
    }
}

/// Log to stderr. `RUST_LOG` overrides the `-v` level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_program(path: &str) -> Program {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    match assemble(&source) {
        Ok(program) => {
            for warning in &program.warnings {
                eprintln!("⚠️  {}", warning);
            }
            program
        }
        Err(errors) => {
            eprintln!("❌ Assembly failed:");
            for err in errors.errors() {
                eprintln!("   {}", err);
            }
            std::process::exit(1);
        }
    }
}

struct RunOptions {
    max_cycles: u64,
    trace: bool,
    input: String,
    presets: Vec<String>,
    dump: Option<String>,
    json: bool,
}

/// Parse `REG=VALUE` with a hex value.
fn parse_preset(text: &str) -> Result<(Register, u16), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected REG=VALUE, got `{}`", text))?;
    let reg: Register = name.trim().parse().map_err(|e| format!("{}", e))?;
    let value = u16::from_str_radix(value.trim(), 16).map_err(|e| format!("bad value `{}`: {}", value, e))?;
    Ok((reg, value))
}

fn run_program(path: &str, options: &RunOptions) {
    let &RunOptions { max_cycles, trace, json, .. } = options;
    let program = load_program(path);
    let mut cpu = Cpu::new(program.memory);

    for preset in &options.presets {
        match parse_preset(preset) {
            Ok((reg, value)) => cpu.set_register(reg, value),
            Err(e) => {
                eprintln!("❌ Invalid --set: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut input = options.input.bytes();
    let mut output = Vec::new();
    let mut cycles = 0u64;

    while cycles < max_cycles {
        if !cpu.flags().fgi {
            if let Some(byte) = input.next() {
                cpu.inject_input(byte);
            }
        }
        if !cpu.advance_one_cycle() {
            break;
        }
        cycles += 1;

        if trace {
            let transfer = cpu.last_transfer().map(|t| t.to_string()).unwrap_or_default();
            println!("{:>6}  {:<16} {}", cycles, cpu.cycle_label(), transfer);
        }
        if let Some(byte) = cpu.take_output() {
            output.push(byte);
        }
    }

    if json {
        match serde_json::to_string(&cpu.snapshot()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if !output.is_empty() {
        println!("━━━ Output ━━━");
        println!("{}", String::from_utf8_lossy(&output));
        println!();
    }

    println!("━━━ Result ━━━");
    println!("Cycles: {}", cycles);
    for (reg, value) in cpu.registers().iter() {
        let digits = match reg {
            Register::Ar | Register::Pc => 3,
            Register::Outr | Register::Inpr => 2,
            _ => 4,
        };
        println!("{:<5} {:0width$X}", reg.name(), value, width = digits);
    }
    let flags = cpu.flags();
    println!(
        "E={} S={} R={} IEN={} FGI={} FGO={}",
        u8::from(flags.e),
        u8::from(flags.s),
        u8::from(flags.r),
        u8::from(flags.ien),
        u8::from(flags.fgi),
        u8::from(flags.fgo)
    );

    if let Some(start) = &options.dump {
        match usize::from_str_radix(start, 16) {
            Ok(start) => {
                println!();
                println!("━━━ Memory ━━━");
                for (addr, word) in cpu.memory().dump(start, 16) {
                    println!("{:03X}  {:04X}  {}", addr, word, disassemble_word(word));
                }
            }
            Err(e) => eprintln!("❌ Invalid --dump address {}: {}", start, e),
        }
    }

    if !cpu.is_halted() {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }
}

fn assemble_file(path: &str) {
    let program = load_program(path);
    println!("✓ Assembled {} words", program.memory.programmed().count());
    println!();

    let mut symbols: Vec<(&String, &u16)> = program.symbols.iter().collect();
    symbols.sort_by_key(|&(_, &addr)| addr);
    println!("━━━ Symbols ━━━");
    for (name, addr) in symbols {
        println!("{:<4} {:03X}", name, addr);
    }
    println!();

    println!("━━━ Listing ━━━");
    print!("{}", listing(&program.memory, &program.symbols));
}

fn disassemble_words(words: &[String]) {
    for text in words {
        let digits = text.trim_start_matches("0x").trim_start_matches("0X");
        match u16::from_str_radix(digits, 16) {
            Ok(word) => println!("{:04X}  {}", word, disassemble_word(word)),
            Err(e) => {
                eprintln!("❌ Invalid word {}: {}", text, e);
                std::process::exit(1);
            }
        }
    }
}
