//! RISC-V instruction-stepping harness CLI.
//!
//! This binary drives the reference engine in one of two modes:
//! 1. **File-driven:** Load ELF images, boot through the reset vector, run until the
//!    guest halts and report `SUCCESS` or `FAILURE: <code>`.
//! 2. **Socket-driven:** Serve an RVFI-DII client on a local TCP port, stepping one
//!    injected instruction per command.

mod logging;

use std::fs::{self, File};
use std::io::{self, Write};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use thiserror::Error;
use tracing::{info, warn};

use rvcosim_core::common::constants::COSIM_ENTRY;
use rvcosim_core::common::error::{ConfigError, SimError};
use rvcosim_core::config::{PlatformConfig, Xlen};
use rvcosim_core::engine::reference::ReferenceEngine;
use rvcosim_core::rvfi::server::{self, RvfiServer};
use rvcosim_core::sim::bootstrap::BootImage;
use rvcosim_core::sim::loader::ProgramImage;
use rvcosim_core::sim::signature::write_signature;
use rvcosim_core::sim::{RunOutcome, Simulator};
use rvcosim_core::stats::RunTimes;
use rvcosim_core::Platform;

use crate::logging::TraceCategories;

#[derive(Parser, Debug)]
#[command(
    name = "rvcosim",
    author,
    version,
    about = "RISC-V instruction-stepping harness with RVFI-DII co-simulation",
    long_about = "Run ELF test programs to completion, or serve an RVFI-DII client.\n\nExamples:\n  rvcosim rv64ui-p-add\n  rvcosim -T add.sig --xlen 32 rv32ui-p-add\n  rvcosim --rvfi-dii 5555"
)]
struct Args {
    /// ELF files to load; the first is the program to run.
    files: Vec<PathBuf>,

    /// JSON platform configuration; flags below override it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Register width of the model (32 or 64).
    #[arg(long, value_parser = parse_xlen)]
    xlen: Option<Xlen>,

    /// Retired instructions between clock ticks.
    #[arg(long)]
    insns_per_tick: Option<u64>,

    /// Enable hardware update of PTE dirty bits.
    #[arg(short = 'd', long)]
    enable_dirty_update: bool,

    /// Enable misaligned loads and stores.
    #[arg(short = 'm', long)]
    enable_misaligned: bool,

    /// Number of PMP entries (0, 16 or 64).
    #[arg(long)]
    pmp_count: Option<u64>,

    /// PMP grain (G) value, less than 64.
    #[arg(long)]
    pmp_grain: Option<u64>,

    /// RAM size in MiB.
    #[arg(short = 'z', long, value_name = "MIB")]
    ram_size: Option<u64>,

    /// Disable compressed instructions.
    #[arg(short = 'C', long)]
    disable_compressed: bool,

    /// Make misa read-only.
    #[arg(short = 'I', long)]
    disable_writable_misa: bool,

    /// Disable the F and D extensions.
    #[arg(short = 'F', long)]
    disable_fdext: bool,

    /// Disable the vector extension.
    #[arg(short = 'W', long)]
    disable_vector_ext: bool,

    /// Store illegal instruction bits in mtval.
    #[arg(short = 'i', long)]
    mtval_has_illegal_inst_bits: bool,

    /// Device tree blob placed after the reset vector.
    #[arg(short = 'b', long, value_name = "FILE")]
    device_tree_blob: Option<PathBuf>,

    /// Send guest console output to a file.
    #[arg(short = 't', long, value_name = "FILE")]
    terminal_log: Option<PathBuf>,

    /// Print initialization and execution times on completion.
    #[arg(short = 'p', long)]
    show_times: bool,

    /// Print the model architecture and exit.
    #[arg(short = 'a', long)]
    report_arch: bool,

    /// Write the test signature to a file.
    #[arg(short = 'T', long, value_name = "FILE")]
    test_signature: Option<PathBuf>,

    /// Bytes per signature line.
    #[arg(short = 'g', long, default_value = "4")]
    signature_granularity: NonZeroU64,

    /// Serve an RVFI-DII client on this local port.
    #[arg(short = 'r', long, value_name = "PORT")]
    rvfi_dii: Option<u16>,

    /// Enable a trace category (instr, reg, mem, platform, rvfi, step, all).
    #[arg(
        short = 'v',
        long = "trace",
        value_name = "CATEGORY",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "all",
        action = ArgAction::Append
    )]
    trace: Vec<String>,

    /// Disable a trace category.
    #[arg(
        short = 'V',
        long = "no-trace",
        value_name = "CATEGORY",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "all",
        action = ArgAction::Append
    )]
    no_trace: Vec<String>,

    /// Write trace output to a file instead of standard error.
    #[arg(long, value_name = "FILE")]
    trace_output: Option<PathBuf>,

    /// Stop after this many instructions (0 for no limit).
    #[arg(short = 'l', long, value_parser = parse_u64)]
    inst_limit: Option<u64>,

    /// Enable Zfinx; disables F and D.
    #[arg(short = 'x', long)]
    enable_zfinx: bool,

    /// Enable the B extension.
    #[arg(short = 'B', long)]
    enable_bitmanip: bool,

    /// Make the FIOM bit of menvcfg writable.
    #[arg(long)]
    enable_writable_fiom: bool,

    /// Enable Svinval.
    #[arg(long)]
    enable_svinval: bool,

    /// Enable Zcb.
    #[arg(long)]
    enable_zcb: bool,

    /// Enable Zicbom.
    #[arg(long)]
    enable_zicbom: bool,

    /// Enable Zicboz.
    #[arg(long)]
    enable_zicboz: bool,

    /// Enable Sstc.
    #[arg(long)]
    enable_sstc: bool,

    /// Cache block size in bytes (power of two, at most 4096).
    #[arg(long, value_name = "BYTES")]
    cache_block_size: Option<u64>,
}

/// Failures reported by the command line front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// Harness failure.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The configuration file is not valid JSON for the schema.
    #[error("invalid configuration file '{path}': {source}")]
    ConfigFile {
        /// Offending path.
        path: PathBuf,
        /// Parser error.
        source: serde_json::Error,
    },

    /// A trace category name was not recognised.
    #[error("unknown trace category '{0}' (should be instr|reg|mem|rvfi|platform|step|all)")]
    UnknownCategory(String),

    /// An input or output file could not be opened.
    #[error("cannot open {what} '{path}': {source}")]
    Create {
        /// What the file is for.
        what: &'static str,
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// File-driven mode needs at least one ELF file.
    #[error("no ELF file provided")]
    NoElf,

    /// Console or socket I/O failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, CliError> {
    let mut categories = TraceCategories::default();
    for category in &args.trace {
        categories.set(category, true)?;
    }
    for category in &args.no_trace {
        categories.set(category, false)?;
    }
    logging::init(&categories, args.trace_output.as_deref())?;

    let config = build_config(args)?;
    if args.report_arch {
        println!("RV{}", config.isa.xlen.bits());
        return Ok(ExitCode::SUCCESS);
    }

    let times = args.show_times.then(RunTimes::start);
    let terminal: Box<dyn Write> = match &args.terminal_log {
        Some(path) => Box::new(create(path, "terminal log")?),
        None => Box::new(io::stdout()),
    };
    let engine = ReferenceEngine::with_terminal(terminal);

    match args.rvfi_dii {
        Some(port) => run_rvfi(args, config, engine, port, times),
        None => run_file(args, config, engine, times),
    }
}

/// Loads the configuration file, if any, and applies flag overrides.
fn build_config(args: &Args) -> Result<PlatformConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|source| CliError::Create {
                what: "configuration file",
                path: path.clone(),
                source,
            })?;
            PlatformConfig::from_json(&json).map_err(|source| CliError::ConfigFile {
                path: path.clone(),
                source,
            })?
        }
        None => PlatformConfig::default(),
    };

    if let Some(xlen) = args.xlen {
        config.isa.xlen = xlen;
    }
    if let Some(n) = args.insns_per_tick {
        config.platform.insns_per_tick = n;
    }
    if let Some(count) = args.pmp_count {
        config.pmp.count = count;
    }
    if let Some(grain) = args.pmp_grain {
        config.pmp.grain = grain;
    }
    if let Some(mib) = args.ram_size {
        config.memory.set_ram_size_mib(mib);
    }
    if let Some(bytes) = args.cache_block_size {
        config.set_cache_block_size(bytes)?;
    }

    let isa = &mut config.isa;
    isa.enable_rvc &= !args.disable_compressed;
    isa.enable_writable_misa &= !args.disable_writable_misa;
    isa.enable_fdext &= !(args.disable_fdext || args.enable_zfinx);
    isa.enable_vext &= !args.disable_vector_ext;
    isa.enable_zfinx |= args.enable_zfinx;
    isa.enable_bext |= args.enable_bitmanip;
    isa.enable_writable_fiom |= args.enable_writable_fiom;
    isa.enable_svinval |= args.enable_svinval;
    isa.enable_zcb |= args.enable_zcb;
    isa.enable_zicbom |= args.enable_zicbom;
    isa.enable_zicboz |= args.enable_zicboz;
    isa.enable_sstc |= args.enable_sstc;

    let platform = &mut config.platform;
    platform.enable_dirty_update |= args.enable_dirty_update;
    platform.enable_misaligned |= args.enable_misaligned;
    platform.mtval_has_illegal_inst_bits |= args.mtval_has_illegal_inst_bits;

    config.validate()?;
    Ok(config)
}

/// Runs the main ELF file to completion.
fn run_file(
    args: &Args,
    mut config: PlatformConfig,
    engine: ReferenceEngine,
    times: Option<RunTimes>,
) -> Result<ExitCode, CliError> {
    let (main, extra) = args.files.split_first().ok_or(CliError::NoElf)?;
    println!("Running file {}.", main.display());

    let xlen = config.isa.xlen;
    let program = ProgramImage::load(main, extra, xlen)?;
    config.memory.htif_tohost = program.tohost;

    let dtb = match &args.device_tree_blob {
        Some(path) => {
            let dtb = fs::read(path).map_err(|source| CliError::Create {
                what: "DTB file",
                path: path.clone(),
                source,
            })?;
            info!(target: "platform", "Read {} bytes of DTB from {}.", dtb.len(), path.display());
            dtb
        }
        None => Vec::new(),
    };

    let boot = BootImage::reset_vector(program.entry, xlen, &dtb)
        .with_segments(program.segments.iter().cloned());
    if let Some((base, size)) = boot.rom_extent() {
        config.memory.rom_base = base;
        config.memory.rom_size = size;
    }
    let platform = Platform::new(config)?;

    let mut sim = Simulator::new(engine, platform, boot)
        .with_inst_limit(args.inst_limit.filter(|&limit| limit != 0));
    if let Some(times) = times {
        sim = sim.with_timing(times);
    }

    match sim.run()? {
        RunOutcome::Halted { exit_code: 0 } => println!("SUCCESS"),
        RunOutcome::Halted { exit_code } => {
            println!("FAILURE: {}", exit_code as i64);
            finish(&mut sim)?;
            return Ok(ExitCode::FAILURE);
        }
        RunOutcome::LimitReached { retired } => {
            info!("stopped after {retired} instructions");
        }
    }

    finish(&mut sim)?;
    if let Some(path) = &args.test_signature {
        let region = program.signature_region();
        if write_signature(path, sim.engine(), region, args.signature_granularity)? {
            info!("wrote test signature to {}", path.display());
        }
    }
    report_times(&sim);
    Ok(ExitCode::SUCCESS)
}

/// Serves one RVFI-DII client until it disconnects.
fn run_rvfi(
    args: &Args,
    mut config: PlatformConfig,
    engine: ReferenceEngine,
    port: u16,
    times: Option<RunTimes>,
) -> Result<ExitCode, CliError> {
    if !args.files.is_empty() {
        warn!("ELF files are ignored in RVFI-DII mode");
    }
    config.memory.use_cosim_map();
    let platform = Platform::new(config)?;

    let server = RvfiServer::bind(port)?;
    println!("Waiting for connection on port {}.", server.port()?);
    let stream = server.accept()?;
    println!("Connected");

    let mut sim = Simulator::new(engine, platform, BootImage::direct(COSIM_ENTRY))
        .with_inst_limit(args.inst_limit.filter(|&limit| limit != 0));
    if let Some(times) = times {
        sim = sim.with_timing(times);
    }
    server::serve(&stream, &mut sim)?;
    finish(&mut sim)?;
    report_times(&sim);
    Ok(ExitCode::SUCCESS)
}

/// Shuts the engine down, surfacing a lost terminal flush.
fn finish(sim: &mut Simulator<ReferenceEngine>) -> Result<(), CliError> {
    sim.finish();
    sim.engine_mut().take_terminal_error().map_or(Ok(()), |err| Err(err.into()))
}

fn report_times(sim: &Simulator<ReferenceEngine>) {
    if let Some(report) = sim.time_report() {
        eprintln!("{report}");
    }
}

fn create(path: &Path, what: &'static str) -> Result<File, CliError> {
    File::create(path).map_err(|source| CliError::Create {
        what,
        path: path.to_path_buf(),
        source,
    })
}

fn parse_xlen(value: &str) -> Result<Xlen, String> {
    match value {
        "32" | "RV32" | "rv32" => Ok(Xlen::Rv32),
        "64" | "RV64" | "rv64" => Ok(Xlen::Rv64),
        other => Err(format!("unsupported register width '{other}' (expected 32 or 64)")),
    }
}

/// Parses decimal, `0x` hex or `0o` octal, like `strtoull` with base 0.
fn parse_u64(value: &str) -> Result<u64, String> {
    let parsed = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if let Some(oct) = value.strip_prefix("0o") {
        u64::from_str_radix(oct, 8)
    } else {
        value.parse()
    };
    parsed.map_err(|_| format!("invalid instruction limit {value}"))
}
