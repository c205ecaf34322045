use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use riri_core::{EmitOptions, compile_file};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

mod toolchain;

use toolchain::{Toolchain, run_binary, run_captured};

const PASS_MARKER: &str = "ALL TESTS PASSED";

/// RiriLang to C++20 compiler.
#[derive(Parser, Debug)]
#[command(name = "rrc", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    #[arg(long, global = true, help = "Enable the Qt GUI toolkit prelude")]
    gui: bool,

    #[arg(long, global = true, help = "Enable the cpp-httplib server prelude")]
    http: bool,

    #[arg(long, global = true, help = "Keep the generated .cpp file after building")]
    keep_cpp: bool,

    #[arg(long, global = true, help = "Log at debug level")]
    verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Directory for generated files (defaults to the current directory)"
    )]
    out_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "RRC_CXX", default_value = "g++", help = "C++ compiler to invoke")]
    cxx: String,

    #[arg(long, global = true, help = "Compile with -O0 instead of -O3")]
    no_optimize: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the generated C++ to stdout
    Show { file: PathBuf },
    /// Compile to a native executable
    Build { file: PathBuf },
    /// Build, run and clean up
    Run { file: PathBuf },
    /// Build and run every .rr file under a directory
    Test {
        #[arg(default_value = "tests")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli)
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    let options = EmitOptions {
        gui_toolkit: cli.gui,
        http_server: cli.http,
    };

    match &cli.command {
        Cmd::Show { file } => {
            let artifact = compile_file(file, &options)
                .with_context(|| format!("failed to compile {}", file.display()))?;
            print!("{}", artifact.cpp);
        }
        Cmd::Build { file } => {
            let exe = build(&cli, file, &options)?;
            info!(output = %exe.display(), "build finished");
        }
        Cmd::Run { file } => {
            let exe = build(&cli, file, &options)?;
            let status = run_binary(&exe);
            remove_artifact(&exe);
            let status = status?;
            if !status.success() {
                bail!("{} exited with {status}", file.display());
            }
        }
        Cmd::Test { dir } => run_tests(&cli, dir, &options)?,
    }
    Ok(())
}

/// Emit `<stem>.cpp` into the output directory and compile it to `<stem>`.
fn build(cli: &Cli, file: &Path, options: &EmitOptions) -> Result<PathBuf> {
    let artifact = compile_file(file, options)
        .with_context(|| format!("failed to compile {}", file.display()))?;

    let out_dir = cli.out_dir.as_deref().unwrap_or(Path::new("."));
    let (cpp, exe) = artifact_paths(out_dir, file)?;

    write_output(&cpp, artifact.cpp.as_bytes())?;
    debug!(path = %cpp.display(), "wrote C++ source");

    let toolchain = Toolchain {
        cxx: cli.cxx.clone(),
        optimize: !cli.no_optimize,
        gui: cli.gui,
    };
    let compiled = toolchain.compile(&cpp, &exe);
    if !cli.keep_cpp {
        remove_artifact(&cpp);
    }
    compiled?;
    Ok(exe)
}

/// `(<out_dir>/<stem>.cpp, <out_dir>/<stem>)`, keeping every dot in the stem.
fn artifact_paths(out_dir: &Path, file: &Path) -> Result<(PathBuf, PathBuf)> {
    let stem = file
        .file_stem()
        .with_context(|| format!("{} has no file name", file.display()))?;
    let mut cpp_name = stem.to_os_string();
    cpp_name.push(".cpp");
    Ok((out_dir.join(cpp_name), out_dir.join(stem)))
}

fn run_tests(cli: &Cli, dir: &Path, options: &EmitOptions) -> Result<()> {
    if !dir.is_dir() {
        bail!("test directory {} does not exist", dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "rr"))
        .collect();
    files.sort();

    let mut failed = Vec::new();
    for file in &files {
        match run_test(cli, file, options) {
            Ok(true) => println!("PASS {}", file.display()),
            Ok(false) => {
                println!("FAIL {}", file.display());
                failed.push(file);
            }
            Err(err) => {
                println!("FAIL {} ({err:#})", file.display());
                failed.push(file);
            }
        }
    }

    println!("{} passed, {} failed", files.len() - failed.len(), failed.len());
    if !failed.is_empty() {
        bail!("{} test file(s) failed", failed.len());
    }
    Ok(())
}

fn run_test(cli: &Cli, file: &Path, options: &EmitOptions) -> Result<bool> {
    let exe = build(cli, file, options)?;
    let output = run_captured(&exe);
    remove_artifact(&exe);
    let output = output?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(output.status.success() && stdout.contains(PASS_MARKER))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {}", path.display()))
}

fn remove_artifact(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), %err, "could not remove build artifact");
    }
}
