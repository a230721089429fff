use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use swege::build::{self, BuildError, BuildOptions};
use swege::{config, manifest, output};

#[derive(Parser)]
#[command(name = "swege")]
#[command(about = "Incremental static site builder")]
#[command(long_about = "\
Incremental static site builder

Mirrors a source tree into a destination tree. Markdown files are rendered
to HTML between a shared header and footer; everything else is copied.
Only files newer than the last build are touched.

Layout (defaults):

  swege.toml        # Optional config (run 'swege gen-config')
  header.html       # Written before every page
  footer.html       # Written after every page
  .manifest         # Paths seen so far; its mtime marks the last build
  content/          # Source tree
  │   ├── index.md          → dist/index.html
  │   ├── posts/first.md    → dist/posts/first.html
  │   ├── img/logo.png      → dist/img/logo.png
  │   └── ~draft.md         # Names starting with ~ or # are ignored
  dist/             # Destination tree

Page titles come from a 'title: ...' first line or a leading '# heading'.
Editing header.html, footer.html or swege.toml re-renders every page.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Manifest file
    #[arg(long, default_value = manifest::DEFAULT_MANIFEST_FILE, global = true)]
    manifest: PathBuf,

    /// Also list files that were up to date
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build what changed since the last run (default)
    Build,
    /// Delete the manifest, then rebuild everything
    Force,
    /// Print a stock swege.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            exit_code(&e)
        }
    }
}

fn run(cli: &Cli) -> Result<(), BuildError> {
    match cli.command.as_ref().unwrap_or(&Command::Build) {
        Command::Build => run_build(cli),
        Command::Force => {
            if build::force_rebuild(&cli.manifest)? {
                println!("==> Removed {}", cli.manifest.display());
            }
            run_build(cli)
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
    }
}

fn run_build(cli: &Cli) -> Result<(), BuildError> {
    let site_config = config::load_config(&cli.config)?;
    let options = BuildOptions {
        config_path: cli.config.clone(),
        manifest_path: cli.manifest.clone(),
    };

    println!(
        "==> Building {} → {}",
        site_config.src_dir.display(),
        site_config.dst_dir.display()
    );

    let (tx, rx) = std::sync::mpsc::channel();
    let dst_root = site_config.dst_dir.clone();
    let verbose = cli.verbose;
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_build_event(&event, &dst_root, verbose);
        }
    });

    let result = build::build(&site_config, &options, Some(tx));
    // The sender went away with the build, so the printer drains and exits.
    if printer.join().is_err() {
        eprintln!("warning: progress printer panicked");
    }

    output::print_summary(&result?);
    Ok(())
}

/// Exit status for a failed build: the OS error code when there is one.
fn exit_code(error: &BuildError) -> ExitCode {
    let code = error
        .raw_os_error()
        .and_then(|c| u8::try_from(c).ok())
        .filter(|&c| c != 0)
        .unwrap_or(1);
    ExitCode::from(code)
}
