//! routesh entry point.
//!
//! Builds the shell from defaults, the config file, the environment, and
//! flags, loads plugins from the plugin directory, then runs the
//! interactive loop (or the `--exec` lines).

mod cli;
mod repl;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use routesh_core::Shell;

use crate::cli::Cli;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Cli::parse();
    let config = args.shell_config(|k| std::env::var(k).ok())?;
    log::info!(
        "Starting routesh as {} (plugin dir {:?})",
        config.product_name,
        config.resolve_plugin_dir()
    );

    let loader = cli::loader(&config);
    let mut shell = Shell::with_loader(config, Box::new(loader)).context("starting shell")?;

    if let Some(scan) = shell.autoload() {
        match scan {
            Ok(report) => {
                for (path, err) in &report.failures {
                    println!("% Skipped {}: {err}", path.display());
                }
                log::info!("Loaded {} plugin(s) at startup", report.loaded_count());
            },
            Err(e) => println!("% {e}"),
        }
    }

    let shell = Rc::new(RefCell::new(shell));
    if args.exec.is_empty() {
        repl::interactive(Rc::clone(&shell))?;
    } else {
        for line in &args.exec {
            if !shell.borrow().is_running() {
                break;
            }
            if !repl::run_line(&shell, line) {
                shell.borrow_mut().shutdown();
                bail!("'{line}' failed");
            }
        }
    }
    shell.borrow_mut().shutdown();
    Ok(())
}
