//! Trace categories and subscriber setup.
//!
//! Each category is a `tracing` target emitted by the core crate. The command line
//! switches categories on and off; the result becomes an `EnvFilter` directive
//! string. `RUST_LOG`, when set, replaces it entirely.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::CliError;

/// Enabled trace categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceCategories {
    pub instr: bool,
    pub reg: bool,
    pub mem: bool,
    pub platform: bool,
    pub rvfi: bool,
    pub step: bool,
}

impl Default for TraceCategories {
    fn default() -> Self {
        Self {
            instr: true,
            reg: true,
            mem: true,
            platform: true,
            rvfi: false,
            step: false,
        }
    }
}

impl TraceCategories {
    /// Switches `category` (or every category but `step` for `all`) to `enabled`.
    pub fn set(&mut self, category: &str, enabled: bool) -> Result<(), CliError> {
        match category {
            "all" => {
                self.instr = enabled;
                self.reg = enabled;
                self.mem = enabled;
                self.platform = enabled;
                self.rvfi = enabled;
            }
            "instr" => self.instr = enabled,
            "reg" => self.reg = enabled,
            "mem" => self.mem = enabled,
            "platform" => self.platform = enabled,
            "rvfi" => self.rvfi = enabled,
            "step" => self.step = enabled,
            other => return Err(CliError::UnknownCategory(other.to_owned())),
        }
        Ok(())
    }

    /// `EnvFilter` directives: `info` by default, each category at `trace` or off.
    pub fn directives(&self) -> String {
        let level = |on: bool| if on { "trace" } else { "off" };
        format!(
            "info,instr={},reg={},mem={},platform={},rvfi={},step={}",
            level(self.instr),
            level(self.reg),
            level(self.mem),
            level(self.platform),
            level(self.rvfi),
            level(self.step),
        )
    }
}

/// Installs the global subscriber, writing to `output` or standard error.
pub fn init(categories: &TraceCategories, output: Option<&Path>) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(categories.directives()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time();

    match output {
        Some(path) => {
            let file = File::create(path).map_err(|source| CliError::Create {
                what: "trace log",
                path: path.to_path_buf(),
                source,
            })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}
