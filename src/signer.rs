//! Ad-hoc re-signing of patched Mach-O binaries.
//!
//! Changing a single byte invalidates a Mach-O code signature, and Apple Silicon refuses
//! to run unsigned code, so a patched macOS binary has to be signed again. Two external
//! tools can do it:
//!
//! - `quill`, a cross-platform signer, preferred wherever it is installed;
//! - `codesign`, which only exists on macOS.
//!
//! Discovery and signing are separate steps: [`Finalizer::signer`] probes once and
//! caches the answer, [`Finalizer::sign`] runs the chosen tool. All process spawning goes
//! through [`CommandRunner`].

use std::cell::OnceCell;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// What a finished child process reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Exit status as printed for diagnostics.
    pub status: String,
    pub stderr: String,
}

/// Runs an external program to completion.
pub trait CommandRunner {
    /// `capture` asks for stdout/stderr to be collected instead of inherited.
    fn run(&self, program: &str, args: &[OsString], capture: bool) -> io::Result<CommandOutput>;
}

/// Spawns real processes found on the search path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[OsString], capture: bool) -> io::Result<CommandOutput> {
        let mut command = Command::new(program);
        command.args(args);
        if capture {
            let output = command.stdin(Stdio::null()).output()?;
            Ok(CommandOutput {
                success: output.status.success(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        } else {
            let status = command.status()?;
            Ok(CommandOutput {
                success: status.success(),
                status: status.to_string(),
                stderr: String::new(),
            })
        }
    }
}

/// External signing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signer {
    Quill,
    Codesign,
}

impl Signer {
    pub fn program(self) -> &'static str {
        match self {
            Self::Quill => "quill",
            Self::Codesign => "codesign",
        }
    }

    /// The invocations that sign `path`, in order.
    fn invocations(self, path: &OsStr) -> Vec<Vec<OsString>> {
        let args = |fixed: &[&str]| -> Vec<OsString> {
            fixed
                .iter()
                .map(OsString::from)
                .chain(std::iter::once(path.to_os_string()))
                .collect()
        };
        match self {
            Self::Quill => vec![args(&["sign"])],
            Self::Codesign => vec![
                args(&["--remove-signature"]),
                args(&["--force", "--deep", "--sign", "-"]),
            ],
        }
    }
}

impl fmt::Display for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Chooses a signer on first use and signs files with it.
#[derive(Debug)]
pub struct Finalizer<R: CommandRunner> {
    runner: R,
    host_is_macos: bool,
    choice: OnceCell<Signer>,
}

impl Finalizer<SystemRunner> {
    pub fn system() -> Self {
        Self::new(SystemRunner, cfg!(target_os = "macos"))
    }
}

impl<R: CommandRunner> Finalizer<R> {
    pub fn new(runner: R, host_is_macos: bool) -> Self {
        Self {
            runner,
            host_is_macos,
            choice: OnceCell::new(),
        }
    }

    /// The signer to use, probing for it on the first call.
    pub fn signer(&self) -> Result<Signer> {
        if let Some(signer) = self.choice.get() {
            return Ok(*signer);
        }
        let signer = self.probe()?;
        tracing::debug!("selected {} for ad-hoc signing", signer);
        Ok(*self.choice.get_or_init(|| signer))
    }

    fn probe(&self) -> Result<Signer> {
        // quill answers its help sub-command with success.
        if self.answers("quill", &["sign", "--help"], |out| out.success) {
            return Ok(Signer::Quill);
        }
        // codesign has no help switch; an unknown flag prints its usage on stderr.
        if self.host_is_macos
            && self.answers("codesign", &["--help"], |out| {
                out.stderr.contains("Usage: codesign")
            })
        {
            return Ok(Signer::Codesign);
        }
        Err(Error::SignerNotFound)
    }

    fn answers(&self, program: &str, args: &[&str], accept: impl Fn(&CommandOutput) -> bool) -> bool {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        match self.runner.run(program, &args, true) {
            Ok(output) => accept(&output),
            Err(e) => {
                tracing::debug!("{} is not available: {}", program, e);
                false
            }
        }
    }

    /// Signs `path` ad hoc, checking the exit status of every invocation.
    pub fn sign(&self, path: &Path) -> Result<()> {
        let signer = self.signer()?;
        let path = std::path::absolute(path)?;
        tracing::info!(
            "Using {} to perform an ad-hoc sign on the patched executable.",
            signer
        );
        for args in signer.invocations(path.as_os_str()) {
            let output = self.runner.run(signer.program(), &args, false)?;
            if !output.success {
                return Err(Error::SignerFailed {
                    program: signer.program(),
                    status: output.status,
                });
            }
        }
        Ok(())
    }
}
