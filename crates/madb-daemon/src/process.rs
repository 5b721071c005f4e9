//! Child process execution for per-device commands

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use madb_core::prelude::*;

use crate::prefixer::{LinePrefixer, OutputSink};

const READ_CHUNK: usize = 8 * 1024;

/// A command line to run for one device
///
/// Built once, then either streamed to the console through line prefixers
/// ([`DeviceCommand::run_prefixed`]) or captured ([`DeviceCommand::output`]).
#[derive(Debug, Clone)]
pub struct DeviceCommand {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
}

impl DeviceCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Program name as shown in error messages (file name only)
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Human-readable command line, for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        Error::ProcessSpawn {
            program: self.program_name(),
            reason: e.to_string(),
        }
    }

    /// Run to completion, streaming stdout and stderr line by line with
    /// `prefix` prepended
    ///
    /// A non-zero exit status is an error.
    pub async fn run_prefixed(&self, prefix: &str, stdout: &OutputSink, stderr: &OutputSink) -> Result<()> {
        debug!("Running: {}", self.display());

        let mut child = self
            .build()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let child_stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::process("stdout was not captured"))?;
        let child_stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::process("stderr was not captured"))?;

        let out = LinePrefixer::new(prefix, stdout.clone());
        let err = LinePrefixer::new(prefix, stderr.clone());

        let (out_result, err_result) = tokio::join!(
            pump(child_stdout, out),
            pump(child_stderr, err)
        );
        out_result?;
        err_result?;

        let status = child.wait().await?;
        trace!("{} exited with {:?}", self.display(), status);

        if status.success() {
            Ok(())
        } else {
            Err(Error::ProcessExit {
                program: self.program_name(),
                code: status.code(),
            })
        }
    }

    /// Run to completion and return stdout
    ///
    /// A non-zero exit status is an error; stderr is logged but not returned.
    pub async fn output(&self) -> Result<String> {
        debug!("Capturing: {}", self.display());

        let output = self
            .build()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", self.program_name(), stderr.trim());
        }

        if !output.status.success() {
            return Err(Error::ProcessExit {
                program: self.program_name(),
                code: output.status.code(),
            });
        }

        Ok(stdout)
    }

    /// Run to completion with the console inherited, no prefixing
    pub async fn run_inherited(&self) -> Result<()> {
        debug!("Running (inherited stdio): {}", self.display());

        let status = self
            .build()
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::ProcessExit {
                program: self.program_name(),
                code: status.code(),
            })
        }
    }
}

/// Copy a child stream into a prefixer until EOF, then flush the partial line
async fn pump<R>(mut reader: R, mut prefixer: LinePrefixer) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        prefixer.push(&chunk[..n])?;
    }
    prefixer.finish()?;
    Ok(())
}
