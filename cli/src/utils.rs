use std::fs;
use std::io::{self, BufRead, Read, Write};

use clap::Args;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Read input from a file or stdin
///
/// If `file` is `Some`, reads from the specified file path.
/// If `file` is `None`, reads from stdin.
pub(crate) fn read_input(file: Option<&str>) -> Result<Vec<u8>> {
    match file {
        Some(path) => Ok(fs::read(path)?),
        None => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Where an encrypted key's password comes from.
#[derive(Args)]
pub(crate) struct PasswordArgs {
    /// Read the password from this environment variable
    #[arg(long, value_name = "VAR", conflicts_with = "prompt")]
    pub(crate) password_env: Option<String>,

    /// Ask for the password on stdin. The input is echoed, not hidden
    #[arg(long)]
    pub(crate) prompt: bool,
}

impl PasswordArgs {
    /// The password from `--password-env`, if given.
    pub(crate) fn env_password(&self) -> Result<Option<Zeroizing<Vec<u8>>>> {
        match &self.password_env {
            Some(var) => std::env::var(var)
                .map(|value| Some(Zeroizing::new(value.into_bytes())))
                .map_err(|_| Error::MissingEnv(var.clone())),
            None => Ok(None),
        }
    }
}

/// Prints `message` to stderr and reads one line from stdin.
///
/// Terminal echo is left on. Returns `None` on end of input. The line ending
/// is stripped.
pub(crate) fn prompt_password(message: &str) -> Option<Zeroizing<Vec<u8>>> {
    let mut stderr = io::stderr();
    let _ = write!(stderr, "{}", message);
    let _ = stderr.flush();

    let mut line = Zeroizing::new(String::new());
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            let password = line.trim_end_matches(['\r', '\n']);
            Some(Zeroizing::new(password.as_bytes().to_vec()))
        }
    }
}

pub(crate) fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
