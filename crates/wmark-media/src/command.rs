//! FFmpeg command builder.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
///
/// The output is always overwritten (`-y`).
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Arguments placed before the first input
    input_args: Vec<String>,
    /// Input file paths, in `-i` order
    inputs: Vec<PathBuf>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            input_args: Vec::new(),
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Add an input file.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(path.as_ref().to_path_buf());
        self
    }

    /// Add an argument before the inputs.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Seek the inputs to `position` before decoding.
    pub fn seek(self, position: impl Into<String>) -> Self {
        self.input_arg("-ss").input_arg(position)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-codec:a").output_arg(codec)
    }

    /// Stop after writing `count` video frames.
    pub fn video_frames(self, count: u32) -> Self {
        self.output_arg("-vframes").output_arg(count.to_string())
    }

    /// Build the command arguments.
    ///
    /// No log level is passed: the stats line FFmpeg prints on stderr is
    /// what progress is read from.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.input_args.clone();

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push("-y".to_string());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Render a program and its arguments as a single command line.
///
/// Any argument with a character outside `[A-Za-z0-9_./:=,+-]` is
/// single-quoted, so the result can be pasted into a POSIX shell.
pub fn render_command(program: impl AsRef<Path>, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(quote_arg(&program.as_ref().to_string_lossy()));
    parts.extend(args.iter().map(|a| quote_arg(a)));
    parts.join(" ")
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | ':' | '=' | ',' | '+' | '-')
}

fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && arg.chars().all(is_shell_safe) {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Resolve the configured FFmpeg executable.
///
/// A bare program name is looked up in `PATH`; anything with a directory
/// component must exist at that exact location.
pub fn resolve_executable(path: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let path = path.as_ref();

    if path.components().count() > 1 || path.is_absolute() {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(MediaError::executable_not_found(path));
    }

    let resolved = which::which(path)
        .map_err(|_| MediaError::NotInPath(path.to_string_lossy().to_string()))?;
    debug!(executable = %resolved.display(), "Resolved FFmpeg executable");
    Ok(resolved)
}
