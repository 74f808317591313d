use std::path::{Path, PathBuf};

/// One process invocation: program plus fully rendered argument list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// Program name used in diagnostics (file name only).
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Space-joined command line for logs. Arguments containing whitespace are single-quoted.
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                line.push('\'');
                line.push_str(&arg.replace('\'', r"'\''"));
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// An ffmpeg input file with the options that must precede its `-i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegInput {
    pub options: Vec<(String, String)>,
    pub path: PathBuf,
}

impl FfmpegInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            options: Vec::new(),
            path: path.into(),
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }
}

/// Output option: `-key value` or a bare `-flag`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputOption {
    pub key: String,
    pub value: Option<String>,
}

/// Typed description of a single ffmpeg run.
///
/// Graph construction only ever builds these; [`FfmpegCommand::to_args`] is the one place that
/// knows ffmpeg's argument syntax.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegCommand {
    pub inputs: Vec<FfmpegInput>,
    pub filter_complex: Option<String>,
    pub maps: Vec<String>,
    pub output_options: Vec<OutputOption>,
    pub output: PathBuf,
}

impl FfmpegCommand {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            inputs: Vec::new(),
            filter_complex: None,
            maps: Vec::new(),
            output_options: Vec::new(),
            output: output.into(),
        }
    }

    pub fn input(mut self, input: FfmpegInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn filter_complex(mut self, graph: impl Into<String>) -> Self {
        self.filter_complex = Some(graph.into());
        self
    }

    pub fn map(mut self, spec: impl Into<String>) -> Self {
        self.maps.push(spec.into());
        self
    }

    pub fn opt(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.output_options.push(OutputOption {
            key: key.into(),
            value: Some(value.into()),
        });
        self
    }

    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.output_options.push(OutputOption {
            key: key.into(),
            value: None,
        });
        self
    }

    /// Value of the first output option named `key`, if any.
    pub fn output_option(&self, key: &str) -> Option<&str> {
        self.output_options
            .iter()
            .find(|o| o.key == key)
            .and_then(|o| o.value.as_deref())
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.output_options
            .iter()
            .any(|o| o.key == key && o.value.is_none())
    }

    /// Same command writing to `output` instead.
    pub fn with_output(&self, output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            ..self.clone()
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y"]
            .into_iter()
            .map(str::to_owned)
            .collect();

        for input in &self.inputs {
            for (k, v) in &input.options {
                args.push(format!("-{k}"));
                args.push(v.clone());
            }
            args.push("-i".to_owned());
            args.push(input.path.to_string_lossy().into_owned());
        }

        if let Some(graph) = &self.filter_complex {
            args.push("-filter_complex".to_owned());
            args.push(graph.clone());
        }

        for m in &self.maps {
            args.push("-map".to_owned());
            args.push(m.clone());
        }

        for o in &self.output_options {
            args.push(format!("-{}", o.key));
            if let Some(v) = &o.value {
                args.push(v.clone());
            }
        }

        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    pub fn invocation(&self, ffmpeg: &Path) -> Invocation {
        Invocation {
            program: ffmpeg.to_path_buf(),
            args: self.to_args(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tool/command.rs"]
mod tests;
