//! Command-line options for the demo
//!
//! Parsing happens before any engine object is constructed; malformed
//! arguments produce a usage message and a non-zero exit, so the renderer
//! only ever sees validated values.

use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: ember3d_demo [OPTIONS]

Options:
  --help               Print this message and exit
  --width <uint>       Window width in pixels (default 1280)
  --height <uint>      Window height in pixels (default 720)
  --model <path>       Wavefront OBJ model to render (default: built-in cube)
  --texture <path>     Albedo texture (default: built-in checkerboard)
  --flip-texture       Flip the texture vertically on load";

/// Validated demo options
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub width: u32,
    pub height: u32,
    pub model: Option<PathBuf>,
    pub texture: Option<PathBuf>,
    pub flip_texture: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            model: None,
            texture: None,
            flip_texture: false,
        }
    }
}

/// Outcome of argument parsing
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedArgs {
    Run(Options),
    Help,
}

fn parse_dimension(flag: &str, value: Option<String>) -> Result<u32, String> {
    let value = value.ok_or_else(|| format!("Missing value for {}", flag))?;
    let parsed: u32 = value
        .parse()
        .map_err(|_| format!("Invalid value '{}' for {}", value, flag))?;
    if parsed == 0 {
        return Err(format!("{} must be at least 1", flag));
    }
    Ok(parsed)
}

/// Parse the arguments following the program name
pub fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<ParsedArgs, String> {
    let mut options = Options::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" => return Ok(ParsedArgs::Help),
            "--width" => options.width = parse_dimension("--width", args.next())?,
            "--height" => options.height = parse_dimension("--height", args.next())?,
            "--model" => {
                let value = args.next().ok_or("Missing value for --model")?;
                options.model = Some(PathBuf::from(value));
            }
            "--texture" => {
                let value = args.next().ok_or("Missing value for --texture")?;
                options.texture = Some(PathBuf::from(value));
            }
            "--flip-texture" => options.flip_texture = true,
            other => return Err(format!("Unknown argument '{}'", other)),
        }
    }

    Ok(ParsedArgs::Run(options))
}
