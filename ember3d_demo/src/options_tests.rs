use crate::options::{parse_args, Options, ParsedArgs};

fn args(list: &[&str]) -> impl Iterator<Item = String> {
    list.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .into_iter()
}

#[test]
fn test_no_arguments_yields_defaults() {
    let parsed = parse_args(args(&[])).unwrap();
    assert_eq!(parsed, ParsedArgs::Run(Options::default()));
}

#[test]
fn test_help_short_circuits() {
    // --help wins even when followed by garbage
    let parsed = parse_args(args(&["--help", "--width", "banana"])).unwrap();
    assert_eq!(parsed, ParsedArgs::Help);
}

#[test]
fn test_width_and_height() {
    let parsed = parse_args(args(&["--width", "1920", "--height", "1080"])).unwrap();
    let ParsedArgs::Run(options) = parsed else {
        panic!("expected Run");
    };
    assert_eq!(options.width, 1920);
    assert_eq!(options.height, 1080);
}

#[test]
fn test_model_texture_and_flip() {
    let parsed = parse_args(args(&[
        "--model",
        "assets/teapot.obj",
        "--texture",
        "assets/marble.png",
        "--flip-texture",
    ]))
    .unwrap();
    let ParsedArgs::Run(options) = parsed else {
        panic!("expected Run");
    };
    assert_eq!(options.model.unwrap().to_str(), Some("assets/teapot.obj"));
    assert_eq!(options.texture.unwrap().to_str(), Some("assets/marble.png"));
    assert!(options.flip_texture);
}

#[test]
fn test_missing_value_is_an_error() {
    assert!(parse_args(args(&["--width"])).is_err());
    assert!(parse_args(args(&["--model"])).is_err());
}

#[test]
fn test_non_numeric_dimension_is_an_error() {
    assert!(parse_args(args(&["--width", "wide"])).is_err());
    assert!(parse_args(args(&["--height", "-3"])).is_err());
}

#[test]
fn test_zero_dimension_is_an_error() {
    assert!(parse_args(args(&["--width", "0"])).is_err());
    assert!(parse_args(args(&["--height", "0"])).is_err());
}

#[test]
fn test_unknown_argument_is_an_error() {
    assert!(parse_args(args(&["--fullscreen"])).is_err());
}
