//! Integration tests for ember-cli.
//!
//! Each test runs the built `ember` binary and checks its exit status and output.

use std::io::Write;
use std::process::{Command, Output};

fn ember_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ember"))
}

fn run(args: &[&str]) -> Output {
    ember_bin()
        .args(args)
        .output()
        .expect("failed to run ember")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// `ember info`
// ---------------------------------------------------------------------------

#[test]
fn info_lists_voices_and_circuits() {
    let output = run(&["info"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for name in ["borealis", "helios", "nebula"] {
        assert!(text.contains(name), "missing voice '{name}'");
    }
    for name in [
        "germanium",
        "silicon",
        "bjt",
        "opamp-tanh",
        "opamp-knee",
        "cmos",
        "cmos-lut",
        "cmos-approx",
        "jfet",
        "triode",
    ] {
        assert!(text.contains(name), "missing circuit '{name}'");
    }
}

#[test]
fn info_stage_prints_its_controls() {
    let output = run(&["info", "compressor"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("threshold"));
    assert!(text.contains("ratio"));
}

#[test]
fn info_settings_template_is_toml() {
    let output = run(&["info", "--settings-template"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("[pipeline]"));
    assert!(text.contains("[fuzz]"));
}

#[test]
fn info_unknown_topic_fails() {
    let output = run(&["info", "reverb"]);
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// `ember curve`
// ---------------------------------------------------------------------------

#[test]
fn curve_prints_csv() {
    let output = run(&["curve", "opamp-tanh", "--points", "5"]);
    assert!(output.status.success());
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "input,output");
    for line in &lines[1..] {
        let (x, y) = line.split_once(',').expect("two columns");
        assert!(x.parse::<f32>().is_ok());
        assert!(y.parse::<f32>().unwrap().is_finite());
    }
}

#[test]
fn curve_unknown_circuit_fails() {
    let output = run(&["curve", "pentode"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("pentode"));
}

// ---------------------------------------------------------------------------
// `ember render`
// ---------------------------------------------------------------------------

#[test]
fn render_stage_reports_levels() {
    let output = run(&["render", "--stage", "fuzz", "--duration", "0.1", "--settle", "0.02"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("Target:      fuzz"));
    assert!(text.contains("Output"));
}

#[test]
fn render_engine_with_voice_and_param() {
    let output = run(&[
        "render",
        "--voice",
        "helios",
        "-p",
        "helios.drive=8",
        "--duration",
        "0.1",
        "--amplitude",
        "-12",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("engine (helios)"));
    assert!(text.contains("Reduction"));
}

#[test]
fn render_circuit_with_oversampling() {
    let output = run(&[
        "render",
        "--circuit",
        "triode",
        "--oversampling",
        "4",
        "--duration",
        "0.05",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("x4"));
}

#[test]
fn render_with_settings_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[pipeline]\nsample_rate = 44100.0\nmax_block_size = 128\nchannels = 2\n\n\
         [engine]\nvoice = \"nebula\"\n"
    )
    .unwrap();

    let output = ember_bin()
        .arg("render")
        .arg("--settings")
        .arg(file.path())
        .args(["--duration", "0.1"])
        .output()
        .expect("failed to run ember");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("engine (nebula)"));
    assert!(text.contains("44100 Hz, block 128, 2 channel(s)"));
}

#[test]
fn render_rejects_bad_input() {
    assert!(!run(&["render", "--voice", "plexi", "--duration", "0.05"]).status.success());
    assert!(!run(&["render", "--circuit", "pentode"]).status.success());
    let unknown_control = ["render", "--stage", "fuzz", "-p", "volume=1", "--duration", "0.05"];
    assert!(!run(&unknown_control).status.success());
    assert!(!run(&["render", "--oversampling", "4"]).status.success());
}
