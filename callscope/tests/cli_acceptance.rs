use callscope_core::Database;
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("callscope/calls.db")
    }
}

fn fixture_path() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../callscope-core/tests/fixtures/calls.json")
        .to_string_lossy()
        .into_owned()
}

fn run_cli(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("callscope"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("CALLSCOPE_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute callscope: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "callscope {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn import_fixture(env: &CliTestEnv) {
    let fixture = fixture_path();
    let args = ["import", fixture.as_str()];
    let output = run_cli(env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Imported 5 call(s)"),
        "expected import summary in stdout, got:\n{stdout}"
    );
}

#[test]
fn import_populates_local_store() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let db_path = env.db_path();
    assert!(
        db_path.exists(),
        "database file should exist at {}",
        db_path.display()
    );

    let db = Database::open(&db_path).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    assert_eq!(db.count_calls().expect("failed to count calls"), 5);

    let log_dir = env.xdg_state.join("callscope");
    let log_files: Vec<String> = fs::read_dir(&log_dir)
        .expect("log directory should exist")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        log_files.iter().any(|name| name.starts_with("callscope.log.")),
        "expected a dated log file in {}, got {:?}",
        log_dir.display(),
        log_files
    );
}

#[test]
fn report_json_covers_every_analysis() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let args = [
        "report",
        "--start",
        "2024-01-01",
        "--end",
        "2024-01-31",
        "--format",
        "json",
    ];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);

    let report: Value =
        serde_json::from_slice(&output.stdout).expect("report output should be JSON");

    let performance = &report["modelPerformance"];
    assert_eq!(performance["totalCalls"], 5);
    assert_eq!(performance["bestPerformingModel"], "gpt-4");
    assert_eq!(performance["modelsUsed"].as_array().map(Vec::len), Some(3));

    assert_eq!(report["failurePatterns"]["callsWithCriticalFailures"], 2);
    assert_eq!(report["conversationQuality"]["totalEvaluations"], 4);
    assert_eq!(report["accuracyTrends"]["granularity"], "daily");
    assert_eq!(report["technical"]["totalCost"], 1.27);
    assert_eq!(report["request"]["category"], "llm");
}

#[test]
fn report_text_with_filters() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let args = [
        "report",
        "--start",
        "2024-01-01",
        "--end",
        "2024-01-31",
        "--client",
        "globex",
        "--granularity",
        "weekly",
    ];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Model performance"));
    assert!(stdout.contains("Client: globex"));
    assert!(stdout.contains("Best: gpt-3.5"));
    assert!(stdout.contains("Accuracy trends (weekly)"));
    assert!(!stdout.contains("gpt-4"));
}

#[test]
fn min_accuracy_drops_models() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let args = [
        "report",
        "--start",
        "2024-01-01",
        "--end",
        "2024-01-31",
        "--min-accuracy",
        "45",
        "--format",
        "json",
    ];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);

    let report: Value =
        serde_json::from_slice(&output.stdout).expect("report output should be JSON");
    let models = report["modelPerformance"]["modelsUsed"]
        .as_array()
        .expect("modelsUsed should be an array");
    assert_eq!(models.len(), 1);
    assert_eq!(models[0]["model"], "gpt-4");
}

#[test]
fn compare_reports_both_models() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let args = [
        "compare",
        "gpt-4",
        "gpt-3.5",
        "--start",
        "2024-01-01",
        "--end",
        "2024-01-31",
    ];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gpt-4 (2 calls) vs gpt-3.5 (2 calls)"));
    assert!(stdout.contains("Quality"));
    assert!(stdout.contains("Adherence"));
}

#[test]
fn inverted_range_is_rejected() {
    let env = CliTestEnv::new();

    let output = run_cli(
        &env,
        &["report", "--start", "2024-02-01", "--end", "2024-01-01"],
    );
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("start date"),
        "expected range error in stderr, got:\n{stderr}"
    );
}

#[test]
fn unknown_format_is_rejected() {
    let env = CliTestEnv::new();

    let output = run_cli(&env, &["report", "--format", "yaml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown output format"));
}
