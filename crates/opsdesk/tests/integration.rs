//! End-to-end CLI integration tests for the `opsdesk` binary.
//!
//! Each test creates its own temporary directory, initializes an
//! `.opsdesk` directory, and runs the binary as a subprocess via
//! `assert_cmd`. Engine interaction goes to a `mockito` server.

use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn opsdesk() -> Command {
    let mut cmd = Command::cargo_bin("opsdesk").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("OPSDESK_DIR").env_remove("RUST_LOG");
    cmd
}

fn init_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    opsdesk()
        .args(["init", "--quiet"])
        .current_dir(tmp.path())
        .assert()
        .success();
    tmp
}

fn run_json(tmp: &TempDir, args: &[&str]) -> Value {
    let mut full = args.to_vec();
    full.push("--json");
    let output = opsdesk().args(&full).current_dir(tmp.path()).output().unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn add_task(tmp: &TempDir, name: &str, extra: &[&str]) -> String {
    let mut args = vec!["tasks", "add", "--name", name];
    args.extend_from_slice(extra);
    run_json(tmp, &args)["id"].as_str().unwrap().to_string()
}

/// Points the project's engine configuration at `server`.
fn use_engine(tmp: &TempDir, server: &mockito::Server) {
    opsdesk()
        .args(["config", "set", "engine.base_url", &server.url()])
        .current_dir(tmp.path())
        .assert()
        .success();
}

/// Serves `schema` as the deployed form of engine task `external_id`.
fn mock_form(server: &mut mockito::Server, external_id: &str, schema: &Value) -> mockito::Mock {
    server
        .mock("GET", format!("/engine-rest/task/{external_id}/deployed-form").as_str())
        .with_header("content-type", "application/json")
        .with_body(schema.to_string())
        .create()
}

fn inspection_schema() -> Value {
    json!({
        "id": "inspeccion",
        "components": [
            {"id": "t", "type": "text", "text": "Revise la unidad antes de salir"},
            {"id": "p", "type": "textfield", "key": "placa", "label": "Placa", "validate": {"required": true}},
            {"id": "g", "type": "group", "label": "Chofer", "path": "driver", "components": [
                {"id": "n", "type": "textfield", "key": "name", "label": "Nombre"}
            ]},
            {"id": "x", "type": "signature", "key": "firma"}
        ]
    })
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_and_refuses_twice() {
    let tmp = init_project();
    let dir = tmp.path().join(".opsdesk");
    assert!(dir.join("config.yaml").is_file());
    assert!(dir.join(".gitignore").is_file());
    assert!(dir.join("opsdesk.db").is_file());

    opsdesk()
        .arg("init")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));

    opsdesk()
        .args(["init", "--force", "--quiet"])
        .current_dir(tmp.path())
        .assert()
        .success();
}

#[test]
fn commands_without_directory_fail_with_hint() {
    let tmp = TempDir::new().unwrap();
    opsdesk()
        .args(["tasks", "list"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("opsdesk init"));
}

// ---------------------------------------------------------------------------
// tasks
// ---------------------------------------------------------------------------

#[test]
fn task_lifecycle() {
    let tmp = init_project();
    let id = add_task(
        &tmp,
        "Registrar salida",
        &["--external-id", "cam-1", "--var", "unidad=T-12"],
    );
    add_task(&tmp, "Subir reporte", &["--kind", "subirReporteMovimientos"]);

    let pending = run_json(&tmp, &["tasks", "list"]);
    assert_eq!(pending.as_array().unwrap().len(), 2);

    let shown = run_json(&tmp, &["tasks", "show", &id]);
    assert_eq!(shown["external_id"], json!("cam-1"));
    assert_eq!(shown["variables"]["unidad"], json!("T-12"));

    let toggled = run_json(&tmp, &["tasks", "toggle", &id]);
    assert_eq!(toggled["is_completed"], json!(true));

    assert_eq!(run_json(&tmp, &["tasks", "list"]).as_array().unwrap().len(), 1);
    let completed = run_json(&tmp, &["tasks", "list", "--completed"]);
    assert_eq!(completed[0]["id"], json!(id));
    assert_eq!(run_json(&tmp, &["tasks", "list", "--all"]).as_array().unwrap().len(), 2);

    opsdesk()
        .args(["tasks", "delete", &id])
        .current_dir(tmp.path())
        .assert()
        .success();
    opsdesk()
        .args(["tasks", "show", &id])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn plain_listing_shows_names() {
    let tmp = init_project();
    add_task(&tmp, "Revisar llantas", &["--id", "od-llantas"]);
    opsdesk()
        .args(["tasks", "list"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("od-llantas")
                .and(predicate::str::contains("Revisar llantas")),
        );
}

#[test]
fn import_skips_known_engine_tasks() {
    let tmp = init_project();
    let file = tmp.path().join("tasks.jsonl");
    std::fs::write(
        &file,
        concat!(
            r#"{"camundaId": "cam-1", "name": "Cargar caja", "asignee": "patio"}"#, "\n",
            r#"{"camundaId": "cam-2", "name": "Entregar"}"#, "\n",
            "\n",
            r#"{"camundaId": "cam-1", "name": "Cargar caja otra vez"}"#, "\n",
        ),
    )
    .unwrap();

    let report = run_json(&tmp, &["tasks", "import", file.to_str().unwrap()]);
    assert_eq!(report, json!({"added": 2, "skipped": 1}));

    let again = run_json(&tmp, &["tasks", "import", file.to_str().unwrap()]);
    assert_eq!(again, json!({"added": 0, "skipped": 3}));

    let tasks = run_json(&tmp, &["tasks", "list", "--assignee", "patio"]);
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["name"], json!("Cargar caja"));
}

#[test]
fn export_feeds_import_elsewhere() {
    let source = init_project();
    add_task(&source, "Cargar caja", &["--external-id", "cam-1"]);
    let done = add_task(&source, "Entregar", &["--external-id", "cam-2"]);
    run_json(&source, &["tasks", "toggle", &done]);

    let out = opsdesk()
        .args(["tasks", "export", "--all"])
        .current_dir(source.path())
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout.clone()).unwrap().lines().count(), 2);

    let target = init_project();
    let file = target.path().join("export.jsonl");
    std::fs::write(&file, &out.stdout).unwrap();
    let report = run_json(&target, &["tasks", "import", file.to_str().unwrap()]);
    assert_eq!(report, json!({"added": 2, "skipped": 0}));
    assert_eq!(run_json(&target, &["tasks", "list"]).as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// routes
// ---------------------------------------------------------------------------

#[test]
fn routes_list_newest_first() {
    let tmp = init_project();
    for (inicio, destino) in [("2025-09-01T08:00:00Z", "MTY"), ("2025-09-03T08:00:00Z", "NLD")] {
        opsdesk()
            .args([
                "routes", "add", "--unidad", "T-1", "--origen", "SLP", "--destino", destino,
                "--inicio", inicio,
            ])
            .current_dir(tmp.path())
            .assert()
            .success();
    }
    let routes = run_json(&tmp, &["routes", "list", "T-1"]);
    let destinos: Vec<&str> = routes
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["destino"].as_str().unwrap())
        .collect();
    assert_eq!(destinos, vec!["NLD", "MTY"]);
    assert_eq!(run_json(&tmp, &["routes", "list", "T-9"]), json!([]));
}

// ---------------------------------------------------------------------------
// form
// ---------------------------------------------------------------------------

#[test]
fn preview_renders_local_schema() {
    let tmp = init_project();
    let schema = tmp.path().join("inspeccion.json");
    let vars = tmp.path().join("vars.json");
    std::fs::write(&schema, inspection_schema().to_string()).unwrap();
    std::fs::write(
        &vars,
        json!({"placa": "ABC-123", "driver": {"name": "Juan"}}).to_string(),
    )
    .unwrap();

    opsdesk()
        .args(["form", "preview", schema.to_str().unwrap(), "--vars", vars.to_str().unwrap()])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Revise la unidad antes de salir")
                .and(predicate::str::contains("Placa * [placa]: ABC-123"))
                .and(predicate::str::contains("  Nombre [driver.name]: Juan"))
                .and(predicate::str::contains("Tipo de campo no soportado (signature)")),
        );
}

#[test]
fn preview_json_reports_seeded_values() {
    let tmp = TempDir::new().unwrap();
    let schema = tmp.path().join("inspeccion.json");
    std::fs::write(&schema, inspection_schema().to_string()).unwrap();
    let out = run_json(&tmp, &["form", "preview", schema.to_str().unwrap()]);
    assert_eq!(out["title"], json!("inspeccion"));
    assert_eq!(out["values"], json!({}));
}

#[test]
fn local_task_has_no_engine_form() {
    let tmp = init_project();
    let id = add_task(&tmp, "Checklist interno", &[]);
    opsdesk()
        .args(["form", "show", &id])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no engine form"));
}

#[test]
fn submit_fetches_completes_and_marks_done() {
    let tmp = init_project();
    let mut server = mockito::Server::new();
    use_engine(&tmp, &server);
    let form = mock_form(&mut server, "cam-7", &inspection_schema());
    let complete = server
        .mock("POST", "/engine-rest/task/cam-7/complete")
        .match_body(Matcher::Json(json!({
            "variables": {
                "placa": {"value": "XYZ-9"},
                "driver": {"value": r#"{"name":"Juan"}"#, "type": "Json"}
            },
            "withVariablesInReturn": true
        })))
        .with_status(204)
        .create();
    let id = add_task(
        &tmp,
        "Inspección",
        &["--external-id", "cam-7", "--var", "driver.name=Juan"],
    );

    let out = run_json(&tmp, &["form", "submit", &id, "--set", "placa=XYZ-9"]);
    assert_eq!(out["submitted"], json!(true));
    assert_eq!(out["variables"], json!({"placa": "XYZ-9", "driver": {"name": "Juan"}}));
    form.assert();
    complete.assert();

    let task = run_json(&tmp, &["tasks", "show", &id]);
    assert_eq!(task["is_completed"], json!(true));
}

#[test]
fn submit_blocked_by_validation_never_completes() {
    let tmp = init_project();
    let mut server = mockito::Server::new();
    use_engine(&tmp, &server);
    let form = mock_form(&mut server, "cam-8", &inspection_schema());
    let complete = server
        .mock("POST", "/engine-rest/task/cam-8/complete")
        .expect(0)
        .create();
    let id = add_task(&tmp, "Inspección", &["--external-id", "cam-8"]);

    opsdesk()
        .args(["form", "submit", &id])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Placa (placa): a value is required"));

    form.assert();
    complete.assert();
    let task = run_json(&tmp, &["tasks", "show", &id]);
    assert!(task.get("is_completed").is_none());
}

#[test]
fn dry_run_prints_wire_payload() {
    let tmp = init_project();
    let schema = json!({"components": [
        {"id": "p", "type": "textfield", "key": "placa"},
        {"id": "f", "type": "filepicker", "key": "fotos", "multiple": true}
    ]});
    let mut server = mockito::Server::new();
    use_engine(&tmp, &server);
    let form = mock_form(&mut server, "cam-9", &schema);
    let complete = server
        .mock("POST", "/engine-rest/task/cam-9/complete")
        .expect(0)
        .create();
    let id = add_task(&tmp, "Fotos de carga", &["--external-id", "cam-9"]);

    let out = opsdesk()
        .args([
            "form", "submit", &id, "--set", "placa=A1", "--file", "fotos=/tmp/a.jpg", "--file",
            "fotos=/tmp/b.jpg", "--dry-run",
        ])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let body: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(
        body["variables"]["fotos"],
        json!({"value": r#"["dry-run:a.jpg","dry-run:b.jpg"]"#, "type": "Json"})
    );
    form.assert();
    complete.assert();

    // Nothing was completed.
    let task = run_json(&tmp, &["tasks", "show", &id]);
    assert!(task.get("is_completed").is_none());
}

// ---------------------------------------------------------------------------
// config, version
// ---------------------------------------------------------------------------

#[test]
fn config_get_and_set() {
    let tmp = init_project();
    opsdesk()
        .args(["config", "get", "engine.base_url"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout("http://localhost:8080\n");

    opsdesk()
        .args(["config", "set", "engine.timeout_secs", "5"])
        .current_dir(tmp.path())
        .assert()
        .success();
    assert_eq!(
        run_json(&tmp, &["config", "get", "engine.timeout_secs"])["value"],
        json!("5")
    );

    assert_eq!(
        run_json(&tmp, &["config", "get", "route_history_limit"])["value"],
        json!("2")
    );
    opsdesk()
        .args(["config", "set", "route_history_limit", "4"])
        .current_dir(tmp.path())
        .assert()
        .success();
    opsdesk()
        .args(["config", "get", "route_history_limit"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout("4\n");

    opsdesk()
        .args(["config", "set", "engine.nope", "x"])
        .current_dir(tmp.path())
        .assert()
        .failure();
}

#[test]
fn version_json() {
    let tmp = TempDir::new().unwrap();
    let out = run_json(&tmp, &["version"]);
    assert!(out["version"].is_string());
}
