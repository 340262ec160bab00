//! End-to-end tests: a generated `.docx` through the whole pipeline.
//!
//! The documents are assembled in memory with `zip::ZipWriter`; SVG rendering
//! goes through a fake renderer, except where the real Kroki client is
//! pointed at a closed port on purpose.

use async_trait::async_trait;
use ebd_toolchain::error::KrokiError;
use ebd_toolchain::{
    run_pipeline, scrape_and_graph, DocxDocument, EbdDescriptor, ExportType,
    ProcessingProgressCallback, RunConfig, Settings, Stage, StageFailure, SvgRenderer,
    ToolchainError,
};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;

// ── Document builder ─────────────────────────────────────────────────────────

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn heading(level: u8, text: &str) -> String {
    format!(
        "<w:p><w:pPr><w:pStyle w:val=\"Heading{level}\"/></w:pPr>\
         <w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        escape(text)
    )
}

fn para(text: &str) -> String {
    format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", escape(text))
}

fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in *row {
            xml.push_str(&format!(
                "<w:tc><w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p></w:tc>",
                escape(cell)
            ));
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

fn docx_bytes(body: &[String]) -> Vec<u8> {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}</w:body></w:document>",
        body.concat()
    );
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

fn write_docx(dir: &Path, body: &[String]) -> PathBuf {
    let path = dir.join("ebd.docx");
    std::fs::write(&path, docx_bytes(body)).unwrap();
    path
}

fn open(body: &[String]) -> DocxDocument {
    DocxDocument::from_reader(Cursor::new(docx_bytes(body)), Path::new("ebd.docx")).unwrap()
}

const HEADER: &[&str] = &["Nr.", "Prüfschritt", "Prüfergebnis", "Code", "Hinweis"];

fn e_0003() -> Vec<String> {
    vec![
        heading(3, "E_0003_Bestellung der Aggregationsebene RZ prüfen"),
        table(&[
            &["Prüfende Rolle: NB"],
            HEADER,
            &["1", "Erfolgt die Bestellung fristgerecht?", "ja → 2", "", ""],
            &["", "", "nein", "A01", "Frist nicht eingehalten"],
            &["2", "Ist die Aggregationsebene bekannt?", "ja → 3", "", ""],
            &["", "", "nein", "A02", ""],
            &["3", "Liegt eine gültige Zuordnung vor?", "ja", "A03", ""],
            &["", "", "nein", "A04", ""],
        ]),
    ]
}

fn e_0401_no_table() -> Vec<String> {
    vec![
        heading(3, "E_0401_Stammdaten prüfen"),
        para("Derzeit ist für diese Entscheidung kein Entscheidungsbaum notwendig."),
    ]
}

fn e_0404_nothing() -> Vec<String> {
    vec![heading(3, "E_0404_Ohne Inhalt")]
}

fn e_0500_cross_reference() -> Vec<String> {
    vec![
        heading(3, "E_0500_Verweis prüfen"),
        table(&[
            HEADER,
            &["1", "Ist die Meldung vollständig?", "ja → E_0003", "", ""],
            &["", "", "nein", "A01", ""],
        ]),
    ]
}

fn e_0600_merge() -> Vec<String> {
    vec![
        heading(3, "E_0600_Zusammenführung prüfen"),
        table(&[
            HEADER,
            &["1", "Ist der Zählpunkt bekannt?", "ja → 2", "", ""],
            &["", "", "nein → 3", "", ""],
            &["3", "Ist eine Ersatz-ID vorhanden?", "ja → 2", "", ""],
            &["", "", "nein", "A01", ""],
            &["2", "Ist der Zeitraum gültig?", "ja", "A02", ""],
            &["", "", "nein", "A03", ""],
        ]),
    ]
}

/// A Word table of contents: `Verzeichnis3` entries with a tab before the page.
fn toc(entries: &[(&str, u32)]) -> Vec<String> {
    let mut body = vec![para("Inhaltsverzeichnis")];
    body.extend(entries.iter().map(|(text, page)| {
        format!(
            "<w:p><w:pPr><w:pStyle w:val=\"Verzeichnis3\"/>\
             <w:tabs><w:tab w:val=\"right\" w:leader=\"dot\" w:pos=\"9062\"/></w:tabs></w:pPr>\
             <w:r><w:t xml:space=\"preserve\">{}</w:t></w:r><w:r><w:tab/><w:t>{page}</w:t></w:r></w:p>",
            escape(text)
        )
    }));
    body
}

fn chapter(parts: Vec<Vec<String>>) -> Vec<String> {
    let mut body = vec![heading(1, "MaBiS"), heading(2, "AD: Bilanzkreiszuordnung")];
    body.extend(parts.into_iter().flatten());
    body
}

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FakeRenderer;

#[async_trait]
impl SvgRenderer for FakeRenderer {
    async fn render_svg(&self, dot: &str) -> Result<String, KrokiError> {
        Ok(format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><!-- {} --></svg>\n",
            dot.lines().count()
        ))
    }
}

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn snapshot(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ProcessingProgressCallback for EventLog {
    fn on_ebd_start(&self, _index: usize, _total: usize, ebd: &EbdDescriptor) {
        self.push(format!("start {}", ebd.key));
    }

    fn on_artifact_written(&self, ebd_key: &str, export_type: ExportType, _path: &Path) {
        self.push(format!("artifact {ebd_key} {export_type}"));
    }

    fn on_stage_failure(&self, ebd_key: &str, failure: &StageFailure) {
        self.push(format!("failure {ebd_key} {}", failure.kind));
    }
}

fn config(dir: &Path, types: &[ExportType]) -> RunConfig {
    RunConfig::builder()
        .output_dir(dir)
        .export_types(types.iter().copied())
        .build()
        .unwrap()
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_row_table_produces_all_four_artifacts() {
    let out = tempfile::tempdir().unwrap();
    let document = open(&chapter(vec![e_0003()]));

    let report = run_pipeline(&document, &FakeRenderer, &config(out.path(), &ExportType::ALL))
        .await
        .unwrap();

    assert!(report.ledger.is_empty());
    assert_eq!(report.ledger.to_pretty_json(4).unwrap(), "{}");
    assert_eq!(
        files_in(out.path()),
        ["E_0003.dot", "E_0003.json", "E_0003.puml", "E_0003.svg"]
    );

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("E_0003.json")).unwrap())
            .unwrap();
    assert_eq!(json["metadata"]["ebd_code"], "E_0003");
    assert_eq!(json["metadata"]["ebd_name"], "Bestellung der Aggregationsebene RZ prüfen");
    assert_eq!(json["metadata"]["role"], "NB");
    assert_eq!(json["metadata"]["chapter"], "MaBiS");
    assert_eq!(json["rows"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn table_of_contents_entries_resolve_to_the_body() {
    let out = tempfile::tempdir().unwrap();
    let mut body = toc(&[
        ("E_0003_Bestellung der Aggregationsebene RZ prüfen", 5),
        ("E_0401_Stammdaten prüfen", 7),
    ]);
    body.extend(chapter(vec![e_0003(), e_0401_no_table()]));
    let document = open(&body);

    let report = run_pipeline(&document, &FakeRenderer, &config(out.path(), &ExportType::ALL))
        .await
        .unwrap();

    assert!(report.ledger.is_empty(), "{}", report.ledger.to_pretty_json(4).unwrap());
    assert_eq!(report.processed, 2);
    assert_eq!(
        files_in(out.path()),
        ["E_0003.dot", "E_0003.json", "E_0003.puml", "E_0003.svg", "E_0401.json"]
    );
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("E_0003.json")).unwrap())
            .unwrap();
    assert_eq!(json["metadata"]["ebd_name"], "Bestellung der Aggregationsebene RZ prüfen");
    assert_eq!(json["metadata"]["chapter"], "MaBiS");
}

#[tokio::test]
async fn missing_table_is_recorded_once_and_writes_nothing() {
    let out = tempfile::tempdir().unwrap();
    let document = open(&chapter(vec![e_0404_nothing()]));

    let report = run_pipeline(&document, &FakeRenderer, &config(out.path(), &ExportType::ALL))
        .await
        .unwrap();

    assert!(files_in(out.path()).is_empty());
    let entries: Vec<(String, Vec<String>)> = report
        .ledger
        .entries()
        .map(|(label, ebds)| (label, ebds.to_vec()))
        .collect();
    assert_eq!(
        entries,
        vec![("[critical:scraping] TableNotFound".to_string(), vec!["E_0404".to_string()])]
    );
}

#[tokio::test]
async fn no_table_marker_only_yields_json() {
    let out = tempfile::tempdir().unwrap();
    let document = open(&chapter(vec![e_0401_no_table()]));

    let report = run_pipeline(&document, &FakeRenderer, &config(out.path(), &ExportType::ALL))
        .await
        .unwrap();

    assert!(report.ledger.is_empty());
    assert_eq!(files_in(out.path()), ["E_0401.json"]);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("E_0401.json")).unwrap())
            .unwrap();
    assert!(json["rows"].as_array().unwrap().is_empty());
    assert_eq!(
        json["metadata"]["remark"],
        "Derzeit ist für diese Entscheidung kein Entscheidungsbaum notwendig."
    );
    assert_eq!(json["metadata"]["role"], "N/A");
}

#[tokio::test]
async fn zero_rows_skip_plantuml_without_error() {
    let out = tempfile::tempdir().unwrap();
    let document = open(&chapter(vec![e_0401_no_table()]));

    let report = run_pipeline(&document, &FakeRenderer, &config(out.path(), &[ExportType::Puml]))
        .await
        .unwrap();

    assert!(report.ledger.is_empty());
    assert!(files_in(out.path()).is_empty());
}

#[tokio::test]
async fn graph_failure_keeps_json_but_blocks_diagrams() {
    let out = tempfile::tempdir().unwrap();
    let document = open(&chapter(vec![e_0500_cross_reference()]));

    let report = run_pipeline(&document, &FakeRenderer, &config(out.path(), &ExportType::ALL))
        .await
        .unwrap();

    assert_eq!(files_in(out.path()), ["E_0500.json"]);
    assert_eq!(
        report
            .ledger
            .ebds_for(Stage::GraphConversion, "EbdCrossReferenceNotSupportedError"),
        ["E_0500"]
    );
}

#[tokio::test]
async fn plantuml_failure_does_not_block_dot_and_svg() {
    let out = tempfile::tempdir().unwrap();
    let document = open(&chapter(vec![e_0600_merge()]));

    let report = run_pipeline(&document, &FakeRenderer, &config(out.path(), &ExportType::ALL))
        .await
        .unwrap();

    assert_eq!(
        files_in(out.path()),
        ["E_0600.dot", "E_0600.json", "E_0600.svg"]
    );
    assert_eq!(
        report
            .ledger
            .ebds_for(Stage::PlantUml, "GraphTooComplexForPlantumlError"),
        ["E_0600"]
    );
}

#[tokio::test]
async fn mixed_document_summary_lists_critical_first() {
    let out = tempfile::tempdir().unwrap();
    let document = open(&chapter(vec![
        e_0600_merge(),
        e_0003(),
        e_0404_nothing(),
        e_0401_no_table(),
        e_0500_cross_reference(),
    ]));

    let report = run_pipeline(&document, &FakeRenderer, &config(out.path(), &ExportType::ALL))
        .await
        .unwrap();

    assert_eq!(report.processed, 5);
    let labels: Vec<String> = report.ledger.entries().map(|(label, _)| label).collect();
    assert_eq!(
        labels,
        [
            "[critical:scraping] TableNotFound",
            "[critical:graph_conversion] EbdCrossReferenceNotSupportedError",
            "[advisory:plantuml] GraphTooComplexForPlantumlError",
        ]
    );

    let printed = report.ledger.to_pretty_json(4).unwrap();
    let first_advisory = printed.find("[advisory:").unwrap();
    assert!(printed.rfind("[critical:").unwrap() < first_advisory);
}

#[tokio::test]
async fn progress_line_precedes_stage_output() {
    let out = tempfile::tempdir().unwrap();
    let document = open(&chapter(vec![
        e_0003(),
        e_0404_nothing(),
        e_0600_merge(),
    ]));
    let log = Arc::new(EventLog::default());
    let config = RunConfig::builder()
        .output_dir(out.path())
        .export_types(ExportType::ALL)
        .progress_callback(log.clone())
        .build()
        .unwrap();

    run_pipeline(&document, &FakeRenderer, &config).await.unwrap();

    let events = log.snapshot();
    for key in ["E_0003", "E_0404", "E_0600"] {
        let mine: Vec<&String> = events
            .iter()
            .filter(|e| e.split(' ').nth(1) == Some(key))
            .collect();
        assert_eq!(mine.first().map(|e| e.as_str()), Some(format!("start {key}").as_str()));
        assert_eq!(mine.iter().filter(|e| e.starts_with("start")).count(), 1);
    }
}

#[tokio::test]
async fn rerun_into_same_directory_is_byte_identical() {
    let out = tempfile::tempdir().unwrap();
    let body = chapter(vec![e_0003(), e_0401_no_table()]);
    let config = config(out.path(), &[ExportType::Json]);

    run_pipeline(&open(&body), &FakeRenderer, &config).await.unwrap();
    let first_0003 = std::fs::read(out.path().join("E_0003.json")).unwrap();
    let first_0401 = std::fs::read(out.path().join("E_0401.json")).unwrap();

    std::fs::write(out.path().join("notes.txt"), "unrelated").unwrap();
    run_pipeline(&open(&body), &FakeRenderer, &config).await.unwrap();

    assert_eq!(std::fs::read(out.path().join("E_0003.json")).unwrap(), first_0003);
    assert_eq!(std::fs::read(out.path().join("E_0401.json")).unwrap(), first_0401);
    assert!(out.path().join("notes.txt").is_file());
}

// ── File entry point ─────────────────────────────────────────────────────────

fn unreachable_kroki() -> Settings {
    Settings {
        kroki_host: "127.0.0.1".into(),
        kroki_port: 1,
    }
}

#[tokio::test]
async fn unreachable_kroki_is_a_rendering_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), &chapter(vec![e_0003()]));
    let out = dir.path().join("output");

    let report = scrape_and_graph(
        &input,
        &unreachable_kroki(),
        &config(&out, &[ExportType::Dot, ExportType::Svg]),
    )
    .await
    .unwrap();

    assert_eq!(files_in(&out), ["E_0003.dot"]);
    assert_eq!(
        report.ledger.ebds_for(Stage::Rendering, "KrokiUnreachableError"),
        ["E_0003"]
    );
}

#[tokio::test]
async fn missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = scrape_and_graph(
        &dir.path().join("missing.docx"),
        &unreachable_kroki(),
        &config(&dir.path().join("output"), &ExportType::ALL),
    )
    .await;
    assert!(matches!(result, Err(ToolchainError::FileNotFound { .. })));
}

#[tokio::test]
async fn directory_as_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = scrape_and_graph(
        dir.path(),
        &unreachable_kroki(),
        &config(&dir.path().join("output"), &ExportType::ALL),
    )
    .await;
    assert!(matches!(result, Err(ToolchainError::NotAFile { .. })));
}

#[tokio::test]
async fn non_docx_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ebd.docx");
    std::fs::write(&input, "this is not a zip archive").unwrap();
    let result = scrape_and_graph(
        &input,
        &unreachable_kroki(),
        &config(&dir.path().join("output"), &ExportType::ALL),
    )
    .await;
    assert!(matches!(result, Err(ToolchainError::NotADocx { .. })));
}
