use std::fs;
use std::path::Path;
use std::process::Command;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_waiver-pdf"))
}

fn output_dir() -> &'static Path {
    Path::new("tests/output")
}

fn setup() {
    fs::create_dir_all(output_dir()).expect("Failed to create output directory");
}

fn cleanup_file(name: &str) {
    let path = output_dir().join(name);
    if path.exists() {
        fs::remove_file(&path).ok();
    }
}

fn write_fixture(name: &str, content: &str) -> String {
    let path = output_dir().join(name);
    fs::write(&path, content).expect("Failed to write fixture");
    path.to_string_lossy().into_owned()
}

const PASSENGER_SUBMISSION: &str = r#"{
    "waiverId": "PAS-7KX2M9QD4R",
    "waiverType": "passenger",
    "createdAt": "2025-03-05T20:04:09Z",
    "passenger": { "firstName": "Jane", "lastName": "Doe", "town": "Springfield" },
    "contact": { "email": "jane@example.org", "phone": "555-0100" },
    "mediaRelease": "fullConsent",
    "signatures": {
        "passenger": { "timestamp": 1741205049 },
        "witness": { "name": "Wendy Witness", "timestamp": "2025-03-05T20:04:09Z" }
    }
}"#;

const REPRESENTATIVE_SUBMISSION: &str = r#"{
    "waiverType": "representative",
    "createdAt": "2025-03-05T20:04:09Z",
    "passenger": { "firstName": "Jane", "lastName": "Doe", "town": "Springfield" },
    "representative": { "firstName": "John", "lastName": "Roe" },
    "mediaRelease": "noConsent",
    "signatures": {
        "passenger": {},
        "witness": { "name": "Wendy Witness" }
    }
}"#;

fn assert_pdf(path: &Path) -> lopdf::Document {
    assert!(path.exists(), "PDF file was not created");
    let metadata = fs::metadata(path).expect("Failed to get file metadata");
    assert!(metadata.len() > 1000, "PDF file is too small, likely empty or corrupt");
    lopdf::Document::load(path).expect("Output is not a readable PDF")
}

#[test]
fn test_compose_passenger_waiver() {
    setup();
    let output_file = "test-compose-passenger.pdf";
    cleanup_file(output_file);
    let submission = write_fixture("passenger-submission.json", PASSENGER_SUBMISSION);

    let output = cargo_bin()
        .args([
            "compose",
            "-s", &submission,
            "--time-zone", "America/Vancouver",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ Generated"));
    assert!(stdout.contains("PAS-7KX2M9QD4R"));

    let doc = assert_pdf(&output_dir().join(output_file));
    assert!(!doc.get_pages().is_empty());
}

#[test]
fn test_compose_representative_letter_generates_id() {
    setup();
    let output_file = "test-compose-representative.pdf";
    cleanup_file(output_file);
    let submission = write_fixture("representative-submission.json", REPRESENTATIVE_SUBMISSION);

    let output = cargo_bin()
        .args([
            "compose",
            "-s", &submission,
            "--page-size", "letter",
            "--time-zone", "UTC",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ID: PAS-"), "no generated ID in {}", stdout);
    assert!(stdout.contains("John Roe"));

    let doc = assert_pdf(&output_dir().join(output_file));
    let first = doc.get_pages()[&1];
    let media_box = doc
        .get_dictionary(first)
        .and_then(|page| page.get(b"MediaBox"))
        .and_then(|obj| obj.as_array())
        .expect("page has a MediaBox")
        .clone();
    let width = match &media_box[2] {
        lopdf::Object::Real(w) => *w as f64,
        lopdf::Object::Integer(w) => *w as f64,
        other => panic!("unexpected MediaBox entry {:?}", other),
    };
    assert!((width - 612.0).abs() < 1.0, "not a Letter page: {}", width);
}

#[test]
fn test_compose_with_custom_template() {
    setup();
    let output_file = "test-compose-custom-template.pdf";
    cleanup_file(output_file);
    let submission = write_fixture("custom-submission.json", PASSENGER_SUBMISSION);
    let template = write_fixture(
        "custom-template.json",
        r#"{
            "waiverType": "passenger",
            "version": "v2.3",
            "effectiveDate": "2025-01-01",
            "title": "Trishaw Ride Waiver",
            "blocks": [
                { "id": "intro", "label": "Intro", "templateText": "I, {{firstName}} {{lastName}} of {{town}}, agree." },
                { "id": "sectionTitle", "label": "Title", "templateText": "Terms of Riding" },
                { "id": "c1", "label": "Helmet", "templateText": "I will wear the provided blanket in cold weather." }
            ]
        }"#,
    );

    let output = cargo_bin()
        .args([
            "compose",
            "-s", &submission,
            "-t", &template,
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&output_dir().join(output_file));
}

#[test]
fn test_compose_rejects_invalid_submission() {
    setup();
    let submission = write_fixture("broken-submission.json", "{ \"waiverType\": ");

    let output = cargo_bin()
        .args(["compose", "-s", &submission, "-o", "tests/output/never.pdf"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "stderr was {}", stderr);
}

#[test]
fn test_annotate_scanned_waiver() {
    setup();
    let scan_file = "test-annotate-scan.pdf";
    let output_file = "test-annotate-stamped.pdf";
    cleanup_file(scan_file);
    cleanup_file(output_file);

    // Any readable PDF stands in for a scan.
    let compose = cargo_bin()
        .args([
            "compose",
            "-s", &write_fixture("annotate-submission.json", PASSENGER_SUBMISSION),
            "-o", &format!("tests/output/{}", scan_file),
        ])
        .output()
        .expect("Failed to execute command");
    assert!(compose.status.success(), "Command failed: {:?}", compose);
    let before = assert_pdf(&output_dir().join(scan_file)).get_pages().len();

    let output = cargo_bin()
        .args([
            "annotate",
            "-i", &format!("tests/output/{}", scan_file),
            "--signed-date", "2024-02-29",
            "--uploaded-by", "volunteer.coordinator@example.org",
            "--upload-date", "2025-03-05",
            "--waiver-id", "PAS-0123456789",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let doc = assert_pdf(&output_dir().join(output_file));
    assert_eq!(doc.get_pages().len(), before);

    let first = doc.get_pages()[&1];
    let content = String::from_utf8_lossy(&doc.get_page_content(first).unwrap()).into_owned();
    assert!(content.contains("(PAS-0123456789) Tj"));
    assert!(content.contains("(28 February 2025) Tj"));
}

#[test]
fn test_annotate_rejects_bad_date() {
    setup();
    let output = cargo_bin()
        .args([
            "annotate",
            "-i", "tests/output/does-not-matter.pdf",
            "--signed-date", "29/02/2024",
            "--uploaded-by", "a@b.co",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}

#[test]
fn test_annotate_rejects_non_pdf() {
    setup();
    let input = write_fixture("not-a-pdf.pdf", "this is plain text");

    let output = cargo_bin()
        .args([
            "annotate",
            "-i", &input,
            "--signed-date", "2024-06-01",
            "--uploaded-by", "a@b.co",
            "-o", "tests/output/never-annotated.pdf",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Malformed input PDF"), "stderr was {}", stderr);
}

#[test]
fn test_new_id() {
    let output = cargo_bin()
        .args(["new-id", "-n", "3"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let ids: Vec<&str> = stdout.lines().collect();
    assert_eq!(ids.len(), 3);
    for id in ids {
        assert!(id.starts_with("PAS-"));
        assert_eq!(id.len(), 14);
    }
}
