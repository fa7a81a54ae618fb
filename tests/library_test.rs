use chrono::{NaiveDate, TimeZone, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use pretty_assertions::assert_eq;

use waiver_pdf::assets::RenderAssets;
use waiver_pdf::content::default_template;
use waiver_pdf::metrics::StandardFonts;
use waiver_pdf::model::{MediaRelease, Passenger, Signatures};
use waiver_pdf::{
    annotate, Compositor, DisplayZone, OverlayMetadata, RenderSettings, WaiverError,
    WaiverSubmission, WaiverType,
};

fn submission(waiver_type: WaiverType) -> WaiverSubmission {
    WaiverSubmission {
        waiver_id: Some("PAS-7KX2M9QD4R".into()),
        waiver_type,
        created_at: Some(Utc.with_ymd_and_hms(2025, 3, 5, 20, 4, 9).unwrap()),
        expiry_date: None,
        passenger: Passenger {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            town: "Springfield".into(),
        },
        representative: None,
        contact: Default::default(),
        agreements: Default::default(),
        media_release: MediaRelease::FullConsent,
        signatures: Signatures::default(),
    }
}

/// A plain N-page document standing in for a scanner's output.
fn scanned_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });

    let mut kids = Vec::new();
    for i in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {}", i + 1))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn composed_waiver_parses_with_planned_page_count() {
    let fonts = StandardFonts;
    let compositor = Compositor::new(
        &fonts,
        RenderSettings::default(),
        DisplayZone::from_name("America/Vancouver").unwrap(),
    );
    let now = Utc.with_ymd_and_hms(2025, 3, 6, 0, 0, 0).unwrap();

    for waiver_type in [WaiverType::Passenger, WaiverType::Representative] {
        let template = default_template(waiver_type);
        let submission = submission(waiver_type);
        let assets = RenderAssets::default();

        let plan = compositor.layout(&template, &submission, &assets, now);
        let bytes = compositor
            .compose(&template, &submission, &assets, now)
            .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), plan.page_count());
    }
}

#[test]
fn annotation_touches_only_the_first_page() {
    let input = scanned_pdf(4);
    let metadata = OverlayMetadata {
        waiver_id: "PAS-0123456789".into(),
        signed_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        uploaded_by_email: "volunteer@example.org".into(),
        upload_date: None,
    };

    let output = annotate(&input, &metadata).unwrap();
    let before = Document::load_mem(&input).unwrap();
    let after = Document::load_mem(&output).unwrap();

    let (before_pages, after_pages) = (before.get_pages(), after.get_pages());
    assert_eq!(after_pages.len(), 4);

    let first = String::from_utf8_lossy(&after.get_page_content(after_pages[&1]).unwrap())
        .into_owned();
    assert!(first.contains("Page 1"));
    assert!(first.contains("(1 June 2026) Tj"));
    assert!(!first.contains("Uploaded:"));

    for n in 2..=4u32 {
        assert_eq!(
            after.get_page_content(after_pages[&n]).unwrap(),
            before.get_page_content(before_pages[&n]).unwrap()
        );
    }
}

#[test]
fn empty_or_garbage_input_is_malformed() {
    let metadata = OverlayMetadata {
        waiver_id: "PAS-0123456789".into(),
        signed_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        uploaded_by_email: "volunteer@example.org".into(),
        upload_date: None,
    };
    for input in [&b""[..], &b"%PDF-1.4\nnot really"[..]] {
        assert!(matches!(
            annotate(input, &metadata),
            Err(WaiverError::MalformedPdf(_))
        ));
    }
}
