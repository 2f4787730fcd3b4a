mod common;

use std::path::Path;

use report_pdf::{
    CompileOptions, FALLBACK_FILENAME, FontSet, LayoutOptions, PageGeometry, StructuredReport,
    compile_report_text, compile_report_to_pdf, paginate_with, parse, render_pdf,
    suggested_filename,
};

const TEST_FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fonts/demo.ttf");

const SAMPLE: &str = "Grid Storage Outlook\n\
Introduction\n\
Storage capacity grew quickly over the last decade.\n\
Conclusion\n\
Costs keep falling.\n\
Sources\n\
1. Agency report\n\
- Utility filings";

fn page_objects(pdf: &[u8]) -> usize {
    String::from_utf8_lossy(pdf)
        .lines()
        .filter(|l| l.trim() == "/Type /Page")
        .count()
}

/// Inflated content of every Flate stream in the file.
fn inflated_streams(pdf: &[u8]) -> Vec<String> {
    let start_tag = b">>\nstream\n";
    let end_tag = b"\nendstream";
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(off) = pdf[pos..].windows(start_tag.len()).position(|w| w == start_tag) {
        let data_start = pos + off + start_tag.len();
        let Some(len) = pdf[data_start..]
            .windows(end_tag.len())
            .position(|w| w == end_tag)
        else {
            break;
        };
        let data = &pdf[data_start..data_start + len];
        if let Ok(raw) = miniz_oxide::inflate::decompress_to_vec_zlib(data) {
            out.push(String::from_utf8_lossy(&raw).into_owned());
        }
        pos = data_start + len;
    }
    out
}

fn options() -> CompileOptions {
    CompileOptions {
        layout: LayoutOptions::new("2024-05-01"),
        ..Default::default()
    }
}

#[test]
fn renders_one_pdf_page_per_planned_page() {
    let _ = env_logger::try_init();
    let options = options();
    let report = parse(SAMPLE);
    let plan = paginate_with(&report, options.geometry, &options.fonts, &options.layout)
        .expect("paginate");

    let pdf = render_pdf(&plan, &options.fonts).expect("render");
    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(page_objects(&pdf), plan.pages.len());

    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("/BaseFont /Helvetica"));
    assert!(text.contains("/BaseFont /Helvetica-Bold"));
    assert!(text.contains("/FlateDecode"));
}

#[test]
fn content_streams_carry_page_labels() {
    let pdf = compile_report_text(SAMPLE, &options()).expect("compile");
    let streams = inflated_streams(&pdf);
    assert_eq!(streams.len(), 3);
    assert!(streams[0].contains("(Grid Storage Outlook) Tj"));
    assert!(!streams[0].contains("(Page "));
    assert!(streams[1].contains("(Page 1 of 2) Tj"));
    assert!(streams[2].contains("(Page 2 of 2) Tj"));
    assert!(streams[2].contains("(Generated on 2024-05-01) Tj"));
}

#[test]
fn embeds_truetype_faces_as_cid_fonts() {
    let fonts = FontSet::from_files(Path::new(TEST_FONT), None).expect("load test font");
    assert!(!fonts.regular.is_builtin());
    let options = CompileOptions {
        fonts,
        ..options()
    };
    let pdf = compile_report_text("AAAA\nIntroduction\nA A\nConclusion\nAA", &options)
        .expect("compile");
    assert!(pdf.starts_with(b"%PDF-"));

    let text = String::from_utf8_lossy(&pdf);
    for key in ["/Type0", "/FontFile2", "/ToUnicode", "/Identity-H", "beginbfchar"] {
        assert!(text.contains(key), "missing {key}");
    }
    assert!(!text.contains("/BaseFont /Helvetica"));

    // The font maps only 'A', which lands right after .notdef in the subset.
    let streams = inflated_streams(&pdf);
    assert!(
        streams[0].contains(r"(\000\001\000\001\000\001\000\001) Tj"),
        "title not drawn as 2-byte glyph ids"
    );
}

#[test]
fn compile_text_matches_manual_pipeline() {
    let options = options();
    let pdf = compile_report_text(SAMPLE, &options).expect("compile");
    // title + ToC + one content page
    assert_eq!(page_objects(&pdf), 3);
}

#[test]
fn letter_pages_use_letter_media_box() {
    let options = CompileOptions {
        geometry: PageGeometry::letter(),
        ..options()
    };
    let pdf = compile_report_text(SAMPLE, &options).expect("compile");
    let text = String::from_utf8_lossy(&pdf);
    let boxes: Vec<Vec<f32>> = text
        .lines()
        .filter_map(|l| l.trim().strip_prefix("/MediaBox ["))
        .map(|rest| {
            rest.trim_end_matches(']')
                .split_whitespace()
                .filter_map(|n| n.parse().ok())
                .collect()
        })
        .collect();
    assert_eq!(boxes.len(), page_objects(&pdf));
    for b in boxes {
        assert_eq!(b, [0.0, 0.0, 612.0, 792.0]);
    }
}

#[test]
fn long_report_renders() {
    let fonts = FontSet::builtin();
    let plan = paginate_with(
        &common::long_report(),
        PageGeometry::a4(),
        &fonts,
        &LayoutOptions::default(),
    )
    .expect("paginate");
    let pdf = render_pdf(&plan, &fonts).expect("render");
    assert_eq!(page_objects(&pdf), plan.pages.len());
    assert!(plan.pages.len() > 3);
}

#[test]
fn empty_report_still_renders() {
    let pdf = compile_report_text("", &options()).expect("compile");
    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(page_objects(&pdf), 1);
}

#[test]
fn compile_to_file_writes_output() {
    let dir = std::env::temp_dir().join(format!("report-pdf-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let input = dir.join("report.txt");
    let output = dir.join("report.pdf");
    std::fs::write(&input, SAMPLE).expect("write input");

    compile_report_to_pdf(&input, &output, &options()).expect("compile");
    let bytes = std::fs::read(&output).expect("read output");
    assert!(bytes.starts_with(b"%PDF-"));

    let missing = dir.join("missing.txt");
    let never = dir.join("never.pdf");
    let err = compile_report_to_pdf(&missing, &never, &options()).unwrap_err();
    assert!(matches!(err, report_pdf::Error::Io(_)));
    assert!(!never.exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn filename_from_title() {
    let report = parse(SAMPLE);
    assert_eq!(suggested_filename(&report), "grid-storage-outlook.pdf");

    let report = StructuredReport {
        title: Some("AI & Energy: 2030?".to_string()),
        ..Default::default()
    };
    assert_eq!(suggested_filename(&report), "ai---energy--2030-.pdf");
}

#[test]
fn filename_uses_first_fifty_characters() {
    let report = StructuredReport {
        title: Some("x".repeat(80)),
        ..Default::default()
    };
    assert_eq!(suggested_filename(&report), format!("{}.pdf", "x".repeat(50)));
}

#[test]
fn filename_falls_back_without_title() {
    assert_eq!(suggested_filename(&parse("")), FALLBACK_FILENAME);
    let report = StructuredReport {
        title: Some("???".to_string()),
        ..Default::default()
    };
    assert_eq!(suggested_filename(&report), FALLBACK_FILENAME);
}
