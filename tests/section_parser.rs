use report_pdf::{
    HeuristicParser, ParseOptions, ReportParser, StructuredReport, parse, source_entries,
};

fn field_lines(report: &StructuredReport) -> Vec<String> {
    let mut out = Vec::new();
    for text in [&report.introduction, &report.body, &report.conclusion]
        .into_iter()
        .flatten()
    {
        out.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        );
    }
    out.extend(report.sources.iter().flatten().cloned());
    out
}

#[test]
fn labelled_sections() {
    let r = parse("My Title\nIntroduction\nHello.\nConclusion\nBye.\nSources\n1. A\n2. B");
    assert_eq!(r.title.as_deref(), Some("My Title"));
    assert_eq!(r.introduction.as_deref(), Some("Hello."));
    assert_eq!(r.body, None);
    assert_eq!(r.conclusion.as_deref(), Some("Bye."));
    assert_eq!(r.sources, Some(vec!["A".to_string(), "B".to_string()]));
}

#[test]
fn parse_is_idempotent() {
    let inputs = [
        "My Title\nIntroduction\nHello.\nConclusion\nBye.\nSources\n1. A\n2. B",
        "Title\n\nFirst.\n\nSecond.\n\nThird.",
        "",
        "   \n\n",
        "Only a title",
    ];
    for raw in inputs {
        assert_eq!(parse(raw), parse(raw), "input {raw:?}");
    }
}

#[test]
fn empty_input_has_no_title() {
    assert_eq!(parse(""), StructuredReport::default());
    assert_eq!(parse(" \n\t\n  "), StructuredReport::default());
    assert!(parse("\n\n").is_empty());
}

#[test]
fn title_is_first_non_blank_line_trimmed() {
    let r = parse("\n\n   Energy Outlook 2030  \nIntroduction\nText");
    assert_eq!(r.title.as_deref(), Some("Energy Outlook 2030"));
    assert_eq!(r.introduction.as_deref(), Some("Text"));
}

#[test]
fn title_only() {
    let r = parse("Only a title\n\n");
    assert_eq!(r.title.as_deref(), Some("Only a title"));
    assert!(r.present_sections().is_empty());
}

#[test]
fn markers_are_case_insensitive_and_trimmed() {
    let r = parse("T\n  INTRODUCTION \nHi\n\tConclusion\nBye\nREFERENCES\n- Ref");
    assert_eq!(r.introduction.as_deref(), Some("Hi"));
    assert_eq!(r.conclusion.as_deref(), Some("Bye"));
    assert_eq!(r.sources, Some(vec!["Ref".to_string()]));
}

#[test]
fn marker_must_be_the_whole_line() {
    let r = parse("T\nIntroduction to batteries\nMore text");
    assert_eq!(r.introduction, None);
    assert!(r.body.as_deref().is_some_and(|b| b.contains("Introduction to batteries")));
}

#[test]
fn text_before_first_marker_is_body() {
    let r = parse("T\nPreamble line\nIntroduction\nHi\nConclusion\nBye");
    assert_eq!(r.body.as_deref(), Some("Preamble line"));
    assert_eq!(r.introduction.as_deref(), Some("Hi"));
    assert_eq!(r.conclusion.as_deref(), Some("Bye"));
}

#[test]
fn reentered_label_keeps_last_text() {
    let r = parse("T\nIntroduction\nA\nConclusion\nB\nIntroduction\nC");
    assert_eq!(r.introduction.as_deref(), Some("C"));
    assert_eq!(r.conclusion.as_deref(), Some("B"));
    assert_eq!(r.body, None);
}

#[test]
fn empty_sections_stay_absent() {
    let r = parse("T\nIntroduction\n\n\nConclusion\nDone\nSources\n\n");
    assert_eq!(r.introduction, None);
    assert_eq!(r.conclusion.as_deref(), Some("Done"));
    assert_eq!(r.sources, None);
}

#[test]
fn unmarked_report_splits_at_early_blank_line() {
    let paragraphs: Vec<String> = (1..=10).map(|i| format!("Paragraph {i}.")).collect();
    let raw = format!("Title\n{}", paragraphs.join("\n\n"));
    let r = parse(&raw);
    assert_eq!(r.introduction.as_deref(), Some("Paragraph 1."));
    let body = r.body.expect("body");
    assert!(body.starts_with("Paragraph 2."));
    assert!(body.ends_with("Paragraph 10."));
    assert_eq!(r.conclusion, None);
    assert_eq!(r.sources, None);
}

#[test]
fn unmarked_report_without_blank_line_takes_three_lines() {
    let r = parse("T\nA\nB\nC\nD\nE");
    assert_eq!(r.introduction.as_deref(), Some("A\nB\nC"));
    assert_eq!(r.body.as_deref(), Some("D\nE"));
}

#[test]
fn short_unmarked_report_stays_body() {
    let r = parse("T\nJust one line of findings.");
    assert_eq!(r.introduction, None);
    assert_eq!(r.body.as_deref(), Some("Just one line of findings."));
}

#[test]
fn inline_headings_found_inside_body() {
    let raw = "T\nIntro para.\n\nBody para one.\nBody para two.\nIn Conclusion\nWrap up.\nReferences:\n- A\n- B";
    let r = parse(raw);
    assert_eq!(r.introduction.as_deref(), Some("Intro para."));
    assert_eq!(r.body.as_deref(), Some("Body para one.\nBody para two."));
    assert_eq!(r.conclusion.as_deref(), Some("Wrap up."));
    assert_eq!(r.sources, Some(vec!["A".to_string(), "B".to_string()]));
}

#[test]
fn inline_conclusion_without_sources() {
    let r = parse("T\nOpening line.\n\nFinding one.\nFinding two.\nConclusion:\nIt works.");
    assert_eq!(r.introduction.as_deref(), Some("Opening line."));
    assert_eq!(r.body.as_deref(), Some("Finding one.\nFinding two."));
    assert_eq!(r.conclusion.as_deref(), Some("It works."));
    assert_eq!(r.sources, None);
}

#[test]
fn inline_sources_before_conclusion() {
    let r = parse("T\nOpening.\n\nFinding.\nReferences:\n- A\n- B\nFinal conclusion\nWrap up.");
    assert_eq!(r.introduction.as_deref(), Some("Opening."));
    assert_eq!(r.body.as_deref(), Some("Finding."));
    assert_eq!(r.sources, Some(vec!["A".to_string(), "B".to_string()]));
    assert_eq!(r.conclusion.as_deref(), Some("Wrap up."));
}

#[test]
fn long_line_mentioning_conclusion_is_not_a_heading() {
    let long = "The conclusion of this study is that more measurements are needed.";
    assert!(long.chars().count() >= 50);
    let r = parse(&format!("T\nFirst finding.\n{long}"));
    assert_eq!(r.conclusion, None);
    assert!(r.body.as_deref().is_some_and(|b| b.contains(long)));
}

#[test]
fn source_markers_normalize() {
    let entries = source_entries(
        "1. Foo\n- Bar\n\n* Baz\n12. Twelve\n-NoSpace",
        ParseOptions::default(),
    );
    assert_eq!(entries, ["Foo", "Bar", "Baz", "Twelve", "-NoSpace"]);

    let r = parse("T\nSources\n1. Foo\n- Bar\n* Baz");
    assert_eq!(r.sources, Some(vec!["Foo".into(), "Bar".into(), "Baz".into()]));
}

#[test]
fn no_text_is_duplicated_between_sections() {
    let inputs = [
        "My Title\nIntroduction\nHello.\nConclusion\nBye.\nSources\n1. A\n2. B",
        "T\nIntro para.\n\nBody para one.\nBody para two.\nIn Conclusion\nWrap up.\nReferences:\n- A\n- B",
        "T\nPreamble\nIntroduction\nHi\nthere\nConclusion\nBye\nSources\nX\nY",
        "T\nA\nB\nC\nD\nE",
    ];
    for raw in inputs {
        let r = parse(raw);
        let lines = field_lines(&r);
        for (i, line) in lines.iter().enumerate() {
            assert!(
                !lines[i + 1..].contains(line),
                "{line:?} duplicated for input {raw:?}"
            );
            assert!(raw.contains(line.as_str()), "{line:?} not from input {raw:?}");
        }
    }
}

#[test]
fn markdown_mode_strips_decoration() {
    let raw = "# Grid Storage\n\n## Introduction\nHello\n\n---\n\nMain text\n\n## Conclusion\nBye\n\n**Sources**\n[1] A\n[2] B";
    let r = HeuristicParser::new(ParseOptions::markdown()).parse(raw);
    assert_eq!(r.title.as_deref(), Some("Grid Storage"));
    assert_eq!(r.introduction.as_deref(), Some("Hello"));
    assert_eq!(r.body.as_deref(), Some("Main text"));
    assert_eq!(r.conclusion.as_deref(), Some("Bye"));
    assert_eq!(r.sources, Some(vec!["A".to_string(), "B".to_string()]));
}

#[test]
fn plain_mode_keeps_markdown_literal() {
    let raw = "# Grid Storage\n## Introduction\nHello";
    let r = parse(raw);
    assert_eq!(r.title.as_deref(), Some("# Grid Storage"));
    assert_eq!(r.introduction, None);
    assert!(r.body.is_some());
}
